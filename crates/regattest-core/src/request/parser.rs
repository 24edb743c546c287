//! Request decoding and typed validation.

use thiserror::Error;

use super::schema::validate_request_schema;
use crate::types::{ValidationRequest, MAX_CERTAINTY, MIN_CERTAINTY};
use crate::version::RegulationVersion;

/// Errors that make a request unusable.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Request does not match protocol shape: {}", .0.join("; "))]
    Shape(Vec<String>),

    #[error("Failed to decode request: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RequestError {
    /// Individual violation messages.
    pub fn violations(&self) -> Vec<String> {
        match self {
            Self::Shape(errors) => errors.clone(),
            Self::Decode(e) => vec![e.to_string()],
        }
    }
}

impl ValidationRequest {
    /// Decode a request from raw JSON after checking it against the schema.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, RequestError> {
        validate_request_schema(value).map_err(RequestError::Shape)?;

        let request: ValidationRequest = serde_json::from_value(value.clone())?;
        request.validate()?;
        Ok(request)
    }

    /// Decode a request from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, RequestError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }

    /// Check the typed request.
    ///
    /// Requests built in code skip the schema, so the same constraints are
    /// enforced here.
    pub fn validate(&self) -> Result<(), RequestError> {
        let mut errors = Vec::new();

        if self.regulation_id.trim().is_empty() {
            errors.push("regulationId must not be empty".to_string());
        }

        if let Err(e) = self.regulation_version.parse::<RegulationVersion>() {
            errors.push(format!("regulationVersion: {}", e));
        }

        let certainty = self.options.require_certainty;
        if !(MIN_CERTAINTY..=MAX_CERTAINTY).contains(&certainty) {
            errors.push(format!(
                "options.requireCertainty must be between {} and {}, got {}",
                MIN_CERTAINTY, MAX_CERTAINTY, certainty
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RequestError::Shape(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RegulationContent, ValidationLevel, ValidationOptions};
    use serde_json::json;

    const VALID_REQUEST: &str = r#"{
        "regulationId": "REG-001",
        "regulationVersion": "2.1.0",
        "content": {
            "text": "Institutions shall report within 30 days.",
            "metadata": { "source": "client-cache" }
        },
        "requestedLevel": 2,
        "options": {
            "requireCertainty": 3,
            "includeEvidence": false,
            "checkVersionChanges": true
        }
    }"#;

    #[test]
    fn test_parse_valid_request() {
        let request = ValidationRequest::from_json_str(VALID_REQUEST).unwrap();
        assert_eq!(request.regulation_id, "REG-001");
        assert_eq!(request.requested_level, ValidationLevel::Pattern);
        assert_eq!(request.options.require_certainty, 3);
        assert!(!request.options.include_evidence);
        assert!(request.options.check_version_changes);
        assert_eq!(request.content.metadata["source"], json!("client-cache"));
    }

    #[test]
    fn test_defaults_applied() {
        let request = ValidationRequest::from_json(&json!({
            "regulationId": "R1",
            "regulationVersion": "1.2.3",
            "content": { "text": "" }
        }))
        .unwrap();

        assert_eq!(request.requested_level, ValidationLevel::Text);
        assert_eq!(request.options, ValidationOptions::default());
    }

    #[test]
    fn test_shape_errors_surface() {
        let result = ValidationRequest::from_json(&json!({
            "regulationId": "",
            "regulationVersion": "one",
            "content": {}
        }));

        match result {
            Err(RequestError::Shape(errors)) => assert!(errors.len() >= 2),
            other => panic!("Expected shape error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let result = ValidationRequest::from_json_str("{not json");
        assert!(matches!(result, Err(RequestError::Decode(_))));
    }

    #[test]
    fn test_typed_validation_catches_programmatic_requests() {
        let request = ValidationRequest {
            regulation_id: " ".to_string(),
            regulation_version: "1.0".to_string(),
            content: RegulationContent::text("x"),
            requested_level: ValidationLevel::Text,
            options: ValidationOptions {
                require_certainty: 0,
                ..Default::default()
            },
        };

        let errors = request.validate().unwrap_err().violations();
        assert_eq!(errors.len(), 3);
    }
}
