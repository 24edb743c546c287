//! Remote validator reached over HTTP.
//!
//! POSTs the [`ValidatorPayload`] as JSON and expects a
//! `ValidationResult`-shaped body back.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use regattest_core::{ValidationLevel, ValidationResult};

use super::secrets::ApiCredential;
use super::{check_remote_result, Validator, ValidatorError, ValidatorPayload};
use crate::config::ValidatorEndpointConfig;

/// Remote validator for one level.
pub struct HttpValidator {
    level: ValidationLevel,
    name: String,
    endpoint: String,
    credential: Option<ApiCredential>,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpValidator")
            .field("level", &self.level)
            .field("endpoint", &self.endpoint)
            .field("credential", &self.credential)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    #[serde(default)]
    message: String,
}

impl HttpValidator {
    pub fn new(
        level: ValidationLevel,
        endpoint: impl Into<String>,
        credential: Option<ApiCredential>,
        timeout: Duration,
    ) -> Result<Self, ValidatorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ValidatorError::NotConfigured(e.to_string()))?;

        Ok(Self {
            level,
            name: format!("http-{}", level),
            endpoint: endpoint.into(),
            credential,
            timeout,
            client,
        })
    }

    /// Build from an endpoint entry, resolving its credential.
    pub fn from_config(
        config: &ValidatorEndpointConfig,
        timeout: Duration,
    ) -> Result<Self, ValidatorError> {
        let level = ValidationLevel::try_from(config.level)
            .map_err(|e| ValidatorError::NotConfigured(e.to_string()))?;

        let credential = ApiCredential::from_config_or_env(
            config.api_key.as_deref(),
            config.api_key_env.as_deref(),
            "Validator API key",
        )?;

        Self::new(level, config.endpoint.clone(), credential, timeout)
    }
}

#[async_trait]
impl Validator for HttpValidator {
    fn level(&self) -> ValidationLevel {
        self.level
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn validate(
        &self,
        payload: &ValidatorPayload,
    ) -> Result<ValidationResult, ValidatorError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(payload);

        // Only expose the credential here, at the point of use
        if let Some(credential) = &self.credential {
            request = request.header("x-api-key", credential.expose());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ValidatorError::Timeout(self.timeout)
            } else {
                ValidatorError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<RemoteError>()
                .await
                .map(|body| body.message)
                .unwrap_or_default();
            return Err(ValidatorError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let result: ValidationResult = response
            .json()
            .await
            .map_err(|e| ValidatorError::MalformedResponse(e.to_string()))?;

        check_remote_result(result)
    }
}
