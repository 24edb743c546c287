//! Request protocol parsing and validation.
//!
//! Inbound requests are structured JSON validated against an embedded JSON
//! Schema, then decoded and checked again as typed values.

mod parser;
mod schema;

pub use parser::RequestError;
pub use schema::validate_request_schema;
