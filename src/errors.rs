//! Typed error hierarchy for the NexusFlow client.
//!
//! Two enums cover the two failure domains:
//! - `ClientError`: API calls and store actions
//! - `ValidationErrors`: client-side form checks, resolved before any request

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Errors from the API client and the store actions built on it.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Unknown {kind} value '{value}'")]
    UnknownEnum { kind: &'static str, value: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Reconciliation task failed: {0}")]
    TaskJoin(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// True when the server answered with the given HTTP status.
    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, Self::Api { status, .. } if *status == code)
    }
}

impl From<ValidationErrors> for ClientError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Field-keyed validation messages. Empty means the form is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`. The first message per field wins.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// `Ok(())` when no field failed, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_carries_status() {
        let err = ClientError::Api {
            status: 409,
            message: "key already taken".to_string(),
        };
        assert!(err.is_status(409));
        assert!(!err.is_status(500));
        assert!(err.to_string().contains("key already taken"));
    }

    #[test]
    fn not_found_names_entity_and_id() {
        let err = ClientError::NotFound {
            entity: "Issue",
            id: "42".to_string(),
        };
        assert_eq!(err.to_string(), "Issue 42 not found");
    }

    #[test]
    fn validation_errors_keep_first_message_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("key", "Key is required");
        errors.add("key", "Key must be 5 characters or less");
        errors.add("name", "Name is required");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("key"), Some("Key is required"));
    }

    #[test]
    fn validation_errors_display_is_sorted_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "too short");
        errors.add("key", "missing");
        assert_eq!(errors.to_string(), "key: missing; name: too short");
    }

    #[test]
    fn empty_validation_errors_convert_to_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn validation_converts_into_client_error() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Please enter an email address");
        let err: ClientError = errors.into();
        match &err {
            ClientError::Validation(v) => {
                assert_eq!(v.get("email"), Some("Please enter an email address"))
            }
            _ => panic!("Expected Validation"),
        }
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&ClientError::Config("x".into()));
        assert_std_error(&ValidationErrors::new());
    }
}
