//! Validation - Reject invalid configuration before any network call

use crate::provider::ProviderError;

/// A single configuration problem
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Attributes '{first}' and '{second}' cannot be set together")]
    Conflicting { first: String, second: String },

    #[error("Invalid value '{value}' for '{name}': {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid value '{value}' for '{name}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        name: String,
        value: String,
        expected: Vec<String>,
    },
}

impl ValidationError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingRequired { name: name.into() }
    }

    pub fn invalid(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration that can check itself
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Validate and convert failures into a single provider error
    fn ensure_valid(&self) -> Result<(), ProviderError> {
        self.validate().map_err(into_provider_error)
    }
}

/// Fold a list of validation failures into one provider error
pub fn into_provider_error(errors: Vec<ValidationError>) -> ProviderError {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    ProviderError::validation(messages.join("; "))
}

/// Record a missing-attribute error when `value` is blank
pub fn require_non_empty(name: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.trim().is_empty() {
        errors.push(ValidationError::missing(name));
    }
}
