//! Error types for EdgeGrid configuration and transport

use thiserror::Error;

/// Errors that can occur when loading credentials or calling an Akamai API
#[derive(Debug, Error)]
pub enum EdgeGridError {
    /// Configuration error (missing section or key, unreadable file)
    #[error("EdgeGrid configuration error: {0}")]
    Configuration(String),

    /// The API answered with a non-success status
    #[error("API error {status}: {title}{}", detail.as_ref().map(|d| format!(" ({})", d)).unwrap_or_default())]
    Api {
        status: u16,
        title: String,
        detail: Option<String>,
        body: String,
    },

    /// Network or TLS failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EdgeGridError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result type for EdgeGrid operations
pub type EdgeGridResult<T> = Result<T, EdgeGridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let error = EdgeGridError::Api {
            status: 404,
            title: "Not Found".to_string(),
            detail: Some("activation atv_1 does not exist".to_string()),
            body: String::new(),
        };
        assert_eq!(
            error.to_string(),
            "API error 404: Not Found (activation atv_1 does not exist)"
        );
        assert!(error.is_not_found());
    }

    #[test]
    fn test_configuration_error_has_no_status() {
        let error = EdgeGridError::configuration("missing host");
        assert_eq!(error.status(), None);
        assert_eq!(
            error.to_string(),
            "EdgeGrid configuration error: missing host"
        );
    }
}
