use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Main error type for blob-storage discovery
#[derive(Debug)]
pub enum DiscoveryError {
    /// Missing or malformed settings, or a cross-field invariant violation
    Config(String),

    /// The requested object or container does not exist
    NotFound { operation: &'static str, key: String },

    /// Any backend I/O failure: network, permissions, server errors
    StorageUnavailable {
        operation: &'static str,
        key: String,
        reason: String,
    },

    /// A presence record could not be constructed or decoded
    RecordCorrupt(String),

    /// The agent has not finished a discovery cycle yet
    NotReady(String),

    /// Discovery file could not be parsed
    Serialization(toml::de::Error),
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::Config(msg) => write!(f, "Configuration error: {}", msg),
            DiscoveryError::NotFound { operation, key } => {
                write!(f, "Not found: {} of '{}'", operation, key)
            }
            DiscoveryError::StorageUnavailable {
                operation,
                key,
                reason,
            } => write!(
                f,
                "Storage unavailable: {} of '{}' failed: {}",
                operation, key, reason
            ),
            DiscoveryError::RecordCorrupt(msg) => write!(f, "Corrupt presence record: {}", msg),
            DiscoveryError::NotReady(msg) => write!(f, "Not ready: {}", msg),
            DiscoveryError::Serialization(err) => write!(f, "Serialization error: TOML: {}", err),
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoveryError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, DiscoveryError>;

impl IntoResponse for DiscoveryError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.to_string(),
                "type": self.error_type(),
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl DiscoveryError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DiscoveryError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DiscoveryError::NotFound { .. } => StatusCode::NOT_FOUND,
            DiscoveryError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DiscoveryError::RecordCorrupt(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DiscoveryError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            DiscoveryError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            DiscoveryError::Config(_) => "configuration_invalid",
            DiscoveryError::NotFound { .. } => "not_found",
            DiscoveryError::StorageUnavailable { .. } => "storage_unavailable",
            DiscoveryError::RecordCorrupt(_) => "record_corrupt",
            DiscoveryError::NotReady(_) => "not_ready",
            DiscoveryError::Serialization(_) => "serialization_error",
        }
    }

    /// Storage failures end the current step but are expected to clear up by the next cycle
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            DiscoveryError::NotFound { .. } | DiscoveryError::StorageUnavailable { .. }
        )
    }
}

// Conversions from common error types
impl From<toml::de::Error> for DiscoveryError {
    fn from(err: toml::de::Error) -> Self {
        DiscoveryError::Serialization(err)
    }
}

impl From<url::ParseError> for DiscoveryError {
    fn from(err: url::ParseError) -> Self {
        DiscoveryError::Config(format!("Invalid connection string: {}", err))
    }
}

// Helper macros for common error construction patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::DiscoveryError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::DiscoveryError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! record_error {
    ($msg:expr) => {
        $crate::error::DiscoveryError::RecordCorrupt($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::DiscoveryError::RecordCorrupt(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! storage_error {
    ($op:expr, $key:expr, $reason:expr) => {
        $crate::error::DiscoveryError::StorageUnavailable {
            operation: $op,
            key: $key.to_string(),
            reason: $reason.to_string(),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = DiscoveryError::Config("container name is blank".to_string());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: container name is blank"
        );

        let storage_err = storage_error!("put", "node-A", "connection reset");
        assert_eq!(
            storage_err.to_string(),
            "Storage unavailable: put of 'node-A' failed: connection reset"
        );
    }

    #[test]
    fn test_error_conversion() {
        let toml_err = toml::from_str::<toml::Table>("key = [").unwrap_err();
        let err: DiscoveryError = toml_err.into();
        assert_eq!(err.error_type(), "serialization_error");

        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: DiscoveryError = url_err.into();
        assert_eq!(err.error_type(), "configuration_invalid");
    }

    #[test]
    fn test_macros() {
        let err = config_error!("update interval {} >= expiration {}", 360, 180);
        assert_eq!(
            err.to_string(),
            "Configuration error: update interval 360 >= expiration 180"
        );

        let err = record_error!("expected 5 fields, found {}", 3);
        assert_eq!(
            err.to_string(),
            "Corrupt presence record: expected 5 fields, found 3"
        );
    }

    #[test]
    fn test_storage_failure_classification() {
        assert!(storage_error!("get", "k", "timeout").is_storage_failure());
        assert!(DiscoveryError::NotFound {
            operation: "get",
            key: "k".to_string()
        }
        .is_storage_failure());
        assert!(!config_error!("bad").is_storage_failure());
        assert_eq!(
            storage_error!("list", "prefix", "503").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_response() {
        let err = DiscoveryError::NotReady("no cycle yet".to_string());
        assert_eq!(err.error_type(), "not_ready");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
    }
}
