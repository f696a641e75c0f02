use crate::domain::error_code::ErrorCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Decoding param JSON: {0}")]
    Decode(String),
    #[error("{0}")]
    ExternalStore(String),
    #[error("{description}")]
    Sdk { code: ErrorCode, description: String },
    #[error("{0}")]
    Canceled(String),
    #[error("{0}")]
    AlreadyInProgress(String),
    #[error("{0}")]
    Internal(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Error body posted back to the scripting layer.
#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorPayload {
    pub error: ErrorCode,
    pub description: String,
}

impl StoreError {
    pub fn sdk(code: ErrorCode, description: impl Into<String>) -> Self {
        StoreError::Sdk {
            code,
            description: description.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::Decode(_) | StoreError::Internal(_) => ErrorCode::InternalError,
            StoreError::ExternalStore(_) => ErrorCode::ErrorWithExternalStore,
            StoreError::Sdk { code, .. } => *code,
            StoreError::Canceled(_) => ErrorCode::Canceled,
            StoreError::AlreadyInProgress(_) => ErrorCode::AlreadyInProgress,
            StoreError::Io(_) | StoreError::Csv(_) | StoreError::Config(_) => {
                ErrorCode::InternalError
            }
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            error: self.code(),
            description: self.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_errors_pass_through() {
        let err = StoreError::sdk(ErrorCode::NetworkError, "Store unreachable");
        let payload = err.to_payload();
        assert_eq!(payload.error, ErrorCode::NetworkError);
        assert_eq!(payload.description, "Store unreachable");
    }

    #[test]
    fn test_decode_error_payload() {
        let err: StoreError = serde_json::from_str::<Vec<String>>("{").unwrap_err().into();
        let json = serde_json::to_value(err.to_payload()).unwrap();
        assert_eq!(json["error"], 2004);
        assert!(
            json["description"]
                .as_str()
                .unwrap()
                .starts_with("Decoding param JSON: ")
        );
    }

    #[test]
    fn test_taxonomy_codes() {
        assert_eq!(
            StoreError::ExternalStore("setup".into()).code(),
            ErrorCode::ErrorWithExternalStore
        );
        assert_eq!(StoreError::Canceled("x".into()).code(), ErrorCode::Canceled);
        assert_eq!(
            StoreError::AlreadyInProgress("x".into()).code(),
            ErrorCode::AlreadyInProgress
        );
        assert_eq!(StoreError::Internal("x".into()).code(), ErrorCode::InternalError);
    }
}
