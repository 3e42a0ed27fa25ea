//! Error types for the FoodPrint challenge service

use mongodb::error::ErrorKind;

/// Main error type for challenge service operations
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("Remote store unreachable: {0}")]
    Unreachable(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Implement From conversions for common error types

impl From<std::io::Error> for ChallengeError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            Self::Timeout(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChallengeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {}", err))
    }
}

impl From<mongodb::error::Error> for ChallengeError {
    fn from(err: mongodb::error::Error) -> Self {
        classify_mongo_error(&err)
    }
}

/// Classify a MongoDB driver error into the service taxonomy.
///
/// Server selection failures mean the store could not be reached at all;
/// authentication and authorization failures map to `PermissionDenied`;
/// transient I/O problems map to `Unavailable`. Everything else is a
/// generic `Database` error.
fn classify_mongo_error(err: &mongodb::error::Error) -> ChallengeError {
    // MongoDB "Unauthorized" command error code
    const CODE_UNAUTHORIZED: i32 = 13;

    match err.kind.as_ref() {
        ErrorKind::ServerSelection { message, .. } => {
            ChallengeError::Unreachable(message.clone())
        }
        ErrorKind::Authentication { message, .. } => {
            ChallengeError::PermissionDenied(message.clone())
        }
        ErrorKind::Command(cmd) if cmd.code == CODE_UNAUTHORIZED => {
            ChallengeError::PermissionDenied(cmd.message.clone())
        }
        ErrorKind::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::TimedOut {
                ChallengeError::Timeout(io_err.to_string())
            } else {
                ChallengeError::Unavailable(io_err.to_string())
            }
        }
        _ => ChallengeError::Database(err.to_string()),
    }
}

/// Result type alias for challenge service operations
pub type Result<T> = std::result::Result<T, ChallengeError>;
