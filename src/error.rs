use axum::{http::StatusCode, Json};
use serde_json::json;
use std::fmt;

use crate::import::constants::{
    CUSTOM_FIELDS_DO_NOT_EXIST, ERROR_MESSAGE, FAILED_TO_PROCESS_USER_SEARCH_RESULT,
};

#[derive(Debug)]
pub enum AppError {
    Database(String),
    Serialization(serde_json::Error),
    SchemaMismatch(String),
    BadRequest(String),
    NotFound(String),
    Internal(String),
    Configuration(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Serialization(e) => write!(f, "Serialization error: {}", e),
            AppError::SchemaMismatch(e) => write!(f, "Schema mismatch: {}", e),
            AppError::BadRequest(e) => write!(f, "Bad request: {}", e),
            AppError::NotFound(e) => write!(f, "Not found: {}", e),
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::Configuration(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True when the collaborator answered but its payload could not be interpreted.
    pub fn is_malformed_result(&self) -> bool {
        matches!(self, AppError::Serialization(_) | AppError::SchemaMismatch(_))
    }

    pub fn to_response(&self) -> (StatusCode, Json<serde_json::Value>) {
        let (status, message) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.clone())
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::SchemaMismatch(e) => {
                tracing::error!("Schema mismatch: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.clone())
            }
            AppError::BadRequest(e) => (StatusCode::BAD_REQUEST, e.clone()),
            AppError::NotFound(e) => (StatusCode::NOT_FOUND, e.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.clone())
            }
            AppError::Configuration(e) => {
                tracing::error!("Configuration error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.clone())
            }
        };

        (status, Json(json!({ "error": message })))
    }
}

/// Failure that stops a whole import batch before or after the per-record pass.
#[derive(Debug)]
pub enum ImportError {
    /// A reference table could not be listed. `stage` is the user-facing stage message.
    ReferenceData { stage: &'static str, cause: AppError },
    /// Included custom field definitions reference fields the directory does not know.
    UnknownCustomFields(Vec<String>),
    /// Included departments or custom fields could not be written back.
    IncludedDataSave { stage: &'static str, cause: AppError },
    /// Accounts of the batch source type could not be listed for the deactivation sweep.
    DeactivationListing(AppError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::ReferenceData { stage, cause }
            | ImportError::IncludedDataSave { stage, cause } => {
                write!(f, "{}{}{}", stage, ERROR_MESSAGE, cause)
            }
            ImportError::UnknownCustomFields(ref_ids) => {
                write!(f, "{}[{}].", CUSTOM_FIELDS_DO_NOT_EXIST, ref_ids.join(", "))
            }
            ImportError::DeactivationListing(cause) => {
                write!(
                    f,
                    "{} {}",
                    FAILED_TO_PROCESS_USER_SEARCH_RESULT, cause
                )
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::ReferenceData { cause, .. }
            | ImportError::IncludedDataSave { cause, .. }
            | ImportError::DeactivationListing(cause) => Some(cause),
            ImportError::UnknownCustomFields(_) => None,
        }
    }
}
