use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;
use thiserror::Error;

/// Outcome envelope shared by the snapshot API and every FFI entry point.
///
/// The engine itself never fails; these variants only describe problems at
/// the boundary (unknown ids, undecodable payloads, null pointers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum AppResponse {
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Ok: {0}")]
    Ok(String),
}

impl From<SerdeError> for AppResponse {
    fn from(err: SerdeError) -> Self {
        AppResponse::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl AppResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        AppResponse::Ok(msg.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, AppResponse::Ok(_))
    }
}
