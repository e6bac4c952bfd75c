use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Literal message the backend uses when the bearer token is no longer accepted.
pub const TOKEN_INVALID_MESSAGE: &str = "Token invalid";

pub const GENERIC_ERROR_MESSAGE: &str = "Ocorreu um erro inesperado. Tente novamente.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Backend error ({status}): {}", message.as_deref().unwrap_or("no message"))]
    Backend { status: u16, message: Option<String> },

    #[error("Session token rejected by the backend")]
    TokenInvalid,

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Media device error: {0}")]
    MediaDevice(String),

    #[error("Booking draft incomplete: {0}")]
    IncompleteDraft(String),
}

impl PortalError {
    /// Message suitable for a toast: the backend's own message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Backend { message: Some(message), .. } if !message.is_empty() => {
                message.clone()
            }
            PortalError::TokenInvalid | PortalError::Unauthenticated => {
                "Sua sessão expirou. Faça login novamente.".to_string()
            }
            PortalError::Validation(errors) => errors
                .first()
                .map(|error| error.message.clone())
                .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
            PortalError::MediaDevice(_) => {
                "Não foi possível acessar a câmera ou o microfone.".to_string()
            }
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn is_session_fatal(&self) -> bool {
        matches!(self, PortalError::TokenInvalid)
    }

    /// Transient failures worth retrying on read queries.
    pub fn is_retryable(&self) -> bool {
        match self {
            PortalError::Network(_) | PortalError::Timeout => true,
            PortalError::Backend { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            PortalError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Decode(err.to_string())
    }
}
