use thiserror::Error;

use shared_models::error::PortalError;

#[derive(Error, Debug)]
pub enum CookieError {
    #[error("Cookie file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cookie file is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cookie jar lock poisoned")]
    Poisoned,
}

impl From<CookieError> for PortalError {
    fn from(err: CookieError) -> Self {
        PortalError::Storage(err.to_string())
    }
}
