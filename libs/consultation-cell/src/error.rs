use thiserror::Error;

use shared_models::error::PortalError;

use crate::services::video::TrackKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VideoCallError {
    #[error("Permission to use the {0} was denied")]
    PermissionDenied(TrackKind),

    #[error("No {0} device found")]
    DeviceNotFound(TrackKind),

    #[error("Real-time transport error: {0}")]
    Transport(String),
}

impl From<VideoCallError> for PortalError {
    fn from(err: VideoCallError) -> Self {
        match err {
            VideoCallError::PermissionDenied(_) | VideoCallError::DeviceNotFound(_) => {
                PortalError::MediaDevice(err.to_string())
            }
            VideoCallError::Transport(message) => PortalError::Network(message),
        }
    }
}
