// libs/consultation-cell/src/services/video.rs
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use shared_models::error::PortalError;
use shared_models::toast::Toast;

use crate::error::VideoCallError;
use crate::services::consultation::ConsultationService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Camera,
    Microphone,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Camera => write!(f, "camera"),
            TrackKind::Microphone => write!(f, "microphone"),
        }
    }
}

/// A camera or microphone track handed out by the real-time SDK.
pub trait LocalTrack: Send + Sync {
    fn kind(&self) -> TrackKind;
    fn set_enabled(&self, enabled: bool) -> Result<(), VideoCallError>;
    fn is_enabled(&self) -> bool;
    /// Stops capture; the device light goes off.
    fn stop(&self);
    /// Releases the underlying device handle.
    fn close(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser {
    pub uid: String,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Boundary to the third-party real-time communication SDK.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    async fn acquire_local_track(&self, kind: TrackKind) -> Result<Box<dyn LocalTrack>, VideoCallError>;
    async fn join(&self, channel: &str, token: &str) -> Result<(), VideoCallError>;
    async fn publish(&self, kinds: &[TrackKind]) -> Result<(), VideoCallError>;
    fn remote_users(&self) -> Vec<RemoteUser>;
    async fn leave(&self) -> Result<(), VideoCallError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Active,
    Muted,
    /// Device denied or missing; the UI shows a placeholder.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Joined,
    Left,
}

/// One patient's presence in a consultation video call.
///
/// Every acquired track is stopped and closed exactly once, whether the call
/// ends through `leave`, a failed join, or the session being dropped.
pub struct VideoCallSession {
    transport: Arc<dyn RealtimeTransport>,
    consultations: Arc<ConsultationService>,
    camera: Option<Box<dyn LocalTrack>>,
    microphone: Option<Box<dyn LocalTrack>>,
    state: CallState,
    toasts: Vec<Toast>,
}

impl VideoCallSession {
    pub fn new(transport: Arc<dyn RealtimeTransport>, consultations: Arc<ConsultationService>) -> Self {
        Self {
            transport,
            consultations,
            camera: None,
            microphone: None,
            state: CallState::Idle,
            toasts: Vec::new(),
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn camera_state(&self) -> MediaState {
        media_state(self.camera.as_deref())
    }

    pub fn microphone_state(&self) -> MediaState {
        media_state(self.microphone.as_deref())
    }

    /// Notices raised since the last call, oldest first.
    pub fn take_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    pub fn remote_users(&self) -> Vec<RemoteUser> {
        if self.state == CallState::Joined {
            self.transport.remote_users()
        } else {
            Vec::new()
        }
    }

    #[instrument(skip(self))]
    pub async fn start(&mut self, consultation_id: &str) -> Result<(), PortalError> {
        if self.state == CallState::Joined {
            return Ok(());
        }

        let credentials = self.consultations.video_call_token(consultation_id).await?;

        // Each track is owned by the session as soon as it is acquired, so an
        // abandoned start still releases it on drop.
        self.release_tracks();
        let camera = self.transport.acquire_local_track(TrackKind::Camera).await;
        self.camera = self.keep_track(camera);
        let microphone = self.transport.acquire_local_track(TrackKind::Microphone).await;
        self.microphone = self.keep_track(microphone);

        if let Err(e) = self.transport.join(&credentials.channel_name, &credentials.token).await {
            warn!("Joining channel {} failed: {}", credentials.channel_name, e);
            self.release_tracks();
            return Err(e.into());
        }
        self.state = CallState::Joined;

        let published: Vec<TrackKind> = [self.camera.as_deref(), self.microphone.as_deref()]
            .into_iter()
            .flatten()
            .map(|track| track.kind())
            .collect();
        if !published.is_empty() {
            if let Err(e) = self.transport.publish(&published).await {
                warn!("Publishing local tracks failed: {}", e);
                self.shutdown().await;
                return Err(e.into());
            }
        }

        info!("Joined video call for consultation {} ({} local track(s))", consultation_id, published.len());
        Ok(())
    }

    pub fn toggle_camera(&mut self) -> Result<MediaState, PortalError> {
        toggle(self.camera.as_deref(), TrackKind::Camera)?;
        Ok(self.camera_state())
    }

    pub fn toggle_microphone(&mut self) -> Result<MediaState, PortalError> {
        toggle(self.microphone.as_deref(), TrackKind::Microphone)?;
        Ok(self.microphone_state())
    }

    pub async fn leave(&mut self) -> Result<(), PortalError> {
        if self.state != CallState::Joined {
            self.release_tracks();
            return Ok(());
        }
        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.release_tracks();
        if let Err(e) = self.transport.leave().await {
            warn!("Leaving the channel failed: {}", e);
        }
        self.state = CallState::Left;
        debug!("Video call left");
    }

    fn keep_track(&mut self, acquired: Result<Box<dyn LocalTrack>, VideoCallError>) -> Option<Box<dyn LocalTrack>> {
        match acquired {
            Ok(track) => Some(track),
            Err(e) => {
                warn!("Media acquisition failed: {}", e);
                self.toasts.push(Toast::error(PortalError::from(e).user_message()));
                None
            }
        }
    }

    fn release_tracks(&mut self) {
        for track in [self.camera.take(), self.microphone.take()].into_iter().flatten() {
            track.stop();
            track.close();
            debug!("Released {} track", track.kind());
        }
    }
}

impl Drop for VideoCallSession {
    fn drop(&mut self) {
        self.release_tracks();
    }
}

fn media_state(track: Option<&dyn LocalTrack>) -> MediaState {
    match track {
        Some(track) if track.is_enabled() => MediaState::Active,
        Some(_) => MediaState::Muted,
        None => MediaState::Unavailable,
    }
}

fn toggle(track: Option<&dyn LocalTrack>, kind: TrackKind) -> Result<(), PortalError> {
    let track = track.ok_or(VideoCallError::DeviceNotFound(kind))?;
    track.set_enabled(!track.is_enabled())?;
    Ok(())
}
