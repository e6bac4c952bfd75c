// libs/session-cell/src/services/store.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use shared_api::ApiClient;
use shared_config::{PortalConfig, REMEMBER_ME_DAYS};
use shared_models::auth::{AuthResponse, Patient};
use shared_models::error::PortalError;
use shared_models::workspace::WorkspaceMembership;
use workspace_cell::WorkspaceService;

use crate::cipher::CookieCipher;
use crate::cookies::{Cookie, CookieJar};

pub const TOKEN_COOKIE: &str = "portal.token";
pub const AUTH_COOKIE: &str = "portal.auth";

/// Who is signed in and which clinics they belong to.
///
/// `token` is non-empty exactly when `patient` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub patient: Option<Patient>,
    pub token: String,
    pub workspaces: Vec<WorkspaceMembership>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty() && self.patient.is_some()
    }

    pub fn active_workspaces(&self) -> Vec<WorkspaceMembership> {
        self.workspaces.iter().filter(|w| w.is_active()).cloned().collect()
    }

    pub fn pending_invites(&self) -> Vec<WorkspaceMembership> {
        self.workspaces.iter().filter(|w| w.is_pending_invite()).cloned().collect()
    }
}

/// Encrypted payload of the auth cookie.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedAuth {
    patient: Patient,
    workspaces: Vec<WorkspaceMembership>,
}

pub struct SessionStore {
    api: Arc<ApiClient>,
    workspace_service: Arc<WorkspaceService>,
    jar: Arc<dyn CookieJar>,
    cipher: CookieCipher,
    secure_cookies: bool,
    state: watch::Sender<SessionState>,
    // Workspace-list writes go through this lock one at a time.
    writer: Mutex<()>,
    workspaces_revision: AtomicU64,
    // Bumped on sign-in and sign-out; fetches started under an older epoch are discarded.
    session_epoch: AtomicU64,
}

impl SessionStore {
    /// Builds the store and rehydrates it once from the cookie jar.
    pub fn new(
        config: &PortalConfig,
        api: Arc<ApiClient>,
        workspace_service: Arc<WorkspaceService>,
        jar: Arc<dyn CookieJar>,
    ) -> Result<Self, PortalError> {
        let (state, _) = watch::channel(SessionState::default());
        let store = Self {
            api,
            workspace_service,
            jar,
            cipher: CookieCipher::new(&config.cookie_secret)?,
            secure_cookies: config.secure_cookies,
            state,
            writer: Mutex::new(()),
            workspaces_revision: AtomicU64::new(0),
            session_epoch: AtomicU64::new(0),
        };
        store.rehydrate();
        Ok(store)
    }

    fn rehydrate(&self) {
        let (Some(token_cookie), Some(auth_cookie)) = (self.jar.get(TOKEN_COOKIE), self.jar.get(AUTH_COOKIE)) else {
            debug!("No session cookies to rehydrate from");
            return;
        };

        let restored = self
            .cipher
            .open(&auth_cookie.value)
            .and_then(|plain| serde_json::from_slice::<PersistedAuth>(&plain).map_err(PortalError::from));

        match restored {
            Ok(auth) if !token_cookie.value.is_empty() => {
                info!("Session restored for patient {}", auth.patient.id);
                self.api.set_token(Some(token_cookie.value.clone()));
                self.state.send_replace(SessionState {
                    patient: Some(auth.patient),
                    token: token_cookie.value,
                    workspaces: auth.workspaces,
                });
            }
            Ok(_) => debug!("Token cookie is empty, staying signed out"),
            Err(e) => {
                warn!("Discarding unreadable session cookies: {}", e);
                self.clear_cookies();
            }
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn token(&self) -> String {
        self.state.borrow().token.clone()
    }

    pub fn patient(&self) -> Option<Patient> {
        self.state.borrow().patient.clone()
    }

    pub fn workspaces(&self) -> Vec<WorkspaceMembership> {
        self.state.borrow().workspaces.clone()
    }

    /// Bumped every time a fetched workspace list is applied.
    pub fn workspaces_revision(&self) -> u64 {
        self.workspaces_revision.load(Ordering::SeqCst)
    }

    /// Storage failures are logged; the in-memory session stays valid for this run.
    #[instrument(skip(self, data), fields(patient_id = %data.patient.id))]
    pub fn sign_in(&self, data: AuthResponse, remember: bool) {
        let expires = remember.then(|| Utc::now() + Duration::days(REMEMBER_ME_DAYS));

        self.session_epoch.fetch_add(1, Ordering::SeqCst);
        self.api.set_token(Some(data.token.clone()));
        self.state.send_replace(SessionState {
            patient: Some(data.patient.clone()),
            token: data.token.clone(),
            workspaces: data.workspaces.clone(),
        });

        let token_cookie = Cookie::new(TOKEN_COOKIE, data.token)
            .expires(expires)
            .secure(self.secure_cookies);
        if let Err(e) = self.jar.set(token_cookie) {
            warn!("Failed to persist token cookie: {}", e);
        }
        self.persist_auth(&data.patient, &data.workspaces, expires);

        info!("Patient signed in (remember: {})", remember);
    }

    pub fn sign_out(&self) {
        self.session_epoch.fetch_add(1, Ordering::SeqCst);
        self.api.set_token(None);
        self.state.send_replace(SessionState::default());
        self.clear_cookies();
        info!("Patient signed out");
    }

    pub async fn accept_invite(&self, workspace_id: &str) -> Result<Vec<WorkspaceMembership>, PortalError> {
        let _guard = self.writer.lock().await;
        self.workspace_service.accept_invite(workspace_id).await?;
        self.fetch_and_apply_workspaces().await
    }

    pub async fn reject_invite(&self, workspace_id: &str) -> Result<Vec<WorkspaceMembership>, PortalError> {
        let _guard = self.writer.lock().await;
        self.workspace_service.reject_invite(workspace_id).await?;
        self.fetch_and_apply_workspaces().await
    }

    pub async fn refresh_workspaces(&self) -> Result<Vec<WorkspaceMembership>, PortalError> {
        let _guard = self.writer.lock().await;
        self.fetch_and_apply_workspaces().await
    }

    /// Replaces the cached patient after an account update.
    pub fn update_patient(&self, patient: Patient) {
        if !self.is_authenticated() {
            return;
        }
        self.state.send_modify(|state| state.patient = Some(patient.clone()));
        let workspaces = self.workspaces();
        self.persist_auth(&patient, &workspaces, self.current_expiry());
    }

    // Caller holds `writer`.
    async fn fetch_and_apply_workspaces(&self) -> Result<Vec<WorkspaceMembership>, PortalError> {
        let epoch = self.session_epoch.load(Ordering::SeqCst);
        let workspaces = self.workspace_service.list().await?;

        // The cookie is rewritten under the state lock, so a concurrent
        // sign-out either discards this list or clears it afterwards.
        let applied = self.state.send_if_modified(|state| {
            if self.session_epoch.load(Ordering::SeqCst) != epoch || !state.is_authenticated() {
                return false;
            }
            state.workspaces = workspaces.clone();
            if let Some(patient) = &state.patient {
                self.persist_auth(patient, &workspaces, self.current_expiry());
            }
            true
        });

        if !applied {
            debug!("Session ended while workspaces were loading, discarding the list");
            return Err(PortalError::Unauthenticated);
        }

        let revision = self.workspaces_revision.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Applied workspace list revision {} ({} entries)", revision, workspaces.len());
        Ok(workspaces)
    }

    fn persist_auth(&self, patient: &Patient, workspaces: &[WorkspaceMembership], expires: Option<DateTime<Utc>>) {
        let payload = PersistedAuth {
            patient: patient.clone(),
            workspaces: workspaces.to_vec(),
        };

        let sealed = serde_json::to_vec(&payload)
            .map_err(PortalError::from)
            .and_then(|plain| self.cipher.seal(&plain));

        match sealed {
            Ok(value) => {
                let cookie = Cookie::new(AUTH_COOKIE, value)
                    .expires(expires)
                    .secure(self.secure_cookies);
                if let Err(e) = self.jar.set(cookie) {
                    warn!("Failed to persist auth cookie: {}", e);
                }
            }
            Err(e) => warn!("Failed to seal auth cookie: {}", e),
        }
    }

    /// Keeps the lifetime chosen at sign-in when the auth cookie is rewritten.
    fn current_expiry(&self) -> Option<DateTime<Utc>> {
        self.jar.get(TOKEN_COOKIE).and_then(|cookie| cookie.expires)
    }

    fn clear_cookies(&self) {
        for name in [TOKEN_COOKIE, AUTH_COOKIE] {
            if let Err(e) = self.jar.remove(name) {
                warn!("Failed to remove cookie {}: {}", name, e);
            }
        }
    }
}
