// libs/workspace-cell/src/services/workspace.rs
use std::sync::Arc;

use tracing::{debug, info, instrument};

use shared_api::ApiClient;
use shared_models::error::PortalError;
use shared_models::workspace::{Professional, WorkspaceMembership};

/// Clinic memberships, invites and the professionals a patient can book with.
pub struct WorkspaceService {
    api: Arc<ApiClient>,
}

impl WorkspaceService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<WorkspaceMembership>, PortalError> {
        debug!("Fetching workspace memberships");
        self.api.get("/patient/workspaces").await
    }

    #[instrument(skip(self))]
    pub async fn accept_invite(&self, workspace_id: &str) -> Result<(), PortalError> {
        let path = format!("/patient/workspaces/{}/accept", urlencoding::encode(workspace_id));
        self.api.post_empty::<serde_json::Value>(&path).await?;
        info!("Invite to workspace {} accepted", workspace_id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn reject_invite(&self, workspace_id: &str) -> Result<(), PortalError> {
        let path = format!("/patient/workspaces/{}/reject", urlencoding::encode(workspace_id));
        self.api.post_empty::<serde_json::Value>(&path).await?;
        info!("Invite to workspace {} rejected", workspace_id);
        Ok(())
    }

    pub async fn professionals(&self, workspace_id: &str) -> Result<Vec<Professional>, PortalError> {
        debug!("Fetching professionals for workspace {}", workspace_id);
        let path = format!("/patient/workspaces/{}/professionals", urlencoding::encode(workspace_id));
        self.api.get(&path).await
    }

    /// Professionals the patient consulted with recently in this workspace.
    pub async fn recent_professionals(&self, workspace_id: &str) -> Result<Vec<Professional>, PortalError> {
        let path = format!(
            "/patient/professionals/recent?workspace_id={}",
            urlencoding::encode(workspace_id)
        );
        self.api.get(&path).await
    }
}
