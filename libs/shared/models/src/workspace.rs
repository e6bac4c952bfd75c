use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceType {
    /// Solo practitioner; the owner is the only professional.
    Personal,
    Business,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Active,
    Pending,
    Expired,
    Archived,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professional {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "especiality", default, skip_serializing_if = "Option::is_none")]
    pub speciality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regional_council_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// The patient's relationship to one workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceMembership {
    pub workspace_id: String,
    pub workspace_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_picture: Option<String>,
    pub workspace_type: WorkspaceType,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Professional>,
}

impl WorkspaceMembership {
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }

    pub fn is_pending_invite(&self) -> bool {
        self.status == MembershipStatus::Pending
    }
}

/// Workspace as carried by the booking draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedWorkspace {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(rename = "type")]
    pub workspace_type: WorkspaceType,
}

impl From<&WorkspaceMembership> for SelectedWorkspace {
    fn from(membership: &WorkspaceMembership) -> Self {
        Self {
            id: membership.workspace_id.clone(),
            name: membership.workspace_name.clone(),
            picture: membership.workspace_picture.clone(),
            workspace_type: membership.workspace_type,
        }
    }
}
