// libs/booking-cell/src/services/draft.rs
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use shared_models::consultation::{ConsultationType, CreateConsultationRequest};
use shared_models::error::PortalError;
use shared_models::workspace::{Professional, SelectedWorkspace};

use crate::models::{ScheduleSelection, WIZARD_PREFIX};

/// The in-progress consultation request. Every piece starts out unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    pub workspace: Option<SelectedWorkspace>,
    pub professional: Option<Professional>,
    pub schedule: Option<ScheduleSelection>,
    pub consultation_type: Option<ConsultationType>,
}

impl BookingDraft {
    pub fn is_workspace_selected(&self) -> bool {
        self.workspace.is_some()
    }

    pub fn is_professional_selected(&self) -> bool {
        self.professional.is_some()
    }

    pub fn is_schedule_selected(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn is_modality_selected(&self) -> bool {
        self.consultation_type.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.is_workspace_selected()
            && self.is_professional_selected()
            && self.is_schedule_selected()
            && self.is_modality_selected()
    }

    /// Assembles the POST body, naming the first missing piece otherwise.
    pub fn to_request(&self) -> Result<CreateConsultationRequest, PortalError> {
        let workspace = self
            .workspace
            .as_ref()
            .ok_or_else(|| PortalError::IncompleteDraft("workspace".to_string()))?;
        let professional = self
            .professional
            .as_ref()
            .ok_or_else(|| PortalError::IncompleteDraft("professional".to_string()))?;
        let schedule = self
            .schedule
            .ok_or_else(|| PortalError::IncompleteDraft("schedule".to_string()))?;
        let consultation_type = self
            .consultation_type
            .ok_or_else(|| PortalError::IncompleteDraft("consultation_type".to_string()))?;

        Ok(CreateConsultationRequest {
            workspace_id: workspace.id.clone(),
            professional_id: professional.id.clone(),
            scheduled_date: schedule.date,
            scheduled_time: schedule.time,
            duration: schedule.duration,
            consultation_type,
        })
    }
}

/// Holds the booking draft across wizard screens.
///
/// Setters are plain merges and never touch the network. Writes are
/// last-write-wins.
#[derive(Debug, Default)]
pub struct BookingDraftStore {
    draft: RwLock<BookingDraft>,
}

impl BookingDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BookingDraft {
        self.read().clone()
    }

    pub fn set_workspace(&self, workspace: SelectedWorkspace) {
        self.write().workspace = Some(workspace);
    }

    pub fn set_professional(&self, professional: Professional) {
        self.write().professional = Some(professional);
    }

    pub fn set_schedule(&self, date: NaiveDate, time: NaiveTime, duration: u32) {
        self.write().schedule = Some(ScheduleSelection { date, time, duration });
    }

    pub fn set_consultation_type(&self, consultation_type: ConsultationType) {
        self.write().consultation_type = Some(consultation_type);
    }

    pub fn clear_consultation(&self) {
        *self.write() = BookingDraft::default();
    }

    pub fn is_workspace_selected(&self) -> bool {
        self.read().is_workspace_selected()
    }

    pub fn is_professional_selected(&self) -> bool {
        self.read().is_professional_selected()
    }

    pub fn is_schedule_selected(&self) -> bool {
        self.read().is_schedule_selected()
    }

    /// Screen teardown hook: discards the draft once the user has navigated
    /// out of the booking flow. Returns whether it was discarded.
    pub fn leave_to(&self, path: &str) -> bool {
        if path.starts_with(WIZARD_PREFIX) {
            return false;
        }
        debug!("Left booking flow for {}, discarding draft", path);
        self.clear_consultation();
        true
    }

    // A panicked writer leaves a consistent draft behind: every write is a
    // single field assignment.
    fn read(&self) -> RwLockReadGuard<'_, BookingDraft> {
        self.draft.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BookingDraft> {
        self.draft.write().unwrap_or_else(PoisonError::into_inner)
    }
}
