// libs/booking-cell/src/services/wizard.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info, instrument, warn};

use consultation_cell::ConsultationService;
use session_cell::SessionStore;
use shared_models::consultation::ConsultationType;
use shared_models::error::{FieldError, PortalError};
use shared_models::toast::Toast;
use shared_models::workspace::{Professional, SelectedWorkspace, WorkspaceMembership, WorkspaceType};
use workspace_cell::WorkspaceService;

use crate::models::{ConsentForm, ProfessionalChoices, StepOutcome, WizardStep, CONSULTATIONS_PATH};
use crate::services::draft::{BookingDraft, BookingDraftStore};
use crate::services::schedule::find_slot;

pub const BOOKED_NOTICE: &str = "Consulta agendada com sucesso!";

/// First step whose selection is still missing; `Confirm` once the draft is complete.
pub fn earliest_incomplete(draft: &BookingDraft) -> WizardStep {
    if !draft.is_workspace_selected() {
        WizardStep::Clinic
    } else if !draft.is_professional_selected() {
        WizardStep::Professional
    } else if !draft.is_schedule_selected() || !draft.is_modality_selected() {
        WizardStep::Schedule
    } else {
        WizardStep::Confirm
    }
}

/// Decides whether `step` may render for `draft`, or where to send the user back to.
pub fn gate(step: WizardStep, draft: &BookingDraft) -> StepOutcome {
    let reachable = earliest_incomplete(draft);
    if step <= reachable {
        return StepOutcome::Render(step);
    }
    StepOutcome::Redirect {
        to: reachable.path().to_string(),
        notice: Some(Toast::warning(reachable.missing_notice())),
    }
}

/// The booking flow: clinic, professional, schedule, confirmation.
///
/// Step prerequisites live here, so no screen renders with a partial draft.
pub struct BookingWizard {
    draft: Arc<BookingDraftStore>,
    session: Arc<SessionStore>,
    workspaces: Arc<WorkspaceService>,
    consultations: Arc<ConsultationService>,
}

impl BookingWizard {
    pub fn new(
        draft: Arc<BookingDraftStore>,
        session: Arc<SessionStore>,
        workspaces: Arc<WorkspaceService>,
        consultations: Arc<ConsultationService>,
    ) -> Self {
        Self {
            draft,
            session,
            workspaces,
            consultations,
        }
    }

    pub fn draft(&self) -> BookingDraft {
        self.draft.snapshot()
    }

    /// Called when a wizard screen mounts.
    pub fn enter(&self, step: WizardStep) -> StepOutcome {
        let outcome = gate(step, &self.draft.snapshot());
        if let StepOutcome::Redirect { to, .. } = &outcome {
            debug!("Step {} not reachable yet, redirecting to {}", step, to);
        }
        outcome
    }

    /// Called when a wizard screen unmounts with the path being navigated to.
    pub fn leave(&self, next_path: &str) -> bool {
        self.draft.leave_to(next_path)
    }

    /// Clinics the patient can book with.
    pub fn clinics(&self) -> Vec<WorkspaceMembership> {
        self.session.snapshot().active_workspaces()
    }

    #[instrument(skip(self))]
    pub fn select_workspace(&self, workspace_id: &str) -> Result<StepOutcome, PortalError> {
        let membership = self
            .clinics()
            .into_iter()
            .find(|m| m.workspace_id == workspace_id)
            .ok_or_else(|| {
                PortalError::Validation(vec![FieldError::new("workspace", "Clínica indisponível para agendamento.")])
            })?;

        let current = self.draft.snapshot().workspace.map(|w| w.id);
        if current.as_deref().is_some_and(|id| id != workspace_id) {
            debug!("Workspace changed, starting a fresh draft");
            self.draft.clear_consultation();
        }
        self.draft.set_workspace(SelectedWorkspace::from(&membership));

        match (membership.workspace_type, membership.owner) {
            (WorkspaceType::Personal, Some(owner)) => {
                info!("Personal workspace {}, assigning owner {}", workspace_id, owner.id);
                self.draft.set_professional(owner);
                Ok(StepOutcome::redirect(WizardStep::Schedule.path()))
            }
            (WorkspaceType::Personal, None) => {
                warn!("Personal workspace {} has no owner, asking for a professional", workspace_id);
                Ok(StepOutcome::redirect(WizardStep::Professional.path()))
            }
            (WorkspaceType::Business, _) => Ok(StepOutcome::redirect(WizardStep::Professional.path())),
        }
    }

    /// Professionals of the selected workspace plus the recently consulted shortlist.
    pub async fn professionals(&self) -> Result<ProfessionalChoices, PortalError> {
        let workspace = self
            .draft
            .snapshot()
            .workspace
            .ok_or_else(|| PortalError::IncompleteDraft("workspace".to_string()))?;

        let (all, recent) = futures::future::join(
            self.workspaces.professionals(&workspace.id),
            self.workspaces.recent_professionals(&workspace.id),
        )
        .await;

        let recent = recent.unwrap_or_else(|e| {
            warn!("Recent professionals unavailable for {}: {}", workspace.id, e);
            Vec::new()
        });

        Ok(ProfessionalChoices { all: all?, recent })
    }

    pub fn select_professional(&self, professional: Professional) -> Result<StepOutcome, PortalError> {
        if !self.draft.is_workspace_selected() {
            return Err(PortalError::IncompleteDraft("workspace".to_string()));
        }
        debug!("Professional {} selected", professional.id);
        self.draft.set_professional(professional);
        Ok(StepOutcome::redirect(WizardStep::Schedule.path()))
    }

    /// Picks a day and one of the offered slots.
    pub fn select_schedule(&self, date: NaiveDate, time: NaiveTime, duration: u32) -> Result<(), PortalError> {
        if !self.draft.is_professional_selected() {
            return Err(PortalError::IncompleteDraft("professional".to_string()));
        }

        let mut errors = Vec::new();
        match find_slot(time) {
            Some(slot) if slot.available => {}
            Some(_) => errors.push(FieldError::new("time", "Horário indisponível.")),
            None => errors.push(FieldError::new("time", "Selecione um horário da lista.")),
        }
        if duration == 0 {
            errors.push(FieldError::new("duration", "Duração inválida."));
        }
        if !errors.is_empty() {
            return Err(PortalError::Validation(errors));
        }

        self.draft.set_schedule(date, time, duration);
        Ok(())
    }

    pub fn select_modality(&self, consultation_type: ConsultationType) {
        self.draft.set_consultation_type(consultation_type);
    }

    /// "Continue" on the schedule screen.
    pub fn proceed_to_confirm(&self) -> StepOutcome {
        match self.enter(WizardStep::Confirm) {
            StepOutcome::Render(step) => StepOutcome::redirect(step.path()),
            redirect => redirect,
        }
    }

    /// Posts the assembled draft and routes to the consultation list.
    ///
    /// The draft is kept on failure so the patient can retry.
    #[instrument(skip(self, consent))]
    pub async fn submit(&self, consent: &ConsentForm) -> Result<StepOutcome, PortalError> {
        if !consent.can_submit() {
            return Err(PortalError::Validation(consent.missing()));
        }

        let request = self.draft.snapshot().to_request()?;
        let created = self.consultations.create(&request).await?;

        self.draft.clear_consultation();
        info!(
            "Consultation booked with professional {} on {} {}",
            request.professional_id,
            request.scheduled_date,
            request.scheduled_time.format("%H:%M")
        );
        if let Some(consultation) = created {
            debug!("Backend assigned id {}", consultation.id);
        }

        Ok(StepOutcome::Redirect {
            to: CONSULTATIONS_PATH.to_string(),
            notice: Some(Toast::success(BOOKED_NOTICE)),
        })
    }
}
