// libs/booking-cell/src/models.rs
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use shared_models::error::FieldError;
use shared_models::toast::Toast;
use shared_models::workspace::Professional;

/// Route prefix shared by every booking screen.
pub const WIZARD_PREFIX: &str = "/consultations/new";
pub const CONSULTATIONS_PATH: &str = "/consultations";

// ==============================================================================
// WIZARD STEPS
// ==============================================================================

/// The four booking screens, in flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Clinic,
    Professional,
    Schedule,
    Confirm,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::Clinic,
        WizardStep::Professional,
        WizardStep::Schedule,
        WizardStep::Confirm,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            WizardStep::Clinic => "/consultations/new",
            WizardStep::Professional => "/consultations/new/professional",
            WizardStep::Schedule => "/consultations/new/schedule",
            WizardStep::Confirm => "/consultations/new/confirm",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim_end_matches('/');
        Self::ALL.into_iter().find(|step| step.path() == path)
    }

    /// Warning shown when a later screen is opened before this step is done.
    pub fn missing_notice(&self) -> &'static str {
        match self {
            WizardStep::Clinic => "Selecione uma clínica para continuar.",
            WizardStep::Professional => "Selecione um profissional para continuar.",
            WizardStep::Schedule => "Selecione data, horário e modalidade para continuar.",
            WizardStep::Confirm => "Revise os dados da consulta.",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardStep::Clinic => write!(f, "clinic"),
            WizardStep::Professional => write!(f, "professional"),
            WizardStep::Schedule => write!(f, "schedule"),
            WizardStep::Confirm => write!(f, "confirm"),
        }
    }
}

/// What the shell should do after a wizard event.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Render(WizardStep),
    Redirect { to: String, notice: Option<Toast> },
}

impl StepOutcome {
    pub fn redirect(to: impl Into<String>) -> Self {
        StepOutcome::Redirect { to: to.into(), notice: None }
    }

    pub fn target(&self) -> &str {
        match self {
            StepOutcome::Render(step) => step.path(),
            StepOutcome::Redirect { to, .. } => to,
        }
    }
}

// ==============================================================================
// SCHEDULE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSelection {
    pub date: NaiveDate,
    #[serde(with = "shared_models::consultation::hh_mm")]
    pub time: NaiveTime,
    pub duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde(with = "shared_models::consultation::hh_mm")]
    pub time: NaiveTime,
    pub available: bool,
}

impl TimeSlot {
    pub fn label(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

/// Listing for the professional screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfessionalChoices {
    pub all: Vec<Professional>,
    pub recent: Vec<Professional>,
}

// ==============================================================================
// CONSENT
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsentItem {
    Terms,
    DataSharing,
    CancellationPolicy,
}

/// The three confirmations required before a booking is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsentForm {
    pub terms: bool,
    pub data_sharing: bool,
    pub cancellation_policy: bool,
}

impl ConsentForm {
    pub fn all_accepted() -> Self {
        Self {
            terms: true,
            data_sharing: true,
            cancellation_policy: true,
        }
    }

    pub fn set(&mut self, item: ConsentItem, checked: bool) {
        match item {
            ConsentItem::Terms => self.terms = checked,
            ConsentItem::DataSharing => self.data_sharing = checked,
            ConsentItem::CancellationPolicy => self.cancellation_policy = checked,
        }
    }

    pub fn toggle(&mut self, item: ConsentItem) {
        let checked = self.is_checked(item);
        self.set(item, !checked);
    }

    pub fn is_checked(&self, item: ConsentItem) -> bool {
        match item {
            ConsentItem::Terms => self.terms,
            ConsentItem::DataSharing => self.data_sharing,
            ConsentItem::CancellationPolicy => self.cancellation_policy,
        }
    }

    /// Submit stays disabled until this is true.
    pub fn can_submit(&self) -> bool {
        self.terms && self.data_sharing && self.cancellation_policy
    }

    pub fn missing(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if !self.terms {
            errors.push(FieldError::new("terms", "Aceite os termos de uso."));
        }
        if !self.data_sharing {
            errors.push(FieldError::new("data_sharing", "Autorize o compartilhamento de dados com o profissional."));
        }
        if !self.cancellation_policy {
            errors.push(FieldError::new("cancellation_policy", "Aceite a política de cancelamento."));
        }
        errors
    }
}
