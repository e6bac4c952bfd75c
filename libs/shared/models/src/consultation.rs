use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workspace::Professional;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationType {
    Presencial,
    Online,
}

impl fmt::Display for ConsultationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationType::Presencial => write!(f, "PRESENCIAL"),
            ConsultationType::Online => write!(f, "ONLINE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Finished,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationStatus::Scheduled => write!(f, "SCHEDULED"),
            ConsultationStatus::Confirmed => write!(f, "CONFIRMED"),
            ConsultationStatus::InProgress => write!(f, "IN_PROGRESS"),
            ConsultationStatus::Finished => write!(f, "FINISHED"),
            ConsultationStatus::Canceled => write!(f, "CANCELED"),
            ConsultationStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professional: Option<Professional>,
    pub scheduled_date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub scheduled_time: NaiveTime,
    pub duration: u32,
    pub consultation_type: ConsultationType,
    pub status: ConsultationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Consultation {
    /// Route of the consultation's detail/video screen.
    pub fn detail_path(&self) -> String {
        format!("/consultations/{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateConsultationRequest {
    pub workspace_id: String,
    pub professional_id: String,
    pub scheduled_date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub scheduled_time: NaiveTime,
    pub duration: u32,
    pub consultation_type: ConsultationType,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsultationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub status: Option<ConsultationStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(alias = "data")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCallToken {
    pub token: String,
    #[serde(rename = "channelName")]
    pub channel_name: String,
}

/// Wall-clock times travel as `"HH:MM"`.
pub mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
