// libs/consultation-cell/src/services/consultation.rs
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use shared_api::ApiClient;
use shared_models::consultation::{
    Consultation, ConsultationQuery, CreateConsultationRequest, Paginated, VideoCallToken,
};
use shared_models::error::PortalError;

use crate::services::poller::UpcomingConsultationSource;

const DEFAULT_PAGE_SIZE: u32 = 10;

pub struct ConsultationService {
    api: Arc<ApiClient>,
}

impl ConsultationService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list(&self, query: &ConsultationQuery) -> Result<Paginated<Consultation>, PortalError> {
        let path = format!("/patient/consultations?{}", build_query_string(query));
        debug!("Listing consultations: {}", path);
        self.api.get(&path).await
    }

    pub async fn upcoming(&self) -> Result<Option<Consultation>, PortalError> {
        self.api.get("/patient/consultations/upcoming").await
    }

    #[instrument(skip(self, request), fields(workspace_id = %request.workspace_id, professional_id = %request.professional_id))]
    pub async fn create(&self, request: &CreateConsultationRequest) -> Result<Option<Consultation>, PortalError> {
        let created: Option<Consultation> = self.api.post("/patient/consultations", request).await?;
        info!(
            "Consultation requested for {} {}",
            request.scheduled_date,
            request.scheduled_time.format("%H:%M")
        );
        Ok(created)
    }

    pub async fn video_call_token(&self, consultation_id: &str) -> Result<VideoCallToken, PortalError> {
        let path = format!(
            "/patient/consultations/{}/video-call-token",
            urlencoding::encode(consultation_id)
        );
        self.api.get(&path).await
    }
}

#[async_trait]
impl UpcomingConsultationSource for ConsultationService {
    async fn next_upcoming(&self) -> Result<Option<Consultation>, PortalError> {
        self.upcoming().await
    }
}

fn build_query_string(query: &ConsultationQuery) -> String {
    let mut parts = vec![
        format!("page={}", query.page.unwrap_or(1)),
        format!("limit={}", query.limit.unwrap_or(DEFAULT_PAGE_SIZE)),
    ];

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        parts.push(format!("search={}", urlencoding::encode(search)));
    }
    if let Some(status) = query.status {
        parts.push(format!("status={}", status));
    }
    if let Some(start) = query.start_date {
        parts.push(format!("start_date={}", start.format("%Y-%m-%d")));
    }
    if let Some(end) = query.end_date {
        parts.push(format!("end_date={}", end.format("%Y-%m-%d")));
    }

    parts.join("&")
}
