use std::sync::Arc;

use tracing::{info, instrument};

use shared_api::ApiClient;
use shared_models::checkout::{CheckoutPlanRequest, PaymentMethod};
use shared_models::error::{FieldError, PortalError};

pub struct CheckoutService {
    api: Arc<ApiClient>,
}

impl CheckoutService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn checkout_plan(
        &self,
        plan_id: &str,
        workspace_id: &str,
        payment_method: PaymentMethod,
    ) -> Result<(), PortalError> {
        let mut errors = Vec::new();
        if plan_id.trim().is_empty() {
            errors.push(FieldError::new("planId", "Selecione um plano"));
        }
        if workspace_id.trim().is_empty() {
            errors.push(FieldError::new("workspaceId", "Selecione uma clínica"));
        }
        if !errors.is_empty() {
            return Err(PortalError::Validation(errors));
        }

        let request = CheckoutPlanRequest {
            plan_id: plan_id.to_string(),
            workspace_id: workspace_id.to_string(),
            payment_method,
        };

        self.api
            .post::<_, serde_json::Value>("/patient/checkout/plan", &request)
            .await?;
        info!("Plan {} purchased for workspace {}", plan_id, workspace_id);
        Ok(())
    }
}
