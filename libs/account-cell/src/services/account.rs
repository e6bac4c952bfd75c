// libs/account-cell/src/services/account.rs
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{debug, info, instrument};

use session_cell::SessionStore;
use shared_api::ApiClient;
use shared_models::account::{Account, PictureUpload, PictureUploadResponse, UpdateAccountRequest};
use shared_models::error::{FieldError, PortalError};
use shared_utils::format::digits_only;
use shared_utils::validation::FormValidator;

const ALLOWED_PICTURE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;

pub struct AccountService {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
}

impl AccountService {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    pub async fn get_account(&self) -> Result<Account, PortalError> {
        if !self.session.is_authenticated() {
            return Err(PortalError::Unauthenticated);
        }
        debug!("Fetching patient account");
        self.api.get("/patient/account").await
    }

    #[instrument(skip(self, request))]
    pub async fn update_account(&self, request: UpdateAccountRequest) -> Result<Account, PortalError> {
        let mut validator = FormValidator::new().optional_phone("phone", request.phone.as_deref());
        if let Some(name) = request.name.as_deref() {
            validator = validator.required("name", name);
        }
        validator.finish()?;

        let request = UpdateAccountRequest {
            name: request.name.map(|n| n.trim().to_string()),
            phone: request.phone.as_deref().map(digits_only),
            ..request
        };

        let account: Account = self.api.put("/patient/account", &request).await?;
        self.session.update_patient(account.to_patient());
        info!("Account {} updated", account.id);
        Ok(account)
    }

    /// Marks the one-time onboarding as done.
    pub async fn complete_onboarding(&self) -> Result<Account, PortalError> {
        self.update_account(UpdateAccountRequest {
            has_onboarding: Some(true),
            ..UpdateAccountRequest::default()
        })
        .await
    }

    /// Uploads a profile picture as a base64 data URL.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_picture(&self, bytes: &[u8], mime_type: &str) -> Result<PictureUploadResponse, PortalError> {
        if !ALLOWED_PICTURE_TYPES.contains(&mime_type) {
            return Err(PortalError::Validation(vec![FieldError::new(
                "picture",
                "Formato de imagem não suportado",
            )]));
        }
        if bytes.is_empty() || bytes.len() > MAX_PICTURE_BYTES {
            return Err(PortalError::Validation(vec![FieldError::new(
                "picture",
                "A imagem deve ter até 5 MB",
            )]));
        }

        let body = PictureUpload {
            picture: format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)),
        };
        let response: PictureUploadResponse = self.api.post("/patient/account/picture", &body).await?;

        // The backend owns the stored URL; pick it up from the refreshed account.
        if let Ok(account) = self.api.get::<Account>("/patient/account").await {
            self.session.update_patient(account.to_patient());
        }

        Ok(response)
    }
}
