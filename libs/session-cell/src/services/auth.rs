// libs/session-cell/src/services/auth.rs
use std::sync::Arc;

use tracing::{debug, info, instrument};

use shared_api::ApiClient;
use shared_models::auth::{
    AuthResponse, EmailRequest, LoginRequest, MessageResponse, RecoverPasswordRequest,
    RegisterRequest, ValidateEmailRequest,
};
use shared_models::error::PortalError;
use shared_utils::format::digits_only;
use shared_utils::validation::FormValidator;

use crate::services::store::SessionStore;

/// Login, registration and password-recovery flows.
///
/// Every form is validated locally first; nothing reaches the network while a
/// field is invalid.
pub struct AuthService {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str, remember: bool) -> Result<(), PortalError> {
        FormValidator::new()
            .email("email", email)
            .required("password", password)
            .finish()?;

        let request = LoginRequest {
            email: email.trim().to_lowercase(),
            password: password.to_string(),
        };
        let response: AuthResponse = self.api.post("/patient/auth", &request).await?;

        self.session.sign_in(response, remember);
        Ok(())
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<MessageResponse, PortalError> {
        FormValidator::new()
            .required("name", &request.name)
            .email("email", &request.email)
            .cpf("cpf", &request.cpf)
            .optional_phone("phone", request.phone.as_deref())
            .password("password", &request.password)
            .matches("confirm_password", &request.confirm_password, &request.password)
            .finish()?;

        let request = RegisterRequest {
            name: request.name.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            cpf: digits_only(&request.cpf),
            phone: request.phone.as_deref().map(digits_only).filter(|p| !p.is_empty()),
            ..request
        };

        let response = self.api.post("/patient/auth/register", &request).await?;
        info!("Registration submitted, awaiting e-mail validation");
        Ok(response)
    }

    /// Confirms the e-mail with the code sent by the backend and signs the patient in.
    #[instrument(skip(self, token))]
    pub async fn validate_email(&self, token: &str, email: &str, remember: bool) -> Result<(), PortalError> {
        FormValidator::new()
            .required("token", token)
            .email("email", email)
            .finish()?;

        let request = ValidateEmailRequest {
            token: token.trim().to_string(),
            email: email.trim().to_lowercase(),
        };
        let response: AuthResponse = self.api.post("/patient/auth/validate-email", &request).await?;

        self.session.sign_in(response, remember);
        Ok(())
    }

    pub async fn resend_validation(&self, email: &str) -> Result<(), PortalError> {
        FormValidator::new().email("email", email).finish()?;

        let request = EmailRequest { email: email.trim().to_lowercase() };
        self.api
            .post::<_, serde_json::Value>("/patient/auth/resend-validate-email", &request)
            .await?;
        debug!("Validation e-mail re-sent");
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, PortalError> {
        FormValidator::new().email("email", email).finish()?;

        let request = EmailRequest { email: email.trim().to_lowercase() };
        self.api.post("/patient/auth/forgot-password", &request).await
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn recover_password(&self, request: RecoverPasswordRequest) -> Result<MessageResponse, PortalError> {
        FormValidator::new()
            .required("token", &request.token)
            .email("email", &request.email)
            .password("password", &request.password)
            .matches("confirm_password", &request.confirm_password, &request.password)
            .finish()?;

        self.api.post("/patient/auth/recover-password", &request).await
    }

    pub fn sign_out(&self) {
        self.session.sign_out();
    }
}
