use std::sync::{Arc, Weak};

use tracing::{debug, info};

use account_cell::AccountService;
use booking_cell::{BookingDraftStore, BookingWizard};
use consultation_cell::{
    ConsultationService, RealtimeTransport, UpcomingConsultationPoller, UpcomingConsultationSource, VideoCallSession,
};
use navigation_cell::{GuardDecision, Navigator, RouteGuard, LOGIN_PATH};
use session_cell::{AuthService, CookieJar, FileCookieJar, MemoryCookieJar, SessionStore};
use shared_api::ApiClient;
use shared_config::PortalConfig;
use shared_models::account::Account;
use shared_models::error::PortalError;
use workspace_cell::{CheckoutService, WorkspaceService};

/// Routes reachable without a session.
const PUBLIC_PATHS: [&str; 5] = [
    "/login",
    "/register",
    "/validate-email",
    "/forgot-password",
    "/recover-password",
];

pub fn is_public(path: &str) -> bool {
    let path = path.trim_end_matches('/');
    PUBLIC_PATHS.contains(&path)
}

/// Every portal service, built once and shared by reference.
pub struct Portal {
    config: PortalConfig,
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
    auth: Arc<AuthService>,
    accounts: Arc<AccountService>,
    workspaces: Arc<WorkspaceService>,
    checkout: Arc<CheckoutService>,
    consultations: Arc<ConsultationService>,
    draft: Arc<BookingDraftStore>,
    wizard: Arc<BookingWizard>,
    navigator: Arc<Navigator>,
    poller: Arc<UpcomingConsultationPoller>,
    guard: Arc<RouteGuard>,
}

impl Portal {
    /// Opens the cookie file when one is configured, otherwise keeps cookies in memory.
    pub fn new(config: PortalConfig) -> Result<Self, PortalError> {
        let jar: Arc<dyn CookieJar> = match &config.cookie_path {
            Some(path) => Arc::new(FileCookieJar::open(path)?),
            None => Arc::new(MemoryCookieJar::new()),
        };
        Self::with_jar(config, jar)
    }

    pub fn with_jar(config: PortalConfig, jar: Arc<dyn CookieJar>) -> Result<Self, PortalError> {
        let api = Arc::new(ApiClient::new(&config)?);
        let workspaces = Arc::new(WorkspaceService::new(Arc::clone(&api)));
        let checkout = Arc::new(CheckoutService::new(Arc::clone(&api)));
        let consultations = Arc::new(ConsultationService::new(Arc::clone(&api)));
        let session = Arc::new(SessionStore::new(&config, Arc::clone(&api), Arc::clone(&workspaces), jar)?);
        let auth = Arc::new(AuthService::new(Arc::clone(&api), Arc::clone(&session)));
        let accounts = Arc::new(AccountService::new(Arc::clone(&api), Arc::clone(&session)));

        let draft = Arc::new(BookingDraftStore::new());
        let wizard = Arc::new(BookingWizard::new(
            Arc::clone(&draft),
            Arc::clone(&session),
            Arc::clone(&workspaces),
            Arc::clone(&consultations),
        ));

        let navigator = Arc::new(Navigator::new(LOGIN_PATH));
        let upcoming: Arc<dyn UpcomingConsultationSource> = consultations.clone();
        let poller = Arc::new(UpcomingConsultationPoller::new(upcoming, config.upcoming_poll_interval()));
        let guard = Arc::new(RouteGuard::new(
            Arc::clone(&session),
            Arc::clone(&accounts),
            Arc::clone(&navigator),
            Arc::clone(&poller),
        ));

        install_token_invalid_hook(&api, &session, &guard, &draft, &navigator);

        info!("Portal ready (api: {})", api.base_url());
        Ok(Self {
            config,
            api,
            session,
            auth,
            accounts,
            workspaces,
            checkout,
            consultations,
            draft,
            wizard,
            navigator,
            poller,
            guard,
        })
    }

    /// Moves to `path`, discarding the booking draft when the flow is left
    /// and running the route guard for private paths.
    pub async fn navigate(&self, path: &str) -> GuardDecision {
        self.navigator.navigate(path);
        self.draft.leave_to(path);

        if is_public(path) {
            debug!("{} is public, skipping guard", path);
            return GuardDecision::Render;
        }
        self.guard.resolve(path).await
    }

    /// Finishes onboarding and makes the guard refetch the account, so the
    /// next private route no longer lands on the welcome screen.
    pub async fn complete_onboarding(&self) -> Result<Account, PortalError> {
        let account = self.accounts.complete_onboarding().await?;
        self.guard.invalidate_account();
        Ok(account)
    }

    pub fn video_call(&self, transport: Arc<dyn RealtimeTransport>) -> VideoCallSession {
        VideoCallSession::new(transport, Arc::clone(&self.consultations))
    }

    /// Signs out and stops background work.
    pub fn sign_out(&self) {
        self.guard.unmount();
        self.draft.clear_consultation();
        self.auth.sign_out();
        self.navigator.replace(LOGIN_PATH);
    }

    pub fn shutdown(&self) {
        self.guard.unmount();
        info!("Portal stopped");
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn auth(&self) -> &Arc<AuthService> {
        &self.auth
    }

    pub fn accounts(&self) -> &Arc<AccountService> {
        &self.accounts
    }

    pub fn workspaces(&self) -> &Arc<WorkspaceService> {
        &self.workspaces
    }

    pub fn checkout(&self) -> &Arc<CheckoutService> {
        &self.checkout
    }

    pub fn consultations(&self) -> &Arc<ConsultationService> {
        &self.consultations
    }

    pub fn wizard(&self) -> &Arc<BookingWizard> {
        &self.wizard
    }

    pub fn navigator(&self) -> &Arc<Navigator> {
        &self.navigator
    }

    pub fn poller(&self) -> &Arc<UpcomingConsultationPoller> {
        &self.poller
    }

    pub fn guard(&self) -> &Arc<RouteGuard> {
        &self.guard
    }
}

/// A "Token invalid" answer anywhere ends the session and reloads the login page.
///
/// The hook lives inside the client, so it only holds weak references to
/// services that own the client themselves.
fn install_token_invalid_hook(
    api: &ApiClient,
    session: &Arc<SessionStore>,
    guard: &Arc<RouteGuard>,
    draft: &Arc<BookingDraftStore>,
    navigator: &Arc<Navigator>,
) {
    let session: Weak<SessionStore> = Arc::downgrade(session);
    let guard: Weak<RouteGuard> = Arc::downgrade(guard);
    let draft = Arc::clone(draft);
    let navigator = Arc::clone(navigator);

    api.on_token_invalid(Arc::new(move || {
        if let Some(session) = session.upgrade() {
            session.sign_out();
        }
        if let Some(guard) = guard.upgrade() {
            guard.unmount();
        }
        draft.clear_consultation();
        navigator.hard_redirect(LOGIN_PATH);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use session_cell::{AUTH_COOKIE, TOKEN_COOKIE};
    use shared_models::auth::AuthResponse;
    use shared_models::error::TOKEN_INVALID_MESSAGE;
    use shared_utils::test_utils::{MockApiResponses, TestConfig, TestPatient};
    use consultation_cell::NotificationState;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn signed_in_portal(server: &MockServer, jar: Arc<MemoryCookieJar>) -> Portal {
        let portal = Portal::with_jar(TestConfig::with_api_url(server.uri()).to_portal_config(), jar).unwrap();
        let data: AuthResponse = serde_json::from_value(MockApiResponses::auth_response(
            &TestPatient::default(),
            "session-token",
            vec![MockApiResponses::personal_membership("w-1", "p-1")],
        ))
        .unwrap();
        portal.session().sign_in(data, true);
        portal
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public("/login"));
        assert!(is_public("/forgot-password/"));
        assert!(!is_public("/dashboard"));
        assert!(!is_public("/consultations/new"));
    }

    #[tokio::test]
    async fn test_token_invalid_tears_session_down() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/patient/account"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": TOKEN_INVALID_MESSAGE })))
            .mount(&mock_server)
            .await;

        let jar = Arc::new(MemoryCookieJar::new());
        let portal = signed_in_portal(&mock_server, Arc::clone(&jar));

        let decision = portal.navigate("/dashboard").await;

        assert_eq!(decision, GuardDecision::Redirect(LOGIN_PATH));
        assert!(!portal.session().is_authenticated());
        assert!(portal.api().token().is_none());
        assert!(jar.get(TOKEN_COOKIE).is_none());
        assert!(jar.get(AUTH_COOKIE).is_none());
        assert_eq!(portal.navigator().current(), LOGIN_PATH);
        assert_eq!(portal.navigator().hard_redirect_count(), 1);
        assert!(!portal.guard().is_polling());
    }

    #[tokio::test]
    async fn test_navigating_away_from_booking_discards_draft() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/patient/account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::account(&TestPatient::default(), true)))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/patient/consultations/upcoming"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .mount(&mock_server)
            .await;

        let portal = signed_in_portal(&mock_server, Arc::new(MemoryCookieJar::new()));

        assert_eq!(portal.navigate("/consultations/new").await, GuardDecision::Render);
        portal.wizard().select_workspace("w-1").unwrap();
        assert_eq!(portal.navigate("/consultations/new/schedule").await, GuardDecision::Render);
        assert!(portal.wizard().draft().is_professional_selected());

        portal.navigate("/dashboard").await;
        assert!(!portal.wizard().draft().is_workspace_selected());

        portal.shutdown();
        assert!(!portal.guard().is_polling());
    }

    #[tokio::test]
    async fn test_sign_out_returns_to_login() {
        let mock_server = MockServer::start().await;
        let portal = signed_in_portal(&mock_server, Arc::new(MemoryCookieJar::new()));

        portal.sign_out();

        assert!(!portal.session().is_authenticated());
        assert_eq!(portal.navigator().current(), LOGIN_PATH);
        assert_eq!(portal.navigate("/login").await, GuardDecision::Render);
    }

    #[tokio::test]
    async fn test_completing_onboarding_unlocks_private_routes() {
        let mock_server = MockServer::start().await;
        let patient = TestPatient::default();
        Mock::given(method("GET"))
            .and(path("/patient/account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::account(&patient, false)))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/patient/account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::account(&patient, true)))
            .mount(&mock_server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/patient/account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::account(&patient, true)))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/patient/consultations/upcoming"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .mount(&mock_server)
            .await;

        let portal = signed_in_portal(&mock_server, Arc::new(MemoryCookieJar::new()));

        assert_eq!(portal.navigate("/dashboard").await, GuardDecision::Redirect("/welcome"));
        assert_eq!(portal.navigator().current(), "/welcome");

        let account = portal.complete_onboarding().await.unwrap();
        assert!(account.has_onboarding);

        assert_eq!(portal.navigate("/dashboard").await, GuardDecision::Render);
        assert_eq!(portal.navigator().current(), "/dashboard");
        portal.shutdown();
    }

    #[tokio::test]
    async fn test_sign_out_closes_reminder_of_previous_patient() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/patient/consultations/upcoming"))
            .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::consultation("c-A")))
            .mount(&mock_server)
            .await;

        let portal = signed_in_portal(&mock_server, Arc::new(MemoryCookieJar::new()));
        assert!(portal.poller().poll_once().await);
        assert!(portal.poller().state().modal_open);

        portal.sign_out();

        assert_eq!(portal.poller().state(), NotificationState::default());
    }

    #[tokio::test]
    async fn test_token_invalid_closes_reminder() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/patient/consultations/upcoming"))
            .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::consultation("c-A")))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/patient/account"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": TOKEN_INVALID_MESSAGE })))
            .mount(&mock_server)
            .await;

        let portal = signed_in_portal(&mock_server, Arc::new(MemoryCookieJar::new()));
        portal.poller().poll_once().await;

        portal.navigate("/dashboard").await;

        assert!(!portal.poller().state().modal_open);
        assert!(portal.poller().state().consultation.is_none());
    }
}
