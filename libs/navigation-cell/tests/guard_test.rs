use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use account_cell::AccountService;
use consultation_cell::{ConsultationService, UpcomingConsultationPoller};
use navigation_cell::{GuardDecision, GuardState, Navigator, RouteGuard, DASHBOARD_PATH, LOGIN_PATH, WELCOME_PATH};
use session_cell::{MemoryCookieJar, SessionStore};
use shared_api::ApiClient;
use shared_models::auth::AuthResponse;
use shared_utils::test_utils::{MockApiResponses, TestConfig, TestPatient};
use workspace_cell::WorkspaceService;

struct Harness {
    guard: RouteGuard,
    session: Arc<SessionStore>,
    navigator: Arc<Navigator>,
    patient: TestPatient,
}

async fn harness(server: &MockServer, start_at: &str) -> Harness {
    Mock::given(method("GET"))
        .and(path("/patient/consultations/upcoming"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .mount(server)
        .await;

    let config = TestConfig::with_api_url(server.uri()).to_portal_config();
    let api = Arc::new(ApiClient::new(&config).unwrap());
    let workspaces = Arc::new(WorkspaceService::new(Arc::clone(&api)));
    let session = Arc::new(
        SessionStore::new(&config, Arc::clone(&api), workspaces, Arc::new(MemoryCookieJar::new())).unwrap(),
    );
    let accounts = Arc::new(AccountService::new(Arc::clone(&api), Arc::clone(&session)));
    let consultations = Arc::new(ConsultationService::new(api));
    let poller = Arc::new(UpcomingConsultationPoller::new(consultations, Duration::from_secs(60)));
    let navigator = Arc::new(Navigator::new(start_at));

    Harness {
        guard: RouteGuard::new(Arc::clone(&session), accounts, Arc::clone(&navigator), poller),
        session,
        navigator,
        patient: TestPatient::default(),
    }
}

fn sign_in(harness: &Harness) {
    let data: AuthResponse = serde_json::from_value(MockApiResponses::auth_response(
        &harness.patient,
        "session-token",
        vec![MockApiResponses::membership("w-1", "BUSINESS", "ACTIVE")],
    ))
    .unwrap();
    harness.session.sign_in(data, false);
}

async fn mount_account(server: &MockServer, patient: &TestPatient, has_onboarding: bool) {
    Mock::given(method("GET"))
        .and(path("/patient/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::account(patient, has_onboarding)))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_signed_out_patient_is_sent_to_login() {
    let mock_server = MockServer::start().await;
    let h = harness(&mock_server, "/consultations").await;

    let decision = h.guard.resolve("/consultations").await;

    assert_eq!(decision, GuardDecision::Redirect(LOGIN_PATH));
    assert_eq!(h.navigator.current(), LOGIN_PATH);
    assert_eq!(h.guard.state(), GuardState::Unauthenticated);
    assert!(!h.guard.is_polling());
}

#[tokio::test]
async fn test_new_patient_is_sent_to_welcome() {
    let mock_server = MockServer::start().await;
    let h = harness(&mock_server, DASHBOARD_PATH).await;
    mount_account(&mock_server, &h.patient, false).await;
    sign_in(&h);

    assert_eq!(h.guard.resolve(DASHBOARD_PATH).await, GuardDecision::Redirect(WELCOME_PATH));
    assert_eq!(h.navigator.current(), WELCOME_PATH);
    assert_eq!(h.guard.state(), GuardState::NeedsOnboarding);

    // Cached account: the welcome screen itself renders without a second fetch.
    assert_eq!(h.guard.resolve(WELCOME_PATH).await, GuardDecision::Render);
    assert!(h.guard.is_polling());
}

#[tokio::test]
async fn test_onboarded_patient_leaves_welcome() {
    let mock_server = MockServer::start().await;
    let h = harness(&mock_server, WELCOME_PATH).await;
    mount_account(&mock_server, &h.patient, true).await;
    sign_in(&h);

    assert_eq!(h.guard.resolve(WELCOME_PATH).await, GuardDecision::Redirect(DASHBOARD_PATH));
    assert_eq!(h.navigator.current(), DASHBOARD_PATH);
    assert_eq!(h.guard.resolve("/consultations").await, GuardDecision::Render);
    assert_eq!(h.guard.state(), GuardState::Onboarded);
}

#[tokio::test]
async fn test_account_failure_keeps_loading() {
    let mock_server = MockServer::start().await;
    let h = harness(&mock_server, DASHBOARD_PATH).await;

    Mock::given(method("GET"))
        .and(path("/patient/account"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    sign_in(&h);

    assert_eq!(h.guard.resolve(DASHBOARD_PATH).await, GuardDecision::Loading);
    assert_eq!(h.guard.state(), GuardState::Checking);
    assert_eq!(h.navigator.current(), DASHBOARD_PATH);
    assert!(!h.guard.is_polling());
}

#[tokio::test]
async fn test_unmount_and_sign_out_stop_polling() {
    let mock_server = MockServer::start().await;
    let h = harness(&mock_server, DASHBOARD_PATH).await;

    Mock::given(method("GET"))
        .and(path("/patient/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::account(&h.patient, true)))
        .mount(&mock_server)
        .await;
    sign_in(&h);

    h.guard.resolve(DASHBOARD_PATH).await;
    assert!(h.guard.is_polling());

    h.guard.unmount();
    assert!(!h.guard.is_polling());

    h.guard.resolve(DASHBOARD_PATH).await;
    assert!(h.guard.is_polling());

    h.session.sign_out();
    assert_eq!(h.guard.resolve(DASHBOARD_PATH).await, GuardDecision::Redirect(LOGIN_PATH));
    assert!(!h.guard.is_polling());
}
