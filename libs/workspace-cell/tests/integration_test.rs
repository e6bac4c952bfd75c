use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_api::ApiClient;
use shared_models::checkout::PaymentMethod;
use shared_models::error::PortalError;
use shared_models::workspace::{MembershipStatus, WorkspaceType};
use shared_utils::test_utils::{MockApiResponses, TestConfig};
use workspace_cell::{CheckoutService, WorkspaceService};

fn api_for(server: &MockServer) -> Arc<ApiClient> {
    let config = TestConfig::with_api_url(server.uri()).to_portal_config();
    Arc::new(ApiClient::new(&config).unwrap())
}

#[tokio::test]
async fn test_list_decodes_memberships() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/patient/workspaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::membership("w-1", "BUSINESS", "ACTIVE"),
            MockApiResponses::membership("w-2", "BUSINESS", "PENDING"),
            MockApiResponses::personal_membership("w-3", "p-9"),
        ])))
        .mount(&mock_server)
        .await;

    let service = WorkspaceService::new(api_for(&mock_server));
    let memberships = service.list().await.unwrap();

    assert_eq!(memberships.len(), 3);
    assert_eq!(memberships[1].status, MembershipStatus::Pending);
    assert!(memberships[1].is_pending_invite());
    assert_eq!(memberships[2].workspace_type, WorkspaceType::Personal);
    assert!(memberships[2].owner.is_some());
}

#[tokio::test]
async fn test_accept_and_reject_hit_membership_endpoints() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/patient/workspaces/w-2/accept"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/patient/workspaces/w-3/reject"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = WorkspaceService::new(api_for(&mock_server));
    service.accept_invite("w-2").await.unwrap();
    service.reject_invite("w-3").await.unwrap();
}

#[tokio::test]
async fn test_recent_professionals_are_scoped_to_workspace() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/patient/professionals/recent"))
        .and(query_param("workspace_id", "w-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([MockApiResponses::professional("p-1")])))
        .mount(&mock_server)
        .await;

    let service = WorkspaceService::new(api_for(&mock_server));
    let recent = service.recent_professionals("w-1").await.unwrap();

    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].speciality.as_deref(), Some("Psicologia"));
}

#[tokio::test]
async fn test_checkout_posts_camel_case_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/patient/checkout/plan"))
        .and(body_json(json!({"planId": "plan-1", "workspaceId": "w-1", "paymentMethod": "PIX"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = CheckoutService::new(api_for(&mock_server));
    service.checkout_plan("plan-1", "w-1", PaymentMethod::Pix).await.unwrap();
}

#[tokio::test]
async fn test_checkout_requires_plan_and_workspace() {
    let mock_server = MockServer::start().await;
    let service = CheckoutService::new(api_for(&mock_server));

    let result = service.checkout_plan("", "w-1", PaymentMethod::CreditCard).await;

    assert_matches!(result, Err(PortalError::Validation(errors)) => {
        assert_eq!(errors[0].field, "planId");
    });
}
