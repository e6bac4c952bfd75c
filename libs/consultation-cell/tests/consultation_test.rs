use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use consultation_cell::{ConsultationService, UpcomingConsultationPoller};
use shared_api::ApiClient;
use shared_models::consultation::{ConsultationQuery, ConsultationType, CreateConsultationRequest};
use shared_utils::test_utils::{MockApiResponses, TestConfig};

fn service_for(server: &MockServer) -> Arc<ConsultationService> {
    let config = TestConfig::with_api_url(server.uri()).to_portal_config();
    Arc::new(ConsultationService::new(Arc::new(ApiClient::new(&config).unwrap())))
}

#[tokio::test]
async fn test_list_sends_pagination_and_search() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/patient/consultations"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "10"))
        .and(query_param("search", "João"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [MockApiResponses::consultation("c-1"), MockApiResponses::consultation("c-2")],
            "total": 12,
            "page": 1,
            "limit": 10
        })))
        .mount(&mock_server)
        .await;

    let page = service_for(&mock_server)
        .list(&ConsultationQuery {
            search: Some("João".to_string()),
            ..ConsultationQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 12);
}

#[tokio::test]
async fn test_upcoming_null_means_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/patient/consultations/upcoming"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .mount(&mock_server)
        .await;

    assert!(service_for(&mock_server).upcoming().await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_posts_booking() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/patient/consultations"))
        .and(body_json(json!({
            "workspace_id": "w-1",
            "professional_id": "p-1",
            "scheduled_date": "2024-06-10",
            "scheduled_time": "09:00",
            "duration": 50,
            "consultation_type": "ONLINE"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(MockApiResponses::consultation("c-9")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let created = service_for(&mock_server)
        .create(&CreateConsultationRequest {
            workspace_id: "w-1".to_string(),
            professional_id: "p-1".to_string(),
            scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            duration: 50,
            consultation_type: ConsultationType::Online,
        })
        .await
        .unwrap();

    assert_eq!(created.map(|c| c.id), Some("c-9".to_string()));
}

#[tokio::test]
async fn test_poller_over_http_swallows_backend_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/patient/consultations/upcoming"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let poller = UpcomingConsultationPoller::new(service_for(&mock_server), Duration::from_secs(60));

    assert!(!poller.poll_once().await);
    assert!(poller.state().last_seen_id.is_none());
}

#[tokio::test]
async fn test_poller_over_http_opens_modal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/patient/consultations/upcoming"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::consultation("c-3")))
        .mount(&mock_server)
        .await;

    let poller = UpcomingConsultationPoller::new(service_for(&mock_server), Duration::from_secs(60));

    assert!(poller.poll_once().await);
    assert!(!poller.poll_once().await);
    assert_eq!(poller.join().as_deref(), Some("/consultations/c-3"));
}
