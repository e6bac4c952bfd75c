use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::PortalConfig;
use shared_models::auth::Patient;

pub struct TestConfig {
    pub api_url: String,
    pub cookie_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3333".to_string(),
            cookie_secret: "test-cookie-secret-must-be-long-enough".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    pub fn to_portal_config(&self) -> PortalConfig {
        PortalConfig {
            api_url: self.api_url.clone(),
            cookie_secret: self.cookie_secret.clone(),
            http_timeout_secs: 2,
            read_retries: 0,
            ..PortalConfig::default()
        }
    }
}

pub struct TestPatient {
    pub id: String,
    pub email: String,
    pub name: String,
    pub cpf: String,
}

impl Default for TestPatient {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "paciente@example.com".to_string(),
            name: "Maria Silva".to_string(),
            cpf: "52998224725".to_string(),
        }
    }
}

impl TestPatient {
    pub fn to_patient(&self) -> Patient {
        Patient {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            cpf: self.cpf.clone(),
            phone: None,
            picture: None,
            date_birth: None,
        }
    }
}

pub struct TokenTestUtils;

impl TokenTestUtils {
    /// HS256-signed bearer token; the portal treats it as opaque.
    pub fn create_test_token(patient: &TestPatient, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({ "alg": "HS256", "typ": "JWT" });
        let payload = json!({
            "sub": patient.id,
            "email": patient.email,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(b"portal-test-signing-key")
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }
}

pub struct MockApiResponses;

impl MockApiResponses {
    pub fn patient(patient: &TestPatient) -> serde_json::Value {
        json!({
            "id": patient.id,
            "email": patient.email,
            "name": patient.name,
            "cpf": patient.cpf,
            "phone": "11987654321"
        })
    }

    pub fn membership(workspace_id: &str, workspace_type: &str, status: &str) -> serde_json::Value {
        json!({
            "workspace_id": workspace_id,
            "workspace_name": format!("Clínica {}", workspace_id),
            "workspace_picture": null,
            "workspace_type": workspace_type,
            "status": status,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn personal_membership(workspace_id: &str, owner_id: &str) -> serde_json::Value {
        let mut membership = Self::membership(workspace_id, "PERSONAL", "ACTIVE");
        membership["owner"] = Self::professional(owner_id);
        membership
    }

    pub fn professional(professional_id: &str) -> serde_json::Value {
        json!({
            "id": professional_id,
            "name": "Dr. João Souza",
            "email": format!("{}@clinica.com.br", professional_id),
            "especiality": "Psicologia",
            "regional_council_number": "CRP 06/12345"
        })
    }

    pub fn auth_response(patient: &TestPatient, token: &str, workspaces: Vec<serde_json::Value>) -> serde_json::Value {
        json!({
            "patient": Self::patient(patient),
            "token": token,
            "workspaces": workspaces
        })
    }

    pub fn account(patient: &TestPatient, has_onboarding: bool) -> serde_json::Value {
        let mut account = Self::patient(patient);
        account["has_onboarding"] = json!(has_onboarding);
        account
    }

    pub fn consultation(consultation_id: &str) -> serde_json::Value {
        json!({
            "id": consultation_id,
            "workspace_id": "w-1",
            "workspace_name": "Clínica w-1",
            "professional": Self::professional("p-1"),
            "scheduled_date": "2024-06-10",
            "scheduled_time": "09:00",
            "duration": 50,
            "consultation_type": "ONLINE",
            "status": "SCHEDULED",
            "created_at": "2024-06-01T12:00:00Z"
        })
    }

    pub fn error_response(message: &str) -> serde_json::Value {
        json!({ "message": message })
    }
}
