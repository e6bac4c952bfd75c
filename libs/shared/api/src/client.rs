// libs/shared/api/src/client.rs
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::PortalConfig;
use shared_models::error::{PortalError, TOKEN_INVALID_MESSAGE};

/// Called once per response carrying the backend's "Token invalid" message.
pub type TokenInvalidHook = Arc<dyn Fn() + Send + Sync>;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// HTTP client for the patient REST API.
///
/// Holds the bearer token of the current session so that every service shares
/// one authenticated client. Reads (GET) are retried on transient failures;
/// writes are sent exactly once.
pub struct ApiClient {
    client: Client,
    base_url: String,
    read_retries: u32,
    token: RwLock<Option<String>>,
    on_token_invalid: RwLock<Option<TokenInvalidHook>>,
}

impl ApiClient {
    pub fn new(config: &PortalConfig) -> Result<Self, PortalError> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| PortalError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            read_retries: config.read_retries,
            token: RwLock::new(None),
            on_token_invalid: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token.filter(|t| !t.is_empty());
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|slot| slot.clone())
    }

    pub fn on_token_invalid(&self, hook: TokenInvalidHook) {
        if let Ok(mut slot) = self.on_token_invalid.write() {
            *slot = Some(hook);
        }
    }

    fn headers(&self) -> Result<HeaderMap, PortalError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = self.token() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| PortalError::Network(format!("invalid bearer token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    pub async fn get<T>(&self, path: &str) -> Result<T, PortalError>
    where
        T: DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            match self.send::<T>(Method::GET, path, None).await {
                Err(err) if err.is_retryable() && attempt < self.read_retries => {
                    attempt += 1;
                    warn!("GET {} failed ({}), retry {}/{}", path, err, attempt, self.read_retries);
                    tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
                }
                result => return result,
            }
        }
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, PortalError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.send(Method::POST, path, Some(body)).await
    }

    /// POST without a request body.
    pub async fn post_empty<T>(&self, path: &str) -> Result<T, PortalError>
    where
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, None).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, PortalError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.send(Method::PUT, path, Some(body)).await
    }

    async fn send<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, PortalError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url).headers(self.headers()?);
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                PortalError::Timeout
            } else {
                PortalError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PortalError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(self.backend_error(status, &text));
        }

        decode_body(&text)
    }

    fn backend_error(&self, status: StatusCode, body: &str) -> PortalError {
        let message = extract_message(body);

        if message.as_deref() == Some(TOKEN_INVALID_MESSAGE) {
            warn!("Backend rejected the session token, tearing the session down");
            let hook = self.on_token_invalid.read().ok().and_then(|slot| slot.clone());
            if let Some(hook) = hook {
                hook();
            }
            return PortalError::TokenInvalid;
        }

        error!("API error ({}): {}", status, body);
        PortalError::Backend {
            status: status.as_u16(),
            message,
        }
    }
}

/// Empty bodies decode as JSON `null`, so `()` and `Option<T>` work for
/// endpoints that answer without content.
fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T, PortalError> {
    let trimmed = text.trim();
    let source = if trimmed.is_empty() { "null" } else { trimmed };
    serde_json::from_str(source).map_err(|e| PortalError::Decode(e.to_string()))
}

/// Pulls a human readable message out of an error body: `{"message": ..}`,
/// `{"error": ..}` or a list of messages.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for key in ["message", "error"] {
        match value.get(key) {
            Some(Value::String(message)) => return Some(message.clone()),
            Some(Value::Array(items)) => {
                if let Some(Value::String(first)) = items.first() {
                    return Some(first.clone());
                }
            }
            _ => {}
        }
    }
    None
}
