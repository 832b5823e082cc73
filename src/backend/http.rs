//! HTTP implementation of the widget backend

use super::types::*;
use super::{BackendError, ChatBackend};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const SMART_ENTRY_PATH: &str = "chat/smart-entry";
const SESSION_MESSAGE_PATH: &str = "chat/ai-response";
const FALLBACK_MESSAGE_PATH: &str = "chat";
const LEADS_PATH: &str = "leads";

/// reqwest-based backend rooted at the API base URL (e.g. `https://host/api`)
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<Req>(&self, path: &str, body: &Req) -> Result<reqwest::Response, BackendError>
    where
        Req: Serialize + Sync,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }
        Ok(response)
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, BackendError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let bytes = self
            .send(path, body)
            .await?
            .bytes()
            .await
            .map_err(classify_transport_error)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| BackendError::decode(format!("Malformed response from {path}: {e}")))
    }
}

fn classify_transport_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::network(format!("Request timed out: {e}"))
    } else if e.is_connect() || e.is_request() || e.is_body() {
        BackendError::network(format!("Request failed: {e}"))
    } else {
        BackendError::unknown(e.to_string())
    }
}

fn classify_status(status: reqwest::StatusCode, body: &str) -> BackendError {
    let message = format!("HTTP {}: {}", status.as_u16(), body);
    if status.is_server_error() {
        BackendError::server_error(message)
    } else if status.is_client_error() {
        BackendError::invalid_request(message)
    } else {
        BackendError::unknown(message)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn smart_entry(
        &self,
        request: &SmartEntryRequest,
    ) -> Result<SmartEntryResponse, BackendError> {
        self.post(SMART_ENTRY_PATH, request).await
    }

    async fn session_message(
        &self,
        request: &SessionMessageRequest,
    ) -> Result<SessionMessageResponse, BackendError> {
        self.post(SESSION_MESSAGE_PATH, request).await
    }

    async fn fallback_message(
        &self,
        request: &FallbackMessageRequest,
    ) -> Result<FallbackMessageResponse, BackendError> {
        self.post(FALLBACK_MESSAGE_PATH, request).await
    }

    async fn register_lead(&self, request: &LeadRequest) -> Result<(), BackendError> {
        // Lead responses carry nothing the widget uses
        self.send(LEADS_PATH, request).await.map(|_| ())
    }
}
