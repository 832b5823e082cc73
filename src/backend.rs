//! Widget backend abstraction
//!
//! The widget talks to four endpoints: Smart-Entry, the session-scoped
//! message endpoint, the stateless fallback message endpoint and lead
//! registration.

mod error;
mod http;
mod types;

pub use error::{BackendError, BackendErrorKind};
pub use http::HttpBackend;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Common interface for the widget backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Resolve a candidate identity into a participant and session
    async fn smart_entry(
        &self,
        request: &SmartEntryRequest,
    ) -> Result<SmartEntryResponse, BackendError>;

    /// Send a message within a resolved session
    async fn session_message(
        &self,
        request: &SessionMessageRequest,
    ) -> Result<SessionMessageResponse, BackendError>;

    /// Send a message without a session
    async fn fallback_message(
        &self,
        request: &FallbackMessageRequest,
    ) -> Result<FallbackMessageResponse, BackendError>;

    /// Register a captured lead
    async fn register_lead(&self, request: &LeadRequest) -> Result<(), BackendError>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn smart_entry(
        &self,
        request: &SmartEntryRequest,
    ) -> Result<SmartEntryResponse, BackendError> {
        (**self).smart_entry(request).await
    }

    async fn session_message(
        &self,
        request: &SessionMessageRequest,
    ) -> Result<SessionMessageResponse, BackendError> {
        (**self).session_message(request).await
    }

    async fn fallback_message(
        &self,
        request: &FallbackMessageRequest,
    ) -> Result<FallbackMessageResponse, BackendError> {
        (**self).fallback_message(request).await
    }

    async fn register_lead(&self, request: &LeadRequest) -> Result<(), BackendError> {
        (**self).register_lead(request).await
    }
}

/// Logging wrapper for backends
pub struct LoggingBackend {
    inner: Arc<dyn ChatBackend>,
}

impl LoggingBackend {
    pub fn new(inner: Arc<dyn ChatBackend>) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(endpoint: &'static str, started: Instant, result: &Result<T, BackendError>) {
    let duration = started.elapsed();
    match result {
        Ok(_) => {
            tracing::info!(
                endpoint,
                duration_ms = %duration.as_millis(),
                "Backend request completed"
            );
        }
        Err(e) => {
            tracing::warn!(
                endpoint,
                duration_ms = %duration.as_millis(),
                error = %e.message,
                transient = e.kind.is_transient(),
                "Backend request failed"
            );
        }
    }
}

#[async_trait]
impl ChatBackend for LoggingBackend {
    async fn smart_entry(
        &self,
        request: &SmartEntryRequest,
    ) -> Result<SmartEntryResponse, BackendError> {
        let start = Instant::now();
        let result = self.inner.smart_entry(request).await;
        log_outcome("smart_entry", start, &result);
        result
    }

    async fn session_message(
        &self,
        request: &SessionMessageRequest,
    ) -> Result<SessionMessageResponse, BackendError> {
        let start = Instant::now();
        let result = self.inner.session_message(request).await;
        log_outcome("session_message", start, &result);
        result
    }

    async fn fallback_message(
        &self,
        request: &FallbackMessageRequest,
    ) -> Result<FallbackMessageResponse, BackendError> {
        let start = Instant::now();
        let result = self.inner.fallback_message(request).await;
        log_outcome("fallback_message", start, &result);
        result
    }

    async fn register_lead(&self, request: &LeadRequest) -> Result<(), BackendError> {
        let start = Instant::now();
        let result = self.inner.register_lead(request).await;
        log_outcome("register_lead", start, &result);
        result
    }
}
