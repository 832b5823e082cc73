//! Session reconciliation
//!
//! Resolves a candidate identity (freshly typed or remembered) against
//! Smart-Entry. A failed call never blocks the visitor: the caller drops
//! into fallback mode with a locally built greeting.

use crate::backend::{ChatBackend, HistoryEntry, SmartEntryRequest, SmartEntryResponse};
use crate::identity::{EntryToken, LocalIdentity, LocalSession};
use crate::message::ChatMessage;
use std::sync::Arc;

/// Outcome of a Smart-Entry handshake
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileResult {
    Resolved(ResolvedEntry),
    /// Backend unreachable or answer unusable
    Unavailable { error: String },
}

impl ReconcileResult {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Authoritative participant and session returned by Smart-Entry
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
    pub participant_id: String,
    pub session: LocalSession,
    pub is_returning: bool,
    /// Earlier turns, in server order
    pub prior_messages: Vec<ChatMessage>,
    pub greeting: String,
}

impl ResolvedEntry {
    fn from_response(resp: SmartEntryResponse) -> Result<Self, String> {
        if resp.participant.id.is_empty() {
            return Err("Smart-Entry returned an empty participant id".to_string());
        }
        if resp.session.id.is_empty() {
            return Err("Smart-Entry returned an empty session id".to_string());
        }

        Ok(Self {
            participant_id: resp.participant.id,
            session: resp.session,
            is_returning: resp.is_returning,
            prior_messages: resp.chat_history.iter().map(HistoryEntry::to_message).collect(),
            greeting: resp.message,
        })
    }

    /// Messages to render right after reconciliation: greeting first, then
    /// restored history for a returning visitor
    pub fn seed_history(&self) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::assistant(self.greeting.clone())];
        if self.is_returning {
            messages.extend(self.prior_messages.iter().cloned());
        }
        messages
    }
}

/// Why reconciliation was started; picks the fallback greeting and whether
/// the capture counts as a new lead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOrigin {
    /// Capture form submitted
    FormSubmit,
    /// Widget opened with a remembered identity
    ReturningVisitor,
}

impl ReconcileOrigin {
    /// Context-free greeting used when Smart-Entry is unavailable
    pub fn fallback_greeting(self, first_name: &str) -> String {
        match self {
            Self::FormSubmit => format!("Enchanté {first_name} ! 👋 Comment puis-je t'aider ?"),
            Self::ReturningVisitor => {
                format!("Bonjour {first_name} ! 😊 Comment puis-je t'aider ?")
            }
        }
    }

    pub fn registers_lead(self) -> bool {
        matches!(self, Self::FormSubmit)
    }
}

/// Calls Smart-Entry and normalizes the answer
pub struct SessionReconciler<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: ?Sized> Clone for SessionReconciler<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

impl<B: ChatBackend + ?Sized> SessionReconciler<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Resolve `candidate` into a session. Each call is independent: a
    /// retry simply resolves again.
    pub async fn reconcile(
        &self,
        candidate: &LocalIdentity,
        entry_token: Option<&EntryToken>,
    ) -> ReconcileResult {
        let request = SmartEntryRequest {
            name: candidate.first_name.clone(),
            email: candidate.email.clone(),
            whatsapp: candidate.whatsapp.clone(),
            link_token: entry_token.map(|t| t.as_str().to_string()),
        };

        let resolved = match self.backend.smart_entry(&request).await {
            Ok(resp) => ResolvedEntry::from_response(resp),
            Err(e) => Err(e.to_string()),
        };

        match resolved {
            Ok(entry) => {
                tracing::info!(
                    participant_id = %entry.participant_id,
                    session_id = %entry.session.id,
                    is_returning = entry.is_returning,
                    restored = entry.prior_messages.len(),
                    "Session reconciled"
                );
                ReconcileResult::Resolved(entry)
            }
            Err(error) => {
                tracing::warn!(
                    first_name = %candidate.first_name,
                    error = %error,
                    "Smart-Entry unavailable, continuing without session"
                );
                ReconcileResult::Unavailable { error }
            }
        }
    }
}
