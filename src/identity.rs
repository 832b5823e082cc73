//! Visitor identity types
//!
//! The identity and session records are the only state that survives
//! between visits. Field names follow the JSON shape already stored by
//! deployed widgets (`firstName`, `whatsapp`, `participantId`).

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

static ENTRY_TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/chat/([a-zA-Z0-9-]+)").expect("entry token pattern is valid"));

/// Lead source used when the visitor did not arrive through a shared link
pub const DEFAULT_LEAD_SOURCE: &str = "widget_ia";

// ============================================================================
// Local Identity
// ============================================================================

/// Visitor identity remembered on this device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalIdentity {
    pub first_name: String,
    /// WhatsApp number, stored as typed by the visitor
    #[serde(default)]
    pub whatsapp: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
}

impl LocalIdentity {
    pub fn new(
        first_name: impl Into<String>,
        whatsapp: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            whatsapp: whatsapp.into(),
            email: email.into(),
            participant_id: None,
        }
    }

    /// A stored identity is only usable with a first name and an email
    pub fn is_complete(&self) -> bool {
        !self.first_name.is_empty() && !self.email.is_empty()
    }

    #[must_use]
    pub fn with_participant(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = Some(participant_id.into());
        self
    }

    #[must_use]
    pub fn without_participant(mut self) -> Self {
        self.participant_id = None;
        self
    }
}

// ============================================================================
// Local Session
// ============================================================================

/// Backend-issued session, kept verbatim so unknown fields survive a save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSession {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LocalSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: Map::new(),
        }
    }
}

// ============================================================================
// Entry Token
// ============================================================================

/// One-time token from a shared `/chat/<token>` link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryToken(String);

impl EntryToken {
    /// Extract the token from a navigation path, if it carries one
    pub fn from_path(path: &str) -> Option<Self> {
        ENTRY_TOKEN_PATTERN
            .captures(path)
            .and_then(|caps| caps.get(1))
            .map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lead_source(&self) -> String {
        format!("link_{}", self.0)
    }
}

/// Lead source for a capture, depending on how the visitor arrived
pub fn lead_source(token: Option<&EntryToken>) -> String {
    token.map_or_else(|| DEFAULT_LEAD_SOURCE.to_string(), EntryToken::lead_source)
}

// ============================================================================
// Capture Form
// ============================================================================

/// Raw capture form fields, as typed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityForm {
    pub first_name: String,
    pub whatsapp: String,
    pub email: String,
}

/// Field-level validation failure shown inline above the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Le prénom est requis")]
    MissingFirstName,
    #[error("Le numéro WhatsApp est requis")]
    MissingWhatsapp,
    #[error("Un email valide est requis")]
    InvalidEmail,
}

impl IdentityForm {
    pub fn new(
        first_name: impl Into<String>,
        whatsapp: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            whatsapp: whatsapp.into(),
            email: email.into(),
        }
    }

    /// Validate and normalize into an identity (trimmed, lower-cased email)
    pub fn validate(&self) -> Result<LocalIdentity, ValidationError> {
        let first_name = self.first_name.trim();
        if first_name.is_empty() {
            return Err(ValidationError::MissingFirstName);
        }
        let whatsapp = self.whatsapp.trim();
        if whatsapp.is_empty() {
            return Err(ValidationError::MissingWhatsapp);
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ValidationError::InvalidEmail);
        }
        Ok(LocalIdentity::new(first_name, whatsapp, email.to_lowercase()))
    }
}

impl From<&LocalIdentity> for IdentityForm {
    fn from(identity: &LocalIdentity) -> Self {
        Self::new(
            identity.first_name.clone(),
            identity.whatsapp.clone(),
            identity.email.clone(),
        )
    }
}
