//! Wire types for the widget backend endpoints

use crate::identity::LocalSession;
use crate::message::ChatMessage;
use serde::{Deserialize, Serialize};

// ============================================================================
// Smart-Entry
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmartEntryRequest {
    pub name: String,
    pub email: String,
    pub whatsapp: String,
    pub link_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SmartEntryResponse {
    pub participant: Participant,
    pub session: LocalSession,
    #[serde(default)]
    pub is_returning: bool,
    #[serde(default)]
    pub chat_history: Vec<HistoryEntry>,
    /// Greeting shown first in the conversation
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Participant {
    pub id: String,
}

/// One stored turn of a previous conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sender_type: String,
    #[serde(default)]
    pub content: String,
}

impl HistoryEntry {
    pub fn to_message(&self) -> ChatMessage {
        if self.sender_type == "user" {
            ChatMessage::visitor(self.content.clone())
        } else {
            ChatMessage::assistant(self.content.clone())
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionMessageRequest {
    pub session_id: String,
    pub participant_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionMessageResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub ai_active: Option<bool>,
}

impl SessionMessageResponse {
    /// Reply text, treating an empty string as no reply
    pub fn reply(&self) -> Option<&str> {
        self.response.as_deref().filter(|r| !r.is_empty())
    }

    /// No reply and automation switched off: a human will answer
    pub fn is_handoff(&self) -> bool {
        self.reply().is_none() && !self.ai_active.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackMessageRequest {
    pub message: String,
    pub first_name: String,
    pub lead_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FallbackMessageResponse {
    #[serde(default)]
    pub response: Option<String>,
}

// ============================================================================
// Leads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRequest {
    pub first_name: String,
    pub whatsapp: String,
    pub email: String,
    pub source: String,
}
