//! Widget state types

use crate::delivery::MessageRoute;
use crate::identity::{EntryToken, IdentityForm, LocalIdentity, LocalSession};
use crate::message::ChatMessage;

/// Which panel the widget shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    /// Capture form (initial)
    #[default]
    CollectingIdentity,
    /// Conversation view
    Chatting,
}

/// Session confirmed by the backend, with the participant it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSession {
    pub participant_id: String,
    pub session: LocalSession,
}

/// Complete widget state
///
/// Only [`super::transition`] produces new values of this record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WidgetState {
    pub open: bool,
    pub step: Step,
    /// Last form contents, prefilled from a remembered identity
    pub form: IdentityForm,
    pub form_error: Option<String>,
    pub identity: Option<LocalIdentity>,
    pub session: Option<ResolvedSession>,
    pub messages: Vec<ChatMessage>,
    /// A request is in flight; new submissions are ignored
    pub busy: bool,
    pub is_returning: bool,
    pub entry_token: Option<EntryToken>,
    /// Bumped on identity change so late results from the previous
    /// identity are discarded
    pub generation: u64,
}

impl WidgetState {
    pub fn is_chatting(&self) -> bool {
        self.step == Step::Chatting
    }

    pub fn first_name(&self) -> &str {
        self.identity
            .as_ref()
            .map_or(self.form.first_name.as_str(), |identity| {
                identity.first_name.as_str()
            })
    }

    /// Route for the next visitor message
    pub fn message_route(&self) -> MessageRoute {
        match &self.session {
            Some(resolved) => MessageRoute::Session {
                session_id: resolved.session.id.clone(),
                participant_id: resolved.participant_id.clone(),
            },
            None => MessageRoute::Fallback {
                first_name: self.first_name().to_string(),
            },
        }
    }

    /// Identity remembered on this device with no session yet confirmed in
    /// this activation
    pub fn can_resume(&self) -> bool {
        self.step == Step::CollectingIdentity && self.identity.is_some() && !self.busy
    }
}
