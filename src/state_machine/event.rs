//! Events that can occur in a widget

use crate::identity::{EntryToken, IdentityForm, LocalIdentity, LocalSession};
use crate::reconciler::{ReconcileOrigin, ReconcileResult};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Lifecycle
    /// Records read from the store when the widget loads
    Activate {
        identity: Option<LocalIdentity>,
        session: Option<LocalSession>,
        entry_token: Option<EntryToken>,
    },
    Open,
    Close,

    // Visitor actions
    SubmitIdentity {
        form: IdentityForm,
    },
    SendMessage {
        text: String,
    },
    /// "Not you?" link
    ChangeIdentity,

    // Backend outcomes
    Reconciled {
        candidate: LocalIdentity,
        origin: ReconcileOrigin,
        result: ReconcileResult,
        generation: u64,
    },
    ReplyReceived {
        reply: Option<String>,
        generation: u64,
    },
}

impl Event {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::Activate { .. } => "activate",
            Event::Open => "open",
            Event::Close => "close",
            Event::SubmitIdentity { .. } => "submit_identity",
            Event::SendMessage { .. } => "send_message",
            Event::ChangeIdentity => "change_identity",
            Event::Reconciled { .. } => "reconciled",
            Event::ReplyReceived { .. } => "reply_received",
        }
    }
}
