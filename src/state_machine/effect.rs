//! Effects produced by state transitions

use crate::delivery::MessageRoute;
use crate::identity::{EntryToken, LocalIdentity, LocalSession};
use crate::reconciler::ReconcileOrigin;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Call Smart-Entry (spawns as background task)
    Reconcile {
        candidate: LocalIdentity,
        entry_token: Option<EntryToken>,
        origin: ReconcileOrigin,
        generation: u64,
    },

    /// Write identity and session together
    PersistIdentity {
        identity: LocalIdentity,
        session: LocalSession,
    },

    /// Remove both stored records
    ClearIdentity,

    /// Send a visitor message (spawns as background task)
    DeliverMessage {
        route: MessageRoute,
        text: String,
        generation: u64,
    },

    /// Best-effort lead registration, result only logged
    RegisterLead {
        identity: LocalIdentity,
        source: String,
    },

    /// Push the new state to connected surfaces
    NotifyClient,
}
