//! Chat widget client
//!
//! Client side of an embeddable chat widget: remembers who the visitor is,
//! reconciles that identity with the backend session on every visit and
//! keeps the conversation going when the backend is unavailable.

pub mod backend;
pub mod config;
pub mod delivery;
pub mod identity;
pub mod message;
pub mod reconciler;
pub mod runtime;
pub mod state_machine;
pub mod store;
