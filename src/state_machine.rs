//! Widget state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! every UI action and every backend outcome is an [`Event`], the
//! [`transition`] function computes the next [`WidgetState`] and the
//! [`Effect`]s the runtime must perform.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{ResolvedSession, Step, WidgetState};
pub use transition::{transition, TransitionError, TransitionResult};
