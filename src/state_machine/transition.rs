//! Pure state transition function
//!
//! Given the same state and event, `transition` always produces the same
//! next state and effects, with no I/O.

use super::{Effect, Event, ResolvedSession, Step, WidgetState};
use crate::identity::{lead_source, IdentityForm, LocalIdentity};
use crate::message::ChatMessage;
use crate::reconciler::{ReconcileOrigin, ReconcileResult};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: WidgetState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: WidgetState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition. None of them is fatal: the
/// runtime keeps the current state and carries on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A request is already in flight")]
    Busy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Result belongs to a previous identity")]
    StaleResult,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
#[allow(clippy::too_many_lines)]
pub fn transition(state: &WidgetState, event: Event) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // Lifecycle
        // ============================================================
        Event::Activate {
            identity,
            session,
            entry_token,
        } => {
            if state.busy || state.is_chatting() {
                return Err(TransitionError::InvalidTransition(
                    "widget is already active".to_string(),
                ));
            }

            let identity = identity.filter(LocalIdentity::is_complete);
            // A stored session only counts next to the identity it was saved with
            let session = match (&identity, session) {
                (
                    Some(LocalIdentity {
                        participant_id: Some(participant_id),
                        ..
                    }),
                    Some(session),
                ) => Some(ResolvedSession {
                    participant_id: participant_id.clone(),
                    session,
                }),
                _ => None,
            };

            // Arriving through a shared link opens the widget right away
            let open = state.open || entry_token.is_some();
            let mut next = WidgetState {
                open,
                form: identity.as_ref().map(IdentityForm::from).unwrap_or_default(),
                is_returning: identity.is_some(),
                identity,
                session,
                entry_token,
                generation: state.generation,
                ..WidgetState::default()
            };

            let resume = if next.open {
                begin_resume(&mut next)
            } else {
                None
            };
            Ok(changed(state, next, resume))
        }

        Event::Open => {
            let mut next = state.clone();
            next.open = true;
            let resume = begin_resume(&mut next);
            Ok(changed(state, next, resume))
        }

        Event::Close => {
            let mut next = state.clone();
            next.open = false;
            Ok(changed(state, next, None))
        }

        // ============================================================
        // Identity capture
        // ============================================================
        Event::SubmitIdentity { form } => {
            if state.is_chatting() {
                return Err(TransitionError::InvalidTransition(
                    "identity already captured".to_string(),
                ));
            }
            if state.busy {
                return Err(TransitionError::Busy);
            }

            let mut next = state.clone();
            let validated = form.validate();
            next.form = form;

            match validated {
                Err(e) => {
                    next.form_error = Some(e.to_string());
                    Ok(changed(state, next, None))
                }
                Ok(candidate) => {
                    next.form_error = None;
                    next.busy = true;
                    let reconcile = Effect::Reconcile {
                        candidate,
                        entry_token: state.entry_token.clone(),
                        origin: ReconcileOrigin::FormSubmit,
                        generation: state.generation,
                    };
                    Ok(changed(state, next, Some(reconcile)))
                }
            }
        }

        // Chatting is entered whatever the outcome: the visitor is never
        // blocked on backend availability
        Event::Reconciled {
            candidate,
            origin,
            result,
            generation,
        } => {
            if generation != state.generation {
                return Err(TransitionError::StaleResult);
            }
            if !state.busy || state.is_chatting() {
                return Err(TransitionError::InvalidTransition(
                    "no reconciliation pending".to_string(),
                ));
            }

            let mut next = state.clone();
            next.busy = false;
            next.step = Step::Chatting;
            next.form_error = None;

            let candidate = candidate.without_participant();
            let mut effects = Vec::new();

            match result {
                ReconcileResult::Resolved(entry) => {
                    let identity = candidate
                        .clone()
                        .with_participant(entry.participant_id.clone());
                    next.messages = entry.seed_history();
                    next.is_returning = entry.is_returning;
                    next.identity = Some(identity.clone());
                    next.session = Some(ResolvedSession {
                        participant_id: entry.participant_id,
                        session: entry.session.clone(),
                    });
                    effects.push(Effect::PersistIdentity {
                        identity,
                        session: entry.session,
                    });
                }
                ReconcileResult::Unavailable { .. } => {
                    next.messages = vec![ChatMessage::assistant(
                        origin.fallback_greeting(&candidate.first_name),
                    )];
                    next.identity = Some(candidate.clone());
                    next.session = None;
                }
            }

            if origin.registers_lead() {
                effects.push(Effect::RegisterLead {
                    identity: candidate,
                    source: lead_source(state.entry_token.as_ref()),
                });
            }

            Ok(TransitionResult::new(next)
                .with_effects(effects)
                .with_effect(Effect::NotifyClient))
        }

        // ============================================================
        // Conversation
        // ============================================================
        Event::SendMessage { text } => {
            if !state.is_chatting() {
                return Err(TransitionError::InvalidTransition(
                    "cannot send before identity capture".to_string(),
                ));
            }
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            if state.busy {
                return Err(TransitionError::Busy);
            }

            let mut next = state.clone();
            next.messages.push(ChatMessage::visitor(text));
            next.busy = true;

            Ok(TransitionResult::new(next)
                .with_effect(Effect::DeliverMessage {
                    route: state.message_route(),
                    text: text.to_string(),
                    generation: state.generation,
                })
                .with_effect(Effect::NotifyClient))
        }

        Event::ReplyReceived { reply, generation } => {
            if generation != state.generation {
                return Err(TransitionError::StaleResult);
            }
            if !state.busy || !state.is_chatting() {
                return Err(TransitionError::InvalidTransition(
                    "no message pending".to_string(),
                ));
            }

            let mut next = state.clone();
            next.busy = false;
            if let Some(reply) = reply {
                next.messages.push(ChatMessage::assistant(reply));
            }
            Ok(TransitionResult::new(next).with_effect(Effect::NotifyClient))
        }

        // Equivalent to a first-ever visit, apart from the widget staying open
        Event::ChangeIdentity => {
            let next = WidgetState {
                open: state.open,
                entry_token: state.entry_token.clone(),
                generation: state.generation + 1,
                ..WidgetState::default()
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::ClearIdentity)
                .with_effect(Effect::NotifyClient))
        }
    }
}

// Helper functions

/// Skip the capture form for a remembered visitor
fn begin_resume(next: &mut WidgetState) -> Option<Effect> {
    if !next.can_resume() {
        return None;
    }
    let candidate = next.identity.clone()?;
    next.busy = true;
    Some(Effect::Reconcile {
        candidate,
        entry_token: next.entry_token.clone(),
        origin: ReconcileOrigin::ReturningVisitor,
        generation: next.generation,
    })
}

/// Wrap `next`, notifying surfaces only when something changed
fn changed(prev: &WidgetState, next: WidgetState, effect: Option<Effect>) -> TransitionResult {
    if next == *prev && effect.is_none() {
        return TransitionResult::new(next);
    }
    TransitionResult::new(next)
        .with_effects(effect)
        .with_effect(Effect::NotifyClient)
}
