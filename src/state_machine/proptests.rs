//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::identity::{EntryToken, IdentityForm, LocalIdentity, LocalSession};
use crate::message::{ChatMessage, Role};
use crate::reconciler::{ReconcileOrigin, ReconcileResult, ResolvedEntry};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_name() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,8}"
}

fn arb_valid_form() -> impl Strategy<Value = IdentityForm> {
    (arb_name(), "\\+41[0-9]{9}", "[a-z]{1,8}@[a-z]{1,5}\\.com")
        .prop_map(|(name, whatsapp, email)| IdentityForm::new(name, whatsapp, email))
}

fn arb_form() -> impl Strategy<Value = IdentityForm> {
    prop_oneof![
        3 => arb_valid_form(),
        1 => ("[ a-z]{0,4}", "[ 0-9]{0,4}", "[ a-z@.]{0,8}")
            .prop_map(|(name, whatsapp, email)| IdentityForm::new(name, whatsapp, email)),
    ]
}

fn arb_identity() -> impl Strategy<Value = LocalIdentity> {
    (arb_valid_form(), proptest::option::of("p-[0-9]{3}")).prop_map(|(form, participant)| {
        let identity = form.validate().unwrap();
        match participant {
            Some(id) => identity.with_participant(id),
            None => identity,
        }
    })
}

fn arb_entry_token() -> impl Strategy<Value = EntryToken> {
    "[a-z0-9-]{1,10}".prop_map(|slug| EntryToken::from_path(&format!("/chat/{slug}")).unwrap())
}

fn arb_message() -> impl Strategy<Value = ChatMessage> {
    (any::<bool>(), "[a-zA-Z ]{1,20}").prop_map(|(visitor, text)| {
        if visitor {
            ChatMessage::visitor(text)
        } else {
            ChatMessage::assistant(text)
        }
    })
}

fn arb_result() -> impl Strategy<Value = ReconcileResult> {
    prop_oneof![
        (
            "p-[0-9]{3}",
            "s-[0-9]{3}",
            any::<bool>(),
            proptest::collection::vec(arb_message(), 0..4),
            "[a-zA-Z ]{1,20}",
        )
            .prop_map(|(participant_id, session_id, is_returning, prior_messages, greeting)| {
                ReconcileResult::Resolved(ResolvedEntry {
                    participant_id,
                    session: LocalSession::new(session_id),
                    is_returning,
                    prior_messages,
                    greeting,
                })
            }),
        "[a-zA-Z ]{1,20}".prop_map(|error| ReconcileResult::Unavailable { error }),
    ]
}

fn arb_origin() -> impl Strategy<Value = ReconcileOrigin> {
    prop_oneof![
        Just(ReconcileOrigin::FormSubmit),
        Just(ReconcileOrigin::ReturningVisitor),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (
            proptest::option::of(arb_identity()),
            proptest::option::of("s-[0-9]{3}".prop_map(LocalSession::new)),
            proptest::option::of(arb_entry_token()),
        )
            .prop_map(|(identity, session, entry_token)| Event::Activate {
                identity,
                session,
                entry_token,
            }),
        Just(Event::Open),
        Just(Event::Close),
        arb_form().prop_map(|form| Event::SubmitIdentity { form }),
        "[a-zA-Z \t]{0,20}".prop_map(|text| Event::SendMessage { text }),
        Just(Event::ChangeIdentity),
        (arb_identity(), arb_origin(), arb_result(), 0u64..2).prop_map(
            |(candidate, origin, result, generation)| Event::Reconciled {
                candidate,
                origin,
                result,
                generation,
            }
        ),
        (proptest::option::of("[a-zA-Z ]{1,20}"), 0u64..2)
            .prop_map(|(reply, generation)| Event::ReplyReceived { reply, generation }),
    ]
}

/// Any reachable state: the default state driven through random events
fn arb_state() -> impl Strategy<Value = WidgetState> {
    proptest::collection::vec(arb_event(), 0..15).prop_map(|events| run(&events))
}

/// A conversation that has just started, with or without a session
fn arb_chatting_state() -> impl Strategy<Value = WidgetState> {
    (arb_valid_form(), arb_result()).prop_map(|(form, result)| chat_with(form, result))
}

// ============================================================================
// Helpers
// ============================================================================

fn run(events: &[Event]) -> WidgetState {
    events
        .iter()
        .cloned()
        .fold(WidgetState::default(), |state, event| {
            transition(&state, event).map_or(state, |r| r.new_state)
        })
}

fn chat_with(form: IdentityForm, result: ReconcileResult) -> WidgetState {
    let candidate = form.validate().unwrap();
    let submitted = transition(&WidgetState::default(), Event::SubmitIdentity { form })
        .unwrap()
        .new_state;
    transition(
        &submitted,
        Event::Reconciled {
            candidate,
            origin: ReconcileOrigin::FormSubmit,
            result,
            generation: submitted.generation,
        },
    )
    .unwrap()
    .new_state
}

fn is_valid_state(state: &WidgetState) -> bool {
    // A session is only ever held next to the participant it belongs to
    let paired = match &state.session {
        Some(resolved) => state
            .identity
            .as_ref()
            .and_then(|i| i.participant_id.as_deref())
            == Some(resolved.participant_id.as_str()),
        None => true,
    };
    let step_consistent = match state.step {
        Step::Chatting => !state.messages.is_empty() && state.identity.is_some(),
        Step::CollectingIdentity => state.messages.is_empty(),
    };
    let complete = state.identity.as_ref().map_or(true, LocalIdentity::is_complete);

    paired && step_consistent && complete
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: Any event sequence keeps the state coherent
    #[test]
    fn prop_transitions_preserve_validity(events in proptest::collection::vec(arb_event(), 0..25)) {
        let mut state = WidgetState::default();
        for event in events {
            if let Ok(result) = transition(&state, event) {
                prop_assert!(
                    is_valid_state(&result.new_state),
                    "Invalid state: {:?}",
                    result.new_state
                );
                state = result.new_state;
            }
        }
    }

    // Invariant 2: Surfaces hear about every state change
    #[test]
    fn prop_state_changes_notify(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, event) {
            if result.new_state != state {
                prop_assert!(
                    result.effects.contains(&Effect::NotifyClient),
                    "State changed without NotifyClient: {:?}",
                    result.effects
                );
            }
        }
    }

    // Invariant 3: A valid submission always ends in the conversation view
    #[test]
    fn prop_valid_submission_reaches_chat(form in arb_valid_form(), result in arb_result()) {
        let state = chat_with(form, result);
        prop_assert_eq!(state.step, Step::Chatting);
        prop_assert!(!state.busy);
        prop_assert!(!state.messages.is_empty());
    }

    // Invariant 4: Backend failure yields exactly one greeting naming the visitor
    #[test]
    fn prop_unavailable_greets_by_name(form in arb_valid_form(), error in "[a-z ]{1,20}") {
        let name = form.first_name.trim().to_string();
        let state = chat_with(form, ReconcileResult::Unavailable { error });
        prop_assert_eq!(state.messages.len(), 1);
        prop_assert_eq!(state.messages[0].role, Role::Assistant);
        prop_assert!(state.messages[0].text.contains(&name));
        prop_assert!(state.session.is_none());
    }

    // Invariant 5: Blank messages change nothing
    #[test]
    fn prop_blank_messages_rejected(state in arb_chatting_state(), text in "[ \t\n]{0,6}") {
        let result = transition(&state, Event::SendMessage { text });
        prop_assert_eq!(result.unwrap_err(), TransitionError::EmptyMessage);
    }

    // Invariant 6: One message in flight at a time
    #[test]
    fn prop_busy_rejects_messages(state in arb_chatting_state(), text in "[a-zA-Z]{1,20}") {
        let sent = transition(&state, Event::SendMessage { text: text.clone() }).unwrap().new_state;
        prop_assert!(sent.busy);
        let again = transition(&sent, Event::SendMessage { text });
        prop_assert_eq!(again.unwrap_err(), TransitionError::Busy);
    }

    // Invariant 7: Changing identity forgets the visitor entirely
    #[test]
    fn prop_change_identity_forgets_visitor(state in arb_state()) {
        let result = transition(&state, Event::ChangeIdentity).unwrap();
        let next = &result.new_state;
        prop_assert_eq!(next.step, Step::CollectingIdentity);
        prop_assert!(next.identity.is_none());
        prop_assert!(next.session.is_none());
        prop_assert!(next.messages.is_empty());
        prop_assert!(!next.busy);
        prop_assert_eq!(next.generation, state.generation + 1);
        prop_assert!(result.effects.contains(&Effect::ClearIdentity));
    }

    // Invariant 8: Results tagged with another generation never apply
    #[test]
    fn prop_stale_results_rejected(
        state in arb_state(),
        offset in 1u64..3,
        candidate in arb_identity(),
        result in arb_result(),
        reply in proptest::option::of("[a-z]{1,10}"),
    ) {
        let generation = state.generation + offset;
        let reconciled = transition(&state, Event::Reconciled {
            candidate,
            origin: ReconcileOrigin::FormSubmit,
            result,
            generation,
        });
        prop_assert_eq!(reconciled.unwrap_err(), TransitionError::StaleResult);

        let replied = transition(&state, Event::ReplyReceived { reply, generation });
        prop_assert_eq!(replied.unwrap_err(), TransitionError::StaleResult);
    }

    // Invariant 9: Within one conversation the history only grows
    #[test]
    fn prop_history_append_only(
        state in arb_chatting_state(),
        events in proptest::collection::vec(
            prop_oneof![
                "[a-zA-Z ]{0,10}".prop_map(|text| Event::SendMessage { text }),
                proptest::option::of("[a-z]{1,10}")
                    .prop_map(|reply| Event::ReplyReceived { reply, generation: 0 }),
                Just(Event::Open),
                Just(Event::Close),
            ],
            0..12,
        ),
    ) {
        let mut state = state;
        for event in events {
            if let Ok(result) = transition(&state, event) {
                prop_assert!(result.new_state.messages.starts_with(&state.messages));
                state = result.new_state;
            }
        }
    }

    // Invariant 10: Identity and session are only ever persisted together,
    // and only with the participant the session belongs to
    #[test]
    fn prop_persist_pairs_records(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, event) {
            for effect in &result.effects {
                if let Effect::PersistIdentity { identity, session } = effect {
                    let held = result.new_state.session.as_ref();
                    prop_assert_eq!(held.map(|r| &r.session), Some(session));
                    prop_assert_eq!(
                        identity.participant_id.as_deref(),
                        held.map(|r| r.participant_id.as_str())
                    );
                }
            }
        }
    }
}
