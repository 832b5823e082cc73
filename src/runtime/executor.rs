//! Widget runtime executor

use super::WidgetEvent;
use crate::backend::{ChatBackend, LeadRequest};
use crate::delivery;
use crate::identity::EntryToken;
use crate::reconciler::SessionReconciler;
use crate::state_machine::{transition, Effect, Event, TransitionError, WidgetState};
use crate::store::{IdentityStore, KeyValueStore};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Generic widget runtime that can work with any backend and store
pub struct WidgetRuntime<B, S>
where
    B: ChatBackend + ?Sized + 'static,
    S: KeyValueStore + 'static,
{
    /// Distinguishes concurrent widgets in logs
    instance_id: String,
    state: WidgetState,
    backend: Arc<B>,
    reconciler: SessionReconciler<B>,
    store: IdentityStore<S>,
    /// Taken once, at activation
    entry_token: Option<EntryToken>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<WidgetEvent>,
}

impl<B, S> WidgetRuntime<B, S>
where
    B: ChatBackend + ?Sized + 'static,
    S: KeyValueStore + 'static,
{
    pub fn new(
        backend: Arc<B>,
        store: S,
        entry_token: Option<EntryToken>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<WidgetEvent>,
    ) -> Self {
        Self {
            instance_id: uuid::Uuid::new_v4().to_string(),
            state: WidgetState::default(),
            reconciler: SessionReconciler::new(backend.clone()),
            backend,
            store: IdentityStore::new(store),
            entry_token,
            event_rx,
            event_tx,
            broadcast_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(instance_id = %self.instance_id, "Starting widget runtime");

        let records = self.store.load();
        let activate = Event::Activate {
            identity: records.identity,
            session: records.session,
            entry_token: self.entry_token.take(),
        };
        self.process_event(activate);
        // Surfaces render from this even when activation changed nothing
        self.notify();

        // Process events in a loop - no recursion
        loop {
            tokio::select! {
                Some(event) = self.event_rx.recv() => {
                    self.process_event(event);
                }
                else => break,
            }
        }

        tracing::info!(instance_id = %self.instance_id, "Widget runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let event_name = event.name();

        let result = match transition(&self.state, event) {
            Ok(r) => r,
            Err(TransitionError::StaleResult) => {
                tracing::debug!(
                    instance_id = %self.instance_id,
                    event = event_name,
                    "Discarding result from a previous identity"
                );
                return;
            }
            Err(e) => {
                tracing::debug!(
                    instance_id = %self.instance_id,
                    event = event_name,
                    error = %e,
                    "Event rejected"
                );
                let _ = self.broadcast_tx.send(WidgetEvent::Rejected {
                    reason: e.to_string(),
                });
                return;
            }
        };

        self.state = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&self, effect: Effect) {
        match effect {
            Effect::Reconcile {
                candidate,
                entry_token,
                origin,
                generation,
            } => {
                let reconciler = self.reconciler.clone();
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tracing::info!(?origin, "Reconciling identity (background)");
                    let result = reconciler.reconcile(&candidate, entry_token.as_ref()).await;
                    let _ = event_tx
                        .send(Event::Reconciled {
                            candidate,
                            origin,
                            result,
                            generation,
                        })
                        .await;
                });
            }

            Effect::PersistIdentity { identity, session } => {
                if let Err(e) = self.store.save(&identity, &session) {
                    // The conversation carries on; the next visit starts over
                    tracing::error!(
                        instance_id = %self.instance_id,
                        error = %e,
                        "Failed to persist identity"
                    );
                }
            }

            Effect::ClearIdentity => {
                if let Err(e) = self.store.clear() {
                    tracing::error!(
                        instance_id = %self.instance_id,
                        error = %e,
                        "Failed to clear stored identity"
                    );
                }
            }

            Effect::DeliverMessage {
                route,
                text,
                generation,
            } => {
                let backend = self.backend.clone();
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tracing::debug!(
                        session = route.is_session(),
                        "Delivering message (background)"
                    );
                    let reply = delivery::deliver(&*backend, &route, &text).await;
                    let _ = event_tx
                        .send(Event::ReplyReceived { reply, generation })
                        .await;
                });
            }

            Effect::RegisterLead { identity, source } => {
                let backend = self.backend.clone();
                let request = LeadRequest {
                    first_name: identity.first_name,
                    whatsapp: identity.whatsapp,
                    email: identity.email,
                    source,
                };
                // Fire and forget: the outcome never reaches the visitor
                tokio::spawn(async move {
                    match backend.register_lead(&request).await {
                        Ok(()) => tracing::info!(source = %request.source, "Lead registered"),
                        Err(e) => tracing::warn!(
                            source = %request.source,
                            error = %e,
                            "Lead registration failed"
                        ),
                    }
                });
            }

            Effect::NotifyClient => self.notify(),
        }
    }

    fn notify(&self) {
        let _ = self
            .broadcast_tx
            .send(WidgetEvent::Snapshot(Box::new(self.state.clone())));
    }
}
