//! Widget runtime
//!
//! Owns the widget state, feeds every UI action and backend outcome through
//! the state machine and executes the resulting effects. Surfaces drive it
//! through a [`WidgetHandle`] and watch it through [`WidgetEvent`]s.

mod executor;


pub use executor::WidgetRuntime;

use crate::backend::ChatBackend;
use crate::identity::{EntryToken, IdentityForm};
use crate::state_machine::{Event, WidgetState};
use crate::store::KeyValueStore;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

/// Events sent to connected surfaces
#[derive(Debug, Clone)]
pub enum WidgetEvent {
    /// Full state after a change
    Snapshot(Box<WidgetState>),
    /// An action was refused; the state is unchanged
    Rejected { reason: String },
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Widget runtime stopped")]
    Stopped,
}

/// Handle to interact with a running widget
#[derive(Clone)]
pub struct WidgetHandle {
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<WidgetEvent>,
}

impl WidgetHandle {
    /// Start a runtime in the background. The returned receiver is
    /// subscribed before the runtime starts, so it sees the first snapshot.
    pub fn spawn<B, S>(
        backend: Arc<B>,
        store: S,
        entry_token: Option<EntryToken>,
    ) -> (Self, broadcast::Receiver<WidgetEvent>)
    where
        B: ChatBackend + ?Sized + 'static,
        S: KeyValueStore + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(128);

        let runtime = WidgetRuntime::new(
            backend,
            store,
            entry_token,
            event_rx,
            event_tx.clone(),
            broadcast_tx.clone(),
        );
        tokio::spawn(async move {
            runtime.run().await;
        });

        (
            Self {
                event_tx,
                broadcast_tx,
            },
            broadcast_rx,
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.broadcast_tx.subscribe()
    }

    pub async fn send(&self, event: Event) -> Result<(), RuntimeError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::Stopped)
    }

    pub async fn open(&self) -> Result<(), RuntimeError> {
        self.send(Event::Open).await
    }

    pub async fn close(&self) -> Result<(), RuntimeError> {
        self.send(Event::Close).await
    }

    pub async fn submit_identity(&self, form: IdentityForm) -> Result<(), RuntimeError> {
        self.send(Event::SubmitIdentity { form }).await
    }

    pub async fn send_message(&self, text: impl Into<String>) -> Result<(), RuntimeError> {
        self.send(Event::SendMessage { text: text.into() }).await
    }

    pub async fn change_identity(&self) -> Result<(), RuntimeError> {
        self.send(Event::ChangeIdentity).await
    }
}
