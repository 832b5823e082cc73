//! Chat widget - terminal surface
//!
//! Runs the widget runtime against the configured backend and renders it
//! on the terminal. Logs go to stderr as JSON.

use chat_widget::backend::{ChatBackend, HttpBackend, LoggingBackend};
use chat_widget::config::WidgetConfig;
use chat_widget::identity::{EntryToken, IdentityForm};
use chat_widget::message::Role;
use chat_widget::runtime::{WidgetEvent, WidgetHandle};
use chat_widget::state_machine::{Step, WidgetState};
use chat_widget::store::{KeyValueStore, MemoryStore, SqliteStore};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_widget=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = WidgetConfig::from_env();

    let store: Box<dyn KeyValueStore> = if config.ephemeral {
        tracing::info!("Using in-memory identity store");
        Box::new(MemoryStore::new())
    } else {
        if let Some(parent) = config.store_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::info!(path = %config.store_path.display(), "Opening identity store");
        Box::new(SqliteStore::open(&config.store_path)?)
    };

    let http = HttpBackend::new(&config.api_base_url, config.request_timeout)?;
    tracing::info!(
        api = %config.api_base_url,
        timeout_secs = config.request_timeout.as_secs(),
        "Backend configured"
    );
    let http: Arc<dyn ChatBackend> = Arc::new(http);
    let backend = Arc::new(LoggingBackend::new(http));

    let entry_token = config.entry_path.as_deref().and_then(EntryToken::from_path);
    if let Some(token) = &entry_token {
        tracing::info!(token = %token.as_str(), "Arrived through shared link");
    }

    let (handle, updates) = WidgetHandle::spawn(backend, store, entry_token);
    let renderer = tokio::spawn(render(updates));

    println!("Commandes: /open, /close, /form prénom;whatsapp;email, /notme, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        let sent = match command {
            Command::Open => handle.open().await,
            Command::Close => handle.close().await,
            Command::Form(form) => handle.submit_identity(form).await,
            Command::NotMe => handle.change_identity().await,
            Command::Say(text) => handle.send_message(text).await,
            Command::Quit => break,
        };
        if let Err(e) = sent {
            tracing::error!(error = %e, "Widget runtime is gone");
            break;
        }
    }

    renderer.abort();
    Ok(())
}

/// One line of terminal input
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Open,
    Close,
    Form(IdentityForm),
    NotMe,
    Quit,
    Say(String),
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let command = match line {
            "/open" => Self::Open,
            "/close" => Self::Close,
            "/notme" => Self::NotMe,
            "/quit" => Self::Quit,
            _ => match line.strip_prefix("/form") {
                Some(rest) => {
                    let mut fields = rest.splitn(3, ';').map(str::trim);
                    let first_name = fields.next().unwrap_or_default();
                    let whatsapp = fields.next().unwrap_or_default();
                    let email = fields.next().unwrap_or_default();
                    Self::Form(IdentityForm::new(first_name, whatsapp, email))
                }
                None => Self::Say(line.to_string()),
            },
        };
        Some(command)
    }
}

/// Prints what changed between snapshots
#[derive(Default)]
struct Screen {
    shown: usize,
    open: bool,
    step: Step,
    form_error: Option<String>,
}

impl Screen {
    fn render(&mut self, state: &WidgetState) {
        if state.open != self.open {
            println!("{}", if state.open { "[widget ouvert]" } else { "[widget fermé]" });
            self.open = state.open;
        }

        if state.step != self.step {
            if state.step == Step::CollectingIdentity {
                println!("--- Nouveau visiteur: /form prénom;whatsapp;email ---");
            }
            self.step = state.step;
        }
        // History was rebuilt (new identity or fresh reconciliation)
        if state.messages.len() < self.shown {
            self.shown = 0;
        }

        for message in state.messages.iter().skip(self.shown) {
            match message.role {
                Role::Visitor => println!("vous > {}", message.text),
                Role::Assistant => println!("coach > {}", message.text),
            }
        }
        self.shown = state.messages.len();

        if state.form_error != self.form_error {
            if let Some(error) = &state.form_error {
                println!("! {error}");
            }
            self.form_error.clone_from(&state.form_error);
        }
    }
}

async fn render(mut updates: broadcast::Receiver<WidgetEvent>) {
    let mut screen = Screen::default();
    loop {
        match updates.recv().await {
            Ok(WidgetEvent::Snapshot(state)) => screen.render(&state),
            Ok(WidgetEvent::Rejected { reason }) => println!("! {reason}"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Renderer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
