//! Message delivery
//!
//! One entry point for both wire contracts: a resolved session selects the
//! session-scoped endpoint, its absence selects the stateless exchange.
//! Every delivery ends in an assistant reply the visitor can see, except
//! when automation is active but produced no text.

use crate::backend::{ChatBackend, FallbackMessageRequest, SessionMessageRequest};

/// Shown when a human operator will answer instead of the assistant
pub const HANDOFF_ACK: &str = "Message reçu ! Le coach vous répondra bientôt. 💬";
/// Shown when the stateless exchange answered without a reply
pub const NO_REPLY: &str = "Désolé, je n'ai pas pu traiter votre message.";
/// Shown when the message could not be delivered at all
pub const DELIVERY_FAILED: &str = "Désolé, une erreur s'est produite. Veuillez réessayer.";

/// Where a visitor message goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRoute {
    Session {
        session_id: String,
        participant_id: String,
    },
    Fallback {
        first_name: String,
    },
}

impl MessageRoute {
    pub fn is_session(&self) -> bool {
        matches!(self, Self::Session { .. })
    }
}

/// Deliver `text` and return the assistant reply to append, if any
pub async fn deliver<B: ChatBackend + ?Sized>(
    backend: &B,
    route: &MessageRoute,
    text: &str,
) -> Option<String> {
    match route {
        MessageRoute::Session {
            session_id,
            participant_id,
        } => {
            let request = SessionMessageRequest {
                session_id: session_id.clone(),
                participant_id: participant_id.clone(),
                message: text.to_string(),
            };
            match backend.session_message(&request).await {
                Ok(resp) => {
                    if let Some(reply) = resp.reply() {
                        Some(reply.to_string())
                    } else if resp.is_handoff() {
                        tracing::info!(
                            session_id = %session_id,
                            "Automated replies off, awaiting human"
                        );
                        Some(HANDOFF_ACK.to_string())
                    } else {
                        tracing::debug!(
                            session_id = %session_id,
                            "No reply text while automation active"
                        );
                        None
                    }
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "Session message failed");
                    Some(DELIVERY_FAILED.to_string())
                }
            }
        }
        MessageRoute::Fallback { first_name } => {
            let request = FallbackMessageRequest {
                message: text.to_string(),
                first_name: first_name.clone(),
                lead_id: String::new(),
            };
            match backend.fallback_message(&request).await {
                Ok(resp) => Some(
                    resp.response
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| NO_REPLY.to_string()),
                ),
                Err(e) => {
                    tracing::warn!(error = %e, "Fallback message failed");
                    Some(DELIVERY_FAILED.to_string())
                }
            }
        }
    }
}
