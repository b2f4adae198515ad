pub mod conversation_state;
pub mod lead;
pub mod lead_store;
pub mod prompt;
pub mod session;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

#[cfg(test)]
use conversation_state::ConversationState;
use lead::{mentions_lead, strip_lead_blocks};
use lead_store::{LeadOutcome, LeadStore};
use prompt::compose_prompt;
use session::{SessionId, SessionStore};

use crate::gateway::{GatewayError, ModelGateway};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("empty message")]
    EmptyMessage,

    #[error("model gateway is unavailable")]
    Unavailable,

    #[error("model call failed: {0}")]
    Upstream(#[source] GatewayError),
}

/// Runs one customer message through the seller persona.
pub struct ChatService {
    gateway: Arc<ModelGateway>,
    rules: String,
    leads: LeadStore,
    sessions: SessionStore,
}

impl ChatService {
    pub fn new(gateway: Arc<ModelGateway>, rules: String, leads: LeadStore) -> Self {
        Self {
            gateway,
            rules,
            leads,
            sessions: SessionStore::new(),
        }
    }

    /// Replace the default session limits.
    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn is_available(&self) -> bool {
        self.gateway.is_available()
    }

    /// Reject a message that could never be exchanged, without touching any
    /// session.
    pub fn check(&self, message: &str) -> Result<(), ChatError> {
        if !self.is_available() {
            return Err(ChatError::Unavailable);
        }
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        Ok(())
    }

    /// Start over: the session's transcript is emptied.
    pub async fn start_session(&self, existing: Option<SessionId>) -> SessionId {
        let id = self.sessions.start(existing).await;
        info!(session = %id, "Conversation reset");
        id
    }

    pub async fn resolve_session(&self, candidate: Option<SessionId>) -> SessionId {
        self.sessions.resolve(candidate).await
    }

    #[cfg(test)]
    pub(crate) async fn conversation(&self, session: SessionId) -> Option<ConversationState> {
        self.sessions.snapshot(session).await
    }

    #[cfg(test)]
    pub(crate) async fn session_count(&self) -> usize {
        self.sessions.len().await
    }

    /// Record the customer's message, ask the model, persist any lead and
    /// return the reply without the lead block.
    ///
    /// On a model failure the customer turn stays recorded and no seller turn
    /// is added. A reply that arrives after the session was reset is returned
    /// but not recorded.
    pub async fn exchange(&self, session: SessionId, message: &str) -> Result<String, ChatError> {
        self.check(message)?;
        let message = message.trim();

        info!(session = %session, "Customer: {}", message);

        let (generation, prompt) = self
            .sessions
            .with_conversation(session, |conversation| {
                conversation.add_customer_message(message);
                compose_prompt(&self.rules, conversation)
            })
            .await;

        let raw = self.gateway.generate(&prompt).await.map_err(|e| {
            error!(session = %session, "Model call failed: {}", e);
            match e {
                GatewayError::Unavailable => ChatError::Unavailable,
                other => ChatError::Upstream(other),
            }
        })?;

        let raw = raw.trim();
        debug!(session = %session, "Model (raw): {}", raw);

        let reply = if mentions_lead(raw) {
            info!(session = %session, "Lead detected, saving");
            self.save_lead(raw).await;
            strip_lead_blocks(raw)
        } else {
            raw.to_string()
        };

        let recorded = self
            .sessions
            .with_current(session, generation, |conversation| {
                conversation.add_seller_message(&reply)
            })
            .await;
        if recorded.is_none() {
            info!(session = %session, "Session was reset while waiting for the model, reply not recorded");
        }

        Ok(reply)
    }

    async fn save_lead(&self, response: &str) -> LeadOutcome {
        let leads = self.leads.clone();
        let response = response.to_string();

        match tokio::task::spawn_blocking(move || leads.save(&response)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Lead writer task failed: {}", e);
                LeadOutcome::Failed
            }
        }
    }
}
