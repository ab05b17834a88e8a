//! Handle Message use case.
//!
//! One chat turn end to end:
//! 1. Load the session, creating it on first contact
//! 2. Load recent history of the session's current conversation
//! 3. Ask the [`AgentResponder`] for a reply
//! 4. Auto-save both turns and the session's bookkeeping fields
//!
//! Auto-save is best-effort. A storage failure there is logged and reported
//! through [`ChatReply::saved`]; the reply is still returned.

use crate::config::store_settings::DEFAULT_MAX_HISTORY;
use crate::ports::agent_responder::{AgentReply, AgentResponder, ResponderError, ResponderRequest};
use crate::ports::clock::{Clock, SystemClock};
use crate::use_cases::conversation_store::ConversationStore;
use crate::use_cases::session_store::SessionStore;
use crate::use_cases::store_error::StoreError;
use crs_domain::{ConversationId, Session, SessionKey, SessionState, Turn};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Session state field holding the current conversation id.
pub const STATE_CONVERSATION_ID: &str = "conversation_id";
/// Session state field holding the last detected intent.
pub const STATE_LAST_INTENT: &str = "last_intent";
/// Session state field holding the last agent action.
pub const STATE_LAST_ACTION: &str = "last_action";

/// Errors that can occur while handling a message.
#[derive(Error, Debug)]
pub enum HandleMessageError {
    #[error("Empty message")]
    EmptyMessage,

    #[error("Session error: {0}")]
    Session(#[from] StoreError),

    #[error("Responder error: {0}")]
    Responder(#[from] ResponderError),
}

/// The reply handed back to the chat surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub intent: Option<String>,
    pub action: Option<String>,
    pub conversation_id: Option<ConversationId>,
    /// Whether the turn was persisted.
    pub saved: bool,
}

pub struct HandleMessageUseCase {
    sessions: Arc<SessionStore>,
    conversations: Arc<ConversationStore>,
    responder: Arc<dyn AgentResponder>,
    clock: Arc<dyn Clock>,
    max_history: usize,
}

impl HandleMessageUseCase {
    pub fn new(
        sessions: Arc<SessionStore>,
        conversations: Arc<ConversationStore>,
        responder: Arc<dyn AgentResponder>,
    ) -> Self {
        Self {
            sessions,
            conversations,
            responder,
            clock: Arc::new(SystemClock),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub async fn execute(
        &self,
        session_key: &SessionKey,
        message: &str,
    ) -> Result<ChatReply, HandleMessageError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(HandleMessageError::EmptyMessage);
        }

        let session = self.load_or_create_session(session_key).await?;
        let conversation_id = current_conversation(&session);
        let history = self.recent_history(conversation_id.as_ref()).await;
        debug!(
            session = %session_key,
            history = history.len(),
            "Dispatching message to responder"
        );

        let reply = self
            .responder
            .respond(ResponderRequest {
                session_key: session_key.clone(),
                message: message.to_string(),
                history,
                state: session.state.clone(),
            })
            .await?;

        let (conversation_id, saved) = match self
            .auto_save(session_key, conversation_id, message, &reply)
            .await
        {
            Ok(id) => (Some(id), true),
            Err(e) => {
                warn!(session = %session_key, error = %e, "Auto-save failed; reply not persisted");
                (None, false)
            }
        };

        Ok(ChatReply {
            text: reply.text,
            intent: reply.intent,
            action: reply.action,
            conversation_id,
            saved,
        })
    }

    /// Drop the session so the next message starts fresh.
    pub async fn reset(&self, session_key: &SessionKey) -> Result<(), HandleMessageError> {
        self.sessions.delete_session(session_key).await?;
        info!(session = %session_key, "Session reset");
        Ok(())
    }

    async fn load_or_create_session(&self, key: &SessionKey) -> Result<Session, StoreError> {
        match self.sessions.get_session(key).await {
            Ok(session) => Ok(session),
            Err(e) if e.is_not_found() => {
                match self.sessions.create_session(key, SessionState::new()).await {
                    Ok(session) => Ok(session),
                    // Another turn created it first
                    Err(StoreError::DuplicateSession(_)) => self.sessions.get_session(key).await,
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn recent_history(&self, conversation_id: Option<&ConversationId>) -> Vec<Turn> {
        let Some(id) = conversation_id else {
            return Vec::new();
        };
        match self.conversations.get_conversation(id).await {
            Ok(record) => record.recent_turns(self.max_history).to_vec(),
            Err(e) => {
                warn!(conversation = %id, error = %e, "Could not load history");
                Vec::new()
            }
        }
    }

    async fn auto_save(
        &self,
        session_key: &SessionKey,
        conversation_id: Option<ConversationId>,
        message: &str,
        reply: &AgentReply,
    ) -> Result<ConversationId, StoreError> {
        let now = self.clock.now();
        let user_turn = Turn::user(message, now);
        let mut agent_turn = Turn::agent(&reply.text, now);
        if let Some(intent) = &reply.intent {
            agent_turn = agent_turn.with_metadata("intent", intent.as_str());
        }
        if let Some(action) = &reply.action {
            agent_turn = agent_turn.with_metadata("action", action.as_str());
        }
        if let Some(agent) = &reply.agent_name {
            agent_turn = agent_turn.with_metadata("agent_name", agent.as_str());
        }

        let id = match conversation_id {
            Some(id) => match self.conversations.append_turn(&id, user_turn.clone()).await {
                Ok(_) => id,
                Err(StoreError::ConversationNotFound(_)) => {
                    debug!(conversation = %id, "Conversation gone, starting a new one");
                    self.conversations
                        .create_conversation(session_key, user_turn)
                        .await?
                }
                Err(e) => return Err(e),
            },
            None => {
                self.conversations
                    .create_conversation(session_key, user_turn)
                    .await?
            }
        };
        self.conversations.append_turn(&id, agent_turn).await?;

        if let Some(user_type) = &reply.user_type {
            self.conversations.update_user_type(&id, user_type).await?;
        }

        let mut patch = SessionState::new();
        patch.insert(
            STATE_CONVERSATION_ID.to_string(),
            Value::String(id.to_string()),
        );
        if let Some(intent) = &reply.intent {
            patch.insert(STATE_LAST_INTENT.to_string(), Value::String(intent.clone()));
        }
        if let Some(action) = &reply.action {
            patch.insert(STATE_LAST_ACTION.to_string(), Value::String(action.clone()));
        }
        self.sessions.update_session(session_key, patch).await?;
        Ok(id)
    }
}

fn current_conversation(session: &Session) -> Option<ConversationId> {
    session
        .state_str(STATE_CONVERSATION_ID)
        .and_then(|id| ConversationId::new(id).ok())
}
