//! Agent responder port
//!
//! The only boundary between the storage core and the agent layer. The
//! message handler hands the responder the user's message plus recent
//! history and receives a reply with its classification.

use async_trait::async_trait;
use crs_domain::{SessionKey, SessionState, Turn};
use thiserror::Error;

/// Errors that can occur while producing a reply
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResponderError {
    #[error("Responder unavailable: {0}")]
    Unavailable(String),

    #[error("Responder failed: {0}")]
    Failed(String),
}

/// Everything the responder sees for one turn.
#[derive(Debug, Clone)]
pub struct ResponderRequest {
    pub session_key: SessionKey,
    pub message: String,
    /// Most recent turns of the current conversation, oldest first.
    pub history: Vec<Turn>,
    /// Session state as of the start of the turn.
    pub state: SessionState,
}

/// A reply from the agent layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentReply {
    pub text: String,
    pub intent: Option<String>,
    pub action: Option<String>,
    /// User classification, when the responder inferred one.
    pub user_type: Option<String>,
    pub agent_name: Option<String>,
}

impl AgentReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_user_type(mut self, user_type: impl Into<String>) -> Self {
        self.user_type = Some(user_type.into());
        self
    }

    pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = Some(name.into());
        self
    }
}

/// Produces the agent's reply to a user message
#[async_trait]
pub trait AgentResponder: Send + Sync {
    async fn respond(&self, request: ResponderRequest) -> Result<AgentReply, ResponderError>;
}
