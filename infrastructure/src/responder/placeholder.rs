//! Keyword-driven responder used when no agent backend is wired in.
//!
//! Destination requests get a clarifying question; everything else gets an
//! acknowledgement. Sustainability vocabulary marks the user as
//! `eco_focused`.

use async_trait::async_trait;
use crs_application::ports::agent_responder::{
    AgentReply, AgentResponder, ResponderError, ResponderRequest,
};
use tracing::debug;

/// Messages shorter than this never trigger a clarification.
const MIN_QUERY_LEN: usize = 5;

const DESTINATION_KEYWORDS: &[&str] = &[
    "find",
    "suggest",
    "recommend",
    "looking for",
    "want to",
    "travel",
    "visit",
    "trip",
    "europe",
    "city",
    "place",
    "destination",
    "where",
    "going to",
    "planning",
    "holiday",
    "vacation",
    "tourism",
    "tour",
    "spain",
    "france",
    "italy",
    "germany",
    "country",
    "countries",
];

const ECO_KEYWORDS: &[&str] = &[
    "eco",
    "sustainab",
    "green",
    "carbon",
    "train",
    "low impact",
    "environment",
];

pub const INTENT_FIND_DESTINATION: &str = "find_destination";
pub const INTENT_GENERAL: &str = "general";
pub const ACTION_CLARIFY: &str = "clarify";
pub const ACTION_ACKNOWLEDGE: &str = "acknowledge";
pub const USER_TYPE_ECO: &str = "eco_focused";

const AGENT_NAME: &str = "placeholder";

fn mentions_any(message: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| message.contains(keyword))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderResponder;

impl PlaceholderResponder {
    pub fn new() -> Self {
        Self
    }

    /// Reply to one message. Pure; the async port wraps this.
    pub fn reply_to(&self, message: &str) -> AgentReply {
        let lower = message.trim().to_lowercase();

        let reply = if lower.len() >= MIN_QUERY_LEN && mentions_any(&lower, DESTINATION_KEYWORDS) {
            AgentReply::new(
                "Happy to help you find a destination. Which region are you considering, \
                 and how do you prefer to travel there?",
            )
            .with_intent(INTENT_FIND_DESTINATION)
            .with_action(ACTION_CLARIFY)
        } else {
            AgentReply::new(
                "Thank you for your message. Tell me where you would like to go and I can suggest sustainable options.",
            )
            .with_intent(INTENT_GENERAL)
            .with_action(ACTION_ACKNOWLEDGE)
        }
        .with_agent_name(AGENT_NAME);

        if mentions_any(&lower, ECO_KEYWORDS) {
            reply.with_user_type(USER_TYPE_ECO)
        } else {
            reply
        }
    }
}

#[async_trait]
impl AgentResponder for PlaceholderResponder {
    async fn respond(&self, request: ResponderRequest) -> Result<AgentReply, ResponderError> {
        let reply = self.reply_to(&request.message);
        debug!(
            session = %request.session_key,
            intent = reply.intent.as_deref().unwrap_or("-"),
            "Placeholder reply"
        );
        Ok(reply)
    }
}
