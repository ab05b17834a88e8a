//! Full analysis export: record plus per-conversation statistics

use super::qa::to_qa_pairs;
use crate::conversation::entities::{ConversationId, ConversationRecord, Role, Turn};
use crate::core::timestamp;
use crate::session::entities::SessionKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnStatistics {
    pub total_turns: usize,
    pub user_messages: usize,
    pub agent_messages: usize,
    pub exchanges: usize,
    /// Distinct intents in order of first appearance.
    pub intents_detected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullExport {
    pub conversation_id: ConversationId,
    pub session_key: SessionKey,
    pub user_type: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    pub turns: Vec<Turn>,
    pub statistics: TurnStatistics,
}

pub fn to_full(records: &[ConversationRecord]) -> Vec<FullExport> {
    records
        .iter()
        .map(|record| FullExport {
            conversation_id: record.conversation_id.clone(),
            session_key: record.session_key.clone(),
            user_type: record.user_type.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            turns: record.turns.clone(),
            statistics: turn_statistics(record),
        })
        .collect()
}

fn turn_statistics(record: &ConversationRecord) -> TurnStatistics {
    let user_messages = record.turns.iter().filter(|t| t.role == Role::User).count();
    let mut intents_detected: Vec<String> = Vec::new();
    for intent in record.turns.iter().filter_map(Turn::intent) {
        if !intents_detected.iter().any(|seen| seen == intent) {
            intents_detected.push(intent.to_string());
        }
    }
    TurnStatistics {
        total_turns: record.turns.len(),
        user_messages,
        agent_messages: record.turns.len() - user_messages,
        exchanges: to_qa_pairs(std::slice::from_ref(record)).len(),
        intents_detected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_full_statistics() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut rec = ConversationRecord::start(
            ConversationId::new("c1").unwrap(),
            SessionKey::new("u1").unwrap(),
            Turn::user("trip to Spain", t0),
            t0,
        );
        rec.push_turn(Turn::agent("When?", t0).with_metadata("intent", "find_destination"), t0);
        rec.push_turn(Turn::user("May", t0), t0);
        rec.push_turn(Turn::agent("Here are options", t0).with_metadata("intent", "find_destination"), t0);
        rec.push_turn(Turn::user("thanks", t0).with_metadata("intent", "farewell"), t0);

        let full = to_full(&[rec]);
        let stats = &full[0].statistics;
        assert_eq!(stats.total_turns, 5);
        assert_eq!(stats.user_messages, 3);
        assert_eq!(stats.agent_messages, 2);
        assert_eq!(stats.exchanges, 2);
        assert_eq!(stats.intents_detected, vec!["find_destination", "farewell"]);
    }
}
