//! Question/answer pair export

use crate::conversation::entities::{ConversationId, ConversationRecord, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub conversation_id: ConversationId,
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn as_tuple(&self) -> (&str, &str) {
        (&self.question, &self.answer)
    }
}

/// Pair each user turn with the agent turn immediately following it.
///
/// A user turn that is followed by another user turn, or ends the
/// conversation, contributes no pair.
pub fn to_qa_pairs(records: &[ConversationRecord]) -> Vec<QaPair> {
    let mut pairs = Vec::new();
    for record in records {
        let turns = &record.turns;
        let mut i = 0;
        while i < turns.len() {
            let answered = turns[i].role == Role::User
                && turns.get(i + 1).is_some_and(|next| next.role == Role::Agent);
            if answered {
                pairs.push(QaPair {
                    conversation_id: record.conversation_id.clone(),
                    question: turns[i].text.clone(),
                    answer: turns[i + 1].text.clone(),
                });
                i += 2;
            } else {
                i += 1;
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::entities::Turn;
    use crate::session::entities::SessionKey;
    use chrono::{DateTime, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    fn conversation(turns: &[(Role, &str)]) -> ConversationRecord {
        let (first_role, first_text) = turns[0];
        let mut rec = ConversationRecord::start(
            ConversationId::new("c1").unwrap(),
            SessionKey::new("u1").unwrap(),
            Turn::new(first_role, first_text, t0()),
            t0(),
        );
        for (role, text) in &turns[1..] {
            rec.push_turn(Turn::new(*role, *text, t0()), t0());
        }
        rec
    }

    #[test]
    fn test_single_exchange() {
        let rec = conversation(&[(Role::User, "A"), (Role::Agent, "B")]);
        let pairs = to_qa_pairs(&[rec]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].as_tuple(), ("A", "B"));
    }

    #[test]
    fn test_trailing_question_dropped() {
        let rec = conversation(&[
            (Role::User, "q1"),
            (Role::Agent, "a1"),
            (Role::User, "q2"),
        ]);
        let pairs = to_qa_pairs(&[rec]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "q1");
    }

    #[test]
    fn test_consecutive_user_turns() {
        let rec = conversation(&[
            (Role::User, "hello?"),
            (Role::User, "anyone?"),
            (Role::Agent, "yes"),
            (Role::Agent, "anything else?"),
        ]);
        let pairs: Vec<(String, String)> = to_qa_pairs(&[rec])
            .into_iter()
            .map(|p| (p.question, p.answer))
            .collect();
        assert_eq!(pairs, vec![("anyone?".to_string(), "yes".to_string())]);
    }

    #[test]
    fn test_agent_only_conversation() {
        let rec = conversation(&[(Role::Agent, "welcome")]);
        assert!(to_qa_pairs(&[rec]).is_empty());
    }
}
