//! Line-delimited JSON export

use crate::conversation::entities::{ConversationId, ConversationRecord, Turn};
use crate::session::entities::SessionKey;
use serde::{Deserialize, Serialize};

/// Shape of one exported line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonlEntry {
    pub conversation_id: ConversationId,
    pub session_key: SessionKey,
    pub turns: Vec<Turn>,
    pub user_type: Option<String>,
}

#[derive(Serialize)]
struct JsonlLine<'a> {
    conversation_id: &'a ConversationId,
    session_key: &'a SessionKey,
    turns: &'a [Turn],
    user_type: Option<&'a str>,
}

/// Render each conversation as a single compact JSON line.
pub fn to_jsonl(records: &[ConversationRecord]) -> Vec<String> {
    records.iter().map(jsonl_line).collect()
}

fn jsonl_line(record: &ConversationRecord) -> String {
    let line = JsonlLine {
        conversation_id: &record.conversation_id,
        session_key: &record.session_key,
        turns: &record.turns,
        user_type: record.user_type.as_deref(),
    };
    // Only string-keyed maps and plain values: serialization cannot fail.
    serde_json::to_string(&line).unwrap_or_default()
}

/// Parse a line produced by [`to_jsonl`].
pub fn parse_jsonl_line(line: &str) -> Result<JsonlEntry, serde_json::Error> {
    serde_json::from_str(line)
}
