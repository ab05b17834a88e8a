//! Aggregate statistics over a set of conversations

use super::entities::ConversationRecord;
use crate::core::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bucket used for conversations whose user type has not been inferred.
pub const UNKNOWN_USER_TYPE: &str = "unknown";

/// Earliest and latest creation time in a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(with = "timestamp")]
    pub earliest: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub latest: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationStatistics {
    pub count: usize,
    pub distribution_by_user_type: BTreeMap<String, usize>,
    pub total_turns: usize,
    pub average_turns_per_conversation: f64,
    /// Intents recorded in turn metadata, counted per turn.
    pub intent_distribution: BTreeMap<String, usize>,
    pub date_range: Option<DateRange>,
}

impl ConversationStatistics {
    /// Fold records into statistics. Pure; order of input does not matter.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ConversationRecord>,
    {
        let mut stats = Self::default();
        for record in records {
            stats.add(record);
        }
        stats.finish()
    }

    fn add(&mut self, record: &ConversationRecord) {
        self.count += 1;
        let bucket = record
            .user_type
            .clone()
            .unwrap_or_else(|| UNKNOWN_USER_TYPE.to_string());
        *self.distribution_by_user_type.entry(bucket).or_insert(0) += 1;
        self.total_turns += record.turn_count();

        for intent in record.turns.iter().filter_map(|turn| turn.intent()) {
            *self
                .intent_distribution
                .entry(intent.to_string())
                .or_insert(0) += 1;
        }

        self.date_range = Some(match self.date_range.take() {
            None => DateRange {
                earliest: record.created_at,
                latest: record.created_at,
            },
            Some(range) => DateRange {
                earliest: range.earliest.min(record.created_at),
                latest: range.latest.max(record.created_at),
            },
        });
    }

    fn finish(mut self) -> Self {
        self.average_turns_per_conversation = if self.count > 0 {
            self.total_turns as f64 / self.count as f64
        } else {
            0.0
        };
        self
    }
}
