//! Export Conversations use case.
//!
//! Selects conversations through a [`ConversationFilter`], bounds the set and
//! renders it in one of the training-data formats.

use crate::use_cases::conversation_store::ConversationStore;
use crate::use_cases::store_error::StoreError;
use crs_domain::{ConversationFilter, ExportFormat, ExportOptions, render_lines};
use std::sync::Arc;
use tracing::info;

/// Records exported when the caller gives no limit.
pub const DEFAULT_EXPORT_LIMIT: usize = 10_000;

/// Input for the [`ExportConversationsUseCase`].
#[derive(Debug, Clone, Default)]
pub struct ExportInput {
    pub format: ExportFormat,
    pub filter: ConversationFilter,
    /// Maximum conversations to export. `None` uses [`DEFAULT_EXPORT_LIMIT`].
    pub limit: Option<usize>,
    pub options: ExportOptions,
}

impl ExportInput {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: ConversationFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.options.system_prompt = Some(prompt.into());
        self
    }
}

/// Rendered export, one output line per entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutput {
    pub format: ExportFormat,
    pub conversations: usize,
    pub lines: Vec<String>,
}

pub struct ExportConversationsUseCase {
    conversations: Arc<ConversationStore>,
}

impl ExportConversationsUseCase {
    pub fn new(conversations: Arc<ConversationStore>) -> Self {
        Self { conversations }
    }

    pub async fn execute(&self, input: ExportInput) -> Result<ExportOutput, StoreError> {
        let limit = input.limit.unwrap_or(DEFAULT_EXPORT_LIMIT);
        let records = self.conversations.scan(&input.filter, Some(limit)).await?;
        let lines = render_lines(input.format, &records, &input.options);
        info!(
            format = %input.format,
            conversations = records.len(),
            lines = lines.len(),
            "Rendered export"
        );
        Ok(ExportOutput {
            format: input.format,
            conversations: records.len(),
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::clock::{Clock, ManualClock};
    use crate::test_support::MockBackend;
    use chrono::{Duration, TimeZone, Utc};
    use crs_domain::{SessionKey, Turn};
    use serde_json::Value;

    async fn setup() -> ExportConversationsUseCase {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap(),
        ));
        let store = ConversationStore::new(Arc::new(MockBackend::new())).with_clock(clock.clone());
        let key = SessionKey::new("u1").unwrap();

        let id = store
            .create_conversation(&key, Turn::user("Where can I hike?", clock.now()))
            .await
            .unwrap();
        store
            .append_turn(&id, Turn::agent("Try the Dolomites.", clock.now()))
            .await
            .unwrap();
        store
            .append_turn(&id, Turn::user("Thanks", clock.now()))
            .await
            .unwrap();
        store.update_user_type(&id, "eco_focused").await.unwrap();

        clock.advance(Duration::minutes(5));
        store
            .create_conversation(&key, Turn::user("Hello", clock.now()))
            .await
            .unwrap();

        ExportConversationsUseCase::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_qa_export_skips_unmatched_user_turns() {
        let use_case = setup().await;
        let output = use_case
            .execute(ExportInput::new(ExportFormat::QaPairs))
            .await
            .unwrap();
        assert_eq!(output.conversations, 2);
        assert_eq!(output.lines.len(), 1);
        let pair: Value = serde_json::from_str(&output.lines[0]).unwrap();
        assert_eq!(pair["question"], "Where can I hike?");
        assert_eq!(pair["answer"], "Try the Dolomites.");
    }

    #[tokio::test]
    async fn test_filter_and_limit_apply_before_conversion() {
        let use_case = setup().await;
        let output = use_case
            .execute(
                ExportInput::new(ExportFormat::Jsonl)
                    .with_filter(ConversationFilter::new().with_user_type("eco_focused")),
            )
            .await
            .unwrap();
        assert_eq!(output.lines.len(), 1);

        let output = use_case
            .execute(ExportInput::new(ExportFormat::Jsonl).with_limit(1))
            .await
            .unwrap();
        assert_eq!(output.conversations, 1);
        // newest first
        assert!(output.lines[0].contains("Hello"));
    }

    #[tokio::test]
    async fn test_chatml_uses_system_prompt() {
        let use_case = setup().await;
        let output = use_case
            .execute(ExportInput::new(ExportFormat::ChatMl).with_system_prompt("Be kind."))
            .await
            .unwrap();
        let transcript: Value = serde_json::from_str(&output.lines[0]).unwrap();
        assert!(
            transcript["transcript"]
                .as_str()
                .unwrap()
                .starts_with("<|im_start|>system\nBe kind.<|im_end|>\n")
        );
    }
}
