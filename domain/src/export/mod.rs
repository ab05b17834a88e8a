//! Export pipeline: stored conversations → training-ready formats.
//!
//! Every converter is a pure function over `&[ConversationRecord]`. They never
//! fail on well-formed records and produce byte-identical output for the same
//! input, so exports can be diffed between runs.

pub mod chatml;
pub mod format;
pub mod full;
pub mod jsonl;
pub mod qa;

pub use chatml::{DEFAULT_SYSTEM_PROMPT, Transcript, to_chatml};
pub use format::ExportFormat;
pub use full::{FullExport, TurnStatistics, to_full};
pub use jsonl::{JsonlEntry, parse_jsonl_line, to_jsonl};
pub use qa::{QaPair, to_qa_pairs};

use crate::conversation::entities::ConversationRecord;
use serde::Serialize;

/// Knobs that only some formats use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Leading system block for ChatML transcripts.
    pub system_prompt: Option<String>,
}

/// Render records in `format` as output lines, one JSON document per line.
pub fn render_lines(
    format: ExportFormat,
    records: &[ConversationRecord],
    options: &ExportOptions,
) -> Vec<String> {
    match format {
        ExportFormat::Jsonl => to_jsonl(records),
        ExportFormat::QaPairs => json_lines(&to_qa_pairs(records)),
        ExportFormat::ChatMl => json_lines(&to_chatml(records, options.system_prompt.as_deref())),
        ExportFormat::Full => json_lines(&to_full(records)),
    }
}

fn json_lines<T: Serialize>(items: &[T]) -> Vec<String> {
    items
        .iter()
        .map(|item| serde_json::to_string(item).unwrap_or_default())
        .collect()
}
