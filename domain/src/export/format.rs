//! Export format value object

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Training-data output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// One JSON object per conversation per line
    #[default]
    Jsonl,
    /// Adjacent (user, agent) turn pairs
    QaPairs,
    /// One chat-markup transcript per conversation
    #[serde(rename = "chatml")]
    ChatMl,
    /// Record plus per-conversation statistics, for analysis
    Full,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::QaPairs => "qa_pairs",
            ExportFormat::ChatMl => "chatml",
            ExportFormat::Full => "full",
        }
    }

    pub fn all() -> [ExportFormat; 4] {
        [
            ExportFormat::Jsonl,
            ExportFormat::QaPairs,
            ExportFormat::ChatMl,
            ExportFormat::Full,
        ]
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "jsonl" => Ok(ExportFormat::Jsonl),
            "qa_pairs" | "qa" => Ok(ExportFormat::QaPairs),
            "chatml" | "chat_ml" => Ok(ExportFormat::ChatMl),
            "full" => Ok(ExportFormat::Full),
            _ => Err(DomainError::UnknownExportFormat(s.to_string())),
        }
    }
}
