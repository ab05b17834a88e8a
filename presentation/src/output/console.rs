//! Console output formatter for statistics, listings and chat replies

use colored::Colorize;
use crs_application::ChatReply;
use crs_domain::{ConversationRecord, ConversationStatistics, Page, timestamp};

/// Longest preview of a first message in listings
const PREVIEW_CHARS: usize = 60;

/// Formats store results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format conversation statistics
    pub fn format_statistics(stats: &ConversationStatistics) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Conversation Statistics"));
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n",
            "Conversations:".cyan().bold(),
            stats.count
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Total turns:".cyan().bold(),
            stats.total_turns
        ));
        output.push_str(&format!(
            "{} {:.2}\n",
            "Avg turns/conversation:".cyan().bold(),
            stats.average_turns_per_conversation
        ));

        match &stats.date_range {
            Some(range) => output.push_str(&format!(
                "{} {} .. {}\n",
                "Created:".cyan().bold(),
                timestamp::format(&range.earliest),
                timestamp::format(&range.latest)
            )),
            None => output.push_str(&format!("{} -\n", "Created:".cyan().bold())),
        }

        if !stats.distribution_by_user_type.is_empty() {
            output.push_str(&Self::section_header("User types"));
            for (user_type, count) in &stats.distribution_by_user_type {
                output.push_str(&format!("  {:<24} {}\n", user_type, count));
            }
        }

        if !stats.intent_distribution.is_empty() {
            output.push_str(&Self::section_header("Intents"));
            for (intent, count) in &stats.intent_distribution {
                output.push_str(&format!("  {:<24} {}\n", intent, count));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_statistics_json(stats: &ConversationStatistics) -> String {
        serde_json::to_string_pretty(stats).unwrap_or_else(|_| "{}".to_string())
    }

    /// One line per conversation plus the continuation token, if any
    pub fn format_page(page: &Page<ConversationRecord>) -> String {
        let mut output = String::new();
        if page.items.is_empty() {
            output.push_str(&format!("{}\n", "No conversations.".dimmed()));
        }
        for record in &page.items {
            output.push_str(&Self::format_record_line(record));
            output.push('\n');
        }
        if let Some(token) = &page.next_page_token {
            output.push_str(&format!(
                "\n{} --page-token {}\n",
                "More results:".yellow().bold(),
                token
            ));
        }
        output
    }

    /// Summary line: id, created time, session, user type, turn count, preview
    pub fn format_record_line(record: &ConversationRecord) -> String {
        let preview = record
            .turns
            .first()
            .map(|turn| Self::truncate(&turn.text, PREVIEW_CHARS))
            .unwrap_or_default();
        format!(
            "{}  {}  {:<16} {:<14} {:>3} turns  {}",
            record.conversation_id.as_str().yellow(),
            timestamp::format(&record.created_at).dimmed(),
            record.session_key.as_str(),
            record.user_type.as_deref().unwrap_or("-"),
            record.turn_count(),
            preview
        )
    }

    /// Agent reply as shown in the chat REPL
    pub fn format_reply(reply: &ChatReply) -> String {
        let mut output = format!("{} {}", "Agent:".green().bold(), reply.text);
        if let Some(intent) = &reply.intent {
            output.push_str(&format!("\n{}", format!("[intent: {intent}]").dimmed()));
        }
        if !reply.saved {
            output.push_str(&format!("\n{}", "(not saved)".yellow()));
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    fn truncate(text: &str, max_chars: usize) -> String {
        let single_line = text.replace('\n', " ");
        if single_line.chars().count() <= max_chars {
            return single_line;
        }
        let cut: String = single_line.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
