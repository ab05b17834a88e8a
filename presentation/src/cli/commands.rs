//! CLI command definitions

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use crs_domain::{ConversationFilter, DomainError, ExportFormat, SessionKey};
use std::path::PathBuf;

/// Export format as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormatArg {
    /// One JSON object per conversation
    Jsonl,
    /// Question/answer pairs from adjacent user/agent turns
    #[value(alias = "qa")]
    QaPairs,
    /// ChatML transcripts
    #[value(name = "chatml")]
    ChatMl,
    /// Records with per-conversation statistics
    Full,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Jsonl => ExportFormat::Jsonl,
            ExportFormatArg::QaPairs => ExportFormat::QaPairs,
            ExportFormatArg::ChatMl => ExportFormat::ChatMl,
            ExportFormatArg::Full => ExportFormat::Full,
        }
    }
}

/// CLI arguments for crs-store
#[derive(Parser, Debug)]
#[command(name = "crs-store")]
#[command(author, version, about = "Session and conversation store for a sustainable-tourism recommender")]
#[command(long_about = r#"
crs-store keeps expiring chat sessions and append-only conversation records,
and exports stored conversations as training data.

Configuration files are loaded from (in priority order):
1. Environment      DATABASE_BACKEND, DATABASE_URL, SESSION_TIMEOUT, ...
2. --config <path>  Explicit config file
3. ./crs.toml       Project-level config
4. ~/.config/crs-store/config.toml   Global config

Example:
  crs-store chat --session alice
  crs-store export --format qa-pairs --output data/qa.jsonl
  crs-store stats --user-type eco_focused
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the health endpoint and the periodic session sweep until Ctrl-C
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Chat interactively through the placeholder responder
    Chat {
        /// Session key to chat under (a fresh one is generated if omitted)
        #[arg(short, long, value_name = "KEY")]
        session: Option<String>,
    },

    /// Export stored conversations as training data
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value = "jsonl")]
        format: ExportFormatArg,

        /// Output file (stdout if omitted or "-")
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,

        /// Maximum conversations to export
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Show conversation statistics
    Stats {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// List one page of conversations, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Records per page (1-1000)
        #[arg(long, value_name = "N", default_value_t = 20)]
        page_size: usize,

        /// Token from a previous page
        #[arg(long, value_name = "TOKEN")]
        page_token: Option<String>,
    },

    /// Delete expired sessions once and exit
    Sweep,

    /// Show configuration file locations and effective configuration
    ShowConfig,
}

/// Conversation filters shared by export, stats and list
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only conversations classified with this user type
    #[arg(long, value_name = "TYPE")]
    pub user_type: Option<String>,

    /// Only conversations of this session
    #[arg(long = "session", value_name = "KEY")]
    pub session_key: Option<String>,

    /// Created on or after (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_name = "DATE", value_parser = parse_date_from)]
    pub from: Option<DateTime<Utc>>,

    /// Created on or before (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_name = "DATE", value_parser = parse_date_to)]
    pub to: Option<DateTime<Utc>>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> Result<ConversationFilter, DomainError> {
        let mut filter = ConversationFilter::new().with_date_range(self.from, self.to);
        if let Some(user_type) = &self.user_type {
            filter = filter.with_user_type(user_type.clone());
        }
        if let Some(key) = &self.session_key {
            filter = filter.with_session_key(SessionKey::new(key.clone())?);
        }
        Ok(filter)
    }
}

fn parse_date(s: &str, end_of_day: bool) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("expected YYYY-MM-DD or RFC 3339, got '{s}'"))?;
    let time = if end_of_day {
        date.and_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| format!("invalid date '{s}'"))
}

fn parse_date_from(s: &str) -> Result<DateTime<Utc>, String> {
    parse_date(s, false)
}

/// A bare date as an upper bound covers the whole day.
fn parse_date_to(s: &str) -> Result<DateTime<Utc>, String> {
    parse_date(s, true)
}
