//! Presentation layer for crs-store
//!
//! This crate contains CLI definitions, console formatters
//! and the interactive chat interface.

pub mod chat;
pub mod cli;
pub mod output;

// Re-export commonly used types
pub use chat::ChatRepl;
pub use cli::commands::{Cli, Command, ExportFormatArg, FilterArgs};
pub use output::console::ConsoleFormatter;
