//! Interactive chat module
//!
//! Readline chat against the message handler, one session per run.

mod repl;

pub use repl::ChatRepl;
