//! REPL (Read-Eval-Print Loop) for interactive chat

use crate::ConsoleFormatter;
use crs_application::{HandleMessageError, HandleMessageUseCase};
use crs_domain::SessionKey;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::sync::Arc;

/// What the loop should do after a slash command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandOutcome {
    Continue,
    Reset,
    Quit,
}

/// Interactive chat REPL bound to one session
pub struct ChatRepl {
    use_case: Arc<HandleMessageUseCase>,
    session_key: SessionKey,
}

impl ChatRepl {
    pub fn new(use_case: Arc<HandleMessageUseCase>, session_key: SessionKey) -> Self {
        Self {
            use_case,
            session_key,
        }
    }

    /// Run the interactive REPL
    pub async fn run(&self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        let history_path = dirs::data_dir().map(|p| p.join("crs-store").join("history.txt"));

        if let Some(ref path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        self.print_welcome();

        loop {
            match rl.readline("you> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    if line.starts_with('/') {
                        match Self::parse_command(line) {
                            CommandOutcome::Quit => {
                                println!("Bye!");
                                break;
                            }
                            CommandOutcome::Reset => self.reset().await,
                            CommandOutcome::Continue => {}
                        }
                        continue;
                    }

                    let _ = rl.add_history_entry(line);
                    self.send(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = history_path {
            let _ = rl.save_history(path);
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│      Sustainable Travel Assistant Chat      │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!("Session: {}", self.session_key);
        println!();
        Self::print_help();
    }

    fn print_help() {
        println!("Commands:");
        println!("  /help, /h, /?     - Show this help");
        println!("  /reset            - Forget this session and start over");
        println!("  /quit, /exit, /q  - Exit chat");
        println!();
    }

    fn parse_command(cmd: &str) -> CommandOutcome {
        match cmd {
            "/quit" | "/exit" | "/q" => CommandOutcome::Quit,
            "/reset" => CommandOutcome::Reset,
            "/help" | "/h" | "/?" => {
                println!();
                Self::print_help();
                CommandOutcome::Continue
            }
            _ => {
                println!("Unknown command: {}", cmd);
                println!("Type /help for available commands");
                CommandOutcome::Continue
            }
        }
    }

    async fn reset(&self) {
        match self.use_case.reset(&self.session_key).await {
            Ok(()) => println!("Session reset."),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    async fn send(&self, message: &str) {
        match self.use_case.execute(&self.session_key, message).await {
            Ok(reply) => println!("{}", ConsoleFormatter::format_reply(&reply)),
            Err(HandleMessageError::EmptyMessage) => {}
            Err(e) => eprintln!("Error: {}", e),
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_aliases() {
        for cmd in ["/quit", "/exit", "/q"] {
            assert_eq!(ChatRepl::parse_command(cmd), CommandOutcome::Quit);
        }
    }

    #[test]
    fn test_reset_and_unknown() {
        assert_eq!(ChatRepl::parse_command("/reset"), CommandOutcome::Reset);
        assert_eq!(ChatRepl::parse_command("/dance"), CommandOutcome::Continue);
    }
}
