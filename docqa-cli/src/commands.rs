//! REPL input parsing.
//!
//! Lines starting with `:` are commands; anything else is a question.

use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  :load PATH          load and index a .pdf, .docx or .txt document
  :history            show answered questions, newest first
  :reset              forget the document and the history
  :set chunk-size N   change the chunk size (re-indexes, clears history)
  :set k N            change how many chunks ground each answer (clears history)
  :config             show the current settings
  :help               show this help
  :quit               exit
Anything else is asked as a question about the loaded document.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load(PathBuf),
    History,
    Reset,
    SetChunkSize(usize),
    SetTopK(usize),
    Config,
    Help,
    Quit,
    Ask(String),
    Empty,
}

/// Parse one line of REPL input.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(command) = line.strip_prefix(':') else {
        return Ok(if line.is_empty() { Command::Empty } else { Command::Ask(line.to_string()) });
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match name {
        "load" | "l" if !rest.is_empty() => Ok(Command::Load(PathBuf::from(rest))),
        "load" | "l" => Err("usage: :load PATH".into()),
        "history" | "h" => Ok(Command::History),
        "reset" => Ok(Command::Reset),
        "set" => parse_set(rest),
        "config" => Ok(Command::Config),
        "help" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command ':{other}' (try :help)")),
    }
}

fn parse_set(rest: &str) -> Result<Command, String> {
    let mut parts = rest.split_whitespace();
    let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err("usage: :set chunk-size N | :set k N".into());
    };
    let n: usize = value.parse().map_err(|_| format!("'{value}' is not a whole number"))?;
    if n == 0 {
        return Err(format!("{key} must be greater than zero"));
    }
    match key {
        "chunk-size" | "chunk_size" => Ok(Command::SetChunkSize(n)),
        "k" | "top-k" | "top_k" => Ok(Command::SetTopK(n)),
        other => Err(format!("unknown setting '{other}'")),
    }
}
