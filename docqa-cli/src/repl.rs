//! The interactive prompt.

use std::io::Write;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::app::{App, Flow};
use crate::commands;

const PROMPT: &str = "docqa> ";

/// Read lines until `:quit`, Ctrl-D or Ctrl-C at an empty prompt.
///
/// Command errors are printed and the loop continues.
pub async fn run(app: &mut App) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut stdout = std::io::stdout();

    match app.document() {
        Some(path) => println!("Loaded {}. Ask a question, or :help.", path.display()),
        None => println!("No document loaded. Use :load PATH, or :help."),
    }

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if !line.trim().is_empty() {
            let _ = editor.add_history_entry(line.as_str());
        }

        let command = match commands::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        debug!(?command, "repl command");

        match app.execute(command, &mut stdout).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => eprintln!("error: {e:#}"),
        }
        stdout.flush()?;
    }
    Ok(())
}
