//! # docqa-cli
//!
//! Command-line front end for `docqa-rag`: load a document, see what
//! indexing it will cost, then ask questions about it.
//!
//! ```bash
//! # Interactive
//! docqa --file report.pdf
//!
//! # One question, then exit
//! docqa --file report.pdf --question "What are the key findings?"
//! ```

pub mod app;
pub mod cli;
pub mod commands;
pub mod interrupt;
pub mod repl;

pub use app::{App, Flow};
pub use cli::Args;
pub use commands::{Command, parse};
pub use interrupt::Interrupt;
