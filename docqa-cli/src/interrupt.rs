//! Ctrl-C handling.
//!
//! Once tokio listens for SIGINT the default handler stays replaced for
//! the life of the process, so a single listener is installed at startup
//! and routes every signal to the operation currently running.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Hands out one cancellation token per operation and cancels the latest.
#[derive(Debug, Default)]
pub struct Interrupt {
    current: Mutex<CancellationToken>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new operation and return its token.
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        match self.current.lock() {
            Ok(mut current) => *current = token.clone(),
            Err(poisoned) => *poisoned.into_inner() = token.clone(),
        }
        token
    }

    /// Cancel the operation started last. A finished operation ignores it.
    pub fn fire(&self) {
        let token = match self.current.lock() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        debug!("interrupt received");
        token.cancel();
    }

    /// Route every SIGINT for the rest of the process to [`fire`](Self::fire).
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let interrupt = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "cannot listen for Ctrl-C");
                    return;
                }
                interrupt.fire();
            }
        })
    }
}
