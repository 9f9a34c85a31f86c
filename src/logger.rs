//! The [`Logger`] seam and its default `tracing`-backed implementation.
//!
//! The core never hard-codes a logging backend; hosts may supply their own
//! [`Logger`]. [`DefaultLogger`] formats each [`CliError`] kind into a single
//! human-friendly line and, when `DEBUG` is set in the environment, appends a
//! rendered backtrace-style error chain for internal error kinds.

use crate::error::CliError;
use std::sync::Once;

/// Minimal logging seam consumed by the dispatcher, plugin manager, and REPL.
pub trait Logger: Send + Sync {
    /// Informational message.
    fn info(&self, message: &str);
    /// Warning message.
    fn warn(&self, message: &str);
    /// Formats and emits an error for user-facing presentation.
    fn error(&self, err: &CliError);
    /// Verbose diagnostic, only emitted when debug mode is active.
    fn debug(&self, message: &str);
}

/// `tracing`-backed logger; debug-mode verbosity is gated on the `DEBUG`
/// environment variable, matching §6.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLogger {
    debug_enabled: bool,
}

static INIT_SUBSCRIBER: Once = Once::new();

impl DefaultLogger {
    /// Build a logger, reading `DEBUG` from the environment once.
    pub fn new() -> Self {
        INIT_SUBSCRIBER.call_once(|| {
            let filter = if std::env::var("DEBUG").map(|v| is_truthy(&v)).unwrap_or(false) {
                "debug"
            } else {
                "info"
            };
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .try_init();
        });
        let debug_enabled = std::env::var("DEBUG").map(|v| is_truthy(&v)).unwrap_or(false);
        Self { debug_enabled }
    }
}

fn is_truthy(v: &str) -> bool {
    !v.is_empty() && !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no")
}

impl Logger for DefaultLogger {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, err: &CliError) {
        tracing::error!("{err}");
        if self.debug_enabled && err.is_internal() {
            tracing::error!("  caused by: {err:?}");
        }
    }

    fn debug(&self, message: &str) {
        if self.debug_enabled {
            tracing::debug!("{message}");
        }
    }
}
