//! stega — a reusable command-line framework.
//!
//! A host program declares a tree of commands, options, and subcommands
//! against a [`registry::CommandRegistry`]; argument vectors are parsed into
//! typed [`model::Args`] by [`parser::Parser`]; dispatch runs through a
//! [`middleware::MiddlewareChain`] and per-command lifecycle hooks via
//! [`dispatcher::Cli`]. The framework extends itself at runtime through
//! [`plugin::PluginManager`], and offers an interactive
//! [`repl::Repl`] backed by a persisted [`history::HistoryStore`] and a
//! [`pipeline`] evaluator for `cmd | .op | cmd` composition.
//!
//! ```
//! use stega::dispatcher::Cli;
//! use stega::logger::DefaultLogger;
//! use stega::model::Command;
//!
//! let mut cli = Cli::new(Box::new(DefaultLogger::new()));
//! cli.registry
//!     .register(Command::new("greet").action(|_, _| {
//!         println!("hello");
//!         Ok(())
//!     }))
//!     .unwrap();
//! cli.run_command(&["greet".to_string()]).unwrap();
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod logger;
pub mod middleware;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod plugin;
pub mod registry;
pub mod repl;
pub mod value;

pub use config::{CliConfig, ConfigLoader};
pub use dispatcher::Cli;
pub use error::{CliError, Result};
pub use history::HistoryStore;
pub use logger::DefaultLogger;
pub use model::{Args, Command, CommandOption, Context};
pub use pipeline::{evaluate as evaluate_pipeline, parse as parse_pipeline};
pub use plugin::{Plugin, PluginManager, PluginMetadata};
pub use registry::CommandRegistry;
pub use repl::{ExitReason, Repl};
pub use value::{FlagValue, OptionType};
