//! Error taxonomy for the framework.
//!
//! Every variant carries the structured fields a host can use to build its own
//! user-facing message; the default [`crate::logger::Logger`] formats each kind
//! into a single human-friendly line.

use thiserror::Error;

/// Errors produced by the registry, parser, dispatcher, plugin manager, and
/// pipeline evaluator.
#[derive(Error, Debug)]
pub enum CliError {
    /// No top-level command resolves.
    #[error("command not found: {name}")]
    CommandNotFound {
        /// The unresolved root token.
        name: String,
    },

    /// A subcommand path fails to resolve.
    #[error("no subcommand '{token}' under '{parent}'")]
    SubcommandNotFound {
        /// The parent command's name.
        parent: String,
        /// The token that failed to match any child.
        token: String,
    },

    /// A required flag is absent, or a short-flag value is missing.
    #[error("missing required flag --{flag} ({expected_type})")]
    MissingFlag {
        /// The flag name or alias.
        flag: String,
        /// The declared (or default) type.
        expected_type: String,
    },

    /// A flag's raw token could not be coerced to its declared type.
    #[error("invalid value '{raw_value}' for --{flag}: expected {expected_type}")]
    InvalidFlagValue {
        /// The flag name or alias.
        flag: String,
        /// The declared type.
        expected_type: String,
        /// The raw token that failed to coerce.
        raw_value: String,
    },

    /// A per-flag, per-positional, or cross-cutting validator rejected input.
    #[error("validation failed for {which}: {reason}")]
    ValidationFailed {
        /// What was being validated (a flag name, "positional", or a cross-cutting rule name).
        which: String,
        /// Why it failed.
        reason: String,
    },

    /// The host environment did not grant a capability the command requires.
    #[error("permission denied: missing capability '{capability}'")]
    PermissionDenied {
        /// The missing capability token.
        capability: String,
    },

    /// Registration collided with an existing top-level command.
    #[error("duplicate command: {name}")]
    DuplicateCommand {
        /// The colliding name or alias.
        name: String,
    },

    /// A command definition is structurally invalid.
    #[error("invalid command definition: {reason}")]
    InvalidDefinition {
        /// What about the definition is invalid.
        reason: String,
    },

    /// A plugin with the same name is already active.
    #[error("plugin already active: {name}")]
    DuplicatePlugin {
        /// The plugin name.
        name: String,
    },

    /// A plugin dependency is not active.
    #[error("plugin '{plugin}' requires '{dependency}', which is not active")]
    MissingDependency {
        /// The dependent plugin.
        plugin: String,
        /// The missing dependency.
        dependency: String,
    },

    /// A plugin artifact's digest did not match the expected integrity hash.
    #[error("integrity check failed for {artifact}")]
    IntegrityViolation {
        /// The artifact path or identifier.
        artifact: String,
    },

    /// An unload target is not active.
    #[error("no active plugin named '{name}'")]
    UnknownPlugin {
        /// The requested plugin name.
        name: String,
    },

    /// A pipeline failed to parse.
    #[error("invalid pipeline: {reason}")]
    InvalidPipeline {
        /// Why the pipeline is invalid.
        reason: String,
    },

    /// A `.`-prefixed pipeline stage named an operator outside the fixed set.
    #[error("unknown pipeline operator: .{name}")]
    UnknownOperator {
        /// The unrecognised operator name.
        name: String,
    },

    /// A lifecycle hook, middleware, or action raised an error not covered above.
    #[error("{0}")]
    Action(String),

    /// Failure reading or writing the history journal, a plugin manifest, or
    /// another filesystem-backed resource.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    /// True for errors that should print a stack trace under `DEBUG`.
    pub fn is_internal(&self) -> bool {
        matches!(self, CliError::Action(_) | CliError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_flag_message_includes_fields() {
        let err = CliError::MissingFlag { flag: "name".into(), expected_type: "string".into() };
        assert_eq!(err.to_string(), "missing required flag --name (string)");
    }

    #[test]
    fn invalid_flag_value_message_includes_fields() {
        let err = CliError::InvalidFlagValue {
            flag: "c".into(),
            expected_type: "number".into(),
            raw_value: "not-a-number".into(),
        };
        assert_eq!(err.to_string(), "invalid value 'not-a-number' for --c: expected number");
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CliError = io_err.into();
        assert!(matches!(err, CliError::Io(_)));
    }
}
