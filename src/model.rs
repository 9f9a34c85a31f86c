//! Command tree data model: options, commands, invocation records, and the
//! context handed to actions and middleware.

use crate::error::{CliError, Result};
use crate::logger::Logger;
use crate::registry::CommandRegistry;
use crate::value::{FlagValue, OptionType};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A declared parameter of a [`Command`].
#[derive(Clone)]
pub struct CommandOption {
    /// Unique name within the owning command.
    pub name: String,
    /// Optional single-token alternative name.
    pub alias: Option<String>,
    /// Declared type, used by the parser for coercion.
    pub option_type: OptionType,
    /// Whether the dispatcher must reject invocations missing this option.
    pub required: bool,
    /// Value inserted by the dispatcher when absent and not required.
    pub default: Option<FlagValue>,
    /// Human-readable description, surfaced by help/REPL completion.
    pub description: String,
}

impl fmt::Debug for CommandOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandOption")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("option_type", &self.option_type)
            .field("required", &self.required)
            .finish()
    }
}

impl CommandOption {
    /// Start building a required-by-default, string-typed option.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            option_type: OptionType::String,
            required: false,
            default: None,
            description: String::new(),
        }
    }

    /// Set the alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the declared type.
    pub fn kind(mut self, option_type: OptionType) -> Self {
        self.option_type = option_type;
        self
    }

    /// Mark as required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set a default value, applied by the dispatcher when the flag is absent.
    pub fn default(mut self, value: FlagValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// True if `candidate` matches this option's name or alias, case-insensitively.
    pub fn matches(&self, candidate: &str) -> bool {
        self.name.eq_ignore_ascii_case(candidate)
            || self.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(candidate))
    }
}

/// The resolved invocation record produced by the parser and consumed by the
/// dispatcher. Discarded once dispatch completes.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Resolved command path, root first, followed by unconsumed positionals.
    pub command: Vec<String>,
    /// Flag values keyed by the name or alias used at parse time.
    pub flags: HashMap<String, FlagValue>,
}

impl Args {
    /// Positional tokens beyond the resolved command path.
    pub fn positionals<'a>(&'a self, consumed: usize) -> &'a [String] {
        if consumed >= self.command.len() {
            &[]
        } else {
            &self.command[consumed..]
        }
    }
}

/// Host services exposed to actions, middleware, and lifecycle hooks. Kept
/// separate from [`Args`] so actions never hold a cyclic reference back to the
/// owning framework instance.
pub struct Context<'a> {
    /// The live command registry, for introspection (e.g. a `help` action).
    pub registry: &'a CommandRegistry,
    /// Capability tokens the host environment has granted.
    pub granted: &'a HashSet<String>,
    /// The active logger.
    pub logger: &'a dyn Logger,
    /// Localisation lookup; `vars` are `(key, value)` substitution pairs.
    pub translate: &'a dyn Fn(&str, &[(&str, &str)]) -> String,
    /// Captures an action's textual output for pipeline threading (§4.6).
    /// `None` outside of a pipeline stage; actions fall back to stdout then.
    pub output: Option<&'a std::cell::RefCell<String>>,
    /// The upstream pipeline stage's output, when this dispatch is running as
    /// a non-first `PipelineStage` (§3, §4.6). `None` outside of a pipeline,
    /// or for a pipeline's first stage.
    pub input: Option<&'a str>,
}

impl<'a> Context<'a> {
    /// Localise a key, substituting `vars` into the returned template.
    pub fn t(&self, key: &str, vars: &[(&str, &str)]) -> String {
        (self.translate)(key, vars)
    }

    /// Emit `text` as this action's output: appended to the pipeline capture
    /// buffer if present, otherwise printed to stdout.
    pub fn emit(&self, text: &str) {
        match self.output {
            Some(buf) => buf.borrow_mut().push_str(text),
            None => println!("{text}"),
        }
    }
}

/// An executable command body.
pub type Action = Box<dyn Fn(&Args, &Context<'_>) -> Result<()> + Send + Sync>;

/// Lifecycle interceptors run once per dispatch, around the action.
#[derive(Default)]
pub struct Lifecycle {
    /// Runs immediately before the action.
    pub before_execute: Option<Box<dyn Fn(&Args, &Context<'_>) -> Result<()> + Send + Sync>>,
    /// Runs immediately after a successful action.
    pub after_execute: Option<Box<dyn Fn(&Args, &Context<'_>) -> Result<()> + Send + Sync>>,
    /// Runs if the action, `before_execute`, or a middleware raised.
    pub on_error: Option<Box<dyn Fn(&CliError, &Args, &Context<'_>) -> Result<()> + Send + Sync>>,
    /// Always runs (if declared), regardless of success or failure.
    pub cleanup: Option<Box<dyn Fn(&Args, &Context<'_>) + Send + Sync>>,
}

/// A single validator over the fully-resolved `Args`.
pub type CrossCuttingValidator = Box<dyn Fn(&Args, &Context<'_>) -> Result<()> + Send + Sync>;

/// Per-flag and per-positional validators, plus cross-cutting rules over the
/// whole invocation.
#[derive(Default)]
pub struct Validation {
    /// Keyed by flag name; runs after type coercion.
    pub flags: HashMap<String, Box<dyn Fn(&FlagValue) -> Result<()> + Send + Sync>>,
    /// Indexed by position within the trailing positional slice.
    pub positionals: HashMap<usize, Box<dyn Fn(&str) -> Result<()> + Send + Sync>>,
    /// Run last, in registration order, over the whole `Args`.
    pub cross_cutting: Vec<CrossCuttingValidator>,
}

/// A node in the command tree.
pub struct Command {
    /// Unique name among sibling commands.
    pub name: String,
    /// Human-readable summary.
    pub description: String,
    /// Alternative names, unique among siblings' names and aliases.
    pub aliases: Vec<String>,
    /// Free-form grouping label.
    pub category: Option<String>,
    /// Capability tokens the host must have granted to run this command.
    pub permissions: HashSet<String>,
    /// Declared options, checked for name/alias uniqueness at construction.
    pub options: Vec<CommandOption>,
    /// Child commands, resolved by [`CommandRegistry::find_subcommand`].
    pub subcommands: Vec<Command>,
    /// The command body; required unless `subcommands` is non-empty.
    pub action: Option<Action>,
    /// Lifecycle hooks.
    pub lifecycle: Lifecycle,
    /// Flag/positional/cross-cutting validators.
    pub validation: Validation,
    /// The plugin that registered this command, if any; used for unload cleanup.
    pub provenance: Option<String>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("options", &self.options)
            .field("subcommands", &self.subcommands.iter().map(|c| &c.name).collect::<Vec<_>>())
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

impl Command {
    /// Start building a leaf command named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            aliases: Vec::new(),
            category: None,
            permissions: HashSet::new(),
            options: Vec::new(),
            subcommands: Vec::new(),
            action: None,
            lifecycle: Lifecycle::default(),
            validation: Validation::default(),
            provenance: None,
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Set the category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Require a capability token.
    pub fn permission(mut self, capability: impl Into<String>) -> Self {
        self.permissions.insert(capability.into());
        self
    }

    /// Add a declared option.
    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// Add a child command.
    pub fn subcommand(mut self, command: Command) -> Self {
        self.subcommands.push(command);
        self
    }

    /// Set the action body.
    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&Args, &Context<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Find a declared option by name or alias, case-insensitively.
    pub fn find_option(&self, candidate: &str) -> Option<&CommandOption> {
        self.options.iter().find(|o| o.matches(candidate))
    }

    /// Find a child by name or alias, case-insensitively.
    pub fn find_child(&self, token: &str) -> Option<&Command> {
        self.subcommands.iter().find(|c| {
            c.name.eq_ignore_ascii_case(token)
                || c.aliases.iter().any(|a| a.eq_ignore_ascii_case(token))
        })
    }

    /// Validate structural invariants: non-empty unique-enough name, no
    /// option name/alias collisions, and an action present unless the command
    /// has subcommands.
    pub fn validate_definition(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CliError::InvalidDefinition { reason: "command name is empty".into() });
        }
        if self.action.is_none() && self.subcommands.is_empty() {
            return Err(CliError::InvalidDefinition {
                reason: format!("command '{}' has neither an action nor subcommands", self.name),
            });
        }
        let mut seen: Vec<String> = Vec::new();
        for opt in &self.options {
            if opt.name.trim().is_empty() {
                return Err(CliError::InvalidDefinition {
                    reason: format!("command '{}' declares an option with an empty name", self.name),
                });
            }
            let mut tokens = vec![opt.name.to_ascii_lowercase()];
            if let Some(alias) = &opt.alias {
                tokens.push(alias.to_ascii_lowercase());
            }
            for token in tokens {
                if seen.contains(&token) {
                    return Err(CliError::InvalidDefinition {
                        reason: format!(
                            "command '{}' has a duplicate option name/alias '{}'",
                            self.name, token
                        ),
                    });
                }
                seen.push(token);
            }
        }
        for child in &self.subcommands {
            child.validate_definition()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_without_action_is_invalid() {
        let cmd = Command::new("broken");
        assert!(cmd.validate_definition().is_err());
    }

    #[test]
    fn parent_without_own_action_is_valid() {
        let cmd = Command::new("parent")
            .subcommand(Command::new("child").action(|_, _| Ok(())));
        assert!(cmd.validate_definition().is_ok());
    }

    #[test]
    fn duplicate_option_alias_is_invalid() {
        let cmd = Command::new("cmd")
            .option(CommandOption::new("verbose").alias("v"))
            .option(CommandOption::new("version").alias("v"))
            .action(|_, _| Ok(()));
        assert!(cmd.validate_definition().is_err());
    }

    #[test]
    fn option_matches_is_case_insensitive() {
        let opt = CommandOption::new("Name").alias("N");
        assert!(opt.matches("name"));
        assert!(opt.matches("n"));
        assert!(!opt.matches("other"));
    }
}
