//! The Command Dispatcher (§4.3): resolves a parsed [`Args`] against the
//! registry and runs it through defaults, validation, middleware, and
//! lifecycle hooks.

use crate::error::{CliError, Result};
use crate::logger::Logger;
use crate::middleware::MiddlewareChain;
use crate::model::{Args, Command, Context};
use crate::parser::Parser;
use crate::registry::CommandRegistry;
use crate::value::FlagValue;
use std::collections::HashSet;

/// Ties together a registry, middleware chain, granted capabilities, and
/// logger into a single entry point for running an argv.
pub struct Cli {
    pub registry: CommandRegistry,
    pub middleware: MiddlewareChain,
    pub granted: HashSet<String>,
    pub logger: Box<dyn Logger>,
    pub translate: Box<dyn Fn(&str, &[(&str, &str)]) -> String + Send + Sync>,
}

impl Cli {
    /// Build a `Cli` with an empty registry, no middleware, no granted
    /// capabilities, and a default, pass-through translator.
    pub fn new(logger: Box<dyn Logger>) -> Self {
        Self {
            registry: CommandRegistry::new(),
            middleware: MiddlewareChain::new(),
            granted: HashSet::new(),
            logger,
            translate: Box::new(|key, vars| {
                let mut out = key.to_string();
                for (k, v) in vars {
                    out = out.replace(&format!("{{{k}}}"), v);
                }
                out
            }),
        }
    }

    /// Grant a capability token, unlocking commands that require it.
    pub fn grant(&mut self, capability: impl Into<String>) -> &mut Self {
        self.granted.insert(capability.into());
        self
    }

    /// Parse and run `argv` (excluding the program name) end to end.
    ///
    /// Implements the nine-step dispatch algorithm: parse, resolve, existence
    /// check, permission check, default application, required-flag check,
    /// validation, middleware chain, and lifecycle-wrapped action execution.
    pub fn run_command(&self, argv: &[String]) -> Result<()> {
        self.dispatch(argv, None, None)
    }

    /// Like [`Self::run_command`], but routes the action's
    /// [`Context::emit`] output into a returned string instead of stdout,
    /// for use by [`crate::pipeline`].
    pub fn run_command_capturing(&self, argv: &[String]) -> Result<String> {
        self.run_command_capturing_with_input(argv, None)
    }

    /// Like [`Self::run_command_capturing`], but also exposes `input` to the
    /// action as [`Context::input`] — the previous [`crate::pipeline`]
    /// stage's output, rather than splicing it into `argv` as a positional.
    pub fn run_command_capturing_with_input(&self, argv: &[String], input: Option<&str>) -> Result<String> {
        let buffer = std::cell::RefCell::new(String::new());
        self.dispatch(argv, Some(&buffer), input)?;
        Ok(buffer.into_inner())
    }

    fn dispatch(
        &self,
        argv: &[String],
        output: Option<&std::cell::RefCell<String>>,
        input: Option<&str>,
    ) -> Result<()> {
        // 1. Parse.
        let mut args = Parser::parse(argv, &self.registry)?;

        // 2. Resolve the deepest matching command.
        let root_name = args.command.first().cloned().ok_or_else(|| CliError::CommandNotFound {
            name: String::new(),
        })?;
        let root = self.registry.find_command(&root_name).ok_or_else(|| CliError::CommandNotFound {
            name: root_name.clone(),
        })?;
        let (cmd, rest) = self.registry.find_subcommand(root, &args.command[1..]);

        // 3. If remaining tokens exist but don't match anything and the
        // resolved command has subcommands, the next token is unresolved.
        if !rest.is_empty() && !cmd.subcommands.is_empty() && cmd.action.is_none() {
            return Err(CliError::SubcommandNotFound {
                parent: cmd.name.clone(),
                token: rest[0].clone(),
            });
        }
        if cmd.action.is_none() {
            return Err(CliError::CommandNotFound { name: cmd.name.clone() });
        }

        let consumed = args.command.len() - rest.len();
        let mut trailing = rest.to_vec();
        args.command = args.command[..consumed].to_vec();
        args.command.append(&mut trailing);

        let context = Context {
            registry: &self.registry,
            granted: &self.granted,
            logger: self.logger.as_ref(),
            translate: self.translate.as_ref(),
            output,
            input,
        };

        // 4. Permission check.
        for capability in &cmd.permissions {
            if !self.granted.contains(capability) {
                let err = CliError::PermissionDenied { capability: capability.clone() };
                self.logger.error(&err);
                return Err(err);
            }
        }

        // 5. Apply declared defaults for absent, non-required flags.
        for opt in &cmd.options {
            if !flag_supplied(opt, &args.flags) {
                if let Some(default) = &opt.default {
                    args.flags.insert(opt.name.clone(), default.clone());
                }
            }
        }

        // 6. Required-flag check.
        for opt in &cmd.options {
            if opt.required && !flag_supplied(opt, &args.flags) {
                let err = CliError::MissingFlag {
                    flag: opt.name.clone(),
                    expected_type: opt.option_type.to_string(),
                };
                self.logger.error(&err);
                return Err(err);
            }
        }

        // 7. Validation: per-flag, per-positional, then cross-cutting.
        if let Err(err) = run_validation(cmd, &args, &context) {
            self.logger.error(&err);
            return Err(err);
        }

        // 8 & 9. Middleware chain wraps lifecycle-guarded action execution.
        let result = self.middleware.run(&mut args, &context, &|args, ctx| {
            run_lifecycle(cmd, args, ctx)
        });

        if let Err(err) = &result {
            self.logger.error(err);
        }
        result
    }
}

/// True if `flags` carries a value under `opt`'s canonical name or its
/// alias — the parser keys `Args.flags` by whichever literal token the user
/// typed, not by the option's canonical name (§3).
fn flag_supplied(opt: &crate::model::CommandOption, flags: &std::collections::HashMap<String, FlagValue>) -> bool {
    flags.contains_key(&opt.name) || opt.alias.as_deref().is_some_and(|a| flags.contains_key(a))
}

fn run_validation(cmd: &Command, args: &Args, ctx: &Context<'_>) -> Result<()> {
    for (name, validator) in &cmd.validation.flags {
        if let Some(value) = args.flags.get(name) {
            validator(value).map_err(|e| wrap_validation(name, e))?;
        }
    }
    let positionals = args.positionals(1);
    for (index, validator) in &cmd.validation.positionals {
        if let Some(value) = positionals.get(*index) {
            validator(value).map_err(|e| wrap_validation(&format!("positional[{index}]"), e))?;
        }
    }
    for validator in &cmd.validation.cross_cutting {
        validator(args, ctx)?;
    }
    Ok(())
}

fn wrap_validation(which: &str, err: CliError) -> CliError {
    match err {
        CliError::ValidationFailed { .. } => err,
        other => CliError::ValidationFailed { which: which.to_string(), reason: other.to_string() },
    }
}

fn run_lifecycle(cmd: &Command, args: &Args, ctx: &Context<'_>) -> Result<()> {
    let result = (|| {
        if let Some(before) = &cmd.lifecycle.before_execute {
            before(args, ctx)?;
        }
        let action = cmd.action.as_ref().expect("resolved command always has an action");
        action(args, ctx)?;
        if let Some(after) = &cmd.lifecycle.after_execute {
            after(args, ctx)?;
        }
        Ok(())
    })();

    let result = match result {
        Err(err) => {
            if let Some(on_error) = &cmd.lifecycle.on_error {
                on_error(&err, args, ctx)
            } else {
                Err(err)
            }
        }
        ok => ok,
    };

    if let Some(cleanup) = &cmd.lifecycle.cleanup {
        cleanup(args, ctx);
    }

    result
}
