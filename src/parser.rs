//! The Argument Parser (§4.2): a hand-written lexer/state-machine that turns
//! an argv into an [`Args`] record, type-resolving each flag against the
//! registry. Deliberately avoids regex, per §9's guidance that a hand-written
//! lexer is clearer and better tested than a regex-driven one.

use crate::error::{CliError, Result};
use crate::model::{Args, Command};
use crate::registry::CommandRegistry;
use crate::value::{self, FlagValue, OptionType};
use std::collections::HashMap;

/// Stateless: parsing never mutates the registry, only reads option
/// declarations from it.
pub struct Parser;

impl Parser {
    /// Parse `argv` (excluding the program name) into an [`Args`] record.
    pub fn parse(argv: &[String], registry: &CommandRegistry) -> Result<Args> {
        let mut command = Vec::new();
        let mut flags = HashMap::new();
        let mut iter = argv.iter().peekable();

        while let Some(tok) = iter.next() {
            if let Some(rest) = tok.strip_prefix("--") {
                if rest.is_empty() {
                    // bare "--" is positional
                    command.push(tok.clone());
                    continue;
                }
                Self::parse_long(rest, &mut iter, registry, &mut flags)?;
            } else if tok.starts_with('-') && tok.len() > 1 {
                Self::parse_short_group(&tok[1..], &mut iter, registry, &mut flags)?;
            } else {
                command.push(tok.clone());
            }
        }

        Ok(Args { command, flags })
    }

    fn parse_long<'a, I>(
        rest: &str,
        iter: &mut std::iter::Peekable<I>,
        registry: &CommandRegistry,
        flags: &mut HashMap<String, FlagValue>,
    ) -> Result<()>
    where
        I: Iterator<Item = &'a String>,
    {
        if let Some((key, value)) = rest.split_once('=') {
            let option_type = resolve_type(registry, key);
            let coerced = value::coerce(key, option_type, value)?;
            flags.insert(key.to_string(), coerced);
            return Ok(());
        }

        let key = rest;
        let option_type = resolve_type(registry, key);
        let takes_adjacent_value = iter.peek().is_some_and(|next| !is_flag_token(next));

        if option_type == OptionType::Boolean {
            if takes_adjacent_value {
                // A boolean flag followed by a bare word still coerces that word.
                let raw = iter.next().unwrap();
                let coerced = value::coerce(key, option_type, raw)?;
                flags.insert(key.to_string(), coerced);
            } else {
                flags.insert(key.to_string(), FlagValue::Boolean(true));
            }
            return Ok(());
        }

        if takes_adjacent_value {
            let raw = iter.next().unwrap();
            let coerced = value::coerce(key, option_type, raw)?;
            flags.insert(key.to_string(), coerced);
        } else {
            // No '=', no following non-flag token: preserved boolean-default
            // fallback per §4.2/§9, even for non-boolean declared types.
            flags.insert(key.to_string(), FlagValue::Boolean(true));
        }
        Ok(())
    }

    fn parse_short_group<'a, I>(
        letters: &str,
        iter: &mut std::iter::Peekable<I>,
        registry: &CommandRegistry,
        flags: &mut HashMap<String, FlagValue>,
    ) -> Result<()>
    where
        I: Iterator<Item = &'a String>,
    {
        let chars: Vec<char> = letters.chars().collect();
        for (i, ch) in chars.iter().enumerate() {
            let key = ch.to_string();
            let option_type = resolve_type(registry, &key);
            let is_last = i == chars.len() - 1;

            if option_type == OptionType::Boolean {
                flags.insert(key, FlagValue::Boolean(true));
                continue;
            }

            if !is_last {
                // A non-boolean letter must be last in the group to consume a value.
                return Err(CliError::MissingFlag {
                    flag: key,
                    expected_type: option_type.to_string(),
                });
            }

            match iter.peek() {
                Some(next) if !is_flag_token(next) => {
                    let raw = iter.next().unwrap();
                    let coerced = value::coerce(&key, option_type, raw)?;
                    flags.insert(key, coerced);
                }
                _ => {
                    return Err(CliError::MissingFlag {
                        flag: key,
                        expected_type: option_type.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn is_flag_token(tok: &str) -> bool {
    tok.starts_with('-') && tok.len() > 1
}

/// Walk every command and subcommand in the registry looking for the first
/// declared option whose name or alias matches `key`. Defaults to `String`.
fn resolve_type(registry: &CommandRegistry, key: &str) -> OptionType {
    fn search(cmd: &Command, key: &str) -> Option<OptionType> {
        if let Some(opt) = cmd.find_option(key) {
            return Some(opt.option_type);
        }
        for child in &cmd.subcommands {
            if let Some(t) = search(child, key) {
                return Some(t);
            }
        }
        None
    }

    for cmd in registry.commands() {
        if let Some(t) = search(cmd, key) {
            return t;
        }
    }
    OptionType::String
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Command, CommandOption};

    fn registry_with_greet() -> CommandRegistry {
        let mut reg = CommandRegistry::new();
        reg.register(
            Command::new("greet")
                .option(CommandOption::new("name").kind(OptionType::String))
                .action(|_, _| Ok(())),
        )
        .unwrap();
        reg
    }

    #[test]
    fn basic_parse_scenario() {
        let reg = registry_with_greet();
        let argv = vec!["greet".to_string(), "--name=Alice".to_string(), "-v".to_string()];
        let args = Parser::parse(&argv, &reg).unwrap();
        assert_eq!(args.command, vec!["greet".to_string()]);
        assert_eq!(args.flags.get("name"), Some(&FlagValue::String("Alice".to_string())));
        assert_eq!(args.flags.get("v"), Some(&FlagValue::Boolean(true)));
    }

    #[test]
    fn subcommand_resolution_scenario() {
        let mut reg = CommandRegistry::new();
        reg.register(
            Command::new("user").subcommand(
                Command::new("add")
                    .option(CommandOption::new("name").kind(OptionType::String))
                    .action(|_, _| Ok(())),
            ),
        )
        .unwrap();
        let argv = vec!["user".to_string(), "add".to_string(), "--name=Charlie".to_string()];
        let args = Parser::parse(&argv, &reg).unwrap();
        assert_eq!(args.command, vec!["user".to_string(), "add".to_string()]);
        assert_eq!(args.flags.get("name"), Some(&FlagValue::String("Charlie".to_string())));
    }

    #[test]
    fn grouped_short_flag_failure_scenario() {
        let mut reg = CommandRegistry::new();
        reg.register(
            Command::new("cmd")
                .option(CommandOption::new("a").kind(OptionType::String))
                .action(|_, _| Ok(())),
        )
        .unwrap();
        let argv = vec!["cmd".to_string(), "-abc".to_string()];
        let err = Parser::parse(&argv, &reg).unwrap_err();
        match err {
            CliError::MissingFlag { flag, expected_type } => {
                assert_eq!(flag, "a");
                assert_eq!(expected_type, "string");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn number_coercion_failure_scenario() {
        let mut reg = CommandRegistry::new();
        reg.register(
            Command::new("cmd")
                .option(CommandOption::new("a").kind(OptionType::String))
                .option(CommandOption::new("c").kind(OptionType::Number))
                .action(|_, _| Ok(())),
        )
        .unwrap();
        let argv = vec![
            "cmd".to_string(),
            "-a".to_string(),
            "value".to_string(),
            "-c".to_string(),
            "not-a-number".to_string(),
        ];
        let err = Parser::parse(&argv, &reg).unwrap_err();
        match err {
            CliError::InvalidFlagValue { flag, expected_type, raw_value } => {
                assert_eq!(flag, "c");
                assert_eq!(expected_type, "number");
                assert_eq!(raw_value, "not-a-number");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn positional_order_is_preserved() {
        let reg = CommandRegistry::new();
        let argv = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let args = Parser::parse(&argv, &reg).unwrap();
        assert_eq!(args.command, argv);
    }

    #[test]
    fn equals_form_wins_over_adjacent_token() {
        let reg = registry_with_greet();
        let argv = vec!["greet".to_string(), "--name=Bob".to_string(), "extra".to_string()];
        let args = Parser::parse(&argv, &reg).unwrap();
        assert_eq!(args.flags.get("name"), Some(&FlagValue::String("Bob".to_string())));
        assert_eq!(args.command, vec!["greet".to_string(), "extra".to_string()]);
    }

    #[test]
    fn lone_dashes_are_positional() {
        let reg = CommandRegistry::new();
        let argv = vec!["-".to_string(), "--".to_string()];
        let args = Parser::parse(&argv, &reg).unwrap();
        assert_eq!(args.command, vec!["-".to_string(), "--".to_string()]);
    }
}
