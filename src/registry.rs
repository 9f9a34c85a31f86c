//! The Command Registry (§4.1): in-memory storage and name/alias/subcommand
//! resolution over the [`Command`] tree.

use crate::error::{CliError, Result};
use crate::model::Command;

/// Owns every registered top-level [`Command`] and resolves invocations
/// against them. Mutation (`register`/`remove`) is the host's responsibility
/// to serialise; see §5.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { commands: Vec::new() }
    }

    /// Validate `cmd` and every descendant, then insert it as a top-level
    /// command.
    ///
    /// # Errors
    /// `InvalidDefinition` if structural invariants are violated;
    /// `DuplicateCommand` if `cmd`'s name or any alias collides with an
    /// existing top-level command's name or alias.
    pub fn register(&mut self, cmd: Command) -> Result<()> {
        cmd.validate_definition()?;
        let mut candidates = vec![cmd.name.to_ascii_lowercase()];
        candidates.extend(cmd.aliases.iter().map(|a| a.to_ascii_lowercase()));
        for existing in &self.commands {
            let mut existing_tokens = vec![existing.name.to_ascii_lowercase()];
            existing_tokens.extend(existing.aliases.iter().map(|a| a.to_ascii_lowercase()));
            if candidates.iter().any(|c| existing_tokens.contains(c)) {
                return Err(CliError::DuplicateCommand { name: cmd.name.clone() });
            }
        }
        self.commands.push(cmd);
        Ok(())
    }

    /// Remove a top-level command by name or alias, case-insensitively.
    /// Idempotent: returns `false` (never errors) if nothing matched.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.commands.len();
        self.commands.retain(|c| {
            !(c.name.eq_ignore_ascii_case(name)
                || c.aliases.iter().any(|a| a.eq_ignore_ascii_case(name)))
        });
        self.commands.len() != before
    }

    /// Look up a top-level command by name or alias.
    pub fn find_command(&self, name_or_alias: &str) -> Option<&Command> {
        self.commands.iter().find(|c| {
            c.name.eq_ignore_ascii_case(name_or_alias)
                || c.aliases.iter().any(|a| a.eq_ignore_ascii_case(name_or_alias))
        })
    }

    /// Walk `path_tokens` from `parent`, greedily matching each token against
    /// a child's name or alias. Stops at the first non-matching token,
    /// returning the deepest command reached and the unconsumed tail of
    /// `path_tokens` (inclusive of the token that failed to match, if any).
    pub fn find_subcommand<'a, 'b>(
        &self,
        parent: &'a Command,
        path_tokens: &'b [String],
    ) -> (&'a Command, &'b [String]) {
        let mut current = parent;
        let mut idx = 0;
        while idx < path_tokens.len() {
            match current.find_child(&path_tokens[idx]) {
                Some(child) => {
                    current = child;
                    idx += 1;
                }
                None => break,
            }
        }
        (current, &path_tokens[idx..])
    }

    /// All registered top-level commands, in registration order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Remove every command attributed to `plugin_name` (including nested
    /// subcommands registered by the plugin). Used by the plugin manager on
    /// unload.
    pub fn remove_by_provenance(&mut self, plugin_name: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.commands.retain(|c| {
            if c.provenance.as_deref() == Some(plugin_name) {
                removed.push(c.name.clone());
                false
            } else {
                true
            }
        });
        removed
    }
}
