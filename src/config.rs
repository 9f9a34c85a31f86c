//! Host-tunable framework settings, loadable from TOML/YAML/JSON.
//!
//! This is an ambient concern, not part of the core dispatch path: a host
//! program may construct [`CliConfig`] however it likes and feed its fields
//! into [`crate::history::HistoryStore`] and [`crate::dispatcher::Cli`]
//! directly. [`ConfigLoader`] merely spares hosts from hand-rolling
//! per-format parsing.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Framework-level settings a host may tune without recompiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Where the history journal is persisted.
    pub history_path: PathBuf,
    /// FIFO cap on stored history entries.
    pub max_history_entries: usize,
    /// REPL idle timeout, in milliseconds; `0` disables the timeout.
    pub idle_timeout_ms: u64,
    /// Command names never recorded to history, matched case-insensitively.
    pub excluded_commands: Vec<String>,
    /// Capability tokens granted to the host at startup.
    pub granted_capabilities: Vec<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from(".stega/history.json"),
            max_history_entries: 1000,
            idle_timeout_ms: 0,
            excluded_commands: Vec::new(),
            granted_capabilities: Vec::new(),
        }
    }
}

impl CliConfig {
    /// The history path resolved against `cwd`, matching §6's
    /// `<cwd>/.stega/history.json` default when unconfigured.
    pub fn resolved_history_path(&self, cwd: &Path) -> PathBuf {
        if self.history_path.is_absolute() {
            self.history_path.clone()
        } else {
            cwd.join(&self.history_path)
        }
    }
}

/// Locates and parses a [`CliConfig`] from one of several candidate paths,
/// or an explicitly-set one.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    default_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// A loader that searches the conventional default paths.
    pub fn new() -> Self {
        Self {
            path: None,
            default_paths: vec![
                PathBuf::from("stega.toml"),
                PathBuf::from("stega.yaml"),
                PathBuf::from("stega.yml"),
                PathBuf::from("stega.json"),
            ],
        }
    }

    /// Restrict the search to exactly this path.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add another path to the default search list.
    pub fn with_default_path(mut self, path: impl AsRef<Path>) -> Self {
        self.default_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Load from the explicit path, or the first existing default path.
    ///
    /// # Errors
    /// `InvalidDefinition` if no candidate path exists, or the file fails to
    /// parse under its extension's format.
    pub fn load(&self) -> Result<CliConfig> {
        let path = match &self.path {
            Some(p) => p.clone(),
            None => self
                .default_paths
                .iter()
                .find(|p| p.exists())
                .cloned()
                .ok_or_else(|| CliError::InvalidDefinition {
                    reason: "no configuration file found".to_string(),
                })?,
        };
        Self::load_from(&path)
    }

    /// Load, falling back to [`CliConfig::default`] if nothing is found or
    /// parsing fails.
    pub fn load_optional(&self) -> CliConfig {
        self.load().unwrap_or_default()
    }

    fn load_from(path: &Path) -> Result<CliConfig> {
        let content = std::fs::read_to_string(path)?;
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
        let config = match extension {
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| CliError::InvalidDefinition {
                reason: format!("failed to parse YAML config: {e}"),
            })?,
            "toml" => toml::from_str(&content).map_err(|e| CliError::InvalidDefinition {
                reason: format!("failed to parse TOML config: {e}"),
            })?,
            _ => serde_json::from_str(&content).map_err(|e| CliError::InvalidDefinition {
                reason: format!("failed to parse JSON config: {e}"),
            })?,
        };
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_matches_spec_history_path() {
        let config = CliConfig::default();
        assert_eq!(config.history_path, PathBuf::from(".stega/history.json"));
        assert_eq!(config.max_history_entries, 1000);
    }

    #[test]
    fn resolved_history_path_joins_relative_against_cwd() {
        let config = CliConfig::default();
        let cwd = Path::new("/srv/app");
        assert_eq!(config.resolved_history_path(cwd), PathBuf::from("/srv/app/.stega/history.json"));
    }

    #[test]
    fn resolved_history_path_keeps_absolute_unchanged() {
        let mut config = CliConfig::default();
        config.history_path = PathBuf::from("/var/lib/stega/history.json");
        let cwd = Path::new("/srv/app");
        assert_eq!(config.resolved_history_path(cwd), PathBuf::from("/var/lib/stega/history.json"));
    }

    #[test]
    fn load_parses_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stega.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "max_history_entries = 42\nidle_timeout_ms = 5000").unwrap();
        let config = ConfigLoader::new().with_path(&path).load().unwrap();
        assert_eq!(config.max_history_entries, 42);
        assert_eq!(config.idle_timeout_ms, 5000);
    }

    #[test]
    fn load_parses_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stega.json");
        std::fs::write(&path, r#"{"max_history_entries": 7}"#).unwrap();
        let config = ConfigLoader::new().with_path(&path).load().unwrap();
        assert_eq!(config.max_history_entries, 7);
    }

    #[test]
    fn load_optional_falls_back_to_default_when_missing() {
        let loader = ConfigLoader::new().with_path("/nonexistent/stega.toml");
        let config = loader.load_optional();
        assert_eq!(config, CliConfig::default());
    }
}
