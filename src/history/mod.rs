//! The Command History Store (§3, §6): a bounded, FIFO-evicted, atomically
//! persisted journal of executed commands, with search and statistics.

use crate::error::Result;
use crate::value::FlagValue;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A single recorded invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// Fresh 128-bit hex identifier.
    pub id: String,
    /// Root command name.
    pub command: String,
    /// Flag values at the time of execution, rendered to JSON for
    /// format-stable persistence.
    pub args: HashMap<String, JsonValue>,
    /// Epoch milliseconds.
    pub timestamp: u128,
    /// Whether the action completed without error.
    pub success: bool,
    /// Wall-clock duration of the dispatch, in milliseconds.
    pub duration: f64,
    /// Stringified error, if the dispatch failed.
    pub error: Option<String>,
}

/// Aggregate statistics over the stored entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    pub total_commands: usize,
    pub unique_commands: usize,
    pub success_rate: f64,
    pub average_duration: f64,
    /// Up to 10 most-frequently-invoked root command names, most frequent first.
    pub most_used_commands: Vec<(String, usize)>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn flag_to_json(value: &FlagValue) -> JsonValue {
    match value {
        FlagValue::String(s) => JsonValue::String(s.clone()),
        FlagValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        FlagValue::Boolean(b) => JsonValue::Bool(*b),
        FlagValue::Array(items) => JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect()),
    }
}

/// Bounded, persisted history journal. Newest entries are stored first.
pub struct HistoryStore {
    path: PathBuf,
    max_entries: usize,
    excluded: Vec<String>,
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Load from `path` if it exists, otherwise start empty.
    pub fn new(path: impl Into<PathBuf>, max_entries: usize, excluded: Vec<String>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            Vec::new()
        };
        Ok(Self { path, max_entries, excluded, entries })
    }

    /// Record a completed dispatch. A no-op if `command` is excluded, or if
    /// `max_entries` is zero.
    pub fn add_entry(
        &mut self,
        command: &str,
        flags: &HashMap<String, FlagValue>,
        success: bool,
        duration: f64,
        error: Option<String>,
        timestamp: u128,
    ) {
        if self.max_entries == 0 {
            return;
        }
        if self.excluded.iter().any(|c| c.eq_ignore_ascii_case(command)) {
            return;
        }
        let args = flags.iter().map(|(k, v)| (k.clone(), flag_to_json(v))).collect();
        let entry = HistoryEntry {
            id: uuid::Uuid::new_v4().simple().to_string(),
            command: command.to_string(),
            args,
            timestamp,
            success,
            duration,
            error,
        };
        self.entries.insert(0, entry);
        if self.entries.len() > self.max_entries {
            self.entries.truncate(self.max_entries);
        }
    }

    /// All entries, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Entries whose root command equals `filter`, or all entries if `None`.
    pub fn get_history(&self, filter: Option<&str>) -> Vec<&HistoryEntry> {
        match filter {
            Some(name) => self.entries.iter().filter(|e| e.command.eq_ignore_ascii_case(name)).collect(),
            None => self.entries.iter().collect(),
        }
    }

    /// Drop every stored entry. Does not touch the backing file until the
    /// next [`Self::save`].
    pub fn clear_history(&mut self) {
        self.entries.clear();
    }

    /// True if `name` is on the exclude list, case-insensitively.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    /// Entries matching `query`: tokenised on whitespace, every term must be
    /// a case-insensitive substring of `command + serialised(args)`.
    pub fn search(&self, query: &str) -> Vec<&HistoryEntry> {
        let terms: Vec<String> = query.split_whitespace().map(|t| t.to_ascii_lowercase()).collect();
        if terms.is_empty() {
            return self.entries.iter().collect();
        }
        self.entries
            .iter()
            .filter(|e| {
                let haystack = format!(
                    "{}{}",
                    e.command.to_ascii_lowercase(),
                    serde_json::to_string(&e.args).unwrap_or_default().to_ascii_lowercase()
                );
                terms.iter().all(|term| haystack.contains(term.as_str()))
            })
            .collect()
    }

    /// Compute [`Statistics`] over the current entries.
    pub fn statistics(&self) -> Statistics {
        let total_commands = self.entries.len();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut success_count = 0usize;
        let mut duration_sum = 0.0f64;
        for entry in &self.entries {
            *counts.entry(entry.command.as_str()).or_insert(0) += 1;
            if entry.success {
                success_count += 1;
            }
            duration_sum += entry.duration;
        }
        let unique_commands = counts.len();
        let mut most_used: Vec<(String, usize)> =
            counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        most_used.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        most_used.truncate(10);

        let success_rate = if total_commands == 0 {
            0.0
        } else {
            round2(100.0 * success_count as f64 / total_commands as f64)
        };
        let average_duration = if total_commands == 0 { 0.0 } else { round2(duration_sum / total_commands as f64) };

        Statistics {
            total_commands,
            unique_commands,
            success_rate,
            average_duration,
            most_used_commands: most_used,
        }
    }

    /// Persist the current entries to disk via write-to-temp-then-rename.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .expect("HistoryEntry serialises infallibly");
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        use std::io::Write as _;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
