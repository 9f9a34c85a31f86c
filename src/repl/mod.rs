//! The REPL Engine (§4.7): raw-mode line editing, tab completion, history
//! navigation, multiline aggregation, and command evaluation over a
//! [`Cli`].

pub mod line_editor;

use crate::dispatcher::Cli;
use crate::history::HistoryStore;
use crate::value::FlagValue;
use line_editor::{current_word, decode, EditorEvent, LineEditor};
use std::collections::HashMap;
use std::io::Write;
use std::time::{Duration, Instant};

const PRIMARY_PROMPT: &str = "> ";
const CONTINUATION_PROMPT: &str = "... ";
const BUILTIN_COMMANDS: &[&str] = &["help", "exit", "clear", "history", "debug"];

/// An observable REPL lifecycle event; hosts subscribe via [`Repl::on_event`].
#[derive(Debug, Clone)]
pub enum ReplEvent {
    Start,
    Line(String),
    Error(String),
    Exit,
}

/// Why the REPL loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    UserRequested,
    IdleTimeout,
    Eof,
}

/// Drives an interactive session over a [`Cli`], with its own
/// [`HistoryStore`] distinct from any the host keeps for non-interactive use.
pub struct Repl<'a> {
    cli: &'a Cli,
    history: HistoryStore,
    editor: LineEditor,
    multiline_enabled: bool,
    multiline_buffer: Vec<String>,
    idle_timeout: Option<Duration>,
    debug_enabled: bool,
    history_cursor: Option<usize>,
    listeners: Vec<Box<dyn Fn(&ReplEvent) + 'a>>,
}

impl<'a> Repl<'a> {
    pub fn new(cli: &'a Cli, history: HistoryStore) -> Self {
        Self {
            cli,
            history,
            editor: LineEditor::new(),
            multiline_enabled: false,
            multiline_buffer: Vec::new(),
            idle_timeout: None,
            debug_enabled: false,
            history_cursor: None,
            listeners: Vec::new(),
        }
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn with_multiline(mut self, enabled: bool) -> Self {
        self.multiline_enabled = enabled;
        self
    }

    pub fn on_event(&mut self, listener: Box<dyn Fn(&ReplEvent) + 'a>) {
        self.listeners.push(listener);
    }

    /// Persist this session's history store. Hosts call this on every exit
    /// path, including idle timeout and EOF.
    pub fn save_history(&self) -> crate::error::Result<()> {
        self.history.save()
    }

    fn emit(&self, event: ReplEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
    }

    fn prompt(&self) -> &'static str {
        if self.multiline_buffer.is_empty() {
            PRIMARY_PROMPT
        } else {
            CONTINUATION_PROMPT
        }
    }

    /// Feed raw input bytes read since the last call. Returns
    /// `Some(reason)` once the session should end.
    pub fn feed(&mut self, bytes: &[u8], last_activity: &mut Instant) -> Option<ExitReason> {
        let mut offset = 0;
        while offset < bytes.len() {
            let (event, consumed) = decode(&bytes[offset..]);
            if consumed == 0 {
                break;
            }
            offset += consumed;
            *last_activity = Instant::now();
            if let Some(reason) = self.handle_event(event) {
                return Some(reason);
            }
        }
        None
    }

    /// Check the idle timeout against `last_activity`.
    pub fn check_idle(&self, last_activity: Instant) -> Option<ExitReason> {
        match self.idle_timeout {
            Some(timeout) if timeout.as_millis() > 0 && last_activity.elapsed() >= timeout => {
                Some(ExitReason::IdleTimeout)
            }
            _ => None,
        }
    }

    fn handle_event(&mut self, event: EditorEvent) -> Option<ExitReason> {
        match event {
            EditorEvent::Insert(c) => {
                self.editor.insert(c);
                None
            }
            EditorEvent::Backspace => {
                self.editor.backspace();
                None
            }
            EditorEvent::MoveLeft => {
                self.editor.move_left();
                None
            }
            EditorEvent::MoveRight => {
                self.editor.move_right();
                None
            }
            EditorEvent::Undo => {
                self.editor.undo();
                None
            }
            EditorEvent::Redo => {
                self.editor.redo();
                None
            }
            EditorEvent::Tab => {
                self.complete();
                None
            }
            EditorEvent::HistoryUp => {
                self.navigate_history(1);
                None
            }
            EditorEvent::HistoryDown => {
                self.navigate_history(-1);
                None
            }
            EditorEvent::CtrlC => {
                if !self.multiline_buffer.is_empty() {
                    self.multiline_buffer.clear();
                    self.editor.reset();
                    None
                } else {
                    self.emit(ReplEvent::Exit);
                    Some(ExitReason::UserRequested)
                }
            }
            EditorEvent::CtrlD => {
                if self.editor.line().is_empty() {
                    self.emit(ReplEvent::Exit);
                    Some(ExitReason::Eof)
                } else {
                    None
                }
            }
            EditorEvent::Submit => self.submit(),
            EditorEvent::Unhandled => None,
        }
    }

    fn submit(&mut self) -> Option<ExitReason> {
        let line = self.editor.line().to_string();
        self.editor.reset();
        self.history_cursor = None;

        if self.multiline_enabled {
            if line.is_empty() && !self.multiline_buffer.is_empty() {
                let full = self.multiline_buffer.join("\n");
                self.multiline_buffer.clear();
                return self.evaluate_line(&full);
            }
            if !line.is_empty() {
                self.multiline_buffer.push(line);
                return None;
            }
        }

        if line.is_empty() {
            return None;
        }
        self.evaluate_line(&line)
    }

    fn evaluate_line(&mut self, line: &str) -> Option<ExitReason> {
        self.emit(ReplEvent::Line(line.to_string()));
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&head) = tokens.first() else { return None };

        match head {
            "exit" => {
                self.emit(ReplEvent::Exit);
                return Some(ExitReason::UserRequested);
            }
            "clear" => {
                print!("\x1b[2J\x1b[H");
                let _ = std::io::stdout().flush();
                return None;
            }
            "help" => {
                self.print_help(tokens.get(1).copied());
                return None;
            }
            "history" => {
                self.print_history(tokens.get(1..).map(|t| t.join(" ")).filter(|s| !s.is_empty()));
                return None;
            }
            "debug" => {
                match tokens.get(1) {
                    Some(&"on") => self.debug_enabled = true,
                    Some(&"off") => self.debug_enabled = false,
                    _ => self.debug_enabled = !self.debug_enabled,
                }
                return None;
            }
            _ => {}
        }

        let argv: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        let started = Instant::now();
        let result = self.cli.run_command(&argv);
        let duration = started.elapsed().as_secs_f64() * 1000.0;
        let success = result.is_ok();
        let error = result.as_ref().err().map(|e| e.to_string());
        if let Some(err) = &error {
            self.emit(ReplEvent::Error(err.clone()));
            eprintln!("error: {err}");
        }

        if !self.history.is_excluded(head) {
            let args = best_effort_args(&tokens[1..]);
            self.history.add_entry(head, &args, success, duration, error, epoch_millis());
        }
        None
    }

    fn complete(&mut self) {
        let line = self.editor.line().to_string();
        let (start, word) = current_word(&line, self.editor.cursor());
        if word.is_empty() {
            return;
        }
        let mut candidates: Vec<String> = BUILTIN_COMMANDS
            .iter()
            .map(|s| s.to_string())
            .chain(self.cli.registry.commands().iter().map(|c| c.name.clone()))
            .filter(|c| c.starts_with(word))
            .collect();
        candidates.sort();
        candidates.dedup();

        match candidates.len() {
            0 => {}
            1 => {
                let replaced = format!("{}{}", &line[..start], candidates[0]);
                self.editor.set_line(replaced);
            }
            _ => {
                let prefix = longest_common_prefix(&candidates);
                if prefix.len() > word.len() {
                    let replaced = format!("{}{}", &line[..start], prefix);
                    self.editor.set_line(replaced);
                }
                print_columns(&candidates);
            }
        }
    }

    fn navigate_history(&mut self, direction: i64) {
        let entries = self.history.entries();
        if entries.is_empty() {
            return;
        }
        let next_index = match self.history_cursor {
            None if direction > 0 => Some(0),
            None => None,
            Some(i) => {
                let new_i = i as i64 + direction;
                if new_i < 0 {
                    None
                } else {
                    Some(new_i.min(entries.len() as i64 - 1) as usize)
                }
            }
        };

        if next_index.is_none() {
            self.editor.end_history_navigation();
            self.history_cursor = None;
            return;
        }

        if self.history_cursor.is_none() {
            self.editor.begin_history_navigation();
        }
        let idx = next_index.unwrap();
        self.history_cursor = Some(idx);
        self.editor.set_line(render_entry_as_line(&entries[idx]));
    }

    fn print_help(&self, name: Option<&str>) {
        match name {
            Some(n) => match self.cli.registry.find_command(n) {
                Some(cmd) => println!("{}: {}", cmd.name, cmd.description),
                None => println!("no such command: {n}"),
            },
            None => {
                for cmd in self.cli.registry.commands() {
                    println!("{:<20} {}", cmd.name, cmd.description);
                }
            }
        }
    }

    fn print_history(&self, term: Option<String>) {
        let matches = match &term {
            Some(t) => self.history.search(t),
            None => self.history.entries().iter().collect(),
        };
        for entry in matches {
            println!("{}  {}", entry.command, entry.args.len());
        }
    }
}

fn best_effort_args(tokens: &[&str]) -> HashMap<String, FlagValue> {
    let mut args = HashMap::new();
    let mut positional_index = 1;
    for token in tokens {
        if let Some((k, v)) = token.trim_start_matches('-').split_once('=') {
            args.insert(k.to_string(), FlagValue::String(v.to_string()));
        } else {
            args.insert(format!("arg{positional_index}"), FlagValue::String(token.to_string()));
            positional_index += 1;
        }
    }
    args
}

fn render_entry_as_line(entry: &crate::history::HistoryEntry) -> String {
    let mut parts = vec![entry.command.clone()];
    for (k, v) in &entry.args {
        let rendered = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
        parts.push(format!("{k}={rendered}"));
    }
    parts.join(" ")
}

fn longest_common_prefix(candidates: &[String]) -> String {
    if candidates.is_empty() {
        return String::new();
    }
    let mut prefix = candidates[0].clone();
    for candidate in &candidates[1..] {
        while !candidate.starts_with(prefix.as_str()) {
            prefix.pop();
            if prefix.is_empty() {
                return prefix;
            }
        }
    }
    prefix
}

fn print_columns(candidates: &[String]) {
    let max_width = candidates.iter().map(|c| c.len()).max().unwrap_or(0);
    let col_width = max_width + 2;
    let cols = (80 / col_width).max(1);
    for chunk in candidates.chunks(cols) {
        let line: String = chunk.iter().map(|c| format!("{c:<col_width$}")).collect();
        println!("{}", line.trim_end());
    }
}

fn epoch_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::DefaultLogger;
    use crate::model::Command;

    fn cli_with_greet() -> Cli {
        let mut cli = Cli::new(Box::new(DefaultLogger::new()));
        cli.registry
            .register(Command::new("greet").description("say hello").action(|_, _| Ok(())))
            .unwrap();
        cli
    }

    fn history() -> HistoryStore {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::mem::forget(dir);
        HistoryStore::new(path, 100, Vec::new()).unwrap()
    }

    #[test]
    fn typing_and_submitting_a_line_dispatches_it() {
        let cli = cli_with_greet();
        let mut repl = Repl::new(&cli, history());
        let mut last_activity = Instant::now();
        repl.feed(b"greet\r", &mut last_activity);
        assert_eq!(repl.history.entries().len(), 1);
        assert_eq!(repl.history.entries()[0].command, "greet");
    }

    #[test]
    fn ctrl_c_on_empty_multiline_buffer_exits() {
        let cli = cli_with_greet();
        let mut repl = Repl::new(&cli, history());
        let mut last_activity = Instant::now();
        let reason = repl.feed(&[0x03], &mut last_activity);
        assert_eq!(reason, Some(ExitReason::UserRequested));
    }

    #[test]
    fn ctrl_d_on_empty_line_exits_but_not_otherwise() {
        let cli = cli_with_greet();
        let mut repl = Repl::new(&cli, history());
        let mut last_activity = Instant::now();
        assert_eq!(repl.feed(&[0x04], &mut last_activity), Some(ExitReason::Eof));

        let mut repl = Repl::new(&cli, history());
        repl.feed(b"x", &mut last_activity);
        assert_eq!(repl.feed(&[0x04], &mut last_activity), None);
    }

    #[test]
    fn tab_completion_extends_to_unique_match() {
        let cli = cli_with_greet();
        let mut repl = Repl::new(&cli, history());
        let mut last_activity = Instant::now();
        repl.feed(b"gre\t", &mut last_activity);
        assert_eq!(repl.editor.line(), "greet");
    }

    #[test]
    fn multiline_mode_flushes_on_empty_line() {
        let cli = cli_with_greet();
        let mut repl = Repl::new(&cli, history()).with_multiline(true);
        let mut last_activity = Instant::now();
        repl.feed(b"greet\r", &mut last_activity);
        assert!(repl.history.entries().is_empty());
        repl.feed(b"\r", &mut last_activity);
        assert_eq!(repl.history.entries().len(), 1);
    }

    #[test]
    fn idle_timeout_fires_after_elapsed_duration() {
        let cli = cli_with_greet();
        let repl = Repl::new(&cli, history()).with_idle_timeout(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        let last_activity = Instant::now() - Duration::from_millis(10);
        assert_eq!(repl.check_idle(last_activity), Some(ExitReason::IdleTimeout));
    }

    #[test]
    fn history_navigation_walks_backwards_then_restores_temp_line() {
        let cli = cli_with_greet();
        let mut repl = Repl::new(&cli, history());
        let mut last_activity = Instant::now();
        repl.feed(b"greet\r", &mut last_activity);
        repl.feed(b"x", &mut last_activity);
        repl.feed(b"\x1b[A", &mut last_activity);
        assert_eq!(repl.editor.line(), "greet");
        repl.feed(b"\x1b[B", &mut last_activity);
        assert_eq!(repl.editor.line(), "x");
    }
}
