//! Binary entry point: wires the library's `Cli` to either a one-shot argv
//! dispatch or an interactive REPL session, plus the two built-in
//! plugin-management meta-commands.

use crossterm::terminal;
use std::collections::HashMap;
use std::io::Read;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use stega::parser::Parser;
use stega::plugin::{PluginLoader, PluginManager};
use stega::{CliConfig, CliError, ConfigLoader, DefaultLogger, ExitReason, FlagValue};

fn main() -> ExitCode {
    let config = ConfigLoader::new().load_optional();
    let mut cli = stega::Cli::new(Box::new(DefaultLogger::new()));
    cli.granted = config.granted_capabilities.iter().cloned().collect();
    let plugins = PluginManager::new();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() {
        return run_repl(&cli, &config);
    }

    if argv.first().map(String::as_str) == Some("plugin") {
        return handle_plugin_command(&argv, &mut cli, &plugins);
    }

    match cli.run_command(&argv) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Handles the `plugin load`/`plugin unload` meta-commands directly rather
/// than as registered [`stega::Command`] actions: loading and unloading
/// mutate the registry, and an action only ever sees it through the
/// dispatcher's shared `&CommandRegistry` borrow (§4.3's `Context`), so the
/// mutation has to happen here, before/after a normal dispatch, instead.
fn handle_plugin_command(argv: &[String], cli: &mut stega::Cli, plugins: &PluginManager) -> ExitCode {
    let Some(sub) = argv.get(1) else {
        eprintln!("error: usage: plugin <load|unload> [flags]");
        return ExitCode::FAILURE;
    };

    let flags = match Parser::parse(&argv[2..], &cli.registry) {
        Ok(args) => args.flags,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = match sub.as_str() {
        "load" => load_plugin(&flags, cli, plugins),
        "unload" => unload_plugin(&flags, cli, plugins),
        other => Err(CliError::SubcommandNotFound { parent: "plugin".to_string(), token: other.to_string() }),
    };

    match result {
        Ok(message) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_plugin(
    flags: &HashMap<String, FlagValue>,
    cli: &mut stega::Cli,
    plugins: &PluginManager,
) -> stega::Result<String> {
    let path = flags.get("path").and_then(|v| v.as_str()).ok_or_else(|| CliError::MissingFlag {
        flag: "path".to_string(),
        expected_type: "string".to_string(),
    })?;
    let integrity = flags.get("integrity").and_then(|v| v.as_str());

    let artifact = PluginLoader::load(path, integrity)?;
    let plugin = artifact.into_plugin();
    let name = plugin.metadata().name.clone();
    plugins.load(plugin, &mut cli.registry)?;
    Ok(format!("loaded plugin '{name}' from {path}"))
}

fn unload_plugin(
    flags: &HashMap<String, FlagValue>,
    cli: &mut stega::Cli,
    plugins: &PluginManager,
) -> stega::Result<String> {
    let name = flags.get("name").and_then(|v| v.as_str()).ok_or_else(|| CliError::MissingFlag {
        flag: "name".to_string(),
        expected_type: "string".to_string(),
    })?;
    plugins.unload(name, &mut cli.registry)?;
    Ok(format!("unloaded plugin '{name}'"))
}

fn run_repl(cli: &stega::Cli, config: &CliConfig) -> ExitCode {
    let history = match stega::HistoryStore::new(
        config.resolved_history_path(&std::env::current_dir().unwrap_or_default()),
        config.max_history_entries,
        config.excluded_commands.clone(),
    ) {
        Ok(h) => h,
        Err(err) => {
            eprintln!("error: failed to open history store: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut repl = stega::Repl::new(cli, history);
    if config.idle_timeout_ms > 0 {
        repl = repl.with_idle_timeout(Duration::from_millis(config.idle_timeout_ms));
    }

    let raw_mode_enabled = terminal::enable_raw_mode().is_ok();
    let exit_reason = drive_repl(&mut repl);
    if raw_mode_enabled {
        let _ = terminal::disable_raw_mode();
    }

    if let Err(err) = repl.save_history() {
        eprintln!("error: failed to persist history: {err}");
    }

    match exit_reason {
        ExitReason::UserRequested | ExitReason::Eof | ExitReason::IdleTimeout => ExitCode::SUCCESS,
    }
}

fn drive_repl(repl: &mut stega::Repl<'_>) -> ExitReason {
    let mut stdin = std::io::stdin();
    let mut buf = [0u8; 64];
    let mut last_activity = Instant::now();
    print!("> ");
    loop {
        if let Some(reason) = repl.check_idle(last_activity) {
            return reason;
        }
        match stdin.read(&mut buf) {
            Ok(0) => return ExitReason::Eof,
            Ok(n) => {
                if let Some(reason) = repl.feed(&buf[..n], &mut last_activity) {
                    return reason;
                }
            }
            Err(_) => return ExitReason::Eof,
        }
    }
}
