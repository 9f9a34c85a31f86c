//! The Pipeline Parser & Evaluator (§4.6): `cmd1 | .op | cmd2`-style
//! composition, threading each stage's stdout into the next stage's stdin.

pub mod operators;

use crate::dispatcher::Cli;
use crate::error::{CliError, Result};
use operators::apply_operator;

/// One `|`-delimited segment of a pipeline: either a dispatcher command or a
/// `.`-prefixed string operator.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStage {
    /// The stage's leading token, without the `.` prefix if it is an operator.
    pub command: String,
    /// Remaining whitespace-delimited tokens, quote-stripped.
    pub args: Vec<String>,
    /// True if `command` was `.`-prefixed.
    pub is_operator: bool,
    /// The previous stage's output, filled in by [`evaluate`] before this
    /// stage runs; `None` for the pipeline's first stage. Parsing alone never
    /// sets this (§3).
    pub input: Option<String>,
}

/// The outcome of running a full pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

/// Split `line` into stages on unquoted `|`, then tokenise each stage.
///
/// # Errors
/// `InvalidPipeline` if any stage is empty (e.g. a leading, trailing, or
/// doubled `|`).
pub fn parse(line: &str) -> Result<Vec<PipelineStage>> {
    let segments = split_unquoted(line, '|');
    if segments.is_empty() {
        return Err(CliError::InvalidPipeline { reason: "empty pipeline".to_string() });
    }
    segments.iter().map(|seg| parse_stage(seg)).collect()
}

fn parse_stage(segment: &str) -> Result<PipelineStage> {
    let tokens = tokenize(segment);
    let mut iter = tokens.into_iter();
    let head = iter.next().ok_or_else(|| CliError::InvalidPipeline { reason: "empty stage".to_string() })?;
    let (command, is_operator) = match head.strip_prefix('.') {
        Some(rest) if !rest.is_empty() => (rest.to_string(), true),
        _ => (head, false),
    };
    Ok(PipelineStage { command, args: iter.collect(), is_operator, input: None })
}

/// Split `s` on `sep`, respecting single- and double-quoted spans.
fn split_unquoted(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in s.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch == sep => {
                parts.push(std::mem::take(&mut current));
            }
            None => current.push(ch),
        }
    }
    parts.push(current);
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

/// Whitespace-tokenise `s`, stripping one layer of matching outer quotes
/// from each token.
fn tokenize(s: &str) -> Vec<String> {
    split_unquoted(s, ' ')
        .into_iter()
        .filter(|t| !t.is_empty())
        .map(|t| strip_quotes(&t))
        .collect()
}

fn strip_quotes(token: &str) -> String {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return token[1..token.len() - 1].to_string();
        }
    }
    token.to_string()
}

/// Run every stage of `stages` left to right against `cli`, threading each
/// stage's captured output string as the next stage's input.
pub fn evaluate(stages: &[PipelineStage], cli: &Cli) -> PipelineResult {
    let mut output = String::new();
    for stage in stages {
        let mut resolved = stage.clone();
        resolved.input = if output.is_empty() { None } else { Some(output.clone()) };
        let result = if resolved.is_operator {
            apply_operator(&resolved.command, &resolved.args, resolved.input.as_deref().unwrap_or(""))
        } else {
            run_dispatcher_stage(&resolved, cli)
        };
        match result {
            Ok(next_output) => output = next_output,
            Err(err) => {
                return PipelineResult { success: false, output, error: Some(err.to_string()) };
            }
        }
    }
    PipelineResult { success: true, output, error: None }
}

fn run_dispatcher_stage(stage: &PipelineStage, cli: &Cli) -> Result<String> {
    let mut argv = vec![stage.command.clone()];
    argv.extend(stage.args.iter().cloned());
    cli.run_command_capturing_with_input(&argv, stage.input.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_pipe_preserving_quoted_spans() {
        let stages = parse(r#"echo "a | b" | .uppercase"#).unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].command, "echo");
        assert_eq!(stages[0].args, vec!["a | b".to_string()]);
        assert_eq!(stages[1].command, "uppercase");
        assert!(stages[1].is_operator);
    }

    #[test]
    fn parse_rejects_empty_stage() {
        let err = parse("echo hi ||").unwrap_err();
        assert!(matches!(err, CliError::InvalidPipeline { .. }));
    }

    #[test]
    fn operator_pipeline_chains_transforms() {
        let stages = parse(r#".uppercase | .lowercase"#).unwrap();
        let cli = Cli::new(Box::new(crate::logger::DefaultLogger::new()));
        let mut output = String::from("Hello");
        for stage in &stages {
            output = apply_operator(&stage.command, &stage.args, &output).unwrap();
        }
        assert_eq!(output, "hello");
        let _ = cli;
    }

    #[test]
    fn single_stage_pipeline_runs_with_no_upstream_input() {
        let stages = parse(".trim").unwrap();
        let result = apply_operator(&stages[0].command, &stages[0].args, "  hi  ").unwrap();
        assert_eq!(result, "hi");
    }

    #[test]
    fn full_pipeline_threads_dispatcher_output_through_operators() {
        let mut cli = Cli::new(Box::new(crate::logger::DefaultLogger::new()));
        cli.registry
            .register(crate::model::Command::new("echo").action(|args, ctx| {
                ctx.emit(&args.positionals(1).join(" "));
                Ok(())
            }))
            .unwrap();

        let stages = parse(r#"echo "Hello, World!" | .lowercase | .replace "world" "there" | .trim"#).unwrap();
        let result = evaluate(&stages, &cli);
        assert!(result.success);
        assert_eq!(result.output, "hello, there!");
    }

    #[test]
    fn second_dispatcher_stage_receives_upstream_output_via_context_input_not_argv() {
        let mut cli = Cli::new(Box::new(crate::logger::DefaultLogger::new()));
        cli.registry
            .register(crate::model::Command::new("shout").action(|args, ctx| {
                ctx.emit(&format!("{}!", args.positionals(1).join(" ")));
                Ok(())
            }))
            .unwrap();
        cli.registry
            .register(crate::model::Command::new("echoback").action(|args, ctx| {
                assert!(args.positionals(1).is_empty(), "upstream output must not be argv-spliced");
                ctx.emit(ctx.input.unwrap_or(""));
                Ok(())
            }))
            .unwrap();

        let stages = parse("shout hello | echoback").unwrap();
        let result = evaluate(&stages, &cli);
        assert!(result.success);
        assert_eq!(result.output, "hello!");
    }
}
