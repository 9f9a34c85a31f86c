//! The fixed String Operator set (§4.6) consumed by `.`-prefixed pipeline
//! stages.

use crate::error::{CliError, Result};
use regex::Regex;

/// Apply the operator named `name` (without its `.` prefix) to `input`.
///
/// # Errors
/// `UnknownOperator` if `name` isn't one of the fixed set; `InvalidPipeline`
/// if an operator's argument count doesn't match its contract, or a regex
/// argument fails to compile.
pub fn apply_operator(name: &str, args: &[String], input: &str) -> Result<String> {
    match name {
        "uppercase" => {
            require_arity(name, args, 0)?;
            Ok(input.to_uppercase())
        }
        "lowercase" => {
            require_arity(name, args, 0)?;
            Ok(input.to_lowercase())
        }
        "trim" => {
            require_arity(name, args, 0)?;
            Ok(input.trim().to_string())
        }
        "replace" => {
            require_arity(name, args, 2)?;
            let re = compile(&args[0])?;
            Ok(re.replace_all(input, args[1].as_str()).into_owned())
        }
        "split" => {
            require_arity(name, args, 1)?;
            Ok(input.split(args[0].as_str()).collect::<Vec<_>>().join("\n"))
        }
        "join" => {
            require_arity(name, args, 1)?;
            Ok(input.split('\n').collect::<Vec<_>>().join(args[0].as_str()))
        }
        "grep" => {
            require_arity(name, args, 1)?;
            let re = compile(&args[0])?;
            Ok(input.lines().filter(|line| re.is_match(line)).collect::<Vec<_>>().join("\n"))
        }
        other => Err(CliError::UnknownOperator { name: other.to_string() }),
    }
}

fn require_arity(name: &str, args: &[String], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(CliError::InvalidPipeline {
            reason: format!("operator '.{name}' expects {expected} argument(s), got {}", args.len()),
        });
    }
    Ok(())
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| CliError::InvalidPipeline { reason: format!("invalid regex '{pattern}': {e}") })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercase_then_lowercase_is_idempotent_with_lowercase() {
        let s = "Hello, World!";
        let upper = apply_operator("uppercase", &[], s).unwrap();
        let lowered_from_upper = apply_operator("lowercase", &[], &upper).unwrap();
        let lowered_direct = apply_operator("lowercase", &[], s).unwrap();
        assert_eq!(lowered_from_upper, lowered_direct);
    }

    #[test]
    fn trim_is_idempotent() {
        let once = apply_operator("trim", &[], "  hi  ").unwrap();
        let twice = apply_operator("trim", &[], &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn replace_runs_global_regex_substitution() {
        let result = apply_operator(
            "replace",
            &["o".to_string(), "0".to_string()],
            "foo boo",
        )
        .unwrap();
        assert_eq!(result, "f00 b00");
    }

    #[test]
    fn split_then_join_round_trips_on_same_delimiter() {
        let split = apply_operator("split", &[",".to_string()], "a,b,c").unwrap();
        assert_eq!(split, "a\nb\nc");
        let joined = apply_operator("join", &[",".to_string()], &split).unwrap();
        assert_eq!(joined, "a,b,c");
    }

    #[test]
    fn grep_keeps_only_matching_lines() {
        let result = apply_operator("grep", &["^a".to_string()], "apple\nbanana\navocado").unwrap();
        assert_eq!(result, "apple\navocado");
    }

    #[test]
    fn unknown_operator_is_reported() {
        let err = apply_operator("reverse", &[], "x").unwrap_err();
        assert!(matches!(err, CliError::UnknownOperator { .. }));
    }

    #[test]
    fn wrong_arity_is_invalid_pipeline() {
        let err = apply_operator("replace", &["only-one".to_string()], "x").unwrap_err();
        assert!(matches!(err, CliError::InvalidPipeline { .. }));
    }
}
