//! The Flag Value Converter: typed option declarations and raw-token coercion.

use crate::error::{CliError, Result};
use std::fmt;

/// The four declarable option types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    /// Free-form text, the default when no declaration matches a flag.
    String,
    /// Base-10 floating point.
    Number,
    /// Truthy/falsy token.
    Boolean,
    /// Comma-separated list of strings.
    Array,
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OptionType::String => "string",
            OptionType::Number => "number",
            OptionType::Boolean => "boolean",
            OptionType::Array => "array",
        };
        write!(f, "{s}")
    }
}

/// A coerced flag value, as it lives in [`crate::model::Args`].
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    /// `String` coercion.
    String(String),
    /// `Number` coercion.
    Number(f64),
    /// `Boolean` coercion.
    Boolean(bool),
    /// `Array` coercion.
    Array(Vec<String>),
}

impl FlagValue {
    /// The [`OptionType`] this value was coerced as.
    pub fn option_type(&self) -> OptionType {
        match self {
            FlagValue::String(_) => OptionType::String,
            FlagValue::Number(_) => OptionType::Number,
            FlagValue::Boolean(_) => OptionType::Boolean,
            FlagValue::Array(_) => OptionType::Array,
        }
    }

    /// Render the value as a display string, used by history persistence and
    /// REPL tab-completion search.
    pub fn as_display_string(&self) -> String {
        match self {
            FlagValue::String(s) => s.clone(),
            FlagValue::Number(n) => n.to_string(),
            FlagValue::Boolean(b) => b.to_string(),
            FlagValue::Array(items) => items.join(","),
        }
    }

    /// Borrow as `&str` if this is a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Borrow as `bool` if this is a `Boolean` value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as `f64` if this is a `Number` value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FlagValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow as `&[String]` if this is an `Array` value.
    pub fn as_array(&self) -> Option<&[String]> {
        match self {
            FlagValue::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

const TRUTHY: &[&str] = &["true", "1", "yes", "y"];
const FALSEY: &[&str] = &["false", "0", "no", "n"];

/// Coerce a raw token into the declared [`OptionType`].
///
/// `flag` is only used to populate the structured error fields.
pub fn coerce(flag: &str, option_type: OptionType, raw: &str) -> Result<FlagValue> {
    match option_type {
        OptionType::String => Ok(FlagValue::String(raw.to_string())),
        OptionType::Number => {
            let n: f64 = raw.parse().map_err(|_| CliError::InvalidFlagValue {
                flag: flag.to_string(),
                expected_type: option_type.to_string(),
                raw_value: raw.to_string(),
            })?;
            if !n.is_finite() {
                return Err(CliError::InvalidFlagValue {
                    flag: flag.to_string(),
                    expected_type: option_type.to_string(),
                    raw_value: raw.to_string(),
                });
            }
            Ok(FlagValue::Number(n))
        }
        OptionType::Boolean => {
            let lower = raw.to_ascii_lowercase();
            if TRUTHY.contains(&lower.as_str()) {
                Ok(FlagValue::Boolean(true))
            } else if FALSEY.contains(&lower.as_str()) {
                Ok(FlagValue::Boolean(false))
            } else {
                Err(CliError::InvalidFlagValue {
                    flag: flag.to_string(),
                    expected_type: option_type.to_string(),
                    raw_value: raw.to_string(),
                })
            }
        }
        OptionType::Array => {
            Ok(FlagValue::Array(raw.split(',').map(|s| s.to_string()).collect()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_number_rejects_garbage() {
        let err = coerce("c", OptionType::Number, "not-a-number").unwrap_err();
        assert!(matches!(err, CliError::InvalidFlagValue { .. }));
    }

    #[test]
    fn coerce_number_rejects_non_finite() {
        assert!(coerce("c", OptionType::Number, "nan").is_err());
        assert!(coerce("c", OptionType::Number, "inf").is_err());
    }

    #[test]
    fn coerce_boolean_accepts_known_tokens() {
        for tok in ["true", "TRUE", "1", "yes", "Y"] {
            assert_eq!(coerce("v", OptionType::Boolean, tok).unwrap(), FlagValue::Boolean(true));
        }
        for tok in ["false", "0", "no", "N"] {
            assert_eq!(coerce("v", OptionType::Boolean, tok).unwrap(), FlagValue::Boolean(false));
        }
    }

    #[test]
    fn coerce_boolean_rejects_unknown_token() {
        assert!(coerce("v", OptionType::Boolean, "maybe").is_err());
    }

    #[test]
    fn coerce_array_splits_on_comma() {
        let v = coerce("tags", OptionType::Array, "a,b,c").unwrap();
        assert_eq!(v.as_array().unwrap(), &["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn coerce_string_is_identity() {
        let v = coerce("name", OptionType::String, "Alice").unwrap();
        assert_eq!(v.as_str(), Some("Alice"));
    }
}
