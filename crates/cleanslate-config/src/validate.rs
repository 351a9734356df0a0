//! Parsing helpers for raw environment values.

use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};

const TRUTHY: &[&str] = &["1", "true", "yes", "on", "y", "t"];
const FALSY: &[&str] = &["0", "false", "no", "off", "n", "f"];

/// Parse a boolean flag using the accepted truthy/falsy spellings.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for any other spelling.
pub fn parse_bool(field: &'static str, raw: &str) -> ConfigResult<bool> {
    let normalized = raw.trim().to_ascii_lowercase();
    if TRUTHY.contains(&normalized.as_str()) {
        Ok(true)
    } else if FALSY.contains(&normalized.as_str()) {
        Ok(false)
    } else {
        Err(ConfigError::invalid(field, raw, "expected boolean"))
    }
}

/// Parse a strictly positive integer.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value does not parse or is zero.
pub fn parse_positive<T>(field: &'static str, raw: &str) -> ConfigResult<T>
where
    T: FromStr + PartialOrd + Default,
{
    let value = raw
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::invalid(field, raw, "expected integer"))?;
    if value <= T::default() {
        return Err(ConfigError::invalid(field, raw, "must be greater than zero"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_known_spellings() -> ConfigResult<()> {
        for raw in ["1", "TRUE", "yes", "On", "y", "t"] {
            assert!(parse_bool("FLAG", raw)?);
        }
        for raw in ["0", "False", "no", "OFF", "n", "f"] {
            assert!(!parse_bool("FLAG", raw)?);
        }
        Ok(())
    }

    #[test]
    fn parse_bool_rejects_unknown() {
        let err = parse_bool("DAEMON_MODE", "maybe").err();
        assert_eq!(
            err,
            Some(ConfigError::InvalidField {
                field: "DAEMON_MODE",
                value: Some("maybe".into()),
                reason: "expected boolean",
            })
        );
    }

    #[test]
    fn parse_positive_rejects_zero_and_garbage() {
        assert_eq!(parse_positive::<u32>("N", "3").ok(), Some(3));
        assert!(parse_positive::<u32>("N", "0").is_err());
        assert!(parse_positive::<u64>("N", "abc").is_err());
    }
}
