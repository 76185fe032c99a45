use std::env;

use super::ConfigError;

/// Reads a variable, treating unset and whitespace-only values as absent.
pub(super) fn env_optional(name: &str) -> Option<String> {
    env::var(name).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

pub(super) fn env_required(name: &'static str) -> Result<String, ConfigError> {
    env_optional(name).ok_or(ConfigError::MissingVar(name))
}

/// Raw variant that keeps whitespace-only values, so callers can tell
/// "unset" apart from "set to blank".
pub(super) fn env_raw(name: &str) -> Option<String> {
    env::var(name).ok()
}

pub(super) fn parse_u32(field: &'static str, value: String) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_i32(field: &'static str, value: String) -> Result<i32, ConfigError> {
    value.trim().parse::<i32>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

/// The sheet gid is tri-state: an unset variable means "use gid 0", a blank
/// value disables the gid lookup entirely, anything else must parse.
pub(super) fn parse_sheet_id(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<i64>, ConfigError> {
    let Some(raw) = value else {
        return Ok(Some(0));
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<i64>() {
        Ok(id) => Ok(Some(id)),
        Err(_) => Err(ConfigError::InvalidValue { field, value: raw }),
    }
}
