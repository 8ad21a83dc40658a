//! Identifier and boolean-literal disciplines shared by every entity in §3.

use crate::error::schema_error;
use ecow::EcoString;
use regex::Regex;
use std::sync::LazyLock;

pub static ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
pub static ID_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").unwrap());

pub fn check_id(s: &str) -> anyhow::Result<EcoString> {
    if ID.is_match(s) {
        Ok(EcoString::from(s))
    } else {
        Err(schema_error(format!("invalid ID {s:?}")))
    }
}

pub fn check_id_dash(s: &str) -> anyhow::Result<EcoString> {
    if ID_DASH.is_match(s) {
        Ok(EcoString::from(s))
    } else {
        Err(schema_error(format!("invalid name {s:?}")))
    }
}

pub fn check_bool(s: &str) -> anyhow::Result<bool> {
    match s {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        other => Err(schema_error(format!("invalid bool value {other:?}"))),
    }
}

pub fn dash_to_underscore(s: &str) -> EcoString {
    s.chars().map(|c| if c == '-' { '_' } else { c }).collect()
}
