//! Parsing of `KEY=value` output files written by steps

use crate::executor::ExecutorError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

const LINE_PATTERN: &str = r"^\s*(?:export\s+)?([A-Za-z_][A-Za-z0-9_.\-]*)\s*=(.*)$";

static LINE_REGEX: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(LINE_PATTERN));

/// Whether `name` can be used as a shell variable name
pub fn is_shell_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

/// Parse dotenv content. Later assignments win.
pub fn parse_dotenv(content: &str) -> Result<HashMap<String, String>, ExecutorError> {
    let pattern = LINE_REGEX
        .as_ref()
        .map_err(|e| ExecutorError::Internal(format!("invalid dotenv pattern: {}", e)))?;
    let mut values = HashMap::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some(caps) = pattern.captures(line) {
            let key = caps[1].to_string();
            let value = unquote(caps[2].trim());
            values.insert(key, value.to_string());
        }
    }

    Ok(values)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Parse NUL-terminated `NAME=value` records written by the exit trap.
///
/// Values are taken verbatim, so newlines, quotes and `=` survive.
pub fn parse_captured(content: &str) -> HashMap<String, String> {
    content
        .split('\0')
        .filter(|record| !record.is_empty())
        .filter_map(|record| record.split_once('='))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Keep only the requested names
pub fn select(values: HashMap<String, String>, names: &[String]) -> HashMap<String, String> {
    values
        .into_iter()
        .filter(|(key, _)| names.iter().any(|n| n == key))
        .collect()
}
