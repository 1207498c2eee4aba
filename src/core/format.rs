//! Typed scalar model for variables and condition operands

use crate::core::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared format of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VariableFormat {
    #[default]
    String,
    Number,
    Bool,
    /// Dates are kept as opaque strings and compare lexicographically
    Date,
}

impl VariableFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableFormat::String => "STRING",
            VariableFormat::Number => "NUMBER",
            VariableFormat::Bool => "BOOL",
            VariableFormat::Date => "DATE",
        }
    }
}

impl fmt::Display for VariableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRING" => Ok(VariableFormat::String),
            "NUMBER" => Ok(VariableFormat::Number),
            "BOOL" => Ok(VariableFormat::Bool),
            "DATE" => Ok(VariableFormat::Date),
            other => Err(EngineError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl TryFrom<String> for VariableFormat {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VariableFormat> for String {
    fn from(format: VariableFormat) -> Self {
        format.as_str().to_string()
    }
}

/// A value converted to its declared format
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl TypedValue {
    /// Name of the runtime kind, used in evaluation errors
    pub fn kind(&self) -> &'static str {
        match self {
            TypedValue::String(_) => "string",
            TypedValue::Number(_) => "number",
            TypedValue::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::String(s) => write!(f, "{}", s),
            TypedValue::Number(n) => write!(f, "{}", n),
            TypedValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Convert a raw string into its declared format.
///
/// STRING and DATE values come back unchanged, NUMBER parses as `f64` and
/// BOOL accepts the usual spellings (`1`, `t`, `T`, `TRUE`, `true`, `True`
/// and their false counterparts).
pub fn convert(raw: &str, format: VariableFormat) -> Result<TypedValue, EngineError> {
    match format {
        VariableFormat::String | VariableFormat::Date => Ok(TypedValue::String(raw.to_string())),
        VariableFormat::Number => raw
            .parse::<f64>()
            .map(TypedValue::Number)
            .map_err(|e| EngineError::Conversion {
                value: raw.to_string(),
                format: format.to_string(),
                reason: e.to_string(),
            }),
        VariableFormat::Bool => parse_bool(raw)
            .map(TypedValue::Bool)
            .ok_or_else(|| EngineError::Conversion {
                value: raw.to_string(),
                format: format.to_string(),
                reason: "invalid syntax".to_string(),
            }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
