//! Semantic value types and raw-value coercion.

use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use url::Url;

/// Semantic type a schema entry declares for its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Boolean,
    /// A string restricted to a declared allowed set.
    Enum,
    /// A non-empty filesystem path.
    Path,
    /// An absolute URL.
    Url,
}

impl ValueType {
    /// Stable name used in error messages and reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Enum => "enum",
            Self::Path => "path",
            Self::Url => "url",
        }
    }
}

/// A validated, typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Path(PathBuf),
    Url(Url),
}

impl ConfigValue {
    /// The semantic type this value satisfies. Enum values are stored as
    /// strings; the allowed-set check happens during validation.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Integer(_) => ValueType::Integer,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Path(_) => ValueType::Path,
            Self::Url(_) => ValueType::Url,
        }
    }

    /// Render the value as a plain string for the redacted view.
    pub fn render(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Integer(n) => n.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Path(p) => p.display().to_string(),
            Self::Url(u) => u.to_string(),
        }
    }
}

/// Coerce a raw layer value into the declared semantic type.
///
/// String forms are accepted for integers and booleans because
/// environment-variable layers only carry strings. Returns a
/// human-readable reason on failure.
pub(crate) fn coerce(raw: &Value, ty: ValueType) -> Result<ConfigValue, String> {
    match ty {
        ValueType::String | ValueType::Enum => match raw {
            Value::String(s) => Ok(ConfigValue::String(s.clone())),
            other => Err(format!("expected string, got {}", raw_kind(other))),
        },
        ValueType::Integer => coerce_integer(raw),
        ValueType::Boolean => coerce_boolean(raw),
        ValueType::Path => match raw {
            Value::String(s) if !s.is_empty() => Ok(ConfigValue::Path(PathBuf::from(s))),
            Value::String(_) => Err("path must be non-empty".to_string()),
            other => Err(format!("expected path string, got {}", raw_kind(other))),
        },
        ValueType::Url => match raw {
            Value::String(s) => Url::parse(s)
                .map(ConfigValue::Url)
                .map_err(|err| format!("not a valid url: {err}")),
            other => Err(format!("expected url string, got {}", raw_kind(other))),
        },
    }
}

fn coerce_integer(raw: &Value) -> Result<ConfigValue, String> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .map(ConfigValue::Integer)
            .ok_or_else(|| format!("expected integer, got {n}")),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(ConfigValue::Integer)
            .map_err(|_| format!("expected integer, got \"{s}\"")),
        other => Err(format!("expected integer, got {}", raw_kind(other))),
    }
}

fn coerce_boolean(raw: &Value) -> Result<ConfigValue, String> {
    match raw {
        Value::Bool(b) => Ok(ConfigValue::Boolean(*b)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(ConfigValue::Boolean(true)),
            "false" | "0" => Ok(ConfigValue::Boolean(false)),
            _ => Err(format!("expected boolean, got \"{s}\"")),
        },
        other => Err(format!("expected boolean, got {}", raw_kind(other))),
    }
}

/// Describe a raw JSON value's kind for error messages.
pub(crate) fn raw_kind(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
