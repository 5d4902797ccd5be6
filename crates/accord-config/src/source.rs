//! Configuration sources and the layers they produce.
//!
//! A source yields ordered raw key/value pairs without interpreting
//! precedence or types; duplicates are preserved so the merger can
//! detect an internally inconsistent layer.

use crate::error::SourceError;
use log::debug;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// A raw, still-untyped configuration value as a source produced it.
pub type RawValue = Value;

/// Any producer of raw key/value pairs.
///
/// Implementations perform no validation and no precedence reasoning;
/// they only read and parse. A syntactically broken or unreachable
/// backing source fails the whole layer with [`SourceError`].
pub trait Source {
    /// Human-readable name used in layer metadata and error messages.
    fn name(&self) -> &str;

    /// Read the source into ordered pairs, preserving duplicates.
    fn entries(&self) -> Result<Vec<(String, RawValue)>, SourceError>;
}

/// One ordered configuration source with a precedence rank.
///
/// Built once per configured source during loading, never mutated
/// afterward. Lower ranks are applied first; higher ranks override.
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    precedence: i32,
    entries: Vec<(String, RawValue)>,
}

impl Layer {
    /// Read a source into a layer at the given precedence rank.
    pub fn load(precedence: i32, source: &dyn Source) -> Result<Self, SourceError> {
        let entries = source.entries()?;
        debug!(
            "loaded layer (name={}, precedence={}, entries={})",
            source.name(),
            precedence,
            entries.len()
        );
        Ok(Self {
            name: source.name().to_string(),
            precedence,
            entries,
        })
    }

    /// Build a layer directly from pairs, mainly for tests and embedders.
    pub fn from_pairs(
        name: impl Into<String>,
        precedence: i32,
        entries: Vec<(String, RawValue)>,
    ) -> Self {
        Self {
            name: name.into(),
            precedence,
            entries,
        }
    }

    /// The layer's name, carried into effective entries and reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The layer's precedence rank (lower = applied first).
    pub fn precedence(&self) -> i32 {
        self.precedence
    }

    /// The raw pairs in source order, duplicates included.
    pub fn entries(&self) -> &[(String, RawValue)] {
        &self.entries
    }
}

/// Flat declaration file: one `key = value` per line.
///
/// Values are JSON5 scalars (`"text"`, `3306`, `true`, `null`); blank
/// lines and `#` comments are skipped. This mirrors the flat
/// constant-declaration files the deployment previously used.
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    /// Create a file source with an explicit layer name.
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Source for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> Result<Vec<(String, RawValue)>, SourceError> {
        let contents = fs::read_to_string(&self.path).map_err(|err| SourceError::Unreadable {
            name: format!("{}({})", self.name, self.path.display()),
            source: err,
        })?;
        parse_declarations(&self.name, &contents)
    }
}

/// Parse flat `key = value` declarations, keeping duplicates in order.
fn parse_declarations(name: &str, contents: &str) -> Result<Vec<(String, RawValue)>, SourceError> {
    let mut entries = Vec::new();
    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, literal) = line.split_once('=').ok_or_else(|| SourceError::Malformed {
            name: name.to_string(),
            line: idx + 1,
            message: "expected `key = value`".to_string(),
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(SourceError::Malformed {
                name: name.to_string(),
                line: idx + 1,
                message: "empty key".to_string(),
            });
        }
        let value: Value =
            json5::from_str(literal.trim()).map_err(|err| SourceError::Malformed {
                name: name.to_string(),
                line: idx + 1,
                message: err.to_string(),
            })?;
        if value.is_array() || value.is_object() {
            return Err(SourceError::Malformed {
                name: name.to_string(),
                line: idx + 1,
                message: "expected a scalar value".to_string(),
            });
        }
        entries.push((key.to_string(), value));
    }
    Ok(entries)
}

/// Process environment variables under a prefix.
///
/// `ACCORD_DATABASE__HOST` becomes `database.host`: the prefix is
/// stripped, the rest lowercased, and `__` maps to `.`. Values stay
/// literal strings; the validator coerces them.
#[derive(Debug, Clone)]
pub struct EnvSource {
    name: String,
    prefix: String,
    vars: Vec<(String, String)>,
}

/// Default environment variable prefix for the Accord stack.
pub const DEFAULT_ENV_PREFIX: &str = "ACCORD_";

impl EnvSource {
    /// Capture the current process environment under the prefix.
    pub fn from_process(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::from_vars(name, prefix, std::env::vars())
    }

    /// Build from explicit variables, mainly for tests.
    pub fn from_vars(
        name: impl Into<String>,
        prefix: impl Into<String>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            vars: vars.into_iter().collect(),
        }
    }
}

impl Source for EnvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> Result<Vec<(String, RawValue)>, SourceError> {
        let mut entries: Vec<(String, RawValue)> = self
            .vars
            .iter()
            .filter_map(|(var, value)| {
                let rest = var.strip_prefix(&self.prefix)?;
                if rest.is_empty() {
                    return None;
                }
                let key = rest.to_ascii_lowercase().replace("__", ".");
                Some((key, Value::String(value.clone())))
            })
            .collect();
        // The process environment has no meaningful order.
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

/// In-code pairs, for tests and embedding applications.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    entries: Vec<(String, RawValue)>,
}

impl MemorySource {
    /// Wrap explicit pairs under a layer name.
    pub fn new(name: impl Into<String>, entries: Vec<(String, RawValue)>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }
}

impl Source for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> Result<Vec<(String, RawValue)>, SourceError> {
        Ok(self.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_declarations_with_comments_and_duplicates() {
        let contents = r#"
            # database
            database.host = "localhost"
            database.port = 3306
            app.debug = true
            redis.password = null

            database.port = 5432
        "#;
        let entries = parse_declarations("defaults", contents).expect("parse");
        assert_eq!(
            entries,
            vec![
                ("database.host".to_string(), json!("localhost")),
                ("database.port".to_string(), json!(3306)),
                ("app.debug".to_string(), json!(true)),
                ("redis.password".to_string(), json!(null)),
                ("database.port".to_string(), json!(5432)),
            ]
        );
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let err = parse_declarations("defaults", "database.host = \"ok\"\nnot a declaration")
            .unwrap_err();
        match err {
            SourceError::Malformed { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_non_scalar_values() {
        let err = parse_declarations("defaults", "upload.types = [\"pdf\"]").unwrap_err();
        assert!(matches!(err, SourceError::Malformed { line: 1, .. }));
    }

    #[test]
    fn env_source_maps_prefixed_variables() {
        let source = EnvSource::from_vars(
            "env",
            DEFAULT_ENV_PREFIX,
            vec![
                ("ACCORD_DATABASE__HOST".to_string(), "prod-db".to_string()),
                ("ACCORD_RATE_LIMIT__LOGIN".to_string(), "25".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
            ],
        );
        let entries = source.entries().expect("entries");
        assert_eq!(
            entries,
            vec![
                ("database.host".to_string(), json!("prod-db")),
                ("rate_limit.login".to_string(), json!("25")),
            ]
        );
    }

    #[test]
    fn missing_file_is_a_source_error() {
        let source = FileSource::new("defaults", "/nonexistent/accord.conf");
        let err = Layer::load(0, &source).unwrap_err();
        assert!(matches!(err, SourceError::Unreadable { .. }));
    }
}
