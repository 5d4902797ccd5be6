//! Error types for schema construction, source loading, and resolution.

use serde::Serialize;
use std::fmt::Write as _;
use thiserror::Error;

/// Errors raised while building a [`crate::SchemaRegistry`].
///
/// These indicate a mistake in the static schema declaration itself and
/// should never occur with a deployed binary.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Two schema entries declare the same key.
    #[error("duplicate schema key: {0}")]
    DuplicateKey(String),
    /// An entry's default value fails its own type or constraints.
    #[error("default for {key} violates its own schema: {message}")]
    InvalidDefault { key: String, message: String },
    /// A pattern constraint failed to compile.
    #[error("invalid pattern for {key}: {message}")]
    BadPattern { key: String, message: String },
}

/// Errors raised while reading a single configuration source.
///
/// Reported per layer, never mixed into validation violations: an
/// unreachable or syntactically broken source fails the whole layer.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reading the backing source failed.
    #[error("failed to read source {name}: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: std::io::Error,
    },
    /// A declaration line could not be parsed.
    #[error("malformed entry in {name} at line {line}: {message}")]
    Malformed {
        name: String,
        line: usize,
        message: String,
    },
}

/// A key defined more than once within a single layer.
///
/// Always fatal: a source contradicting itself cannot be trusted to
/// produce a sane value for the key. Cross-layer redefinition is an
/// override, not a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictViolation {
    /// The duplicated key.
    pub key: String,
    /// Name of the layer containing the duplicate.
    pub layer: String,
}

impl std::fmt::Display for ConflictViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: duplicate key in layer \"{}\"", self.key, self.layer)
    }
}

/// The reason a value failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// A required key without a default is absent from every layer.
    MissingRequired,
    /// The raw value cannot be coerced to the declared type.
    TypeMismatch,
    /// An integer falls outside its declared range.
    OutOfRange,
    /// A value is not in the declared allowed set.
    NotInEnum,
    /// A string does not match the declared pattern.
    PatternMismatch,
    /// The key does not exist in the schema.
    UnknownKey,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::MissingRequired => "missing-required",
            Self::TypeMismatch => "type-mismatch",
            Self::OutOfRange => "out-of-range",
            Self::NotInEnum => "not-in-enum",
            Self::PatternMismatch => "pattern-mismatch",
            Self::UnknownKey => "unknown-key",
        };
        f.write_str(label)
    }
}

/// A single validation failure for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationViolation {
    /// The offending key.
    pub key: String,
    /// Why the value was rejected.
    pub kind: ViolationKind,
    /// Human-readable detail for the report.
    pub detail: String,
}

impl ValidationViolation {
    pub(crate) fn new(key: &str, kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            kind,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for ValidationViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.key, self.kind, self.detail)
    }
}

/// Top-level error for configuration resolution.
///
/// Each variant corresponds to one failure class; resolution fails
/// atomically, so a caller never receives a partial snapshot alongside
/// any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The static schema declaration is broken.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    /// A layer's backing source could not be read or parsed.
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    /// One or more layers contained duplicate keys.
    #[error("merge conflict:\n{}", render_list(.0))]
    Conflict(Vec<ConflictViolation>),
    /// One or more values failed validation.
    #[error("invalid configuration ({} violation[s]):\n{}", .0.len(), render_list(.0))]
    Validation(Vec<ValidationViolation>),
}

/// Errors returned by the typed snapshot accessors.
///
/// Validation already guaranteed schema conformance, so hitting one of
/// these indicates a caller bug, not bad deployment input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The key was never resolved into the snapshot.
    #[error("no resolved value for key: {0}")]
    UnknownKey(String),
    /// The caller requested a type other than the schema's.
    #[error("wrong type for {key}: requested {requested}, schema declares {actual}")]
    WrongType {
        key: String,
        requested: &'static str,
        actual: &'static str,
    },
}

/// Render one violation per indented line for the structured report.
fn render_list(items: &[impl std::fmt::Display]) -> String {
    let mut out = String::new();
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        let _ = write!(out, "  - {item}");
    }
    out
}
