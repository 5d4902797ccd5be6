//! The immutable, validated configuration snapshot.

use crate::error::AccessError;
use crate::value::ConfigValue;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use url::Url;

/// Placeholder substituted for secret values in the redacted view.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

/// Immutable mapping from key to typed, validated value.
///
/// Produced once by a successful resolution and shared read-only for
/// the process lifetime; there is no mutation entry point. Optional
/// keys that resolved to no value are simply absent.
#[derive(Debug, Clone)]
pub struct Snapshot {
    values: BTreeMap<String, ConfigValue>,
    secrets: BTreeSet<String>,
}

impl Snapshot {
    pub(crate) fn new(values: BTreeMap<String, ConfigValue>, secrets: BTreeSet<String>) -> Self {
        Self { values, secrets }
    }

    /// String value for a key (also serves enum-typed keys).
    pub fn str_value(&self, key: &str) -> Result<&str, AccessError> {
        match self.lookup(key)? {
            ConfigValue::String(s) => Ok(s),
            other => Err(self.wrong_type(key, "string", other)),
        }
    }

    /// Integer value for a key.
    pub fn int_value(&self, key: &str) -> Result<i64, AccessError> {
        match self.lookup(key)? {
            ConfigValue::Integer(n) => Ok(*n),
            other => Err(self.wrong_type(key, "integer", other)),
        }
    }

    /// Boolean value for a key.
    pub fn bool_value(&self, key: &str) -> Result<bool, AccessError> {
        match self.lookup(key)? {
            ConfigValue::Boolean(b) => Ok(*b),
            other => Err(self.wrong_type(key, "boolean", other)),
        }
    }

    /// Filesystem path value for a key.
    pub fn path_value(&self, key: &str) -> Result<&Path, AccessError> {
        match self.lookup(key)? {
            ConfigValue::Path(p) => Ok(p),
            other => Err(self.wrong_type(key, "path", other)),
        }
    }

    /// URL value for a key.
    pub fn url_value(&self, key: &str) -> Result<&Url, AccessError> {
        match self.lookup(key)? {
            ConfigValue::Url(u) => Ok(u),
            other => Err(self.wrong_type(key, "url", other)),
        }
    }

    /// Whether a key resolved to a value.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Whether the schema flags this key as a secret.
    pub fn is_secret(&self, key: &str) -> bool {
        self.secrets.contains(key)
    }

    /// Resolved keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of resolved keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no keys resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// String rendering of every key with secrets replaced by a
    /// placeholder. The only configuration representation permitted in
    /// logs and diagnostics; never read it programmatically.
    pub fn redacted(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(key, value)| {
                let rendered = if self.secrets.contains(key) {
                    REDACTED_PLACEHOLDER.to_string()
                } else {
                    value.render()
                };
                (key.clone(), rendered)
            })
            .collect()
    }

    fn lookup(&self, key: &str) -> Result<&ConfigValue, AccessError> {
        self.values
            .get(key)
            .ok_or_else(|| AccessError::UnknownKey(key.to_string()))
    }

    fn wrong_type(&self, key: &str, requested: &'static str, actual: &ConfigValue) -> AccessError {
        AccessError::WrongType {
            key: key.to_string(),
            requested,
            actual: actual.value_type().name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn snapshot() -> Snapshot {
        let mut values = BTreeMap::new();
        values.insert(
            "database.host".to_string(),
            ConfigValue::String("localhost".to_string()),
        );
        values.insert("database.port".to_string(), ConfigValue::Integer(3306));
        values.insert(
            "database.password".to_string(),
            ConfigValue::String("hunter2".to_string()),
        );
        values.insert(
            "google.vision_service_account".to_string(),
            ConfigValue::Path(PathBuf::from("credentials/sa.json")),
        );
        let mut secrets = BTreeSet::new();
        secrets.insert("database.password".to_string());
        Snapshot::new(values, secrets)
    }

    #[test]
    fn typed_getters_return_declared_types() {
        let snapshot = snapshot();
        assert_eq!(snapshot.str_value("database.host"), Ok("localhost"));
        assert_eq!(snapshot.int_value("database.port"), Ok(3306));
        assert_eq!(
            snapshot.path_value("google.vision_service_account"),
            Ok(Path::new("credentials/sa.json"))
        );
    }

    #[test]
    fn wrong_type_is_a_caller_error() {
        let err = snapshot().int_value("database.host").unwrap_err();
        assert_eq!(
            err,
            AccessError::WrongType {
                key: "database.host".to_string(),
                requested: "integer",
                actual: "string",
            }
        );
    }

    #[test]
    fn unresolved_key_is_reported() {
        let err = snapshot().str_value("app.timezone").unwrap_err();
        assert_eq!(err, AccessError::UnknownKey("app.timezone".to_string()));
    }

    #[test]
    fn redacted_view_hides_secret_values() {
        let view = snapshot().redacted();
        assert_eq!(view["database.password"], REDACTED_PLACEHOLDER);
        assert_eq!(view["database.host"], "localhost");
        assert!(!view.values().any(|v| v.contains("hunter2")));
    }
}
