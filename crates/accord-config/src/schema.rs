//! Schema registry: the static declaration of every recognized key.

use crate::error::{SchemaError, ViolationKind};
use crate::value::{self, ConfigValue, ValueType};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// Constraints applied after a value coerces to its declared type.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    /// Inclusive lower bound for integers.
    pub min: Option<i64>,
    /// Inclusive upper bound for integers.
    pub max: Option<i64>,
    /// Allowed values for enum-typed keys.
    pub allowed: Vec<String>,
    /// Compiled pattern for string-typed keys.
    pub pattern: Option<Regex>,
}

impl Constraints {
    /// Check a coerced value, returning the violation kind and detail on failure.
    pub(crate) fn check(&self, value: &ConfigValue) -> Result<(), (ViolationKind, String)> {
        if let ConfigValue::Integer(n) = value {
            if let Some(min) = self.min
                && *n < min
            {
                return Err((
                    ViolationKind::OutOfRange,
                    format!("{n} is below the minimum of {min}"),
                ));
            }
            if let Some(max) = self.max
                && *n > max
            {
                return Err((
                    ViolationKind::OutOfRange,
                    format!("{n} is above the maximum of {max}"),
                ));
            }
        }
        if let ConfigValue::String(s) = value {
            if !self.allowed.is_empty() && !self.allowed.iter().any(|a| a == s) {
                return Err((
                    ViolationKind::NotInEnum,
                    format!("\"{s}\" is not one of [{}]", self.allowed.join(", ")),
                ));
            }
            if let Some(pattern) = &self.pattern
                && !pattern.is_match(s)
            {
                return Err((
                    ViolationKind::PatternMismatch,
                    format!("\"{s}\" does not match /{}/", pattern.as_str()),
                ));
            }
        }
        Ok(())
    }
}

/// Declaration of a single recognized configuration key.
#[derive(Debug, Clone)]
pub struct SchemaEntry {
    key: String,
    ty: ValueType,
    required: bool,
    default: Option<Value>,
    pattern_source: Option<String>,
    constraints: Constraints,
    secret: bool,
}

impl SchemaEntry {
    /// Start declaring a key of the given semantic type. Entries are
    /// optional with no default until the builder says otherwise.
    pub fn new(key: impl Into<String>, ty: ValueType) -> Self {
        Self {
            key: key.into(),
            ty,
            required: false,
            default: None,
            pattern_source: None,
            constraints: Constraints::default(),
            secret: false,
        }
    }

    /// Mark the key as required: absent from every layer with no default
    /// becomes a fatal `missing-required` violation.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declare a default raw value, applied when no layer supplies the key.
    /// Defaults go through the same coercion and constraint checks as layer
    /// values when the registry is built.
    pub fn default(mut self, raw: impl Into<Value>) -> Self {
        self.default = Some(raw.into());
        self
    }

    /// Declare an inclusive integer range.
    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.constraints.min = Some(min);
        self.constraints.max = Some(max);
        self
    }

    /// Declare the allowed value set for an enum-typed key.
    pub fn allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    /// Declare a regex the value must match; compiled when the registry is built.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern_source = Some(pattern.into());
        self
    }

    /// Flag the value as a secret, replaced by a placeholder in the redacted view.
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// The key this entry declares.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The declared semantic type.
    pub fn value_type(&self) -> ValueType {
        self.ty
    }

    /// Whether a value must be present (directly or via default).
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The declared default raw value, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The declared constraints.
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Whether the value must never appear in logs or diagnostics.
    pub fn is_secret(&self) -> bool {
        self.secret
    }
}

/// Read-only registry of every recognized key, built once at startup.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    entries: BTreeMap<String, SchemaEntry>,
}

impl SchemaRegistry {
    /// Build a registry from entry declarations.
    ///
    /// Fails if two entries declare the same key, a pattern does not
    /// compile, or an entry's default violates its own type or constraints.
    pub fn register(entries: Vec<SchemaEntry>) -> Result<Self, SchemaError> {
        let mut map = BTreeMap::new();
        for mut entry in entries {
            if let Some(source) = entry.pattern_source.take() {
                let pattern = Regex::new(&source).map_err(|err| SchemaError::BadPattern {
                    key: entry.key.clone(),
                    message: err.to_string(),
                })?;
                entry.constraints.pattern = Some(pattern);
            }
            if let Some(default) = &entry.default {
                check_default(&entry, default)?;
            }
            let key = entry.key.clone();
            if map.insert(key.clone(), entry).is_some() {
                return Err(SchemaError::DuplicateKey(key));
            }
        }
        Ok(Self { entries: map })
    }

    /// Look up the entry for a key.
    pub fn get(&self, key: &str) -> Option<&SchemaEntry> {
        self.entries.get(key)
    }

    /// Iterate over all declared entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.entries.values()
    }

    /// Number of declared keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry declares no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Run a default through the same checks layer values get.
fn check_default(entry: &SchemaEntry, default: &Value) -> Result<(), SchemaError> {
    let coerced = value::coerce(default, entry.ty).map_err(|message| SchemaError::InvalidDefault {
        key: entry.key.clone(),
        message,
    })?;
    entry
        .constraints
        .check(&coerced)
        .map_err(|(_, message)| SchemaError::InvalidDefault {
            key: entry.key.clone(),
            message,
        })
}

/// The full schema for an Accord deployment.
///
/// Covers every constant family the stack reads: application identity,
/// MySQL, Redis, RabbitMQ, the Soketi websocket broker, the AI/OCR
/// worker, Google Cloud integrations, upload rules, and rate limits.
/// Passwords, API keys, and app secrets are flagged secret.
pub fn application() -> Result<SchemaRegistry, SchemaError> {
    use ValueType::*;

    SchemaRegistry::register(vec![
        SchemaEntry::new("app.env", Enum)
            .required()
            .default("development")
            .allowed(["development", "staging", "production"]),
        SchemaEntry::new("app.url", Url).required(),
        SchemaEntry::new("app.debug", Boolean).default(false),
        SchemaEntry::new("app.timezone", String).default("UTC"),
        SchemaEntry::new("database.connection", Enum)
            .default("mysql")
            .allowed(["mysql", "mariadb"]),
        SchemaEntry::new("database.host", String).required(),
        SchemaEntry::new("database.port", Integer)
            .default(3306)
            .range(1, 65535),
        SchemaEntry::new("database.name", String).default("agreement_db"),
        SchemaEntry::new("database.username", String).required(),
        SchemaEntry::new("database.password", String).required().secret(),
        SchemaEntry::new("database.charset", String).default("utf8mb4"),
        SchemaEntry::new("redis.host", String).default("redis"),
        SchemaEntry::new("redis.port", Integer).default(6379).range(1, 65535),
        SchemaEntry::new("redis.password", String).secret(),
        SchemaEntry::new("redis.db", Integer).default(0).range(0, 15),
        SchemaEntry::new("rabbitmq.host", String).default("rabbitmq"),
        SchemaEntry::new("rabbitmq.port", Integer)
            .default(5672)
            .range(1, 65535),
        SchemaEntry::new("rabbitmq.username", String).required(),
        SchemaEntry::new("rabbitmq.password", String).required().secret(),
        SchemaEntry::new("rabbitmq.vhost", String).default("/"),
        SchemaEntry::new("soketi.host", String).default("soketi"),
        SchemaEntry::new("soketi.port", Integer).default(6001).range(1, 65535),
        SchemaEntry::new("soketi.app_id", String).required(),
        SchemaEntry::new("soketi.app_key", String).required().secret(),
        SchemaEntry::new("soketi.app_secret", String).required().secret(),
        SchemaEntry::new("ocr.enabled", Boolean).default(true),
        SchemaEntry::new("ocr.cpu_cores", Integer).default(4).range(1, 64),
        SchemaEntry::new("ocr.ram_mb", Integer).default(4096).range(256, 65536),
        SchemaEntry::new("google.oauth_client_id", String),
        SchemaEntry::new("google.oauth_client_secret", String).secret(),
        SchemaEntry::new("google.redirect_uri", Url),
        SchemaEntry::new("google.vision_enabled", Boolean).default(true),
        SchemaEntry::new("google.vision_service_account", Path)
            .default("backend/storage/credentials/service-account.json"),
        SchemaEntry::new("google.gemini_api_key_primary", String).secret(),
        SchemaEntry::new("google.gemini_api_key_fallback", String).secret(),
        SchemaEntry::new("google.drive_enabled", Boolean).default(false),
        SchemaEntry::new("google.calendar_enabled", Boolean).default(false),
        SchemaEntry::new("upload.max_size_mb", Integer).default(20).range(1, 100),
        SchemaEntry::new("upload.allowed_types", String)
            .default("pdf")
            .pattern("^[a-z0-9]+(,[a-z0-9]+)*$"),
        SchemaEntry::new("rate_limit.login", Integer).default(10).range(1, 1000),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_duplicate_keys() {
        let err = SchemaRegistry::register(vec![
            SchemaEntry::new("database.host", ValueType::String),
            SchemaEntry::new("database.host", ValueType::String),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateKey(key) if key == "database.host"));
    }

    #[test]
    fn rejects_default_outside_declared_range() {
        let err = SchemaRegistry::register(vec![
            SchemaEntry::new("upload.max_size_mb", ValueType::Integer)
                .default(500)
                .range(1, 100),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefault { key, .. } if key == "upload.max_size_mb"));
    }

    #[test]
    fn rejects_default_of_wrong_type() {
        let err = SchemaRegistry::register(vec![
            SchemaEntry::new("app.debug", ValueType::Boolean).default("sometimes"),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefault { .. }));
    }

    #[test]
    fn rejects_unparsable_pattern() {
        let err = SchemaRegistry::register(vec![
            SchemaEntry::new("upload.allowed_types", ValueType::String).pattern("(["),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::BadPattern { .. }));
    }

    #[test]
    fn application_schema_builds() {
        let registry = application().expect("schema");
        assert!(registry.get("database.host").is_some());
        assert!(registry.get("database.password").expect("entry").is_secret());
        assert_eq!(
            registry.get("upload.max_size_mb").expect("entry").value_type(),
            ValueType::Integer
        );
    }
}
