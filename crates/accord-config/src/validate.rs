//! Exhaustive validation of the effective map against the schema.

use crate::error::{ValidationViolation, ViolationKind};
use crate::merge::EffectiveMap;
use crate::schema::{SchemaEntry, SchemaRegistry};
use crate::snapshot::Snapshot;
use crate::value::{self, ConfigValue};
use log::debug;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Validate every effective value against the registry.
///
/// All applicable checks run and every violation is collected before
/// anything is reported; a non-empty violation list means no snapshot.
/// Registry defaults fill absent keys and go through the same
/// constraint checks as layer values. A raw `null` counts as unset.
pub fn validate(
    effective: &EffectiveMap,
    registry: &SchemaRegistry,
) -> Result<Snapshot, Vec<ValidationViolation>> {
    let mut values = BTreeMap::new();
    let mut secrets = BTreeSet::new();
    let mut violations = Vec::new();

    for entry in registry.entries() {
        let supplied = effective
            .get(entry.key())
            .map(|e| &e.value)
            .filter(|raw| !raw.is_null());
        let raw = match supplied.or(entry.default_value()) {
            Some(raw) => raw,
            None => {
                if entry.is_required() {
                    violations.push(ValidationViolation::new(
                        entry.key(),
                        ViolationKind::MissingRequired,
                        "required key absent from every layer and has no default",
                    ));
                }
                continue;
            }
        };
        match check_value(entry, raw) {
            Ok(value) => {
                if entry.is_secret() {
                    secrets.insert(entry.key().to_string());
                }
                values.insert(entry.key().to_string(), value);
            }
            Err(violation) => violations.push(violation),
        }
    }

    for key in effective.keys() {
        if registry.get(key).is_none() {
            let origin = &effective[key].layer;
            violations.push(ValidationViolation::new(
                key,
                ViolationKind::UnknownKey,
                format!("not declared in the schema (supplied by layer \"{origin}\")"),
            ));
        }
    }

    if violations.is_empty() {
        debug!("validation passed (keys={})", values.len());
        Ok(Snapshot::new(values, secrets))
    } else {
        debug!("validation failed (violations={})", violations.len());
        Err(violations)
    }
}

/// Coerce one raw value and apply its constraints.
fn check_value(entry: &SchemaEntry, raw: &Value) -> Result<ConfigValue, ValidationViolation> {
    let value = value::coerce(raw, entry.value_type()).map_err(|message| {
        ValidationViolation::new(entry.key(), ViolationKind::TypeMismatch, message)
    })?;
    entry
        .constraints()
        .check(&value)
        .map_err(|(kind, message)| ValidationViolation::new(entry.key(), kind, message))?;
    Ok(value)
}
