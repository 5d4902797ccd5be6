//! Merging ordered layers into one effective key/value map.

use crate::error::ConflictViolation;
use crate::source::{Layer, RawValue};
use log::{debug, warn};
use std::collections::{BTreeMap, HashSet};

/// A key's resolved raw value and the layer it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveEntry {
    /// The winning raw value, still untyped.
    pub value: RawValue,
    /// Name of the layer that supplied the value.
    pub layer: String,
}

/// The merged raw configuration before validation.
pub type EffectiveMap = BTreeMap<String, EffectiveEntry>;

/// Merge layers in ascending precedence order.
///
/// A key repeated across layers is an override: the higher-precedence
/// layer wins and the origin is updated. A key repeated *within* one
/// layer is a conflict; all conflicts are collected and, if any exist,
/// no effective map is produced. Ties in precedence keep the supplied
/// order (stable sort), so later layers win among equals.
pub fn merge(layers: &[Layer]) -> Result<EffectiveMap, Vec<ConflictViolation>> {
    let mut ordered: Vec<&Layer> = layers.iter().collect();
    ordered.sort_by_key(|layer| layer.precedence());

    let mut effective = EffectiveMap::new();
    let mut conflicts = Vec::new();

    for layer in ordered {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut flagged: HashSet<&str> = HashSet::new();
        for (key, value) in layer.entries() {
            if !seen.insert(key.as_str()) {
                if flagged.insert(key.as_str()) {
                    warn!(
                        "duplicate key within layer (key={}, layer={})",
                        key,
                        layer.name()
                    );
                    conflicts.push(ConflictViolation {
                        key: key.clone(),
                        layer: layer.name().to_string(),
                    });
                }
                continue;
            }
            if let Some(previous) = effective.get(key) {
                debug!(
                    "override (key={}, from={}, to={})",
                    key, previous.layer, layer.name()
                );
            }
            effective.insert(
                key.clone(),
                EffectiveEntry {
                    value: value.clone(),
                    layer: layer.name().to_string(),
                },
            );
        }
    }

    if conflicts.is_empty() {
        Ok(effective)
    } else {
        Err(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn layer(name: &str, precedence: i32, pairs: &[(&str, RawValue)]) -> Layer {
        Layer::from_pairs(
            name,
            precedence,
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
        )
    }

    #[test]
    fn higher_precedence_layer_overrides() {
        let defaults = layer(
            "defaults",
            0,
            &[
                ("database.host", json!("localhost")),
                ("database.port", json!(3306)),
            ],
        );
        let overrides = layer("override", 1, &[("database.host", json!("prod-db.example.com"))]);

        let effective = merge(&[defaults, overrides]).expect("merge");
        assert_eq!(effective["database.host"].value, json!("prod-db.example.com"));
        assert_eq!(effective["database.host"].layer, "override");
        assert_eq!(effective["database.port"].value, json!(3306));
        assert_eq!(effective["database.port"].layer, "defaults");
    }

    #[test]
    fn layer_order_is_precedence_not_argument_order() {
        let low = layer("defaults", 0, &[("app.timezone", json!("UTC"))]);
        let high = layer("override", 1, &[("app.timezone", json!("Europe/Berlin"))]);

        let effective = merge(&[high, low]).expect("merge");
        assert_eq!(effective["app.timezone"].layer, "override");
    }

    #[test]
    fn duplicate_within_one_layer_is_fatal() {
        let broken = layer(
            "defaults",
            0,
            &[
                ("database.port", json!("3306")),
                ("database.port", json!("5432")),
            ],
        );
        let fine = layer("override", 1, &[("database.host", json!("prod-db"))]);

        let conflicts = merge(&[broken, fine]).unwrap_err();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].key, "database.port");
        assert_eq!(conflicts[0].layer, "defaults");
    }

    #[test]
    fn all_conflicts_are_collected() {
        let first = layer(
            "defaults",
            0,
            &[
                ("redis.port", json!(6379)),
                ("redis.port", json!(6380)),
            ],
        );
        let second = layer(
            "override",
            1,
            &[
                ("app.debug", json!(true)),
                ("app.debug", json!(false)),
                ("app.debug", json!(true)),
            ],
        );

        let conflicts = merge(&[first, second]).unwrap_err();
        let keys: Vec<_> = conflicts.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["redis.port", "app.debug"]);
    }
}
