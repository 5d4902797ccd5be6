//! Configuration resolution and validation engine for Accord.
//!
//! This crate owns the configuration schema, the layered source
//! loading, the merge/conflict policy, and the validated snapshot the
//! rest of the stack reads from. Resolution is a one-shot, synchronous
//! sequence run before any consumer starts: load layers, merge them in
//! precedence order, validate everything against the schema, freeze
//! the result. It either yields an immutable [`Snapshot`] or fails
//! atomically with a report enumerating every violation found.

mod error;
mod merge;
pub mod schema;
mod snapshot;
mod source;
mod validate;
mod value;

pub use error::{
    AccessError, ConfigError, ConflictViolation, SchemaError, SourceError, ValidationViolation,
    ViolationKind,
};
pub use merge::{EffectiveEntry, EffectiveMap, merge};
pub use schema::{Constraints, SchemaEntry, SchemaRegistry};
pub use snapshot::{REDACTED_PLACEHOLDER, Snapshot};
pub use source::{DEFAULT_ENV_PREFIX, EnvSource, FileSource, Layer, MemorySource, RawValue, Source};
pub use validate::validate;
pub use value::{ConfigValue, ValueType};

use log::info;

/// Resolve loaded layers into a validated snapshot.
///
/// Runs the merge and validation stages over layers the caller already
/// loaded. Merge conflicts and validation violations each fail the
/// whole resolution; partial configuration is never produced.
pub fn resolve(registry: &SchemaRegistry, layers: &[Layer]) -> Result<Snapshot, ConfigError> {
    info!(
        "resolving configuration (layers={}, schema_keys={})",
        layers.len(),
        registry.len()
    );
    let effective = merge(layers).map_err(ConfigError::Conflict)?;
    let snapshot = validate(&effective, registry).map_err(ConfigError::Validation)?;
    info!("configuration resolved (keys={})", snapshot.len());
    Ok(snapshot)
}

/// Load each source into a layer and resolve in one call.
///
/// Sources are ranked by their position: the first is precedence 0,
/// each following source overrides the ones before it.
pub fn resolve_sources(
    registry: &SchemaRegistry,
    sources: &[&dyn Source],
) -> Result<Snapshot, ConfigError> {
    let mut layers = Vec::with_capacity(sources.len());
    for (rank, source) in sources.iter().enumerate() {
        layers.push(Layer::load(rank as i32, *source)?);
    }
    resolve(registry, &layers)
}
