//! Notification propagation for externally observed changes.

use crate::engine::MetadataEngine;
use restitch_core::{Identifier, Resolution, RestitchResult};
use tracing::debug;

/// Handle an external change notification for `id`.
///
/// Evicts and recomputes `id`, then walks its downstream identifiers: each
/// downstream's owning provider runs its `notify`, which conventionally
/// recomputes that identifier and recurses while values stay valid and keep
/// changing. The branch stops as soon as a recomputed value is
/// `Resolution::Invalid` - nothing further downstream needs to hear about
/// an artifact that no longer exists.
///
/// The whole cascade runs synchronously on the calling thread. Provider
/// failures inside the cascade stop only their own branch; a failure
/// recomputing `id` itself is returned to the caller with `id`'s cache
/// entry left invalid.
pub fn propagate_change(
    engine: &MetadataEngine,
    id: &Identifier,
) -> RestitchResult<Resolution> {
    debug!(%id, "external change observed");
    engine.evict(id);
    let resolution = engine.get(id)?;
    if !resolution.is_valid() {
        debug!(%id, "recomputed invalid, cascade stops at the changed node");
        return Ok(resolution);
    }
    engine.registry().notify_downstream(id, engine)?;
    Ok(resolution)
}

// ============================================================================
// TESTS
// ============================================================================
