//! The provider contract implemented by feature generators.

use crate::engine::MetadataEngine;
use restitch_core::{Identifier, ProducerKind, Resolution, RestitchResult};

/// A component that computes one kind of artifact from its identifier and
/// upstream dependencies.
///
/// # Purity invariant
///
/// `metadata(id)` must be a pure function of `id` plus whatever
/// `engine.get(upstream)` values it reads during its own execution. It must
/// not consult mutable state the engine cannot observe, or invalidation
/// becomes unsound: the engine would serve a cached value computed from
/// inputs it never saw change.
///
/// # Statelessness
///
/// Providers own nothing across calls, with one sanctioned exception: the
/// local instance-to-identifier table used for the class-level to
/// instance-level subscription upgrade (see [`crate::incremental`]).
pub trait MetadataProvider {
    /// The producer kind this provider computes.
    fn provides_kind(&self) -> ProducerKind;

    /// Compute the value for `id`, pulling upstream values via
    /// `engine.get`. Returning `Resolution::Invalid` is the normal way to
    /// say "no such artifact"; an `Err` is a computation failure and leaves
    /// the identifier's cache entry invalid.
    fn metadata(
        &self,
        engine: &MetadataEngine,
        id: &Identifier,
    ) -> RestitchResult<Resolution>;

    /// React to a change of `upstream` observed for our `downstream`
    /// identifier. The conventional implementation deregisters
    /// `downstream`'s stale upstream edges, evicts and recomputes it, and
    /// propagates further only when the recomputed value is valid and
    /// actually changed.
    fn notify(
        &self,
        engine: &MetadataEngine,
        upstream: &Identifier,
        downstream: &Identifier,
    ) -> RestitchResult<()>;
}
