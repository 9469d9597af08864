//! Generic incremental provider.
//!
//! Feature generators all perform the same pull/cache/notify dance; the
//! differences are the producer kind and the pure build function. This
//! provider captures the dance once, so a generator is just a closure that
//! pulls its upstream values through the engine and returns its output (or
//! `None` when the artifact no longer exists).

use crate::engine::MetadataEngine;
use crate::provider::MetadataProvider;
use restitch_core::{Identifier, Metadata, ProducerKind, Resolution, RestitchResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::debug;

/// A [`MetadataProvider`] parameterized by a pure build function.
///
/// The build function must obey the engine's purity invariant: output is a
/// function of the identifier plus the `engine.get` values it reads.
///
/// `notify` implements the conventional recomputation dance:
/// 1. deregister `downstream`'s stale upstream edges;
/// 2. evict and recompute it (the build function re-registers whatever
///    upstream edges it currently needs, simply by pulling them);
/// 3. upgrade a class-level subscription to an instance-level edge for the
///    concrete upstream instance that fired;
/// 4. propagate further only when the recomputed value is valid AND differs
///    from the previously cached one.
pub struct IncrementalProvider<O, F>
where
    O: Into<Metadata>,
    F: Fn(&MetadataEngine, &Identifier) -> RestitchResult<Option<O>>,
{
    kind: ProducerKind,
    build: F,
    /// Upstream instance key -> our identifier, recorded when a wildcard
    /// subscription is upgraded. Lets the provider answer "which of my
    /// outputs tracks this instance" without re-resolving.
    instances: RefCell<HashMap<String, Identifier>>,
    _output: PhantomData<fn() -> O>,
}

impl<O, F> IncrementalProvider<O, F>
where
    O: Into<Metadata>,
    F: Fn(&MetadataEngine, &Identifier) -> RestitchResult<Option<O>>,
{
    pub fn new(kind: ProducerKind, build: F) -> Self {
        Self {
            kind,
            build,
            instances: RefCell::new(HashMap::new()),
            _output: PhantomData,
        }
    }

    /// The identifier recorded for an upgraded upstream instance key.
    pub fn local_identifier(&self, instance_key: &str) -> Option<Identifier> {
        self.instances.borrow().get(instance_key).cloned()
    }
}

impl<O, F> MetadataProvider for IncrementalProvider<O, F>
where
    O: Into<Metadata>,
    F: Fn(&MetadataEngine, &Identifier) -> RestitchResult<Option<O>>,
{
    fn provides_kind(&self) -> ProducerKind {
        self.kind.clone()
    }

    fn metadata(
        &self,
        engine: &MetadataEngine,
        id: &Identifier,
    ) -> RestitchResult<Resolution> {
        Ok(match (self.build)(engine, id)? {
            Some(output) => Resolution::Valid(output.into()),
            None => Resolution::Invalid,
        })
    }

    fn notify(
        &self,
        engine: &MetadataEngine,
        upstream: &Identifier,
        downstream: &Identifier,
    ) -> RestitchResult<()> {
        let prior = engine.cached(downstream);

        engine.registry().deregister_dependencies(downstream);
        engine.evict(downstream);
        let recomputed = engine.get(downstream)?;

        // Class-level -> instance-level upgrade: if the recomputation kept a
        // wildcard subscription covering the instance that fired, pin an
        // instance-level edge so future notifications are precise.
        if upstream.is_instance()
            && engine
                .registry()
                .has_dependency(&upstream.class_level(), downstream)
        {
            if let Some(key) = upstream.instance_key() {
                self.instances
                    .borrow_mut()
                    .insert(key.to_string(), downstream.clone());
            }
            engine.registry().register_dependency(upstream, downstream)?;
        }

        if !recomputed.is_valid() {
            debug!(%downstream, "recomputed invalid, branch terminates");
            return Ok(());
        }
        if prior.as_ref() == Some(&recomputed) {
            debug!(%downstream, "recomputed value unchanged, propagation suppressed");
            return Ok(());
        }
        engine.registry().notify_downstream(downstream, engine)
    }
}

// ============================================================================
// TESTS
// ============================================================================
