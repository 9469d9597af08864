//! The metadata engine: memoized pull-based resolution through providers.
//!
//! One `MetadataEngine` is the composition root of a run. It owns the
//! provider table, the cache, and the dependency registry, and is shared by
//! reference with every provider. Resolution is re-entrant: a provider's
//! `metadata` routinely calls `engine.get` for its upstream identifiers
//! while already inside an outer `get`.

use crate::provider::MetadataProvider;
use crate::registry::DependencyRegistry;
use restitch_core::{
    EngineError, GraphError, Identifier, ProducerKind, Resolution, RestitchResult,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// Memoized cache and provider dispatcher.
#[derive(Default)]
pub struct MetadataEngine {
    providers: RefCell<HashMap<ProducerKind, Rc<dyn MetadataProvider>>>,
    /// Cache entries are created lazily on first `get`. A stored
    /// `Resolution::Invalid` is a negative entry: a valid "no metadata"
    /// state, distinct from "not yet computed".
    cache: RefCell<HashMap<Identifier, Resolution>>,
    /// Stack of identifiers currently being computed. The top is the
    /// downstream for automatic edge registration; membership detects
    /// resolution cycles.
    computing: RefCell<Vec<Identifier>>,
    registry: DependencyRegistry,
}

impl MetadataEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dependency registry owned by this engine.
    pub fn registry(&self) -> &DependencyRegistry {
        &self.registry
    }

    /// Register a provider. At most one provider may serve a producer kind;
    /// a second registration for an occupied kind fails fast.
    pub fn register_provider(&self, provider: Rc<dyn MetadataProvider>) -> RestitchResult<()> {
        let kind = provider.provides_kind();
        let mut providers = self.providers.borrow_mut();
        if providers.contains_key(&kind) {
            return Err(EngineError::DuplicateProvider { kind }.into());
        }
        debug!(%kind, "provider registered");
        providers.insert(kind, provider);
        Ok(())
    }

    /// Remove the provider for `kind`, if any.
    ///
    /// Precondition: the provider has called
    /// [`DependencyRegistry::deregister_dependencies`] for all of its
    /// outputs. Cached values of the kind are evicted so nothing keeps
    /// serving output of an unregistered provider.
    pub fn deregister_provider(
        &self,
        kind: &ProducerKind,
    ) -> Option<Rc<dyn MetadataProvider>> {
        let removed = self.providers.borrow_mut().remove(kind);
        if removed.is_some() {
            self.cache
                .borrow_mut()
                .retain(|id, _| id.producer_kind() != kind);
            debug!(%kind, "provider deregistered");
        }
        removed
    }

    /// The provider serving `kind`, if any.
    pub fn provider_for(&self, kind: &ProducerKind) -> Option<Rc<dyn MetadataProvider>> {
        self.providers.borrow().get(kind).cloned()
    }

    /// Resolve `id`, recomputing through its provider only on a cache miss.
    ///
    /// Called from inside another computation, this also registers the
    /// dependency edge `(id, currently-computing identifier)` - pulling a
    /// value IS subscribing to it.
    ///
    /// A missing provider is not an error: many lookups are speculative, so
    /// the result is a cached `Resolution::Invalid`. A provider failure
    /// leaves the entry `Invalid` (never partially populated) and reports
    /// the failure to the caller; unrelated identifiers are unaffected.
    pub fn get(&self, id: &Identifier) -> RestitchResult<Resolution> {
        let current = self.computing.borrow().last().cloned();
        if self.computing.borrow().iter().any(|computing| computing == id) {
            // Resolution cycle: id is already being computed further up
            // this stack. Fail instead of recursing forever.
            return Err(GraphError::CyclicDependency {
                upstream: id.clone(),
                downstream: current.unwrap_or_else(|| id.clone()),
            }
            .into());
        }
        if let Some(downstream) = &current {
            self.registry.register_dependency(id, downstream)?;
        }

        if let Some(cached) = self.cache.borrow().get(id) {
            debug!(%id, "cache hit");
            return Ok(cached.clone());
        }

        let Some(provider) = self.provider_for(id.producer_kind()) else {
            debug!(%id, "no provider, caching negative entry");
            self.cache
                .borrow_mut()
                .insert(id.clone(), Resolution::Invalid);
            return Ok(Resolution::Invalid);
        };

        debug!(%id, "cache miss, dispatching");
        self.computing.borrow_mut().push(id.clone());
        let computed = provider.metadata(self, id);
        self.computing.borrow_mut().pop();

        match computed {
            Ok(resolution) => {
                self.cache.borrow_mut().insert(id.clone(), resolution.clone());
                Ok(resolution)
            }
            Err(error) => {
                warn!(%id, %error, "provider failed, entry left invalid");
                self.cache
                    .borrow_mut()
                    .insert(id.clone(), Resolution::Invalid);
                Err(EngineError::ProviderFailed {
                    id: id.clone(),
                    reason: error.to_string(),
                }
                .into())
            }
        }
    }

    /// Drop the cache entry for `id`; the next `get` recomputes it.
    pub fn evict(&self, id: &Identifier) {
        if self.cache.borrow_mut().remove(id).is_some() {
            debug!(%id, "evicted");
        }
    }

    /// The cached resolution for `id`, without triggering computation.
    pub fn cached(&self, id: &Identifier) -> Option<Resolution> {
        self.cache.borrow().get(id).cloned()
    }
}

// ============================================================================
// TESTS
// ============================================================================
