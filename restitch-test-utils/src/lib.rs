//! Restitch Test Utilities
//!
//! Centralized test infrastructure for the Restitch workspace: a spy
//! provider with per-identifier call counters and scriptable inputs, plus
//! convenience re-exports of the core vocabulary.

// Re-export core types for convenience
pub use restitch_core::{
    ArtifactNode, ContributionUnit, ContributionUnitBuilder, FieldSpec, Identifier,
    MemberSignature, Metadata, MethodSpec, ProducerKind, Resolution, RestitchResult, TargetType,
};
pub use restitch_engine::{MetadataEngine, MetadataProvider};

use serde_json::json;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

// ============================================================================
// SPY PROVIDER
// ============================================================================

/// A scriptable provider that counts its calls.
///
/// Its computed record embeds a settable local value (simulating the part of
/// the external type model this producer reads) plus every scripted upstream
/// value, so changing any input changes the output. `notify` performs the
/// conventional dance: deregister stale upstream edges, evict, recompute,
/// and propagate only when the recomputed value is valid and changed.
pub struct SpyProvider {
    kind: ProducerKind,
    /// Simulated external model input per identifier.
    locals: RefCell<HashMap<Identifier, serde_json::Value>>,
    /// Upstream identifiers each computation pulls.
    upstreams: RefCell<HashMap<Identifier, Vec<Identifier>>>,
    /// Identifiers this provider reports as non-existent.
    invalid: RefCell<HashSet<Identifier>>,
    metadata_calls: RefCell<HashMap<Identifier, usize>>,
    notify_calls: RefCell<HashMap<Identifier, usize>>,
}

impl SpyProvider {
    pub fn new(kind: &str) -> Rc<Self> {
        Rc::new(Self {
            kind: ProducerKind::new(kind).expect("valid test kind"),
            locals: RefCell::new(HashMap::new()),
            upstreams: RefCell::new(HashMap::new()),
            invalid: RefCell::new(HashSet::new()),
            metadata_calls: RefCell::new(HashMap::new()),
            notify_calls: RefCell::new(HashMap::new()),
        })
    }

    /// Script the local model input for one identifier.
    pub fn set_local(&self, id: &Identifier, value: serde_json::Value) {
        self.locals.borrow_mut().insert(id.clone(), value);
    }

    /// Script the upstream identifiers one computation pulls.
    pub fn set_upstreams(&self, id: &Identifier, upstreams: Vec<Identifier>) {
        self.upstreams.borrow_mut().insert(id.clone(), upstreams);
    }

    /// Mark an identifier as no longer existing.
    pub fn set_invalid(&self, id: &Identifier, invalid: bool) {
        if invalid {
            self.invalid.borrow_mut().insert(id.clone());
        } else {
            self.invalid.borrow_mut().remove(id);
        }
    }

    /// How many times `metadata` ran for `id`.
    pub fn metadata_count(&self, id: &Identifier) -> usize {
        self.metadata_calls.borrow().get(id).copied().unwrap_or(0)
    }

    /// How many times `notify` ran with `id` as the downstream.
    pub fn notify_count(&self, downstream: &Identifier) -> usize {
        self.notify_calls
            .borrow()
            .get(downstream)
            .copied()
            .unwrap_or(0)
    }
}

impl MetadataProvider for SpyProvider {
    fn provides_kind(&self) -> ProducerKind {
        self.kind.clone()
    }

    fn metadata(
        &self,
        engine: &MetadataEngine,
        id: &Identifier,
    ) -> RestitchResult<Resolution> {
        *self
            .metadata_calls
            .borrow_mut()
            .entry(id.clone())
            .or_insert(0) += 1;

        if self.invalid.borrow().contains(id) {
            return Ok(Resolution::Invalid);
        }

        let pulls = self
            .upstreams
            .borrow()
            .get(id)
            .cloned()
            .unwrap_or_default();
        let mut upstream_values = Vec::with_capacity(pulls.len());
        for upstream in &pulls {
            let value = engine.get(upstream)?;
            upstream_values.push(match value {
                Resolution::Valid(metadata) => {
                    serde_json::to_value(&metadata).expect("metadata serializes")
                }
                Resolution::Invalid => serde_json::Value::Null,
            });
        }

        let local = self
            .locals
            .borrow()
            .get(id)
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        Ok(Resolution::Valid(Metadata::Record(json!({
            "id": id.to_string(),
            "local": local,
            "upstream": upstream_values,
        }))))
    }

    fn notify(
        &self,
        engine: &MetadataEngine,
        _upstream: &Identifier,
        downstream: &Identifier,
    ) -> RestitchResult<()> {
        *self
            .notify_calls
            .borrow_mut()
            .entry(downstream.clone())
            .or_insert(0) += 1;

        let prior = engine.cached(downstream);
        engine.registry().deregister_dependencies(downstream);
        engine.evict(downstream);
        let recomputed = engine.get(downstream)?;

        if !recomputed.is_valid() {
            return Ok(());
        }
        if prior.as_ref() == Some(&recomputed) {
            return Ok(());
        }
        engine.registry().notify_downstream(downstream, engine)
    }
}
