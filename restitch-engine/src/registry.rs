//! Dependency registry: the directed invalidation graph over identifiers.
//!
//! Edges run `(upstream, downstream)` and are ephemeral: a provider replaces
//! its downstream identifier's full upstream set on each recomputation by
//! calling [`DependencyRegistry::deregister_dependencies`] first, so stale
//! subscriptions never accumulate.

use crate::engine::MetadataEngine;
use restitch_core::{GraphError, Identifier, RestitchResult};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Directed dependency graph with insertion-ordered downstream lists.
///
/// Downstream lists keep registration order so notification order is
/// deterministic. Interior mutability via `RefCell`: providers register and
/// deregister edges while a notification walk is already on the stack.
#[derive(Default)]
pub struct DependencyRegistry {
    /// upstream -> downstreams, in registration order.
    edges: RefCell<HashMap<Identifier, Vec<Identifier>>>,
    /// Identifiers currently being notified, guarding against indirect
    /// notification cycles re-entering the same node.
    notifying: RefCell<HashSet<Identifier>>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `downstream` as depending on `upstream`. Idempotent.
    ///
    /// A self-loop is rejected with [`GraphError::CyclicDependency`] and no
    /// edge is added.
    pub fn register_dependency(
        &self,
        upstream: &Identifier,
        downstream: &Identifier,
    ) -> RestitchResult<()> {
        if upstream == downstream {
            return Err(GraphError::CyclicDependency {
                upstream: upstream.clone(),
                downstream: downstream.clone(),
            }
            .into());
        }
        let mut edges = self.edges.borrow_mut();
        let downstreams = edges.entry(upstream.clone()).or_default();
        if !downstreams.contains(downstream) {
            debug!(%upstream, %downstream, "dependency registered");
            downstreams.push(downstream.clone());
        }
        Ok(())
    }

    /// Remove one edge. No-op if absent.
    pub fn deregister_dependency(&self, upstream: &Identifier, downstream: &Identifier) {
        let mut edges = self.edges.borrow_mut();
        if let Some(downstreams) = edges.get_mut(upstream) {
            downstreams.retain(|d| d != downstream);
            if downstreams.is_empty() {
                edges.remove(upstream);
            }
        }
    }

    /// Remove every edge terminating at `downstream`.
    ///
    /// Called by a provider at the start of each recomputation of
    /// `downstream` so its upstream set is replaced, never merged.
    pub fn deregister_dependencies(&self, downstream: &Identifier) {
        let mut edges = self.edges.borrow_mut();
        edges.retain(|_, downstreams| {
            downstreams.retain(|d| d != downstream);
            !downstreams.is_empty()
        });
    }

    /// Whether the exact edge is currently registered.
    pub fn has_dependency(&self, upstream: &Identifier, downstream: &Identifier) -> bool {
        self.edges
            .borrow()
            .get(upstream)
            .is_some_and(|downstreams| downstreams.contains(downstream))
    }

    /// Downstream identifiers of `id`, in registration order.
    ///
    /// For an instance-level `id` this is the union of edges keyed by `id`
    /// itself and by the matching class-level wildcard, so a provider
    /// subscribed to "any instance of this kind" hears about instances it
    /// could not name at registration time.
    pub fn downstream_of(&self, id: &Identifier) -> Vec<Identifier> {
        let edges = self.edges.borrow();
        let mut result: Vec<Identifier> = edges.get(id).cloned().unwrap_or_default();
        if id.is_instance() {
            if let Some(wildcard_subscribers) = edges.get(&id.class_level()) {
                for downstream in wildcard_subscribers {
                    if !result.contains(downstream) {
                        result.push(downstream.clone());
                    }
                }
            }
        }
        result
    }

    /// Notify every downstream of `id` that it changed.
    ///
    /// The downstream list is snapshotted before any provider runs: a
    /// called provider may register or deregister edges mid-iteration, and
    /// the snapshot keeps the walk well-defined. A provider error fails
    /// only its own branch; the walk continues for the others.
    pub fn notify_downstream(
        &self,
        id: &Identifier,
        engine: &MetadataEngine,
    ) -> RestitchResult<()> {
        if !self.notifying.borrow_mut().insert(id.clone()) {
            // Already notifying this identifier further up the stack: an
            // indirect cycle. Stop this branch instead of hanging the
            // compute thread.
            warn!(%id, "notification cycle detected, branch stopped");
            return Ok(());
        }
        let snapshot = self.downstream_of(id);
        for downstream in &snapshot {
            let Some(provider) = engine.provider_for(downstream.producer_kind()) else {
                debug!(%downstream, "no provider for downstream, skipping");
                continue;
            };
            if let Err(error) = provider.notify(engine, id, downstream) {
                warn!(%id, %downstream, %error, "notify failed, branch stopped");
            }
        }
        self.notifying.borrow_mut().remove(id);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
