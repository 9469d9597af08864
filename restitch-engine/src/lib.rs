//! Restitch Engine - Incremental Metadata Computation
//!
//! The pull-based, memoized core of the round-trip tool: a dependency
//! registry over artifact identifiers, a cache-and-dispatch engine that
//! resolves identifiers through registered providers, and a notification
//! propagator that walks the registry when an external change arrives.
//!
//! # Concurrency model
//!
//! Single-writer, synchronous, re-entrant-recursive. Providers routinely
//! call back into the engine and registry while already on the call stack
//! of an outer engine call, so both use `RefCell` interior mutability and
//! never hold a borrow across a provider call. The engine is deliberately
//! not `Sync`; callers that parallelize event intake must serialize all
//! engine access.

pub mod engine;
pub mod incremental;
pub mod propagate;
pub mod provider;
pub mod registry;

pub use engine::MetadataEngine;
pub use incremental::IncrementalProvider;
pub use propagate::propagate_change;
pub use provider::MetadataProvider;
pub use registry::DependencyRegistry;
