//! Error types for Restitch operations

use crate::identity::{Identifier, ProducerKind};
use crate::member::MemberSignature;
use thiserror::Error;

/// Identifier construction and parsing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Producer kind is empty")]
    EmptyKind,

    #[error("Instance key is empty")]
    EmptyKey,

    #[error("Invalid producer kind {kind:?}: {reason}")]
    InvalidKind { kind: String, reason: String },

    #[error("Invalid instance key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Malformed identifier {input:?}: expected kind:key or kind:*")]
    Malformed { input: String },
}

/// Dependency graph errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Cyclic dependency: {upstream} -> {downstream}")]
    CyclicDependency {
        upstream: Identifier,
        downstream: Identifier,
    },
}

/// Engine registration and dispatch errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("A provider for kind {kind} is already registered")]
    DuplicateProvider { kind: ProducerKind },

    #[error("Provider for {id} failed: {reason}")]
    ProviderFailed { id: Identifier, reason: String },
}

/// Contribution unit invariant violations.
///
/// These are programming errors in the generator set: two generators (or a
/// generator and the user's own source) collided on one signature. The output
/// would not be valid, so the builder fails fast rather than picking a winner.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContributionError {
    #[error("Duplicate member on {target}: {signature}")]
    DuplicateMember {
        target: String,
        signature: MemberSignature,
    },

    #[error("Duplicate supertype on {target}: {supertype}")]
    DuplicateSupertype { target: String, supertype: String },
}

/// Merge writer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("Cannot parse existing artifact at {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("File access failed for {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Master error type for all Restitch errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RestitchError {
    #[error("Identifier error: {0}")]
    Identifier(#[from] IdentifierError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Contribution error: {0}")]
    Contribution(#[from] ContributionError),

    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),
}

/// Result type alias for Restitch operations.
pub type RestitchResult<T> = Result<T, RestitchError>;

// ============================================================================
// TESTS
// ============================================================================
