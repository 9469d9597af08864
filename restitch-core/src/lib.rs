//! Restitch Core - Data Types
//!
//! Pure data structures for the round-trip generation engine. All other
//! crates depend on this. This crate contains only data types, structural
//! validation, and content hashing - no engine logic.

use sha2::{Digest, Sha256};

pub mod artifact;
pub mod contribution;
pub mod error;
pub mod identity;
pub mod member;

pub use artifact::{ArtifactNode, HASH_MARKER_ATTRIBUTE, IDENTITY_ATTRIBUTE};
pub use contribution::{ContributionUnit, ContributionUnitBuilder};
pub use error::{
    ContributionError, EngineError, GraphError, IdentifierError, MergeError, RestitchError,
    RestitchResult,
};
pub use identity::{Identifier, ProducerKind};
pub use member::{
    AnnotationSpec, ConstructorSpec, FieldSpec, MemberSignature, MethodSpec, SupertypeRef,
    TargetType,
};

// ============================================================================
// CONTENT HASHING
// ============================================================================

/// SHA-256 content hash, hex-encoded for embedding in artifact attributes.
pub type ContentHash = String;

/// Compute the hex-encoded SHA-256 hash of raw content.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

// ============================================================================
// METADATA VALUES
// ============================================================================

/// A value computed by a metadata provider.
///
/// Values are compared structurally so that propagation can stop at a node
/// whose recomputed value is unchanged.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Metadata {
    /// Generated members destined for one target type.
    Unit(ContributionUnit),
    /// A proposed artifact tree destined for the merge writer.
    Artifact(ArtifactNode),
    /// Intermediate model data consumed by downstream providers.
    Record(serde_json::Value),
}

impl From<ContributionUnit> for Metadata {
    fn from(unit: ContributionUnit) -> Self {
        Metadata::Unit(unit)
    }
}

impl From<ArtifactNode> for Metadata {
    fn from(node: ArtifactNode) -> Self {
        Metadata::Artifact(node)
    }
}

impl From<serde_json::Value> for Metadata {
    fn from(value: serde_json::Value) -> Self {
        Metadata::Record(value)
    }
}

/// The outcome of resolving one identifier.
///
/// `Invalid` is a legitimate state, not an error: it is cached as a negative
/// entry and means "no metadata exists for this identifier right now". Many
/// lookups are speculative and expect it.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The provider produced a value.
    Valid(Metadata),
    /// No value exists for this identifier (negative result).
    Invalid,
}

impl Resolution {
    /// Whether this resolution carries a value.
    pub fn is_valid(&self) -> bool {
        matches!(self, Resolution::Valid(_))
    }

    /// Borrow the value, if any.
    pub fn value(&self) -> Option<&Metadata> {
        match self {
            Resolution::Valid(metadata) => Some(metadata),
            Resolution::Invalid => None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
