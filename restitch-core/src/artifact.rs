//! Artifact trees: the generated-view representation the merge writer
//! reconciles.
//!
//! A node carries a stable identity attribute so the writer can find its
//! on-disk counterpart even when generated structure was reordered, and a
//! hash marker recording what the tool last wrote. A marker that no longer
//! matches the node's current content means the user hand-edited it; the
//! tool never updates a marker it did not just write.

use crate::{compute_content_hash, ContentHash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute naming a node across regenerations.
pub const IDENTITY_ATTRIBUTE: &str = "id";

/// Attribute holding the content hash of the tool's last write.
pub const HASH_MARKER_ATTRIBUTE: &str = "restitch-hash";

/// One node of a generated artifact tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactNode {
    pub tag: String,
    /// Sorted map so serialization and hashing are deterministic.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub children: Vec<ArtifactNode>,
}

impl ArtifactNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.attributes
            .insert(IDENTITY_ATTRIBUTE.to_string(), identity.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: ArtifactNode) -> Self {
        self.children.push(child);
        self
    }

    /// The stable identity attribute, if present.
    pub fn identity(&self) -> Option<&str> {
        self.attributes.get(IDENTITY_ATTRIBUTE).map(String::as_str)
    }

    /// The stored hash marker, if present.
    pub fn marker(&self) -> Option<&str> {
        self.attributes
            .get(HASH_MARKER_ATTRIBUTE)
            .map(String::as_str)
    }

    /// Stamp the marker with the node's current content hash.
    pub fn set_marker(&mut self) {
        let hash = self.content_hash();
        self.attributes.insert(HASH_MARKER_ATTRIBUTE.to_string(), hash);
    }

    /// Content hash over tag, sorted non-marker attributes, and text.
    ///
    /// Children are excluded so a hand edit in a child does not freeze the
    /// parent; each node's edit state is judged independently.
    pub fn content_hash(&self) -> ContentHash {
        let mut canonical = Vec::new();
        canonical.extend_from_slice(self.tag.as_bytes());
        canonical.push(0);
        for (name, value) in &self.attributes {
            if name == HASH_MARKER_ATTRIBUTE {
                continue;
            }
            canonical.extend_from_slice(name.as_bytes());
            canonical.push(0);
            canonical.extend_from_slice(value.as_bytes());
            canonical.push(0);
        }
        canonical.extend_from_slice(self.text.as_bytes());
        compute_content_hash(&canonical)
    }

    /// Depth-first search of the whole subtree for a node with the given
    /// identity attribute.
    pub fn find_by_identity(&self, identity: &str) -> Option<&ArtifactNode> {
        if self.identity() == Some(identity) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_by_identity(identity))
    }

    /// Mutable variant of [`find_by_identity`](Self::find_by_identity).
    pub fn find_by_identity_mut(&mut self, identity: &str) -> Option<&mut ArtifactNode> {
        if self.identity() == Some(identity) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_by_identity_mut(identity))
    }
}

// ============================================================================
// TESTS
// ============================================================================
