//! Idempotent merge writer: round-trip reconciliation of generated
//! artifact trees.
//!
//! The non-destructive guarantee: a node whose stored hash marker no longer
//! matches its own current content was hand-edited since the tool last
//! wrote it, and the merge leaves that node and its entire subtree
//! untouched - even when the freshly proposed tree disagrees.

use crate::files::FileAccess;
use restitch_core::{ArtifactNode, MergeError, RestitchResult, HASH_MARKER_ATTRIBUTE};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Whether the merge wrote the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    Written,
    Unchanged,
}

/// What one merge did, for logging and assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub status: MergeStatus,
    /// Insert operations (a whole new subtree counts once).
    pub inserted: usize,
    /// Nodes whose content and marker were replaced.
    pub replaced: usize,
    /// Hand-edited nodes left untouched, subtree included.
    pub preserved: usize,
}

impl MergeOutcome {
    fn unchanged() -> Self {
        Self {
            status: MergeStatus::Unchanged,
            inserted: 0,
            replaced: 0,
            preserved: 0,
        }
    }
}

enum Action {
    /// Node is hand-edited: freeze it and its subtree.
    Preserve,
    /// Node is current: nothing to change, keep walking children.
    Descend,
    /// Node is tool-owned and out of date: overwrite content and marker.
    Replace,
    /// No on-disk counterpart: new tool-owned content.
    Insert,
}

/// Reconciles a freshly proposed artifact tree with the on-disk tree.
pub struct MergeWriter<F: FileAccess> {
    files: F,
}

impl<F: FileAccess> MergeWriter<F> {
    pub fn new(files: F) -> Self {
        Self { files }
    }

    /// Merge `proposed` into the artifact at `path`.
    ///
    /// Writes only when the merge changed at least one node; an untouched
    /// file is a byte-identical no-op with no write at all. An unparseable
    /// existing artifact is a hard error - the tool never guesses at or
    /// discards content it cannot parse.
    pub fn merge(&self, proposed: &ArtifactNode, path: &Path) -> RestitchResult<MergeOutcome> {
        if !self.files.exists(path) {
            let fresh = stamped(proposed);
            self.files.write(path, &to_bytes(&fresh))?;
            debug!(path = %path.display(), "no existing artifact, written verbatim");
            return Ok(MergeOutcome {
                status: MergeStatus::Written,
                inserted: 1,
                replaced: 0,
                preserved: 0,
            });
        }

        let bytes = self.files.read(path)?;
        let on_disk: ArtifactNode =
            serde_json::from_slice(&bytes).map_err(|e| MergeError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut result = on_disk;
        let mut outcome = MergeOutcome::unchanged();
        let mut dirty = false;

        // Document-order walk of the proposed tree. Each entry carries the
        // identity of the nearest proposed ancestor that has one, which is
        // where a missing node gets inserted.
        let mut stack: Vec<(&ArtifactNode, Option<String>)> = vec![(proposed, None)];
        while let Some((node, parent_identity)) = stack.pop() {
            let Some(identity) = node.identity().map(str::to_string) else {
                // Nodes without a stable identity are opaque to the merge;
                // their identified descendants are still walked.
                for child in node.children.iter().rev() {
                    stack.push((child, parent_identity.clone()));
                }
                continue;
            };

            let action = match result.find_by_identity(&identity) {
                Some(existing) => {
                    if hand_edited(existing) {
                        Action::Preserve
                    } else if content_differs(existing, node) {
                        Action::Replace
                    } else {
                        Action::Descend
                    }
                }
                None => Action::Insert,
            };

            match action {
                Action::Preserve => {
                    outcome.preserved += 1;
                    // The user's subtree wins outright: do not descend.
                }
                Action::Descend => {
                    for child in node.children.iter().rev() {
                        stack.push((child, Some(identity.clone())));
                    }
                }
                Action::Replace => {
                    if let Some(existing) = result.find_by_identity_mut(&identity) {
                        existing.tag = node.tag.clone();
                        existing.text = node.text.clone();
                        existing.attributes = node.attributes.clone();
                        existing
                            .attributes
                            .insert(HASH_MARKER_ATTRIBUTE.to_string(), node.content_hash());
                        dirty = true;
                        outcome.replaced += 1;
                    }
                    for child in node.children.iter().rev() {
                        stack.push((child, Some(identity.clone())));
                    }
                }
                Action::Insert => match &parent_identity {
                    Some(parent) => {
                        if let Some(container) = result.find_by_identity_mut(parent) {
                            // Identified children are walked separately so a
                            // node that merely moved is updated in place
                            // instead of duplicated here.
                            container.children.push(shallow_insert_clone(node));
                            dirty = true;
                            outcome.inserted += 1;
                            for child in node.children.iter().rev() {
                                stack.push((child, Some(identity.clone())));
                            }
                        }
                        // A missing container means its subtree was
                        // preserved as hand-edited; nothing to insert into.
                    }
                    None if std::ptr::eq(node, proposed) => {
                        // The proposed root itself has no on-disk
                        // counterpart: the whole document is new tool-owned
                        // content.
                        result = stamped(proposed);
                        dirty = true;
                        outcome.inserted += 1;
                        stack.clear();
                    }
                    None => {
                        // Reached through identity-less ancestors only; the
                        // on-disk root is the container. Replacing the
                        // document here would discard its other subtrees.
                        result.children.push(shallow_insert_clone(node));
                        dirty = true;
                        outcome.inserted += 1;
                        for child in node.children.iter().rev() {
                            stack.push((child, Some(identity.clone())));
                        }
                    }
                },
            }
        }

        if dirty {
            self.files.write(path, &to_bytes(&result))?;
            outcome.status = MergeStatus::Written;
            debug!(
                path = %path.display(),
                inserted = outcome.inserted,
                replaced = outcome.replaced,
                preserved = outcome.preserved,
                "artifact merged and written"
            );
        } else {
            debug!(path = %path.display(), "artifact unchanged, no write");
        }
        Ok(outcome)
    }
}

/// Deep-clone `node` with every node's marker stamped to its own current
/// content hash: the shape of a fresh tool write.
fn stamped(node: &ArtifactNode) -> ArtifactNode {
    let mut copy = node.clone();
    copy.set_marker();
    copy.children = node.children.iter().map(stamped).collect();
    copy
}

/// Clone for insertion: keep only unidentified children (they have no other
/// way into the document), stamp everything kept.
fn shallow_insert_clone(node: &ArtifactNode) -> ArtifactNode {
    let mut copy = node.clone();
    copy.children = node
        .children
        .iter()
        .filter(|child| child.identity().is_none())
        .map(stamped)
        .collect();
    copy.set_marker();
    copy
}

/// A marker that no longer matches the node's current content means the
/// user edited the node after the tool's last write. A missing marker means
/// the node never carried tool state and is safe to manage.
fn hand_edited(node: &ArtifactNode) -> bool {
    node.marker()
        .is_some_and(|marker| marker != node.content_hash())
}

fn non_marker_attributes(node: &ArtifactNode) -> BTreeMap<&String, &String> {
    node.attributes
        .iter()
        .filter(|(name, _)| name.as_str() != HASH_MARKER_ATTRIBUTE)
        .collect()
}

fn content_differs(existing: &ArtifactNode, proposed: &ArtifactNode) -> bool {
    existing.tag != proposed.tag
        || existing.text != proposed.text
        || non_marker_attributes(existing) != non_marker_attributes(proposed)
}

fn to_bytes(node: &ArtifactNode) -> Vec<u8> {
    let mut bytes =
        serde_json::to_vec_pretty(node).expect("artifact serialization cannot fail");
    bytes.push(b'\n');
    bytes
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::InMemoryFileAccess;
    use restitch_core::RestitchError;

    fn view_tree(label: &str) -> ArtifactNode {
        ArtifactNode::new("view")
            .with_identity("order-view")
            .with_child(
                ArtifactNode::new("section")
                    .with_identity("order-view.fields")
                    .with_child(
                        ArtifactNode::new("input")
                            .with_identity("order-view.fields.id")
                            .with_attribute("label", label),
                    ),
            )
    }

    fn read_tree(files: &InMemoryFileAccess, path: &Path) -> ArtifactNode {
        serde_json::from_slice(&files.contents(path).unwrap()).unwrap()
    }

    #[test]
    fn test_absent_file_written_verbatim_with_markers() {
        let files = InMemoryFileAccess::new();
        let writer = MergeWriter::new(files.clone());
        let path = Path::new("views/order.view");

        let outcome = writer.merge(&view_tree("Id"), path).unwrap();
        assert_eq!(outcome.status, MergeStatus::Written);

        let on_disk = read_tree(&files, path);
        let input = on_disk.find_by_identity("order-view.fields.id").unwrap();
        assert_eq!(input.marker(), Some(input.content_hash().as_str()));
    }

    #[test]
    fn test_second_identical_merge_performs_no_write() {
        let files = InMemoryFileAccess::new();
        let writer = MergeWriter::new(files.clone());
        let path = Path::new("views/order.view");

        writer.merge(&view_tree("Id"), path).unwrap();
        assert_eq!(files.write_count(), 1);

        let outcome = writer.merge(&view_tree("Id"), path).unwrap();
        assert_eq!(outcome.status, MergeStatus::Unchanged);
        assert_eq!(files.write_count(), 1);
    }

    #[test]
    fn test_tool_owned_node_is_updated_in_place() {
        let files = InMemoryFileAccess::new();
        let writer = MergeWriter::new(files.clone());
        let path = Path::new("views/order.view");

        writer.merge(&view_tree("Id"), path).unwrap();
        let outcome = writer.merge(&view_tree("Identifier"), path).unwrap();
        assert_eq!(outcome.status, MergeStatus::Written);
        assert_eq!(outcome.replaced, 1);

        let on_disk = read_tree(&files, path);
        let input = on_disk.find_by_identity("order-view.fields.id").unwrap();
        assert_eq!(input.attributes.get("label").unwrap(), "Identifier");
        // Marker follows the write.
        assert_eq!(input.marker(), Some(input.content_hash().as_str()));
    }

    #[test]
    fn test_hand_edited_node_is_preserved_byte_for_byte() {
        let files = InMemoryFileAccess::new();
        let writer = MergeWriter::new(files.clone());
        let path = Path::new("views/order.view");

        writer.merge(&view_tree("Id"), path).unwrap();

        // Hand edit: change the label without touching the marker.
        let mut edited = read_tree(&files, path);
        let input = edited
            .find_by_identity_mut("order-view.fields.id")
            .unwrap();
        input
            .attributes
            .insert("label".to_string(), "My Custom Label".to_string());
        files.seed(path, to_bytes(&edited));
        let before = files.contents(path).unwrap();

        // Any newly proposed content loses against the hand edit; with no
        // other changes, no write happens at all.
        let outcome = writer.merge(&view_tree("Completely Different"), path).unwrap();
        assert_eq!(outcome.status, MergeStatus::Unchanged);
        assert_eq!(outcome.preserved, 1);
        assert_eq!(files.contents(path).unwrap(), before);
    }

    #[test]
    fn test_hand_edited_subtree_is_skipped_even_when_siblings_change() {
        let files = InMemoryFileAccess::new();
        let writer = MergeWriter::new(files.clone());
        let path = Path::new("views/order.view");

        // Two inputs under the section.
        let proposed = ArtifactNode::new("view")
            .with_identity("order-view")
            .with_child(
                ArtifactNode::new("section")
                    .with_identity("order-view.fields")
                    .with_child(
                        ArtifactNode::new("input")
                            .with_identity("order-view.fields.id")
                            .with_attribute("label", "Id"),
                    )
                    .with_child(
                        ArtifactNode::new("input")
                            .with_identity("order-view.fields.name")
                            .with_attribute("label", "Name"),
                    ),
            );
        writer.merge(&proposed, path).unwrap();

        // Hand-edit the id input.
        let mut edited = read_tree(&files, path);
        let input = edited
            .find_by_identity_mut("order-view.fields.id")
            .unwrap();
        input.text = "customized".to_string();
        files.seed(path, to_bytes(&edited));

        // Regenerate with both labels changed.
        let mut regenerated = proposed.clone();
        regenerated
            .find_by_identity_mut("order-view.fields.id")
            .unwrap()
            .attributes
            .insert("label".to_string(), "Key".to_string());
        regenerated
            .find_by_identity_mut("order-view.fields.name")
            .unwrap()
            .attributes
            .insert("label".to_string(), "Full Name".to_string());

        let outcome = writer.merge(&regenerated, path).unwrap();
        assert_eq!(outcome.status, MergeStatus::Written);
        assert_eq!(outcome.preserved, 1);
        assert_eq!(outcome.replaced, 1);

        let on_disk = read_tree(&files, path);
        let id_input = on_disk.find_by_identity("order-view.fields.id").unwrap();
        let name_input = on_disk.find_by_identity("order-view.fields.name").unwrap();
        assert_eq!(id_input.text, "customized");
        assert_eq!(id_input.attributes.get("label").unwrap(), "Id");
        assert_eq!(name_input.attributes.get("label").unwrap(), "Full Name");
    }

    #[test]
    fn test_new_node_is_inserted_under_its_proposed_parent() {
        let files = InMemoryFileAccess::new();
        let writer = MergeWriter::new(files.clone());
        let path = Path::new("views/order.view");

        writer.merge(&view_tree("Id"), path).unwrap();

        let regenerated = view_tree("Id").with_child(
            ArtifactNode::new("toolbar").with_identity("order-view.toolbar"),
        );
        let outcome = writer.merge(&regenerated, path).unwrap();
        assert_eq!(outcome.status, MergeStatus::Written);
        assert_eq!(outcome.inserted, 1);

        let on_disk = read_tree(&files, path);
        let toolbar = on_disk.find_by_identity("order-view.toolbar").unwrap();
        assert_eq!(toolbar.marker(), Some(toolbar.content_hash().as_str()));
    }

    #[test]
    fn test_insert_under_identityless_root_keeps_hand_edited_siblings() {
        let files = InMemoryFileAccess::new();
        let writer = MergeWriter::new(files.clone());
        let path = Path::new("views/order.view");

        // The root container carries no identity of its own.
        let original = ArtifactNode::new("view").with_child(
            ArtifactNode::new("input")
                .with_identity("order-form.name")
                .with_attribute("label", "Name"),
        );
        writer.merge(&original, path).unwrap();

        // Hand-edit the input's label, leaving its marker stale.
        let mut edited = read_tree(&files, path);
        edited
            .find_by_identity_mut("order-form.name")
            .unwrap()
            .attributes
            .insert("label".to_string(), "Customer Name".to_string());
        files.seed(path, to_bytes(&edited));

        // Regenerate with a new sibling input.
        let regenerated = ArtifactNode::new("view")
            .with_child(
                ArtifactNode::new("input")
                    .with_identity("order-form.name")
                    .with_attribute("label", "Name"),
            )
            .with_child(
                ArtifactNode::new("input")
                    .with_identity("order-form.total")
                    .with_attribute("label", "Total"),
            );
        let outcome = writer.merge(&regenerated, path).unwrap();
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.preserved, 1);

        // The new input lands under the existing root; the hand edit stays.
        let on_disk = read_tree(&files, path);
        assert!(on_disk.find_by_identity("order-form.total").is_some());
        assert_eq!(
            on_disk
                .find_by_identity("order-form.name")
                .unwrap()
                .attributes
                .get("label")
                .unwrap(),
            "Customer Name"
        );
    }

    #[test]
    fn test_match_is_found_across_the_whole_tree() {
        let files = InMemoryFileAccess::new();
        let writer = MergeWriter::new(files.clone());
        let path = Path::new("views/order.view");

        writer.merge(&view_tree("Id"), path).unwrap();

        // Generated structure reordered: the input now sits in another
        // section in the proposed tree, but still matches on disk.
        let reorganized = ArtifactNode::new("view")
            .with_identity("order-view")
            .with_child(
                ArtifactNode::new("section")
                    .with_identity("order-view.details")
                    .with_child(
                        ArtifactNode::new("input")
                            .with_identity("order-view.fields.id")
                            .with_attribute("label", "Key"),
                    ),
            );
        let outcome = writer.merge(&reorganized, path).unwrap();

        // The node was updated where it lives, not duplicated.
        assert_eq!(outcome.replaced, 1);
        let on_disk = read_tree(&files, path);
        let section = on_disk.find_by_identity("order-view.fields").unwrap();
        assert_eq!(section.children.len(), 1);
        assert_eq!(
            on_disk
                .find_by_identity("order-view.fields.id")
                .unwrap()
                .attributes
                .get("label")
                .unwrap(),
            "Key"
        );
    }

    #[test]
    fn test_unparseable_existing_artifact_is_a_hard_error() {
        let files = InMemoryFileAccess::new();
        let writer = MergeWriter::new(files.clone());
        let path = Path::new("views/order.view");

        files.seed(path, b"not an artifact tree".to_vec());
        let err = writer.merge(&view_tree("Id"), path).unwrap_err();
        assert!(matches!(
            err,
            RestitchError::Merge(MergeError::Parse { .. })
        ));
        // Content it cannot parse is never discarded.
        assert_eq!(
            files.contents(path).unwrap(),
            b"not an artifact tree".to_vec()
        );
    }

    #[test]
    fn test_root_identity_change_replaces_the_document() {
        let files = InMemoryFileAccess::new();
        let writer = MergeWriter::new(files.clone());
        let path = Path::new("views/order.view");

        writer.merge(&view_tree("Id"), path).unwrap();

        let replacement = ArtifactNode::new("view").with_identity("customer-view");
        let outcome = writer.merge(&replacement, path).unwrap();
        assert_eq!(outcome.status, MergeStatus::Written);

        let on_disk = read_tree(&files, path);
        assert_eq!(on_disk.identity(), Some("customer-view"));
    }
}
