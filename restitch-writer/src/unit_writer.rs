//! Hash-compare materializer for contribution units.

use crate::files::FileAccess;
use restitch_core::{compute_content_hash, ContributionUnit, RestitchResult};
use std::path::Path;
use tracing::debug;

/// Writes a contribution unit's serialized form, skipping the write when
/// the on-disk content hash already matches. Contribution units carry no
/// hand-editable content, so unlike the merge writer there is nothing to
/// reconcile - only a changed/unchanged decision.
pub struct UnitWriter<F: FileAccess> {
    files: F,
}

impl<F: FileAccess> UnitWriter<F> {
    pub fn new(files: F) -> Self {
        Self { files }
    }

    /// Materialize `unit` at `path`. Returns whether a write occurred.
    pub fn materialize(&self, unit: &ContributionUnit, path: &Path) -> RestitchResult<bool> {
        let mut bytes =
            serde_json::to_vec_pretty(unit).expect("contribution unit serialization cannot fail");
        bytes.push(b'\n');

        if self.files.exists(path) {
            let existing = self.files.read(path)?;
            if compute_content_hash(&existing) == compute_content_hash(&bytes) {
                debug!(path = %path.display(), "unit unchanged, write skipped");
                return Ok(false);
            }
        }

        debug!(path = %path.display(), target = unit.target_type(), "unit written");
        self.files.write(path, &bytes)?;
        Ok(true)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::InMemoryFileAccess;
    use restitch_core::{ContributionUnitBuilder, FieldSpec, TargetType};

    fn unit(field: &str) -> ContributionUnit {
        let mut builder =
            ContributionUnitBuilder::new(TargetType::new("com.acme.Order"), "entity");
        builder.add_field(FieldSpec::new(field, "long")).unwrap();
        builder.build()
    }

    #[test]
    fn test_first_materialization_writes() {
        let files = InMemoryFileAccess::new();
        let writer = UnitWriter::new(files.clone());
        let wrote = writer
            .materialize(&unit("version"), Path::new("gen/order.unit"))
            .unwrap();
        assert!(wrote);
        assert_eq!(files.write_count(), 1);
    }

    #[test]
    fn test_unchanged_unit_suppresses_write() {
        let files = InMemoryFileAccess::new();
        let writer = UnitWriter::new(files.clone());
        let path = Path::new("gen/order.unit");

        assert!(writer.materialize(&unit("version"), path).unwrap());
        // Regenerated from the same inputs: value-equal unit, no write.
        assert!(!writer.materialize(&unit("version"), path).unwrap());
        assert_eq!(files.write_count(), 1);
    }

    #[test]
    fn test_changed_unit_writes_again() {
        let files = InMemoryFileAccess::new();
        let writer = UnitWriter::new(files.clone());
        let path = Path::new("gen/order.unit");

        writer.materialize(&unit("version"), path).unwrap();
        assert!(writer.materialize(&unit("revision"), path).unwrap());
        assert_eq!(files.write_count(), 2);
    }
}
