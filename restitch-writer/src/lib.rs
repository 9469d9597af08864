//! Restitch Writer - Artifact Materialization
//!
//! The two materializers of the round-trip tool. Both write through the
//! [`FileAccess`] seam and only after independently determining that content
//! changed - never speculatively, because external watchers key off
//! modification time and content.
//!
//! - [`UnitWriter`]: simple hash-compare writer for contribution units.
//! - [`MergeWriter`]: idempotent, non-destructive reconciliation of a
//!   freshly generated artifact tree with a possibly hand-edited on-disk
//!   tree.

pub mod files;
pub mod merge;
pub mod unit_writer;

pub use files::{FileAccess, InMemoryFileAccess, StdFileAccess};
pub use merge::{MergeOutcome, MergeStatus, MergeWriter};
pub use unit_writer::UnitWriter;
