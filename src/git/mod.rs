//! Version-control access and staged diff collection.

pub mod diff;
pub mod repository;

pub use diff::{DiffBundle, DiffOutcome, MAX_DIFF_CHARS, TRUNCATION_MARKER, collect_diff};
pub use repository::{GitRepository, VersionControl};
