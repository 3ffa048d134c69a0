//! Staged diff collection with size capping.

use tracing::debug;

use crate::error::GitError;

use super::repository::VersionControl;

/// Maximum characters of diff text sent to the model.
pub const MAX_DIFF_CHARS: usize = 2000;

/// Appended to the diff text when it was cut at [`MAX_DIFF_CHARS`].
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// The staged changes as they will be shown to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffBundle {
    pub summary_text: String,
    pub diff_text: String,
    pub truncated: bool,
}

/// Result of looking for staged changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    Staged(DiffBundle),
    /// Nothing is staged. A normal terminal state, not a failure.
    NoChanges,
}

/// Collect the staged diff and its stat summary.
///
/// Whitespace-only diffs count as no changes. Diff text longer than
/// [`MAX_DIFF_CHARS`] is cut at that position (possibly mid-line) and
/// suffixed with [`TRUNCATION_MARKER`].
pub fn collect_diff(vcs: &dyn VersionControl) -> Result<DiffOutcome, GitError> {
    let diff = vcs.staged_diff()?;
    if diff.trim().is_empty() {
        return Ok(DiffOutcome::NoChanges);
    }

    let (diff_text, truncated) = truncate_diff(&diff, MAX_DIFF_CHARS);
    let summary_text = vcs.staged_stat()?;

    debug!(
        "Collected staged diff: {} chars, truncated={}",
        diff_text.chars().count(),
        truncated
    );

    Ok(DiffOutcome::Staged(DiffBundle {
        summary_text,
        diff_text,
        truncated,
    }))
}

/// Cut `text` to `limit` characters, appending the marker when anything was dropped.
fn truncate_diff(text: &str, limit: usize) -> (String, bool) {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(&text[..cut]);
            out.push_str(TRUNCATION_MARKER);
            (out, true)
        }
        None => (text.to_string(), false),
    }
}
