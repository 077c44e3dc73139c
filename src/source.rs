use crate::error::Result;
use crate::model::CommitRecord;

/// Read-only access to a store of commits. The engine never assumes the full
/// history fits in memory; every lookup is on demand.
pub trait CommitSource {
    /// Resolve reference names to commit hashes. An empty slice means "all
    /// local branch heads".
    fn resolve_references(&self, names: &[String]) -> Result<Vec<String>>;

    /// Load one commit with its file deltas. Failures here are per-commit
    /// recoverable (`CommitExtraction`) unless the store itself is broken.
    fn commit(&self, hash: &str) -> Result<CommitRecord>;

    /// Parent hashes only, usable even when the full record cannot be loaded.
    fn parents(&self, hash: &str) -> Result<Vec<String>>;
}
