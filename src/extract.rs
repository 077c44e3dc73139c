use crate::identity::AliasTable;
use crate::model::{AuthorFact, ChangeKind, CommitFacts, CommitRecord, FileFact, MergeDiffMode};
use crate::util::normalized_extension;

/// Derives per-commit facts. Pure: one `CommitRecord` in, one `CommitFacts`
/// out, no shared state, so extraction is safe to fan out over a worker pool.
pub struct Extractor<'a> {
    aliases: &'a AliasTable,
    merge_mode: MergeDiffMode,
}

impl<'a> Extractor<'a> {
    pub fn new(aliases: &'a AliasTable, merge_mode: MergeDiffMode) -> Self {
        Self {
            aliases,
            merge_mode,
        }
    }

    pub fn extract(&self, record: &CommitRecord) -> CommitFacts {
        let resolved = self
            .aliases
            .resolve(&record.author_name, &record.author_email);

        let author = AuthorFact {
            identity: resolved.identity,
            display_name: resolved.display_name,
            timestamp: record.timestamp,
            is_merge: record.is_merge(),
        };

        // Merges carry an author fact regardless; file facts only under
        // first-parent diffing.
        let files = if record.is_merge() && self.merge_mode == MergeDiffMode::None {
            Vec::new()
        } else {
            record.deltas.iter().map(file_fact).collect()
        };

        CommitFacts { author, files }
    }
}

fn file_fact(delta: &crate::model::FileDelta) -> FileFact {
    // Binary content never contributes to line counters, whatever the
    // source reported.
    let (added, deleted) = if delta.is_binary {
        (0, 0)
    } else {
        (delta.added_lines, delta.deleted_lines)
    };
    FileFact {
        path: delta.path.clone(),
        extension: normalized_extension(&delta.path),
        added_lines: added,
        deleted_lines: deleted,
        is_binary: delta.is_binary,
        is_rename: matches!(delta.kind, ChangeKind::Renamed { .. }),
    }
}
