use crate::error::{RepoStatsError, Result};
use crate::model::{CommitRecord, DateRange, SkippedCommit};
use crate::source::CommitSource;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Reference names to start from; empty means all local branches.
    pub refs: Vec<String>,
    pub range: DateRange,
    /// Stop after emitting this many commits and label the run partial.
    pub max_commits: Option<usize>,
    /// Cooperative stop signal, checked between commits.
    pub stop: Option<Arc<AtomicBool>>,
}

/// What a finished walk leaves behind besides the emitted records.
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub skipped: Vec<SkippedCommit>,
    pub partial: bool,
}

/// Lazy depth-first walk over the commit graph. The visited set exists to
/// handle diamond merges: a commit reachable from several tips is emitted
/// exactly once. Emission order is roughly newest-first but is not a contract;
/// aggregation downstream is order-independent.
pub struct Walker<'a, S: CommitSource> {
    source: &'a S,
    stack: VecDeque<String>,
    seen: HashSet<String>,
    range: DateRange,
    max_commits: Option<usize>,
    stop: Option<Arc<AtomicBool>>,
    emitted: usize,
    skipped: Vec<SkippedCommit>,
    partial: bool,
    fatal: bool,
}

impl<'a, S: CommitSource> Walker<'a, S> {
    pub fn new(source: &'a S, options: WalkOptions) -> Result<Self> {
        let tips = source.resolve_references(&options.refs)?;
        Ok(Self {
            source,
            stack: VecDeque::from(tips),
            seen: HashSet::new(),
            range: options.range,
            max_commits: options.max_commits,
            stop: options.stop,
            emitted: 0,
            skipped: Vec::new(),
            partial: false,
            fatal: false,
        })
    }

    pub fn into_outcome(self) -> WalkOutcome {
        WalkOutcome {
            skipped: self.skipped,
            partial: self.partial,
        }
    }

    fn push_parents<I: IntoIterator<Item = String>>(&mut self, parents: I) {
        for parent in parents {
            if !self.seen.contains(&parent) {
                self.stack.push_back(parent);
            }
        }
    }

    fn cancelled(&self) -> bool {
        self.stop
            .as_ref()
            .map(|s| s.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// The stack may hold stale duplicates of hashes already visited (a merge
    /// whose parents share an ancestor pushes it twice), so a non-empty stack
    /// alone does not prove unfinished work.
    fn has_pending(&self) -> bool {
        self.stack.iter().any(|h| !self.seen.contains(h))
    }
}

impl<S: CommitSource> Iterator for Walker<'_, S> {
    type Item = Result<CommitRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.fatal {
                return None;
            }
            if let Some(max) = self.max_commits {
                if self.emitted >= max {
                    if self.has_pending() {
                        self.partial = true;
                    }
                    return None;
                }
            }
            if self.cancelled() {
                if self.has_pending() {
                    self.partial = true;
                }
                return None;
            }

            let hash = self.stack.pop_back()?;
            if !self.seen.insert(hash.clone()) {
                continue;
            }

            match self.source.commit(&hash) {
                Ok(record) => {
                    if self.range.below(&record.timestamp) {
                        // Ancestors of a too-old commit are older still; stop
                        // this lineage and label the run partial.
                        self.partial = true;
                        continue;
                    }
                    self.push_parents(record.parent_hashes.iter().cloned());
                    if !self.range.contains(&record.timestamp) {
                        continue;
                    }
                    self.emitted += 1;
                    return Some(Ok(record));
                }
                Err(RepoStatsError::CommitExtraction { hash, reason }) => {
                    // Recoverable: record the skip, keep walking through the
                    // parents when they are still readable.
                    if let Ok(parents) = self.source.parents(&hash) {
                        self.push_parents(parents);
                    }
                    self.skipped.push(SkippedCommit { hash, reason });
                }
                Err(fatal) => {
                    self.fatal = true;
                    return Some(Err(fatal));
                }
            }
        }
    }
}
