use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

/// Immutable facts about one commit as loaded from the object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub parent_hashes: Vec<String>,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub subject: String,
    pub deltas: Vec<FileDelta>,
}

impl CommitRecord {
    pub fn is_merge(&self) -> bool {
        self.parent_hashes.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed { from: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDelta {
    pub path: String,
    pub kind: ChangeKind,
    pub added_lines: u32,
    pub deleted_lines: u32,
    pub is_binary: bool,
}

/// One per commit: who, when, and whether it was a merge. The identity is
/// already canonical when this struct exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorFact {
    pub identity: String,
    pub display_name: String,
    pub timestamp: DateTime<Utc>,
    pub is_merge: bool,
}

/// One per changed file in a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFact {
    pub path: String,
    pub extension: String,
    pub added_lines: u32,
    pub deleted_lines: u32,
    pub is_binary: bool,
    pub is_rename: bool,
}

/// Everything the extractor derives from a single commit.
#[derive(Debug, Clone)]
pub struct CommitFacts {
    pub author: AuthorFact,
    pub files: Vec<FileFact>,
}

/// How merge commits are diffed. `None` skips file facts for merges entirely;
/// diffing a merge against all parents over- or under-counts depending on how
/// the merge was made, so it is never attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MergeDiffMode {
    None,
    FirstParent,
}

impl Default for MergeDiffMode {
    fn default() -> Self {
        MergeDiffMode::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodBucket {
    Day,
    Week,
    Month,
}

impl Default for PeriodBucket {
    fn default() -> Self {
        PeriodBucket::Week
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedCommit {
    pub hash: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorEntry {
    pub identity: String,
    pub display_name: String,
    pub commits: u64,
    pub merges: u64,
    pub added_lines: u64,
    pub deleted_lines: u64,
    pub net_lines: i64,
    pub churn: u64,
    pub files_touched: u64,
    pub active_days: u64,
    pub first_commit: DateTime<Utc>,
    pub last_commit: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub commits: u64,
    pub added_lines: u64,
    pub deleted_lines: u64,
    pub churn: u64,
    pub binary_changes: u64,
    pub renames: u64,
    pub authors: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionEntry {
    pub extension: String,
    pub commits: u64,
    pub files_changed: u64,
    pub added_lines: u64,
    pub deleted_lines: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodEntry {
    pub period: String,
    pub commits: u64,
    pub merges: u64,
    pub added_lines: u64,
    pub deleted_lines: u64,
    pub churn: u64,
    pub authors: u64,
    pub binary_changes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Totals {
    pub commits: u64,
    pub merges: u64,
    pub added_lines: u64,
    pub deleted_lines: u64,
    pub net_lines: i64,
    pub churn: u64,
    pub files_changed: u64,
    pub binary_changes: u64,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
}

impl Totals {
    pub fn avg_files_per_commit(&self) -> f64 {
        if self.commits == 0 {
            0.0
        } else {
            self.files_changed as f64 / self.commits as f64
        }
    }
}

/// The only structure that survives a full traversal. Tables are sorted
/// deterministically before the snapshot is handed to rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub bucket: PeriodBucket,
    pub totals: Totals,
    pub authors: Vec<AuthorEntry>,
    pub files: Vec<FileEntry>,
    pub extensions: Vec<ExtensionEntry>,
    pub periods: Vec<PeriodEntry>,
    pub skipped: Vec<SkippedCommit>,
    pub partial: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if timestamp < &since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if timestamp > &until {
                return false;
            }
        }
        true
    }

    /// True when a commit at `timestamp` is old enough that its ancestors can
    /// no longer fall inside the range.
    pub fn below(&self, timestamp: &DateTime<Utc>) -> bool {
        matches!(self.since, Some(since) if timestamp < &since)
    }
}
