use crate::error::{RepoStatsError, Result};
use crate::model::{ChangeKind, CommitRecord, DateRange, FileDelta, MergeDiffMode};
use crate::source::CommitSource;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gix::object::tree::diff::ChangeDetached;
use gix::{discover, ObjectId, Repository};
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// `gix`-backed commit source. Never mutates repository state.
pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
    merge_mode: MergeDiffMode,
}

impl GitRepo {
    /// Open a repository at `path`, or discover one from the current dir.
    pub fn open<P: AsRef<Path>>(path: Option<P>, merge_mode: MergeDiffMode) -> Result<Self> {
        let repo_path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or(std::env::current_dir()?);

        let repo = discover(&repo_path)?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self {
            repo,
            path,
            merge_mode,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resolve_range(&self, since: Option<&str>, until: Option<&str>) -> Result<DateRange> {
        let mut range = DateRange::new();

        let since_dt = since.map(|s| self.parse_commit_or_date(s)).transpose()?;
        let until_dt = until.map(|u| self.parse_commit_or_date(u)).transpose()?;

        if let (Some(s), Some(u)) = (since_dt, until_dt) {
            if s > u {
                return Err(RepoStatsError::InvalidDate(format!(
                    "Invalid range: since ({}) is after until ({})",
                    s, u
                )));
            }
        }

        if let Some(s) = since_dt {
            range = range.with_since(s);
        }
        if let Some(u) = until_dt {
            range = range.with_until(u);
        }

        Ok(range)
    }

    fn parse_commit_or_date(&self, input: &str) -> Result<DateTime<Utc>> {
        // RFC3339
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc));
        }

        // YYYY-MM-DD
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&datetime));
            }
        }

        // Relative duration ("90d", "2 weeks"), interpreted as "that long ago"
        if let Ok(duration) = humantime::parse_duration(input) {
            let target = SystemTime::now().checked_sub(duration).ok_or_else(|| {
                RepoStatsError::InvalidDate(format!("Duration overflow for '{input}'"))
            })?;
            return Ok(DateTime::<Utc>::from(target));
        }

        // Fallback to a git revspec; use that commit's timestamp
        let id = self
            .repo
            .rev_parse_single(input)
            .map_err(|e| RepoStatsError::Parse(format!("Invalid commit or date '{input}': {e}")))?;

        let commit = id
            .object()?
            .try_into_commit()
            .map_err(|_| RepoStatsError::Parse(format!("Not a commit: {input}")))?;

        let secs = commit.time()?.seconds;
        DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| RepoStatsError::InvalidDate(format!("Invalid timestamp: {secs}")))
    }

    /// All local branch heads, falling back to HEAD for detached or
    /// just-initialized repositories.
    fn all_branch_tips(&self) -> Result<Vec<String>> {
        let mut tips = Vec::new();

        let refs = self
            .repo
            .references()
            .map_err(|e| RepoStatsError::RepositoryAccess(e.to_string()))?;
        let branches = refs
            .local_branches()
            .map_err(|e| RepoStatsError::RepositoryAccess(e.to_string()))?;
        for branch in branches {
            let mut branch = branch.map_err(|e| RepoStatsError::RepositoryAccess(e.to_string()))?;
            let id = branch
                .peel_to_id_in_place()
                .map_err(|e| RepoStatsError::RepositoryAccess(e.to_string()))?;
            tips.push(id.detach().to_string());
        }

        if tips.is_empty() {
            let mut head = self
                .repo
                .head()
                .map_err(|e| RepoStatsError::RepositoryAccess(e.to_string()))?;
            let head_commit = head.peel_to_commit_in_place()?;
            tips.push(head_commit.id.to_string());
        }

        tips.sort();
        tips.dedup();
        Ok(tips)
    }

    fn load_record(&self, hash: &str) -> Result<CommitRecord> {
        let oid = ObjectId::from_hex(hash.as_bytes())
            .map_err(|e| RepoStatsError::Parse(format!("Invalid commit ID '{hash}': {e}")))?;

        let commit = self.repo.find_commit(oid)?;
        let secs = commit.time()?.seconds;
        let timestamp = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| RepoStatsError::InvalidDate(format!("Invalid timestamp: {secs}")))?;

        let author = commit.author()?;
        let message = commit.message()?;
        let parents: Vec<ObjectId> = commit.parent_ids().map(|id| id.into()).collect();

        // Merge diffs are only computed when the configured mode asks for
        // them; under MergeDiffMode::None a merge carries no deltas at all.
        let deltas = if parents.len() > 1 && self.merge_mode == MergeDiffMode::None {
            Vec::new()
        } else {
            self.compute_deltas(oid, parents.first().copied())?
        };

        Ok(CommitRecord {
            hash: hash.to_string(),
            parent_hashes: parents.iter().map(|id| id.to_string()).collect(),
            author_name: author.name.to_string(),
            author_email: author.email.to_string(),
            timestamp,
            subject: message.title.to_string(),
            deltas,
        })
    }

    fn compute_deltas(&self, commit_id: ObjectId, parent_id: Option<ObjectId>) -> Result<Vec<FileDelta>> {
        let commit_tree = self.repo.find_commit(commit_id)?.tree()?;
        let parent_tree = match parent_id {
            Some(pid) => Some(self.repo.find_commit(pid)?.tree()?),
            None => None,
        };

        let changes: Vec<ChangeDetached> =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), None)?;

        let mut deltas = Vec::new();
        for change in changes {
            if let Some(delta) = self.delta_from_change(change)? {
                deltas.push(delta);
            }
        }
        Ok(deltas)
    }

    fn delta_from_change(&self, change: ChangeDetached) -> Result<Option<FileDelta>> {
        let delta = match change {
            ChangeDetached::Addition { id, location, .. } => {
                let obj = self.repo.find_object(id)?;
                let is_binary = is_binary_data(&obj.data);
                FileDelta {
                    path: location.to_string(),
                    kind: ChangeKind::Added,
                    added_lines: if is_binary { 0 } else { count_lines(&obj.data) },
                    deleted_lines: 0,
                    is_binary,
                }
            }
            ChangeDetached::Deletion { id, location, .. } => {
                let obj = self.repo.find_object(id)?;
                let is_binary = is_binary_data(&obj.data);
                FileDelta {
                    path: location.to_string(),
                    kind: ChangeKind::Deleted,
                    added_lines: 0,
                    deleted_lines: if is_binary { 0 } else { count_lines(&obj.data) },
                    is_binary,
                }
            }
            ChangeDetached::Modification {
                previous_id,
                id,
                location,
                ..
            } => {
                let old = self.repo.find_object(previous_id)?;
                let new = self.repo.find_object(id)?;
                let is_binary = is_binary_data(&old.data) || is_binary_data(&new.data);
                let (added, deleted) = if is_binary {
                    (0, 0)
                } else {
                    line_diff(&old.data, &new.data)
                };
                FileDelta {
                    path: location.to_string(),
                    kind: ChangeKind::Modified,
                    added_lines: added,
                    deleted_lines: deleted,
                    is_binary,
                }
            }
            // A rewrite is a rename (or copy) detected between the trees.
            // Exactly one delta for the new path; the old path never yields a
            // separate deletion, so nothing is double counted.
            ChangeDetached::Rewrite {
                source_id,
                id,
                source_location,
                location,
                copy,
                ..
            } => {
                if copy {
                    return Ok(None);
                }
                let old = self.repo.find_object(source_id)?;
                let new = self.repo.find_object(id)?;
                let is_binary = is_binary_data(&old.data) || is_binary_data(&new.data);
                let (added, deleted) = if is_binary {
                    (0, 0)
                } else {
                    line_diff(&old.data, &new.data)
                };
                FileDelta {
                    path: location.to_string(),
                    kind: ChangeKind::Renamed {
                        from: source_location.to_string(),
                    },
                    added_lines: added,
                    deleted_lines: deleted,
                    is_binary,
                }
            }
        };
        Ok(Some(delta))
    }
}

impl CommitSource for GitRepo {
    fn resolve_references(&self, names: &[String]) -> Result<Vec<String>> {
        if names.is_empty() {
            return self.all_branch_tips();
        }

        let mut tips = Vec::new();
        for name in names {
            let id = self
                .repo
                .rev_parse_single(name.as_str())
                .map_err(|_| RepoStatsError::ReferenceNotFound(name.clone()))?;
            let commit = id
                .object()?
                .try_into_commit()
                .map_err(|_| RepoStatsError::ReferenceNotFound(name.clone()))?;
            tips.push(commit.id.to_string());
        }
        tips.dedup();
        Ok(tips)
    }

    fn commit(&self, hash: &str) -> Result<CommitRecord> {
        self.load_record(hash)
            .map_err(|e| classify_commit_error(hash, e))
    }

    fn parents(&self, hash: &str) -> Result<Vec<String>> {
        let oid = ObjectId::from_hex(hash.as_bytes())
            .map_err(|e| RepoStatsError::Parse(format!("Invalid commit ID '{hash}': {e}")))?;
        let commit = self.repo.find_commit(oid)?;
        Ok(commit.parent_ids().map(|id| id.to_string()).collect())
    }
}

/// Failures scoped to one object (unreadable blob, undecodable commit, bad
/// diff) are recoverable and become `CommitExtraction`; anything that points
/// at the store itself stays fatal so a corrupt repository aborts the run
/// instead of skipping every commit.
fn classify_commit_error(hash: &str, err: RepoStatsError) -> RepoStatsError {
    match err {
        e @ (RepoStatsError::CommitExtraction { .. }
        | RepoStatsError::RepositoryAccess(_)
        | RepoStatsError::Git(_)
        | RepoStatsError::GitDiscover(_)
        | RepoStatsError::Io(_)
        | RepoStatsError::RefFind(_)
        | RepoStatsError::HeadPeel(_)) => e,
        other => RepoStatsError::CommitExtraction {
            hash: hash.to_string(),
            reason: other.to_string(),
        },
    }
}

fn is_binary_data(data: &[u8]) -> bool {
    data.iter().take(8192).any(|&b| b == 0)
}

fn count_lines(data: &[u8]) -> u32 {
    std::str::from_utf8(data)
        .map(|t| t.lines().count() as u32)
        .unwrap_or(0)
}

fn line_diff(old: &[u8], new: &[u8]) -> (u32, u32) {
    let old_text = std::str::from_utf8(old).unwrap_or("");
    let new_text = std::str::from_utf8(new).unwrap_or("");

    let diff = TextDiff::from_lines(old_text, new_text);
    let mut added = 0u32;
    let mut deleted = 0u32;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => deleted += 1,
            ChangeTag::Equal => {}
        }
    }
    (added, deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn line_diff_counts_inserts_and_deletes() {
        let (added, deleted) = line_diff(b"a\nb\nc\n", b"a\nx\nc\nd\n");
        assert_eq!((added, deleted), (2, 1));
    }

    #[test]
    fn line_diff_of_identical_content_is_zero() {
        assert_eq!(line_diff(b"same\n", b"same\n"), (0, 0));
    }

    #[test]
    fn nul_byte_marks_binary() {
        assert!(is_binary_data(b"\x00\x01\x02"));
        assert!(!is_binary_data(b"plain text\n"));
    }

    #[test]
    fn object_scoped_errors_become_recoverable() {
        let err = classify_commit_error(
            "deadbeef",
            RepoStatsError::Parse("invalid commit header".to_string()),
        );
        assert!(matches!(
            err,
            RepoStatsError::CommitExtraction { ref hash, .. } if hash == "deadbeef"
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn store_level_errors_stay_fatal() {
        let err = classify_commit_error(
            "deadbeef",
            RepoStatsError::RepositoryAccess("object database unreadable".to_string()),
        );
        assert!(matches!(err, RepoStatsError::RepositoryAccess(_)));
        assert!(err.is_fatal());
    }
}
