use crate::model::{
    AnalysisReport, AuthorEntry, AuthorFact, CommitFacts, ExtensionEntry, FileEntry, FileFact,
    PeriodBucket, PeriodEntry, SkippedCommit, Totals, SCHEMA_VERSION,
};
use crate::util::period_key;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug)]
struct AuthorAccum {
    display_name: String,
    commits: u64,
    merges: u64,
    added: u64,
    deleted: u64,
    files: HashSet<String>,
    days: HashSet<NaiveDate>,
    first: chrono::DateTime<Utc>,
    last: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct FileAccum {
    commits: u64,
    added: u64,
    deleted: u64,
    binary: u64,
    renames: u64,
    authors: HashSet<String>,
}

#[derive(Debug, Default)]
struct ExtAccum {
    commits: u64,
    files_changed: u64,
    added: u64,
    deleted: u64,
}

#[derive(Debug, Default)]
struct PeriodAccum {
    commits: u64,
    merges: u64,
    added: u64,
    deleted: u64,
    authors: HashSet<String>,
    binary: u64,
}

/// Streaming fold over commit facts. Holds running counters only: memory is
/// proportional to distinct authors, files, extensions, and periods, never to
/// commit count. The fold is commutative, so feeding the same facts in any
/// order produces the same snapshot. Callers must deliver each fact at most
/// once; the walker's visited set guarantees that upstream.
pub struct Aggregator {
    bucket: PeriodBucket,
    file_depth: Option<u32>,
    authors: HashMap<String, AuthorAccum>,
    files: HashMap<String, FileAccum>,
    extensions: HashMap<String, ExtAccum>,
    periods: BTreeMap<String, PeriodAccum>,
    totals: Totals,
}

impl Aggregator {
    pub fn new(bucket: PeriodBucket) -> Self {
        Self {
            bucket,
            file_depth: None,
            authors: HashMap::new(),
            files: HashMap::new(),
            extensions: HashMap::new(),
            periods: BTreeMap::new(),
            totals: Totals::default(),
        }
    }

    /// Roll file-table paths up to the first `depth` directory components.
    pub fn with_file_depth(mut self, depth: Option<u32>) -> Self {
        self.file_depth = depth;
        self
    }

    /// Fold one commit's facts into every table.
    pub fn record_commit(&mut self, facts: &CommitFacts) {
        self.record_author_fact(&facts.author);
        for file in &facts.files {
            self.record_file_fact(&facts.author, file);
        }
        self.record_period_fact(&facts.author, &facts.files);

        // Extension commit counts are per commit, not per file, so dedupe
        // within this commit before bumping.
        let touched: HashSet<&str> = facts.files.iter().map(|f| f.extension.as_str()).collect();
        for ext in touched {
            self.extensions.entry(ext.to_string()).or_default().commits += 1;
        }
    }

    fn author_accum(&mut self, fact: &AuthorFact) -> &mut AuthorAccum {
        self.authors
            .entry(fact.identity.clone())
            .or_insert_with(|| AuthorAccum {
                display_name: fact.display_name.clone(),
                commits: 0,
                merges: 0,
                added: 0,
                deleted: 0,
                files: HashSet::new(),
                days: HashSet::new(),
                first: fact.timestamp,
                last: fact.timestamp,
            })
    }

    pub fn record_author_fact(&mut self, fact: &AuthorFact) {
        let entry = self.author_accum(fact);
        entry.commits += 1;
        if fact.is_merge {
            entry.merges += 1;
        }
        entry.days.insert(fact.timestamp.date_naive());
        entry.first = entry.first.min(fact.timestamp);
        entry.last = entry.last.max(fact.timestamp);

        self.totals.commits += 1;
        if fact.is_merge {
            self.totals.merges += 1;
        }
        self.totals.first_commit = Some(match self.totals.first_commit {
            Some(first) => first.min(fact.timestamp),
            None => fact.timestamp,
        });
        self.totals.last_commit = Some(match self.totals.last_commit {
            Some(last) => last.max(fact.timestamp),
            None => fact.timestamp,
        });
    }

    pub fn record_file_fact(&mut self, author: &AuthorFact, fact: &FileFact) {
        let key = match self.file_depth {
            Some(depth) => crate::util::aggregate_path(&fact.path, depth),
            None => fact.path.clone(),
        };
        let file = self.files.entry(key).or_default();
        file.commits += 1;
        file.added += fact.added_lines as u64;
        file.deleted += fact.deleted_lines as u64;
        if fact.is_binary {
            file.binary += 1;
        }
        if fact.is_rename {
            file.renames += 1;
        }
        file.authors.insert(author.identity.clone());

        let ext = self.extensions.entry(fact.extension.clone()).or_default();
        ext.files_changed += 1;
        ext.added += fact.added_lines as u64;
        ext.deleted += fact.deleted_lines as u64;

        let author_entry = self.author_accum(author);
        author_entry.added += fact.added_lines as u64;
        author_entry.deleted += fact.deleted_lines as u64;
        author_entry.files.insert(fact.path.clone());

        self.totals.added_lines += fact.added_lines as u64;
        self.totals.deleted_lines += fact.deleted_lines as u64;
        self.totals.files_changed += 1;
        if fact.is_binary {
            self.totals.binary_changes += 1;
        }
    }

    pub fn record_period_fact(&mut self, author: &AuthorFact, files: &[FileFact]) {
        let key = period_key(&author.timestamp, self.bucket);
        let period = self.periods.entry(key).or_default();
        period.commits += 1;
        if author.is_merge {
            period.merges += 1;
        }
        period.authors.insert(author.identity.clone());
        for file in files {
            period.added += file.added_lines as u64;
            period.deleted += file.deleted_lines as u64;
            if file.is_binary {
                period.binary += 1;
            }
        }
    }

    /// Close the fold: sort every table deterministically and hand back the
    /// read-only snapshot. Internal state is consumed.
    pub fn finish(
        mut self,
        repository_path: String,
        skipped: Vec<SkippedCommit>,
        partial: bool,
    ) -> AnalysisReport {
        self.totals.net_lines = self.totals.added_lines as i64 - self.totals.deleted_lines as i64;
        self.totals.churn = self.totals.added_lines + self.totals.deleted_lines;

        let mut authors: Vec<AuthorEntry> = self
            .authors
            .into_iter()
            .map(|(identity, a)| AuthorEntry {
                identity,
                display_name: a.display_name,
                commits: a.commits,
                merges: a.merges,
                added_lines: a.added,
                deleted_lines: a.deleted,
                net_lines: a.added as i64 - a.deleted as i64,
                churn: a.added + a.deleted,
                files_touched: a.files.len() as u64,
                active_days: a.days.len() as u64,
                first_commit: a.first,
                last_commit: a.last,
            })
            .collect();
        authors.sort_by(|a, b| {
            b.commits
                .cmp(&a.commits)
                .then_with(|| a.identity.cmp(&b.identity))
        });

        let mut files: Vec<FileEntry> = self
            .files
            .into_iter()
            .map(|(path, f)| FileEntry {
                path,
                commits: f.commits,
                added_lines: f.added,
                deleted_lines: f.deleted,
                churn: f.added + f.deleted,
                binary_changes: f.binary,
                renames: f.renames,
                authors: f.authors.len() as u64,
            })
            .collect();
        files.sort_by(|a, b| b.churn.cmp(&a.churn).then_with(|| a.path.cmp(&b.path)));

        let mut extensions: Vec<ExtensionEntry> = self
            .extensions
            .into_iter()
            .map(|(extension, e)| ExtensionEntry {
                extension,
                commits: e.commits,
                files_changed: e.files_changed,
                added_lines: e.added,
                deleted_lines: e.deleted,
            })
            .collect();
        extensions.sort_by(|a, b| {
            (b.added_lines + b.deleted_lines)
                .cmp(&(a.added_lines + a.deleted_lines))
                .then_with(|| a.extension.cmp(&b.extension))
        });

        let periods: Vec<PeriodEntry> = self
            .periods
            .into_iter()
            .map(|(period, p)| PeriodEntry {
                period,
                commits: p.commits,
                merges: p.merges,
                added_lines: p.added,
                deleted_lines: p.deleted,
                churn: p.added + p.deleted,
                authors: p.authors.len() as u64,
                binary_changes: p.binary,
            })
            .collect();

        AnalysisReport {
            version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            repository_path,
            bucket: self.bucket,
            totals: self.totals,
            authors,
            files,
            extensions,
            periods,
            skipped,
            partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extractor;
    use crate::identity::AliasTable;
    use crate::model::{ChangeKind, FileDelta, MergeDiffMode};
    use crate::source::memory::{record, MemorySource};
    use crate::traverse::{WalkOptions, Walker};
    use pretty_assertions::assert_eq;

    fn delta(path: &str, added: u32, deleted: u32, binary: bool) -> FileDelta {
        FileDelta {
            path: path.to_string(),
            kind: ChangeKind::Modified,
            added_lines: added,
            deleted_lines: deleted,
            is_binary: binary,
        }
    }

    fn facts_for(records: &[crate::model::CommitRecord]) -> Vec<CommitFacts> {
        let aliases = AliasTable::empty();
        let extractor = Extractor::new(&aliases, MergeDiffMode::None);
        records.iter().map(|r| extractor.extract(r)).collect()
    }

    #[test]
    fn fold_is_order_independent() {
        let records = vec![
            record(
                "a",
                &[],
                ("Jane", "jane@x.com"),
                0,
                vec![delta("src/a.rs", 10, 2, false)],
            ),
            record(
                "b",
                &["a"],
                ("Sam", "sam@x.com"),
                60,
                vec![delta("src/a.rs", 1, 1, false), delta("src/b.rs", 7, 0, false)],
            ),
            record(
                "c",
                &["b"],
                ("Jane", "jane@x.com"),
                120,
                vec![delta("logo.png", 0, 0, true)],
            ),
        ];
        let facts = facts_for(&records);

        let mut forward = Aggregator::new(PeriodBucket::Day);
        for f in &facts {
            forward.record_commit(f);
        }
        let forward = forward.finish("r".to_string(), vec![], false);

        let mut reversed = Aggregator::new(PeriodBucket::Day);
        for f in facts.iter().rev() {
            reversed.record_commit(f);
        }
        let reversed = reversed.finish("r".to_string(), vec![], false);

        assert_eq!(
            serde_json::to_value(&forward.authors).unwrap(),
            serde_json::to_value(&reversed.authors).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&forward.files).unwrap(),
            serde_json::to_value(&reversed.files).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&forward.extensions).unwrap(),
            serde_json::to_value(&reversed.extensions).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&forward.periods).unwrap(),
            serde_json::to_value(&reversed.periods).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&forward.totals).unwrap(),
            serde_json::to_value(&reversed.totals).unwrap()
        );
    }

    #[test]
    fn diamond_graph_counts_each_commit_once() {
        let mut src = MemorySource::new();
        src.add(record("a", &[], ("Jane", "jane@x.com"), 0, vec![]));
        src.add(record("b", &["a"], ("Jane", "jane@x.com"), 1, vec![]));
        src.add(record("c", &["b"], ("Sam", "sam@x.com"), 2, vec![]));
        src.add(record("d", &["b"], ("Jane", "jane@x.com"), 3, vec![]));
        src.add(record("e", &["d", "c"], ("Sam", "sam@x.com"), 4, vec![]));
        src.add_ref("main", "e");
        src.add_ref("side", "c");

        let aliases = AliasTable::empty();
        let extractor = Extractor::new(&aliases, MergeDiffMode::None);
        let mut agg = Aggregator::new(PeriodBucket::Week);
        let mut walker = Walker::new(&src, WalkOptions::default()).unwrap();
        for rec in walker.by_ref() {
            agg.record_commit(&extractor.extract(&rec.unwrap()));
        }
        let outcome = walker.into_outcome();
        let report = agg.finish("r".to_string(), outcome.skipped, outcome.partial);

        assert_eq!(report.totals.commits, 5);
        let jane = report
            .authors
            .iter()
            .find(|a| a.identity == "jane@x.com")
            .unwrap();
        let sam = report
            .authors
            .iter()
            .find(|a| a.identity == "sam@x.com")
            .unwrap();
        assert_eq!(jane.commits, 3);
        assert_eq!(sam.commits, 2);
        assert_eq!(sam.merges, 1);
    }

    #[test]
    fn case_folded_emails_aggregate_as_one_author() {
        let records = vec![
            record("a", &[], ("Jane Doe", "jane@x.com"), 0, vec![]),
            record("b", &["a"], ("J. Doe", "JANE@X.COM"), 1, vec![]),
        ];
        let facts = facts_for(&records);

        let mut agg = Aggregator::new(PeriodBucket::Week);
        for f in &facts {
            agg.record_commit(f);
        }
        let report = agg.finish("r".to_string(), vec![], false);

        assert_eq!(report.authors.len(), 1);
        assert_eq!(report.authors[0].commits, 2);
    }

    #[test]
    fn binary_changes_count_separately_from_lines() {
        let records = vec![record(
            "a",
            &[],
            ("Jane", "jane@x.com"),
            0,
            vec![
                delta("logo.png", 0, 0, true),
                delta("src/a.rs", 4, 1, false),
            ],
        )];
        let facts = facts_for(&records);

        let mut agg = Aggregator::new(PeriodBucket::Week);
        agg.record_commit(&facts[0]);
        let report = agg.finish("r".to_string(), vec![], false);

        assert_eq!(report.totals.binary_changes, 1);
        assert_eq!(report.totals.added_lines, 4);
        assert_eq!(report.totals.deleted_lines, 1);
        let png = report.files.iter().find(|f| f.path == "logo.png").unwrap();
        assert_eq!(png.binary_changes, 1);
        assert_eq!(png.churn, 0);
    }

    #[test]
    fn distinct_files_and_active_days_are_set_based() {
        let records = vec![
            record(
                "a",
                &[],
                ("Jane", "jane@x.com"),
                0,
                vec![delta("src/a.rs", 1, 0, false)],
            ),
            record(
                "b",
                &["a"],
                ("Jane", "jane@x.com"),
                30,
                vec![delta("src/a.rs", 1, 0, false)],
            ),
            // Two days later, a different file
            record(
                "c",
                &["b"],
                ("Jane", "jane@x.com"),
                60 * 48,
                vec![delta("src/b.rs", 1, 0, false)],
            ),
        ];
        let facts = facts_for(&records);

        let mut agg = Aggregator::new(PeriodBucket::Week);
        for f in &facts {
            agg.record_commit(f);
        }
        let report = agg.finish("r".to_string(), vec![], false);

        let jane = &report.authors[0];
        assert_eq!(jane.commits, 3);
        assert_eq!(jane.files_touched, 2);
        assert_eq!(jane.active_days, 2);
    }

    #[test]
    fn period_buckets_split_by_configured_granularity() {
        let records = vec![
            record("a", &[], ("Jane", "jane@x.com"), 0, vec![]),
            record("b", &["a"], ("Jane", "jane@x.com"), 60 * 24, vec![]),
        ];
        let facts = facts_for(&records);

        let mut daily = Aggregator::new(PeriodBucket::Day);
        for f in &facts {
            daily.record_commit(f);
        }
        let daily = daily.finish("r".to_string(), vec![], false);
        assert_eq!(daily.periods.len(), 2);

        let facts = facts_for(&records);
        let mut monthly = Aggregator::new(PeriodBucket::Month);
        for f in &facts {
            monthly.record_commit(f);
        }
        let monthly = monthly.finish("r".to_string(), vec![], false);
        assert_eq!(monthly.periods.len(), 1);
        assert_eq!(monthly.periods[0].commits, 2);
    }

    #[test]
    fn skipped_commits_surface_in_the_report() {
        let mut agg = Aggregator::new(PeriodBucket::Week);
        let facts = facts_for(&[record("a", &[], ("Jane", "jane@x.com"), 0, vec![])]);
        agg.record_commit(&facts[0]);
        let report = agg.finish(
            "r".to_string(),
            vec![SkippedCommit {
                hash: "deadbeef".to_string(),
                reason: "unreadable object".to_string(),
            }],
            false,
        );
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.totals.commits, 1);
    }

    #[test]
    fn file_depth_rolls_paths_into_directories() {
        let records = vec![record(
            "a",
            &[],
            ("Jane", "jane@x.com"),
            0,
            vec![
                delta("src/git/repo.rs", 2, 0, false),
                delta("src/git/walk.rs", 3, 0, false),
                delta("docs/index.md", 1, 0, false),
            ],
        )];
        let facts = facts_for(&records);

        let mut agg = Aggregator::new(PeriodBucket::Week).with_file_depth(Some(1));
        agg.record_commit(&facts[0]);
        let report = agg.finish("r".to_string(), vec![], false);

        let paths: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src", "docs"]);
        assert_eq!(report.files[0].added_lines, 5);
    }
}
