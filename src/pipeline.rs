use crate::aggregate::Aggregator;
use crate::error::Result;
use crate::extract::Extractor;
use crate::identity::AliasTable;
use crate::model::{AnalysisReport, DateRange, MergeDiffMode, PeriodBucket};
use crate::source::CommitSource;
use crate::traverse::{WalkOptions, Walker};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub struct AnalysisConfig {
    pub refs: Vec<String>,
    pub range: DateRange,
    pub max_commits: Option<usize>,
    pub merge_mode: MergeDiffMode,
    pub bucket: PeriodBucket,
    pub file_depth: Option<u32>,
    pub aliases: AliasTable,
    pub stop: Option<Arc<AtomicBool>>,
    pub show_progress: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            refs: Vec::new(),
            range: DateRange::new(),
            max_commits: None,
            merge_mode: MergeDiffMode::None,
            bucket: PeriodBucket::Week,
            file_depth: None,
            aliases: AliasTable::empty(),
            stop: None,
            show_progress: false,
        }
    }
}

/// Run the whole pipeline: walk, extract, fold, snapshot. Fatal errors
/// propagate; per-commit failures end up in the report's skipped list.
pub fn analyze<S: CommitSource>(
    source: &S,
    repository_path: String,
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    let extractor = Extractor::new(&config.aliases, config.merge_mode);
    let mut aggregator = Aggregator::new(config.bucket).with_file_depth(config.file_depth);

    let mut walker = Walker::new(
        source,
        WalkOptions {
            refs: config.refs.clone(),
            range: config.range.clone(),
            max_commits: config.max_commits,
            stop: config.stop.clone(),
        },
    )?;

    let pb = if config.show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} ({pos} commits)")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Analyzing history...");
        pb
    } else {
        ProgressBar::hidden()
    };

    for record in walker.by_ref() {
        let record = record?;
        let facts = extractor.extract(&record);
        aggregator.record_commit(&facts);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let outcome = walker.into_outcome();
    Ok(aggregator.finish(repository_path, outcome.skipped, outcome.partial))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChangeKind, FileDelta};
    use crate::source::memory::{record, MemorySource};
    use pretty_assertions::assert_eq;

    fn linear_history(n: usize) -> MemorySource {
        let mut src = MemorySource::new();
        let mut prev: Option<String> = None;
        for i in 0..n {
            let hash = format!("c{i:03}");
            let parents: Vec<&str> = prev.as_deref().into_iter().collect();
            src.add(record(
                &hash,
                &parents,
                ("Jane", "jane@x.com"),
                i as i64,
                vec![FileDelta {
                    path: "src/lib.rs".to_string(),
                    kind: ChangeKind::Modified,
                    added_lines: 1,
                    deleted_lines: 0,
                    is_binary: false,
                }],
            ));
            prev = Some(hash);
        }
        src.add_ref("main", &format!("c{:03}", n - 1));
        src
    }

    #[test]
    fn corrupt_commit_mid_history_still_aggregates_the_rest() {
        let mut src = linear_history(100);
        src.corrupt("c050");

        let report = analyze(&src, "r".to_string(), &AnalysisConfig::default()).unwrap();

        assert_eq!(report.totals.commits, 99);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].hash, "c050");
        assert!(!report.partial);
    }

    #[test]
    fn commit_cutoff_yields_partial_report_with_exact_count() {
        let src = linear_history(20);
        let config = AnalysisConfig {
            max_commits: Some(5),
            ..Default::default()
        };

        let report = analyze(&src, "r".to_string(), &config).unwrap();
        assert_eq!(report.totals.commits, 5);
        assert!(report.partial);
    }

    #[test]
    fn unknown_ref_propagates_as_fatal() {
        let src = linear_history(3);
        let config = AnalysisConfig {
            refs: vec!["release".to_string()],
            ..Default::default()
        };
        let err = analyze(&src, "r".to_string(), &config).err().unwrap();
        assert!(err.is_fatal());
    }
}
