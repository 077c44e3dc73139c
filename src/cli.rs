use crate::git::GitRepo;
use crate::identity::AliasTable;
use crate::model::{MergeDiffMode, PeriodBucket};
use crate::pipeline::{self, AnalysisConfig};
use crate::report;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repostats")]
#[command(about = "Git history analytics: per-author, per-file, and per-period statistics")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Path to git repository")]
    pub repo: Option<PathBuf>,

    #[arg(long = "ref", help = "Start traversal from this reference (repeatable; default: all branches)")]
    pub refs: Vec<String>,

    #[arg(long, help = "Start from this commit or date (RFC3339, YYYY-MM-DD, or a duration like '90d')")]
    pub since: Option<String>,

    #[arg(long, help = "End at this commit or date (RFC3339, YYYY-MM-DD, or a duration like '90d')")]
    pub until: Option<String>,

    #[arg(long, help = "Stop after this many commits and label the result partial")]
    pub max_commits: Option<usize>,

    #[arg(long, value_enum, default_value_t = MergeDiffMode::None, help = "How merge commits are diffed")]
    pub merge_diff: MergeDiffMode,

    #[arg(long, help = "Path to a JSON author alias table")]
    pub aliases: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Per-author statistics
    Authors {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,

        #[arg(long, default_value_t = 25, help = "Rows to show in the console table")]
        limit: usize,
    },
    /// Per-file churn statistics
    Files {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,

        #[arg(long, help = "Directory depth for path rollup")]
        depth: Option<u32>,

        #[arg(long, default_value_t = 50, help = "Rows to show in the console table")]
        limit: usize,
    },
    /// Commit activity over time
    Activity {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,

        #[arg(long, value_enum, default_value_t = PeriodBucket::Week, help = "Time bucket size")]
        bucket: PeriodBucket,
    },
    /// Repository-wide summary
    Summary {
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Write a Markdown report
    Markdown {
        #[arg(long, default_value = "repostats.md", help = "Output file")]
        out: PathBuf,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        let repo = GitRepo::open(self.common.repo.as_ref(), self.common.merge_diff)
            .context("Failed to open git repository")?;

        let aliases = match &self.common.aliases {
            Some(path) => AliasTable::load(path).context("Failed to load author alias table")?,
            None => AliasTable::empty(),
        };

        let range = repo
            .resolve_range(self.common.since.as_deref(), self.common.until.as_deref())
            .context("Failed to resolve date range")?;

        let (bucket, file_depth, show_progress) = match &self.command {
            Commands::Authors { json, ndjson, .. } => {
                (PeriodBucket::Week, None, !*json && !*ndjson)
            }
            Commands::Files {
                json,
                ndjson,
                depth,
                ..
            } => (PeriodBucket::Week, *depth, !*json && !*ndjson),
            Commands::Activity {
                json,
                ndjson,
                bucket,
            } => (*bucket, None, !*json && !*ndjson),
            Commands::Summary { json } => (PeriodBucket::Week, None, !*json),
            Commands::Markdown { .. } => (PeriodBucket::Week, None, true),
        };

        let config = AnalysisConfig {
            refs: self.common.refs.clone(),
            range,
            max_commits: self.common.max_commits,
            merge_mode: self.common.merge_diff,
            bucket,
            file_depth,
            aliases,
            stop: None,
            show_progress,
        };

        let analysis = pipeline::analyze(
            &repo,
            repo.path().to_string_lossy().to_string(),
            &config,
        )
        .context("Failed to analyze repository history")?;

        match self.command {
            Commands::Authors { json, ndjson, limit } => {
                if json {
                    report::output_json(&analysis)?;
                } else if ndjson {
                    report::output_authors_ndjson(&analysis)?;
                } else {
                    report::output_authors_table(&analysis, limit);
                }
            }
            Commands::Files {
                json,
                ndjson,
                limit,
                ..
            } => {
                if json {
                    report::output_json(&analysis)?;
                } else if ndjson {
                    report::output_files_ndjson(&analysis)?;
                } else {
                    report::output_files_table(&analysis, limit);
                }
            }
            Commands::Activity { json, ndjson, .. } => {
                if json {
                    report::output_json(&analysis)?;
                } else if ndjson {
                    report::output_periods_ndjson(&analysis)?;
                } else {
                    report::output_activity(&analysis);
                }
            }
            Commands::Summary { json } => {
                if json {
                    report::output_json(&analysis)?;
                } else {
                    report::output_summary(&analysis);
                }
            }
            Commands::Markdown { out } => {
                report::write_markdown(&analysis, &out)
                    .context("Failed to write markdown report")?;
                println!("Report written to {}", out.display());
            }
        }

        Ok(())
    }
}
