pub mod aggregate;
pub mod cli;
pub mod error;
pub mod extract;
pub mod git;
pub mod identity;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod traverse;
pub mod util;

pub use aggregate::Aggregator;
pub use error::{RepoStatsError, Result};
pub use extract::Extractor;
pub use identity::AliasTable;
pub use model::{AnalysisReport, CommitRecord, MergeDiffMode, PeriodBucket};
pub use pipeline::{analyze, AnalysisConfig};
pub use source::CommitSource;
pub use traverse::{WalkOptions, Walker};
