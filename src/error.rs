use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepoStatsError>;

#[derive(Error, Debug)]
pub enum RepoStatsError {
    /// A starting reference given on the command line does not exist.
    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),
    /// The repository itself is unreadable or corrupted. Fatal for the run.
    #[error("Repository access error: {0}")]
    RepositoryAccess(String),
    /// A single commit could not be extracted. Recoverable: the walker records
    /// it and continues.
    #[error("Failed to extract commit {hash}: {reason}")]
    CommitExtraction { hash: String, reason: String },
    /// Not a failure: the caller asked the run to stop early.
    #[error("Analysis cancelled")]
    Cancelled,
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Alias table error: {0}")]
    AliasTable(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Git error: {0}")]
    Git(#[from] Box<gix::open::Error>),
    #[error("Git discover error: {0}")]
    GitDiscover(#[from] Box<gix::discover::Error>),
    #[error("Object find error: {0}")]
    ObjectFind(#[from] Box<gix::object::find::existing::Error>),
    #[error("Object find with conversion error: {0}")]
    ObjectFindConv(#[from] Box<gix::object::find::existing::with_conversion::Error>),
    #[error("Commit error: {0}")]
    Commit(#[from] Box<gix::object::commit::Error>),
    #[error("Object decode error: {0}")]
    ObjectDecode(#[from] Box<gix::objs::decode::Error>),
    #[error("Reference find error: {0}")]
    RefFind(#[from] Box<gix::reference::find::existing::Error>),
    #[error("Head peel error: {0}")]
    HeadPeel(#[from] Box<gix::head::peel::to_commit::Error>),
    #[error("Diff tree to tree error: {0}")]
    DiffTreeToTree(#[from] Box<gix::repository::diff_tree_to_tree::Error>),
}

impl RepoStatsError {
    /// Fatal errors abort the whole run; everything else is handled per commit.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RepoStatsError::CommitExtraction { .. } | RepoStatsError::Cancelled
        )
    }
}

// Manual From implementations for unboxed to boxed conversions
impl From<gix::open::Error> for RepoStatsError {
    fn from(err: gix::open::Error) -> Self {
        RepoStatsError::Git(Box::new(err))
    }
}

impl From<gix::discover::Error> for RepoStatsError {
    fn from(err: gix::discover::Error) -> Self {
        RepoStatsError::GitDiscover(Box::new(err))
    }
}

impl From<gix::object::find::existing::Error> for RepoStatsError {
    fn from(err: gix::object::find::existing::Error) -> Self {
        RepoStatsError::ObjectFind(Box::new(err))
    }
}

impl From<gix::object::find::existing::with_conversion::Error> for RepoStatsError {
    fn from(err: gix::object::find::existing::with_conversion::Error) -> Self {
        RepoStatsError::ObjectFindConv(Box::new(err))
    }
}

impl From<gix::object::commit::Error> for RepoStatsError {
    fn from(err: gix::object::commit::Error) -> Self {
        RepoStatsError::Commit(Box::new(err))
    }
}

impl From<gix::objs::decode::Error> for RepoStatsError {
    fn from(err: gix::objs::decode::Error) -> Self {
        RepoStatsError::ObjectDecode(Box::new(err))
    }
}

impl From<gix::reference::find::existing::Error> for RepoStatsError {
    fn from(err: gix::reference::find::existing::Error) -> Self {
        RepoStatsError::RefFind(Box::new(err))
    }
}

impl From<gix::head::peel::to_commit::Error> for RepoStatsError {
    fn from(err: gix::head::peel::to_commit::Error) -> Self {
        RepoStatsError::HeadPeel(Box::new(err))
    }
}

impl From<gix::repository::diff_tree_to_tree::Error> for RepoStatsError {
    fn from(err: gix::repository::diff_tree_to_tree::Error) -> Self {
        RepoStatsError::DiffTreeToTree(Box::new(err))
    }
}
