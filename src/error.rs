use thiserror::Error;

/// Failures that end a pipeline run for one document.
///
/// Errors local to a single node, handle, or proof are absorbed into the
/// partial outcome types in `types`; only failures that prevent any useful
/// artifact from being produced surface through this enum.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("document fetch failed for {id}: {source}")]
    DocumentFetch {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no anchoring nodes reachable")]
    NoNodes,

    #[error("submission rejected by all {attempted} nodes")]
    SubmissionFailed { attempted: usize },

    #[error("status query failed for all {0} handles")]
    PollFailed(usize),

    /// A proof that cannot be persisted is equivalent to an anchoring
    /// that never happened, so archive writes are fatal for the run.
    #[error("archive write failed for {filename}: {source}")]
    ArchiveWrite {
        filename: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("task store error: {0}")]
    TaskStore(#[source] anyhow::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
