use std::path::PathBuf;

use thiserror::Error;

/// Failures that terminate the current command invocation
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not resolve PR context: {0}")]
    ContextResolution(String),

    #[error("failed to fetch review threads (stopped at page {page}): {cause:#}")]
    ThreadFetch { page: usize, cause: anyhow::Error },

    #[error("failed to fetch review comments: {0:#}")]
    CommentFetch(anyhow::Error),

    #[error("could not determine a cutoff timestamp: {0}")]
    TimestampResolution(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to create issue: {0:#}")]
    IssueCreate(anyhow::Error),
}
