//! Error types for gitbot.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration errors. Any of these aborts the run before (or
/// instead of) touching the remote platform.
#[derive(Error, Debug)]
pub enum GitbotError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Path for JSON report {0} does not exist")]
    ReportNotFound(PathBuf),

    #[error(
        "Unable to load JSON report at {path}, ensure it is a valid JSON report: {reason}"
    )]
    InvalidReport { path: PathBuf, reason: String },

    #[error("Path for PDF report {0} does not exist")]
    PdfReportNotFound(PathBuf),

    #[error(
        "Unable to create an instance for the {platform} platform, ensure {env_var} is set"
    )]
    PlatformUnavailable {
        platform: String,
        env_var: &'static str,
    },

    #[error("Repository {repository} was not found on {platform}")]
    RepositoryNotFound {
        repository: String,
        platform: String,
    },

    #[error("Unable to find branch {0} remotely")]
    BranchNotFound(String),

    #[error("Change detection failed: {0}")]
    ChangeDetection(String),

    #[error("Unable to generate the text content for the {0}")]
    NoTextContent(&'static str),
}

/// Reasons a sentinel report is dropped by the change collector. These are
/// logged and never abort the run.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CollectionError {
    #[error("unable to load report {path}: {reason}")]
    UnreadableReport { path: PathBuf, reason: String },

    #[error("no manifest listed by {0} was modified locally")]
    NoCorrelatedChanges(PathBuf),

    #[error("no dependency updates found in {0}")]
    NoDependencies(PathBuf),

    #[error("unable to parse project id from url {url:?} in {path}")]
    NoProjectId { path: PathBuf, url: Option<String> },

    #[error("unable to read manifest {path}: {reason}")]
    UnreadableManifest { path: PathBuf, reason: String },
}
