//! Crate-wide error type.

use crate::path::ProjectId;
use std::path::PathBuf;

pub type Result<T, E = BuildError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to read project file {path}: {source}")]
    ReadConfig { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to parse project file {path}: {source}")]
    ParseConfig { path: PathBuf, #[source] source: serde_json::Error },

    #[error("project {0} specifies both `outFile` and `outDir`")]
    ConflictingEmitMode(PathBuf),

    #[error("project {0} has input files but no `outDir` (required unless `outFile` is set)")]
    MissingOutDir(PathBuf),

    #[error("reference target does not resolve to a project file: {0}")]
    UnresolvedReference(PathBuf),

    #[error("dependency cycle detected involving project {0}")]
    Cycle(ProjectId),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Glob(#[from] glob::PatternError),

    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error("{0}")]
    Message(String),
}

impl BuildError {
    pub fn msg(msg: impl std::fmt::Display) -> Self {
        BuildError::Message(msg.to_string())
    }
}
