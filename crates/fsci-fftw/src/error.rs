use std::path::PathBuf;

use thiserror::Error;

/// Recoverable failure while running a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("plan has no engine handle (wisdom-only miss, unsupported problem, or destroyed)")]
    NullPlan,
    #[error("non-finite input rejected in hardened mode")]
    NonFiniteInput,
    #[error("buffer alignment changed ({planned} -> {supplied}) on a plan built without UNALIGNED")]
    AlignmentMismatch { planned: usize, supplied: usize },
}

#[derive(Debug, Error)]
pub enum WisdomError {
    #[error("wisdom file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed wisdom: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported wisdom format {format:?} version {version}")]
    Format { format: String, version: u32 },
    #[error("failed to serialize wisdom: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("planner config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed planner config: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
}
