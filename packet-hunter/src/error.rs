use std::path::PathBuf;
use thiserror::Error;
use packet_hunter_schemas::filter_config::FilterConfigError;

/// Everything that can go wrong during a hunt. The first three stop the hunt before anything is
/// written to disk, the rest are collected per filter while the hunt carries on.
#[derive(Error, Debug)]
pub enum HunterError {
    #[error("Source file does not exist: {}", path.display())]
    SourceNotFound {
        path: PathBuf,
    },
    #[error("Config file does not exist: {}", path.display())]
    ConfigNotFound {
        path: PathBuf,
    },
    #[error("Invalid config {}: {source}", path.display())]
    ConfigMalformed {
        path: PathBuf,
        source: FilterConfigError,
    },
    #[error("could not run {tool}: {source}")]
    ToolNotStarted {
        tool: String,
        source: std::io::Error,
    },
    #[error("{tool} exited with status {status:?}: {stderr}")]
    ToolFailed {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("{} is not valid UTF-8", path.display())]
    NonUtf8Path {
        path: PathBuf,
    },
    #[error("bad capture search pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl HunterError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
