use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpgradeError>;

/// Why a local archive path was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileProblem {
    Missing,
    NotAFile,
    UnsupportedExtension,
}

impl fmt::Display for FileProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileProblem::Missing => write!(f, "the file does not exist"),
            FileProblem::NotAFile => write!(f, "the path is not a regular file"),
            FileProblem::UnsupportedExtension => {
                write!(f, "expected a .tar.xz, .tar.gz or .pkg archive")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("invalid version format: `{0}` (expected vX.Y.Z or X.Y.Z)")]
    InvalidFormat(String),

    #[error("could not retrieve the remote version listing: {0}")]
    CatalogUnavailable(String),

    #[error("{}: {}", .path.display(), .problem)]
    FileValidation { path: PathBuf, problem: FileProblem },

    #[error("could not determine which Node.js version {0} contains")]
    MissingTargetVersion(String),

    #[error("not found upstream: {0}")]
    NotFound(String),

    #[error("download of {url} failed: {detail}")]
    TransferFailed { url: String, detail: String },

    #[error("installation failed: {0}")]
    InstallFailed(String),

    #[error("`{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("required tool `{0}` is not available")]
    ToolMissing(String),

    #[error("configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
