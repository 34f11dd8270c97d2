use std::path::PathBuf;
use std::process::ExitStatus;

pub type ReleaseResult<T> = Result<T, ReleaseError>;

#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("missing input: {0}")]
    InputMissing(String),

    #[error("can't clone repo: {0}")]
    CloneFailed(String),

    /// Soft abort: the commit is already live, there is nothing to do.
    #[error("revision {0} already exists - push an update and deploy again")]
    RevisionExists(String),

    #[error("config file not found: {0}")]
    ConfigMissing(PathBuf),

    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    #[error("file package.json is missing")]
    ManifestMissing,

    #[error("invalid domain entry: {0}")]
    DomainInvalid(String),

    #[error("build failed: {0}")]
    BuildFailed(String),

    #[error("certificate issuance failed for {0}")]
    CertificateIssuanceFailed(String),

    #[error("service control failed: {0}")]
    ServiceControlFailed(String),

    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
