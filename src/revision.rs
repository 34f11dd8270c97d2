use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::cmd;
use crate::error::{ReleaseError, ReleaseResult};

/// A cloned revision: short commit hash plus the branch it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionId {
    pub hash: String,
    pub branch: String,
}

/// On-disk revision layout for one application:
///
/// ```text
/// apps/<name>/data/      persistent data
/// apps/<name>/log/       logs
/// apps/<name>/tmp/       scratch clone, removed at release start
/// apps/<name>/<hash>/    one retained revision
/// apps/<name>/current    symlink to the live revision
/// ```
///
/// `current` must point at a valid revision at every observable
/// instant; repointing it is the activation event.
#[derive(Debug, Clone)]
pub struct RevisionStore {
    app_dir: PathBuf,
}

impl RevisionStore {
    #[must_use]
    pub fn new(apps_root: &Path, name: &str) -> Self {
        Self {
            app_dir: apps_root.join(name),
        }
    }

    #[must_use]
    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.app_dir.join("data")
    }

    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.app_dir.join("log")
    }

    #[must_use]
    pub fn tmp_dir(&self) -> PathBuf {
        self.app_dir.join("tmp")
    }

    #[must_use]
    pub fn current_link(&self) -> PathBuf {
        self.app_dir.join("current")
    }

    #[must_use]
    pub fn revision_dir(&self, hash: &str) -> PathBuf {
        self.app_dir.join(hash)
    }

    /// Built artifact directory of whichever revision is live.
    #[must_use]
    pub fn dist_dir(&self) -> PathBuf {
        self.current_link().join("dist")
    }

    /// Create the persistent directories and clear any scratch clone
    /// a killed run may have left behind.
    pub fn prepare(&self) -> ReleaseResult<()> {
        fs::create_dir_all(self.data_dir())?;
        fs::create_dir_all(self.log_dir())?;

        let tmp = self.tmp_dir();
        if tmp.exists() {
            fs::remove_dir_all(&tmp)?;
        }
        Ok(())
    }

    /// Clone the repository into the scratch directory.
    pub fn fetch(&self, repo: &str, branch: Option<&str>) -> ReleaseResult<()> {
        let mut args = vec!["clone", repo, "--depth", "1"];
        if let Some(branch) = branch {
            args.extend(["--branch", branch]);
        }
        args.push("tmp");

        let cloned = cmd::run_interactive_in(&self.app_dir, "git", &args);
        if cloned.is_err() || !self.tmp_dir().exists() {
            return Err(ReleaseError::CloneFailed(repo.to_string()));
        }
        Ok(())
    }

    /// Identify the scratch clone's revision.
    pub fn identify(&self) -> ReleaseResult<RevisionId> {
        let tmp = self.tmp_dir();
        let hash = cmd::run_in(&tmp, "git", &["rev-parse", "--short", "HEAD"])?;
        let branch = cmd::run_in(&tmp, "git", &["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(RevisionId { hash, branch })
    }

    /// Refuse to re-deploy a revision that is already on disk. The
    /// scratch clone is removed; nothing else is touched.
    pub fn check_new(&self, id: &RevisionId) -> ReleaseResult<()> {
        if self.revision_dir(&id.hash).exists() {
            let _ = fs::remove_dir_all(self.tmp_dir());
            return Err(ReleaseError::RevisionExists(id.hash.clone()));
        }
        Ok(())
    }

    /// Move the scratch clone to its permanent directory and
    /// atomically repoint `current`.
    ///
    /// The repoint is a symlink created at a scratch name and renamed
    /// over `current`; rename(2) replaces the link in one step, so
    /// there is no instant where `current` points at neither revision.
    /// Returns the previously live revision directory, if any.
    pub fn activate(&self, hash: &str) -> ReleaseResult<Option<PathBuf>> {
        fs::rename(self.tmp_dir(), self.revision_dir(hash))?;

        let current = self.current_link();
        let previous = match fs::read_link(&current) {
            Ok(target) => Some(self.app_dir.join(target)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let staging = self.app_dir.join("current.new");
        if fs::symlink_metadata(&staging).is_ok() {
            fs::remove_file(&staging)?;
        }
        std::os::unix::fs::symlink(hash, &staging)?;
        fs::rename(&staging, &current)?;

        Ok(previous)
    }

    /// Delete the superseded revision directory. Failure is logged,
    /// never fatal: the new revision is already serving.
    pub fn prune(&self, previous: &Path) {
        eprintln!("Removing previous revision {}", previous.display());
        if let Err(e) = fs::remove_dir_all(previous) {
            eprintln!("warning: could not remove {}: {e}", previous.display());
        }
    }

    /// Delete the entire application tree.
    pub fn remove_all(&self) -> ReleaseResult<()> {
        fs::remove_dir_all(&self.app_dir)?;
        Ok(())
    }
}
