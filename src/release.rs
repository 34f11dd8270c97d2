use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cert;
use crate::cmd;
use crate::config::{AppConfig, AppType, Manifest};
use crate::cron;
use crate::domain::{self, DomainSpec};
use crate::error::{ReleaseError, ReleaseResult};
use crate::nginx::{self, Site};
use crate::revision::RevisionStore;
use crate::service;

/// Sequences a full release: fetch, validate, build, provision
/// domains, atomically activate, prune. `remove` runs the inverse.
///
/// All steps are strictly sequential; every external-command failure
/// aborts the release. Concurrent releases of the same app are a
/// caller responsibility (take an external lock).
pub struct Releaser {
    apps_root: PathBuf,
    conf_dir: PathBuf,
    live_dir: PathBuf,
    mode: Option<String>,
    branch: Option<String>,
}

impl Releaser {
    /// Host defaults, with the deployment mode and branch override
    /// taken from `SWITCHYARD_ENV` / `SWITCHYARD_BRANCH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            apps_root: PathBuf::from("/root/apps"),
            conf_dir: PathBuf::from("/etc/nginx/conf.d"),
            live_dir: PathBuf::from(cert::LETSENCRYPT_LIVE),
            mode: std::env::var("SWITCHYARD_ENV").ok(),
            branch: std::env::var("SWITCHYARD_BRANCH").ok(),
        }
    }

    #[must_use]
    pub fn apps_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.apps_root = dir.into();
        self
    }

    #[must_use]
    pub fn conf_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.conf_dir = dir.into();
        self
    }

    #[must_use]
    pub fn letsencrypt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.live_dir = dir.into();
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: &str) -> Self {
        self.mode = Some(mode.to_string());
        self
    }

    #[must_use]
    pub fn branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    /// Parse CLI arguments and dispatch the appropriate command.
    ///
    /// # Errors
    ///
    /// Returns an error if the dispatched command fails.
    pub fn run(&self) -> ReleaseResult<()> {
        let cli = Cli::parse();

        match &cli.command {
            Command::Deploy { repo, name } => self.deploy(repo, name.as_deref()),
            Command::Remove { name } => self.remove(name),
        }
    }

    /// Release a new revision of `repo`, atomically switching the
    /// app over once every step has succeeded.
    pub fn deploy(&self, repo: &str, explicit_name: Option<&str>) -> ReleaseResult<()> {
        eprintln!("Deploying repository {repo}");
        let name = app_name(repo, explicit_name)?;

        let store = RevisionStore::new(&self.apps_root, &name);
        store.prepare()?;
        store.fetch(repo, self.branch.as_deref())?;

        let tmp = store.tmp_dir();

        // The mode is written into the clone so the app resolves the
        // same config variant at runtime.
        if let Some(mode) = &self.mode {
            fs::write(tmp.join(".env"), mode)?;
        }

        let id = store.identify()?;
        eprintln!("Revision {} on {} branch", id.hash, id.branch);
        store.check_new(&id)?;

        let config = AppConfig::load(&tmp, self.mode.as_deref())?;
        eprintln!("Using config: {config:?}");
        let manifest = Manifest::load(&tmp)?;
        let domains = domain::normalize(&config)?;

        eprintln!("Installing packages...");
        cmd::run_interactive_in(&tmp, "npm", &["i", "--omit=dev"])?;

        if manifest.has_script("build") {
            eprintln!("Building app...");
            cmd::run_interactive_in(&tmp, "npm", &["run", "build"])
                .map_err(|e| ReleaseError::BuildFailed(e.to_string()))?;
        }

        if config.apptype == AppType::Web {
            self.provision_domains(&name, &config, &domains, &store)?;

            if let Some(basicauth) = &config.basicauth {
                service::write_htpasswd(&store.data_dir(), basicauth)?;
            }

            cron::install(&config.jobs)?;

            if config.sitemap && manifest.has_script("sitemap") {
                cmd::run_interactive_in(&tmp, "npm", &["run", "sitemap"])?;
            }
            if manifest.has_script("migrate") {
                cmd::run_interactive_in(&tmp, "npm", &["run", "migrate"])?;
            }
        }

        let previous = store.activate(&id.hash)?;
        if let Some(previous) = previous {
            store.prune(&previous);
        }

        if config.apptype == AppType::Web {
            service::daemon_reload()?;
            service::restart_nginx()?;

            if config.proxy.is_some() {
                service::start_app(&name)?;
            } else {
                service::stop_app(&name)?;
            }

            if config.ping && manifest.has_script("ping") {
                cmd::run_interactive_in(&store.current_link(), "npm", &["run", "ping"])?;
            }
        }

        eprintln!();
        eprintln!("Deployed.");
        Ok(())
    }

    /// Tear an application down: stop its unit, drop per-domain
    /// config and certificates, delete its tree.
    ///
    /// Per-domain cleanup is best effort; one failing step never
    /// blocks the next.
    pub fn remove(&self, name: &str) -> ReleaseResult<()> {
        eprintln!("Removing {name}");

        let store = RevisionStore::new(&self.apps_root, name);
        let config = AppConfig::load(&store.current_link(), self.mode.as_deref())?;
        let hosts = domain::canonical_hosts(&config);
        if hosts.is_empty() {
            eprintln!("No domains found.");
            return Ok(());
        }

        if let Err(e) = service::stop_app(name) {
            eprintln!("warning: {e}");
        }

        for host in &hosts {
            let conf = nginx::conf_path(&self.conf_dir, host, name);
            if let Err(e) = fs::remove_file(&conf) {
                eprintln!("warning: could not remove {}: {e}", conf.display());
            }
            if let Err(e) = cert::revoke_certificate(host) {
                eprintln!("warning: {e}");
            }
        }

        store.remove_all()?;

        eprintln!();
        eprintln!("Removed {name}.");
        Ok(())
    }

    fn provision_domains(
        &self,
        name: &str,
        config: &AppConfig,
        domains: &[DomainSpec],
        store: &RevisionStore,
    ) -> ReleaseResult<()> {
        let dist = store.dist_dir();
        let data = store.data_dir();

        for spec in domains {
            if spec.skip_proxy {
                eprintln!("Found ip address, skipping...");
                continue;
            }

            eprintln!("Processing {}...", spec.canonical());

            let (cert_path, key_path) = cert::cert_paths(spec, &self.live_dir);
            let site = Site::new(
                spec,
                config,
                cert_path.clone(),
                key_path,
                dist.clone(),
                data.clone(),
            );
            let conf_file = nginx::conf_path(&self.conf_dir, spec.canonical(), name);

            cert::ensure_certificate(spec, &site, &conf_file, &cert_path, config.email.as_deref())?;
            fs::write(&conf_file, nginx::render(&site, spec.ssl))?;
        }

        Ok(())
    }
}

impl Default for Releaser {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive the application name from an explicit argument or the last
/// path segment of the repository URL.
pub fn app_name(repo: &str, explicit: Option<&str>) -> ReleaseResult<String> {
    let raw = match explicit {
        Some(name) => name,
        None => repo.rsplit('/').next().unwrap_or_default(),
    };

    let name = raw.trim().replace(' ', "_").to_lowercase();
    let name = name.strip_suffix(".git").unwrap_or(&name);
    if name.is_empty() {
        return Err(ReleaseError::InputMissing("application name".into()));
    }
    Ok(name.to_string())
}

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Zero-downtime single-host releases", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, build, and activate a new revision
    Deploy {
        /// Git repository URL
        repo: String,

        /// Application name (defaults to the repository basename)
        name: Option<String>,
    },

    /// Tear an application down
    Remove {
        /// Application name
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_from_repo_basename() {
        let name = app_name("https://github.com/acme/My App.git", None).expect("name");

        assert_eq!(name, "my_app");
    }

    #[test]
    fn explicit_name_wins() {
        let name = app_name("https://example.com/repo.git", Some("Custom Name")).expect("name");

        assert_eq!(name, "custom_name");
    }

    #[test]
    fn empty_name_is_rejected() {
        let result = app_name("https://example.com/", None);

        assert!(matches!(result, Err(ReleaseError::InputMissing(_))));
    }
}
