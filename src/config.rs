use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::RawDomains;
use crate::error::{ReleaseError, ReleaseResult};

/// Application type declared in the config document.
///
/// Only `web` apps get reverse-proxy config, certificates, and a
/// supervised unit; `service` and `lib` deploys stop after the
/// revision swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    #[default]
    Web,
    Service,
    Lib,
}

/// Declarative per-app configuration, read from `app.json` in the
/// cloned working tree (or a per-mode variant, see
/// [`AppConfig::load`]).
///
/// The top-level `redirects`/`ssl` fields only apply when `domains`
/// is a bare hostname string; they are folded into the single domain
/// it produces.
#[derive(Debug, Clone, Deserialize)]
#[allow(clippy::struct_excessive_bools)] // mirrors the flag-shaped config document
pub struct AppConfig {
    #[serde(default)]
    pub domains: Option<RawDomains>,
    #[serde(default)]
    pub apptype: AppType,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub basicauth: Option<String>,
    #[serde(default)]
    pub ssr: bool,
    #[serde(default)]
    pub sitemapdir: Option<String>,
    #[serde(default)]
    pub errordir: Option<String>,
    #[serde(default)]
    pub redirectmain: bool,
    #[serde(default)]
    pub jobs: Vec<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub sitemap: bool,
    #[serde(default)]
    pub ping: bool,
    #[serde(default)]
    pub redirects: Vec<String>,
    #[serde(default)]
    pub ssl: Option<bool>,
}

impl AppConfig {
    /// Load and validate the config document from `dir`.
    ///
    /// When `mode` is set and `app.<mode>.json` exists it is loaded
    /// instead of `app.json`, so one repository can carry per-host
    /// variants.
    pub fn load(dir: &Path, mode: Option<&str>) -> ReleaseResult<Self> {
        let path = config_path(dir, mode);
        if !path.exists() {
            return Err(ReleaseError::ConfigMissing(path));
        }

        let content = fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ReleaseError::ConfigInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ReleaseResult<()> {
        if self.apptype == AppType::Web && self.domains.as_ref().is_none_or(RawDomains::is_empty) {
            return Err(ReleaseError::ConfigInvalid(
                "domains field is missing".into(),
            ));
        }
        Ok(())
    }
}

fn config_path(dir: &Path, mode: Option<&str>) -> PathBuf {
    if let Some(mode) = mode {
        let variant = dir.join(format!("app.{mode}.json"));
        if variant.exists() {
            return variant;
        }
    }
    dir.join("app.json")
}

/// The package manifest (`package.json`), reduced to the lifecycle
/// scripts the release sequence gates on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

impl Manifest {
    pub fn load(dir: &Path) -> ReleaseResult<Self> {
        let path = dir.join("package.json");
        if !path.exists() {
            return Err(ReleaseError::ManifestMissing);
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Whether the manifest declares a lifecycle script by name.
    #[must_use]
    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }
}
