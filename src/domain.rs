use std::net::IpAddr;
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::AppConfig;
use crate::error::{ReleaseError, ReleaseResult};

/// The `domains` field as it appears in the config document: a bare
/// space-delimited hostname string, or a list of strings and
/// structured entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawDomains {
    One(String),
    Many(Vec<RawDomain>),
}

impl RawDomains {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(names) => names.trim().is_empty(),
            Self::Many(list) => list.is_empty(),
        }
    }
}

/// One entry of a `domains` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawDomain {
    Name(String),
    Full {
        #[serde(default)]
        names: Option<String>,
        #[serde(default)]
        cert: Option<PathBuf>,
        #[serde(default)]
        key: Option<PathBuf>,
        #[serde(default)]
        ssl: Option<bool>,
        #[serde(default, rename = "dryRun")]
        dry_run: bool,
        #[serde(default)]
        redirects: Vec<String>,
    },
}

/// One `pattern -> target` redirect rule, order-significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub pattern: String,
    pub target: String,
}

/// Canonical domain descriptor, the single shape every downstream
/// component consumes.
#[derive(Debug, Clone)]
pub struct DomainSpec {
    /// Hostnames, first one canonical.
    pub names: Vec<String>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub ssl: bool,
    pub dry_run: bool,
    pub redirects: Vec<Redirect>,
    /// Set when the canonical host is an IP literal: the template
    /// writer and certificate provisioner must be no-ops, revision
    /// bookkeeping still applies.
    pub skip_proxy: bool,
}

impl DomainSpec {
    /// The canonical ("main") hostname.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.names[0]
    }
}

/// Normalize the heterogeneous `domains` declarations into an ordered
/// [`DomainSpec`] list.
///
/// A bare string config folds the top-level `redirects`/`ssl` fields
/// into the single spec it produces.
pub fn normalize(config: &AppConfig) -> ReleaseResult<Vec<DomainSpec>> {
    let Some(raw) = &config.domains else {
        return Ok(Vec::new());
    };

    match raw {
        RawDomains::One(names) => Ok(vec![build_spec(
            names,
            None,
            None,
            config.ssl,
            false,
            &config.redirects,
        )?]),
        RawDomains::Many(list) => list
            .iter()
            .map(|entry| match entry {
                RawDomain::Name(names) => build_spec(names, None, None, None, false, &[]),
                RawDomain::Full {
                    names,
                    cert,
                    key,
                    ssl,
                    dry_run,
                    redirects,
                } => {
                    let names = names.as_deref().ok_or_else(|| {
                        ReleaseError::DomainInvalid("names field is missing".into())
                    })?;
                    build_spec(names, cert.clone(), key.clone(), *ssl, *dry_run, redirects)
                }
            })
            .collect(),
    }
}

/// Collect the canonical host of every domain entry, skipping
/// malformed ones. Teardown uses this so it can make maximum forward
/// progress even over a half-broken config.
#[must_use]
pub fn canonical_hosts(config: &AppConfig) -> Vec<String> {
    fn first(names: &str) -> Option<String> {
        names.split_whitespace().next().map(String::from)
    }

    match &config.domains {
        None => Vec::new(),
        Some(RawDomains::One(names)) => first(names).into_iter().collect(),
        Some(RawDomains::Many(list)) => list
            .iter()
            .filter_map(|entry| match entry {
                RawDomain::Name(names) => first(names),
                RawDomain::Full { names, .. } => names.as_deref().and_then(first),
            })
            .collect(),
    }
}

fn build_spec(
    names: &str,
    cert: Option<PathBuf>,
    key: Option<PathBuf>,
    ssl: Option<bool>,
    dry_run: bool,
    redirects: &[String],
) -> ReleaseResult<DomainSpec> {
    let names: Vec<String> = names.split_whitespace().map(String::from).collect();
    let Some(canonical) = names.first() else {
        return Err(ReleaseError::DomainInvalid("names field is empty".into()));
    };

    let skip_proxy = canonical.parse::<IpAddr>().is_ok();
    let redirects = redirects
        .iter()
        .map(|rule| parse_redirect(rule))
        .collect::<ReleaseResult<Vec<_>>>()?;

    Ok(DomainSpec {
        names,
        cert,
        key,
        ssl: ssl.unwrap_or(true),
        dry_run,
        redirects,
        skip_proxy,
    })
}

fn parse_redirect(rule: &str) -> ReleaseResult<Redirect> {
    let rule = rule.trim();
    let Some((pattern, target)) = rule.split_once(char::is_whitespace) else {
        return Err(ReleaseError::DomainInvalid(format!(
            "redirect rule \"{rule}\" has no target"
        )));
    };

    Ok(Redirect {
        pattern: pattern.to_string(),
        target: target.trim().to_string(),
    })
}
