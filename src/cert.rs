use std::fs;
use std::path::{Path, PathBuf};

use crate::cmd;
use crate::domain::DomainSpec;
use crate::error::{ReleaseError, ReleaseResult};
use crate::nginx::{self, Site};
use crate::service;

/// Default Let's Encrypt live directory.
pub const LETSENCRYPT_LIVE: &str = "/etc/letsencrypt/live";

/// Expected certificate and key paths for a domain.
///
/// Explicit overrides win; otherwise the path derives from the
/// canonical host with wildcard markers stripped.
#[must_use]
pub fn cert_paths(spec: &DomainSpec, live_dir: &Path) -> (PathBuf, PathBuf) {
    let base = live_dir.join(spec.canonical().replace("*.", ""));
    let cert = spec
        .cert
        .clone()
        .unwrap_or_else(|| base.join("fullchain.pem"));
    let key = spec.key.clone().unwrap_or_else(|| base.join("privkey.pem"));
    (cert, key)
}

/// Ensure a certificate exists for the domain before the TLS config
/// is written.
///
/// When the certificate is absent, a plaintext bootstrap config is
/// written and nginx reloaded first - the proxy has to answer the
/// HTTP-01 challenge on port 80. Issuance failure aborts the release;
/// no partial-cert state is left live.
pub fn ensure_certificate(
    spec: &DomainSpec,
    site: &Site,
    conf_file: &Path,
    cert: &Path,
    email: Option<&str>,
) -> ReleaseResult<()> {
    if spec.skip_proxy || !spec.ssl || cert.exists() {
        return Ok(());
    }

    fs::write(conf_file, nginx::render(site, false))?;
    service::reload_nginx()?;

    let mut args: Vec<String> = ["certonly", "--nginx", "--agree-tos", "--no-eff-email"]
        .iter()
        .map(ToString::to_string)
        .collect();
    if spec.dry_run {
        args.push("--dry-run".into());
    }
    match email {
        Some(address) => {
            args.push("--email".into());
            args.push(address.into());
        }
        None => args.push("--register-unsafely-without-email".into()),
    }
    for name in &spec.names {
        args.push("-d".into());
        args.push(name.clone());
    }

    eprintln!("certbot {}", args.join(" "));
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    cmd::run_interactive("certbot", &refs)
        .map_err(|_| ReleaseError::CertificateIssuanceFailed(spec.canonical().to_string()))
}

/// Request revocation and removal of a host's certificate.
pub fn revoke_certificate(host: &str) -> ReleaseResult<()> {
    cmd::run_interactive(
        "certbot",
        &["delete", "--non-interactive", "--cert-name", host],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::normalize;

    fn spec(json: &str) -> DomainSpec {
        let config = serde_json::from_str(json).expect("config should parse");
        normalize(&config).expect("should normalize").remove(0)
    }

    #[test]
    fn derived_cert_paths() {
        let spec = spec(r#"{"domains": "example.com www.example.com"}"#);

        let (cert, key) = cert_paths(&spec, Path::new("/etc/letsencrypt/live"));

        assert_eq!(
            cert,
            PathBuf::from("/etc/letsencrypt/live/example.com/fullchain.pem")
        );
        assert_eq!(
            key,
            PathBuf::from("/etc/letsencrypt/live/example.com/privkey.pem")
        );
    }

    #[test]
    fn wildcard_markers_are_stripped() {
        let spec = spec(r#"{"domains": "*.example.com"}"#);

        let (cert, _) = cert_paths(&spec, Path::new("/etc/letsencrypt/live"));

        assert_eq!(
            cert,
            PathBuf::from("/etc/letsencrypt/live/example.com/fullchain.pem")
        );
    }

    #[test]
    fn explicit_paths_win() {
        let spec = spec(
            r#"{"domains": [{
                "names": "example.com",
                "cert": "/srv/tls/example.pem",
                "key": "/srv/tls/example.key"
            }]}"#,
        );

        let (cert, key) = cert_paths(&spec, Path::new("/etc/letsencrypt/live"));

        assert_eq!(cert, PathBuf::from("/srv/tls/example.pem"));
        assert_eq!(key, PathBuf::from("/srv/tls/example.key"));
    }
}
