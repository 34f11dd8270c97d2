use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::domain::{DomainSpec, Redirect};

/// Inputs for one rendered server config.
///
/// Everything the template needs is resolved up front so
/// [`render`] stays a pure function of its arguments.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)] // mirrors the flag-shaped config document
pub struct Site {
    /// Hostnames served by this config, first one canonical.
    pub names: Vec<String>,
    /// Upstream URL; `None` means static files from `dist`.
    pub proxy: Option<String>,
    pub cert: PathBuf,
    pub key: PathBuf,
    /// Built artifact directory of the active revision.
    pub dist: PathBuf,
    /// Persistent per-app data directory.
    pub data: PathBuf,
    pub redirects: Vec<Redirect>,
    pub basicauth: bool,
    pub ssr: bool,
    pub sitemapdir: Option<String>,
    pub errordir: Option<String>,
    pub redirectmain: bool,
}

impl Site {
    /// Assemble the render inputs for one domain of an app.
    #[must_use]
    pub fn new(
        spec: &DomainSpec,
        config: &AppConfig,
        cert: PathBuf,
        key: PathBuf,
        dist: PathBuf,
        data: PathBuf,
    ) -> Self {
        Self {
            names: spec.names.clone(),
            proxy: config.proxy.clone(),
            cert,
            key,
            dist,
            data,
            redirects: spec.redirects.clone(),
            basicauth: config.basicauth.is_some(),
            ssr: config.ssr,
            sitemapdir: config.sitemapdir.clone(),
            errordir: config.errordir.clone(),
            redirectmain: config.redirectmain,
        }
    }

    fn canonical(&self) -> &str {
        &self.names[0]
    }
}

/// Config artifact path for a (canonical host, app name) pair inside
/// the proxy's include directory.
#[must_use]
pub fn conf_path(conf_dir: &Path, host: &str, app: &str) -> PathBuf {
    conf_dir.join(format!("{host}.{app}.conf"))
}

/// Render the complete server configuration for a site.
///
/// Deterministic: identical inputs produce byte-identical text. The
/// release calls this twice per domain, once with `ssl = false` for
/// the certificate bootstrap window and once with the domain's final
/// setting.
#[must_use]
pub fn render(site: &Site, ssl: bool) -> String {
    let mut out = String::new();

    if ssl {
        push_http_redirect(&mut out, site);
    }
    push_server(&mut out, site, ssl);
    if site.redirectmain && site.names.len() > 1 {
        push_main_redirect(&mut out, site, ssl);
    }

    out
}

/// Port-80 block sending every hostname to its TLS listener.
fn push_http_redirect(out: &mut String, site: &Site) {
    out.push_str("server {\n");
    out.push_str("    listen 80;\n");
    out.push_str("    listen [::]:80;\n");
    let _ = writeln!(out, "    server_name {};", site.names.join(" "));
    out.push_str("    return 301 https://$host$request_uri;\n");
    out.push_str("}\n");
}

fn push_server(out: &mut String, site: &Site, ssl: bool) {
    if ssl {
        out.push('\n');
    }
    out.push_str("server {\n");
    push_listen(out, ssl);

    let names = if site.redirectmain {
        site.canonical().to_string()
    } else {
        site.names.join(" ")
    };
    let _ = writeln!(out, "    server_name {names};");

    if ssl {
        push_certificate(out, site);
    }

    for Redirect { pattern, target } in &site.redirects {
        let _ = writeln!(out, "    rewrite {pattern} {target} permanent;");
    }

    if site.basicauth {
        out.push_str("    auth_basic \"Restricted\";\n");
        let _ = writeln!(
            out,
            "    auth_basic_user_file {}/.htpasswd;",
            site.data.display()
        );
    }

    if let Some(dir) = &site.sitemapdir {
        for file in ["sitemap.xml", "sitemap.xml.gz"] {
            let _ = writeln!(out, "    location = /{file} {{");
            let _ = writeln!(out, "        root {dir};");
            out.push_str("    }\n");
        }
    }

    if let Some(dir) = &site.errordir {
        out.push_str("    error_page 404 /404.html;\n");
        out.push_str("    location = /404.html {\n");
        let _ = writeln!(out, "        root {dir};");
        out.push_str("        internal;\n");
        out.push_str("    }\n");
    }

    match &site.proxy {
        // SSR apps forward everything to the upstream.
        Some(upstream) if site.ssr => {
            out.push_str("    location / {\n");
            push_proxy(out, upstream);
            out.push_str("    }\n");
        }
        // Non-SSR apps serve the built assets directly and only fall
        // back to the upstream for unmatched paths.
        Some(upstream) => {
            let _ = writeln!(out, "    root {};", site.dist.display());
            out.push_str("    location / {\n");
            out.push_str("        try_files $uri $uri/ @app;\n");
            out.push_str("    }\n");
            out.push_str("    location @app {\n");
            push_proxy(out, upstream);
            out.push_str("    }\n");
        }
        None => {
            let _ = writeln!(out, "    root {};", site.dist.display());
            out.push_str("    index index.html;\n");
            out.push_str("    location / {\n");
            out.push_str("        try_files $uri $uri/ /index.html;\n");
            out.push_str("    }\n");
        }
    }

    out.push_str("}\n");
}

/// Block redirecting the non-canonical hostnames to the canonical
/// one.
fn push_main_redirect(out: &mut String, site: &Site, ssl: bool) {
    out.push_str("\nserver {\n");
    push_listen(out, ssl);
    let _ = writeln!(out, "    server_name {};", site.names[1..].join(" "));
    if ssl {
        push_certificate(out, site);
    }

    let scheme = if ssl { "https" } else { "http" };
    let _ = writeln!(out, "    return 301 {scheme}://{}$request_uri;", site.canonical());
    out.push_str("}\n");
}

fn push_listen(out: &mut String, ssl: bool) {
    if ssl {
        out.push_str("    listen 443 ssl;\n");
        out.push_str("    listen [::]:443 ssl;\n");
    } else {
        out.push_str("    listen 80;\n");
        out.push_str("    listen [::]:80;\n");
    }
}

fn push_certificate(out: &mut String, site: &Site) {
    let _ = writeln!(out, "    ssl_certificate {};", site.cert.display());
    let _ = writeln!(out, "    ssl_certificate_key {};", site.key.display());
}

fn push_proxy(out: &mut String, upstream: &str) {
    let _ = writeln!(out, "        proxy_pass {upstream};");
    out.push_str("        proxy_http_version 1.1;\n");
    out.push_str("        proxy_set_header Upgrade $http_upgrade;\n");
    out.push_str("        proxy_set_header Connection \"upgrade\";\n");
    out.push_str("        proxy_set_header Host $host;\n");
    out.push_str("        proxy_set_header X-Real-IP $remote_addr;\n");
    out.push_str("        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n");
    out.push_str("        proxy_set_header X-Forwarded-Proto $scheme;\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Site {
        Site {
            names: vec!["entangle.no".into(), "www.entangle.no".into()],
            proxy: Some("http://localhost:5000".into()),
            cert: "/etc/letsencrypt/live/entangle.no/fullchain.pem".into(),
            key: "/etc/letsencrypt/live/entangle.no/privkey.pem".into(),
            dist: "/root/apps/hello/current/dist".into(),
            data: "/root/apps/hello/data".into(),
            redirects: vec![
                Redirect {
                    pattern: "^/about.html$".into(),
                    target: "http://example.com".into(),
                },
                Redirect {
                    pattern: "^/nils.html$".into(),
                    target: "http://example.no".into(),
                },
            ],
            basicauth: false,
            ssr: true,
            sitemapdir: None,
            errordir: None,
            redirectmain: false,
        }
    }

    #[test]
    fn proxy_with_tls() {
        let text = render(&site(), true);

        assert!(text.contains("listen 443 ssl;"));
        assert!(text.contains("server_name entangle.no www.entangle.no;"));
        assert!(text.contains("ssl_certificate /etc/letsencrypt/live/entangle.no/fullchain.pem;"));
        assert!(text.contains("proxy_pass http://localhost:5000;"));
        assert!(text.contains("return 301 https://$host$request_uri;"));
    }

    #[test]
    fn redirect_rules_keep_input_order() {
        let text = render(&site(), true);

        let first = text.find("rewrite ^/about.html$").expect("first rule");
        let second = text.find("rewrite ^/nils.html$").expect("second rule");
        assert!(first < second);
        assert_eq!(text.matches("rewrite ").count(), 2);
    }

    #[test]
    fn bootstrap_config_is_plaintext_only() {
        let text = render(&site(), false);

        assert!(!text.contains("443"));
        assert!(!text.contains("ssl_certificate"));
        assert!(text.contains("listen 80;"));
    }

    #[test]
    fn static_mode_serves_dist() {
        let mut s = site();
        s.proxy = None;

        let text = render(&s, true);

        assert!(text.contains("root /root/apps/hello/current/dist;"));
        assert!(text.contains("try_files $uri $uri/ /index.html;"));
        assert!(!text.contains("proxy_pass"));
    }

    #[test]
    fn non_ssr_proxy_serves_assets_first() {
        let mut s = site();
        s.ssr = false;

        let text = render(&s, true);

        assert!(text.contains("try_files $uri $uri/ @app;"));
        assert!(text.contains("location @app {"));
        assert!(text.contains("proxy_pass http://localhost:5000;"));
    }

    #[test]
    fn basicauth_references_credentials_file() {
        let mut s = site();
        s.basicauth = true;

        let text = render(&s, true);

        assert!(text.contains("auth_basic \"Restricted\";"));
        assert!(text.contains("auth_basic_user_file /root/apps/hello/data/.htpasswd;"));
    }

    #[test]
    fn redirectmain_isolates_canonical_host() {
        let mut s = site();
        s.redirectmain = true;

        let text = render(&s, true);

        assert!(text.contains("server_name entangle.no;"));
        assert!(text.contains("server_name www.entangle.no;"));
        assert!(text.contains("return 301 https://entangle.no$request_uri;"));
    }

    #[test]
    fn sitemap_and_error_locations() {
        let mut s = site();
        s.sitemapdir = Some("/root/apps/hello/data/sitemaps".into());
        s.errordir = Some("/root/apps/hello/data/errors".into());

        let text = render(&s, true);

        assert!(text.contains("location = /sitemap.xml {"));
        assert!(text.contains("location = /sitemap.xml.gz {"));
        assert!(text.contains("error_page 404 /404.html;"));
        assert!(text.contains("root /root/apps/hello/data/errors;"));
    }
}
