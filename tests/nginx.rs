use switchyard::nginx::{self, Site};
use switchyard::{AppConfig, Redirect};

fn config(json: &str) -> AppConfig {
    serde_json::from_str(json).expect("config should parse")
}

fn site_for(json: &str) -> Site {
    let config = config(json);
    let spec = switchyard::domain::normalize(&config)
        .expect("should normalize")
        .remove(0);
    let (cert, key) = switchyard::cert::cert_paths(&spec, std::path::Path::new("/etc/letsencrypt/live"));
    Site::new(
        &spec,
        &config,
        cert,
        key,
        "/root/apps/myapp/current/dist".into(),
        "/root/apps/myapp/data".into(),
    )
}

#[test]
fn render_is_deterministic() {
    let site = site_for(
        r#"{
            "domains": "a.example.com b.example.com",
            "redirects": ["^/a$ /b", "^/c$ /d"],
            "basicauth": "admin:secret",
            "redirectmain": true
        }"#,
    );

    assert_eq!(nginx::render(&site, true), nginx::render(&site, true));
    assert_eq!(nginx::render(&site, false), nginx::render(&site, false));
}

#[test]
fn proxy_deploy_scenario() {
    // config {domains: "a.example.com b.example.com",
    //         proxy: "http://localhost:5000"}, apptype defaulted
    let site = site_for(
        r#"{
            "domains": "a.example.com b.example.com",
            "proxy": "http://localhost:5000",
            "ssr": true
        }"#,
    );

    let text = nginx::render(&site, true);

    assert!(text.contains("proxy_pass http://localhost:5000;"));
    assert!(text.contains("server_name a.example.com b.example.com;"));
    assert!(text.contains("return 301 https://$host$request_uri;"));
    assert!(text.contains("ssl_certificate /etc/letsencrypt/live/a.example.com/fullchain.pem;"));
    assert!(!text.contains("rewrite "));
}

#[test]
fn redirects_preserve_order_and_count() {
    let site = site_for(
        r#"{
            "domains": "a.example.com",
            "redirects": ["^/one$ /1", "^/two$ /2", "^/three$ /3"]
        }"#,
    );

    let text = nginx::render(&site, true);

    let positions: Vec<usize> = ["^/one$", "^/two$", "^/three$"]
        .iter()
        .map(|p| text.find(p).expect("rule should be present"))
        .collect();
    assert!(positions[0] < positions[1]);
    assert!(positions[1] < positions[2]);
    assert_eq!(text.matches("rewrite ").count(), 3);
    assert_eq!(site.redirects.len(), 3);
    assert_eq!(
        site.redirects[0],
        Redirect {
            pattern: "^/one$".into(),
            target: "/1".into()
        }
    );
}

#[test]
fn bootstrap_then_final_differ_only_in_tls() {
    let site = site_for(r#"{"domains": "a.example.com", "proxy": "http://localhost:5000", "ssr": true}"#);

    let bootstrap = nginx::render(&site, false);
    let final_ = nginx::render(&site, true);

    assert!(!bootstrap.contains("ssl_certificate"));
    assert!(bootstrap.contains("proxy_pass http://localhost:5000;"));
    assert!(final_.contains("ssl_certificate"));
}

#[test]
fn static_site_without_proxy() {
    let site = site_for(r#"{"domains": "a.example.com"}"#);

    let text = nginx::render(&site, true);

    assert!(text.contains("root /root/apps/myapp/current/dist;"));
    assert!(text.contains("index index.html;"));
    assert!(!text.contains("proxy_pass"));
}

#[test]
fn conf_path_is_deterministic_per_host_and_app() {
    let path = nginx::conf_path(std::path::Path::new("/etc/nginx/conf.d"), "a.example.com", "myapp");

    assert_eq!(
        path,
        std::path::PathBuf::from("/etc/nginx/conf.d/a.example.com.myapp.conf")
    );
}
