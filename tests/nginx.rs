mod common;

use balista::error::DeployError;
use balista::nginx::reload;
use balista::{Nginx, ProxyRevision, Site};
use common::Recorder;

const CONF: &str = "/etc/nginx/sites-available/shop.example.org.conf";

fn site() -> Site {
    Site::new("shop.example.org", 8080)
}

#[test]
fn http_writes_links_and_reloads() {
    let recorder = Recorder::new();

    Nginx::new().write_http(&recorder, &site()).unwrap();

    assert_eq!(
        recorder.lines(),
        vec![
            "sudo tee /etc/nginx/sites-available/shop.example.org.conf",
            "sudo ln -sf /etc/nginx/sites-available/shop.example.org.conf \
             /etc/nginx/sites-enabled/shop.example.org.conf",
            "sudo sh -c 'nginx -t && systemctl reload nginx'",
        ]
    );
    let calls = recorder.calls.borrow();
    assert_eq!(
        calls[0].stdin.as_deref(),
        Some(Nginx::new().render(&ProxyRevision::HttpOnly(site())).as_str())
    );
}

#[test]
fn https_rewrite_without_issuance_still_renders_cert_paths() {
    let recorder = Recorder::new();
    let nginx = Nginx::new().skip_certificate_check();

    nginx.write_http(&recorder, &site()).unwrap();
    nginx.write_https(&recorder, &site()).unwrap();

    let calls = recorder.calls.borrow();
    let https = calls[3].stdin.as_deref().unwrap();
    assert_eq!(calls[3].line, format!("sudo tee {CONF}"));
    assert!(https.contains("/etc/letsencrypt/live/shop.example.org/fullchain.pem"));
    assert!(https.contains("/etc/letsencrypt/live/shop.example.org/privkey.pem"));
    assert!(!calls.iter().any(|c| c.line.starts_with("sudo test")));
    assert!(!calls.iter().skip(2).any(|c| c.line.starts_with("sudo ln")));
}

#[test]
fn https_checks_certificates_first() {
    let recorder = Recorder::new();

    Nginx::new().write_https(&recorder, &site()).unwrap();

    let lines = recorder.lines();
    assert!(lines[0].starts_with("sudo test -f /etc/letsencrypt/live/shop.example.org/"));
    assert_eq!(lines[1], format!("sudo tee {CONF}"));
    assert_eq!(lines.len(), 3);
}

#[test]
fn missing_certificate_leaves_config_alone() {
    let recorder = Recorder::new().fail_on("sudo test", "");

    let err = Nginx::new().write_https(&recorder, &site()).unwrap_err();

    assert!(matches!(err, DeployError::CertificateMissing(_)));
    assert!(err.to_string().contains("fullchain.pem"));
    assert_eq!(recorder.lines().len(), 1);
}

#[test]
fn failed_validation_is_a_proxy_error() {
    let recorder =
        Recorder::new().fail_on("sudo sh", "nginx: configuration file test failed");

    let err = reload(&recorder).unwrap_err();

    assert!(matches!(err, DeployError::ProxyReload(_)));
    assert_eq!(err.exit_code(), 6);
    assert!(err.to_string().contains("configuration file test failed"));
}

#[test]
fn write_failure_propagates_unwrapped() {
    let recorder = Recorder::new().fail_on("sudo tee", "permission denied");

    let err = Nginx::new().write_http(&recorder, &site()).unwrap_err();

    assert!(matches!(err, DeployError::CommandFailed { .. }));
    assert_eq!(recorder.lines().len(), 1);
}

#[test]
fn custom_layout() {
    let recorder = Recorder::new();
    let nginx = Nginx::new()
        .sites_available("/opt/nginx/available")
        .sites_enabled("/opt/nginx/enabled");

    nginx.write_http(&recorder, &site()).unwrap();

    assert_eq!(
        recorder.lines()[1],
        "sudo ln -sf /opt/nginx/available/shop.example.org.conf \
         /opt/nginx/enabled/shop.example.org.conf"
    );
}
