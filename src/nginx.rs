use std::path::{Path, PathBuf};

use crate::cmd::{CommandLine, Runner};
use crate::error::{DeployError, DeployResult};

/// Validate the configuration, then reload only if it passed.
pub const TEST_AND_RELOAD: &str = "nginx -t && systemctl reload nginx";

/// A site served by nginx and proxied to a local port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub domain: String,
    pub upstream_port: u16,
}

impl Site {
    #[must_use]
    pub fn new(domain: &str, upstream_port: u16) -> Self {
        Self {
            domain: domain.to_string(),
            upstream_port,
        }
    }
}

/// The two revisions of a site configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRevision {
    /// Plain HTTP, used until a certificate exists.
    HttpOnly(Site),
    /// HTTP plus a TLS server block using the issued certificate.
    HttpsEnabled(Site),
}

impl ProxyRevision {
    #[must_use]
    pub const fn site(&self) -> &Site {
        match self {
            Self::HttpOnly(site) | Self::HttpsEnabled(site) => site,
        }
    }
}

/// Filesystem layout of the nginx host and the certbot output it
/// points at.
///
/// # Example
///
/// ```
/// use balista::Nginx;
///
/// let nginx = Nginx::new().cert_root("/srv/certs");
///
/// assert_eq!(
///     nginx.certificate_path("example.com"),
///     std::path::Path::new("/srv/certs/example.com/fullchain.pem")
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Nginx {
    pub sites_available: PathBuf,
    pub sites_enabled: PathBuf,
    pub log_dir: PathBuf,
    pub cert_root: PathBuf,
    pub ssl_options: PathBuf,
    pub dhparam: PathBuf,
    pub verify_certificates: bool,
}

impl Nginx {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sites_available: PathBuf::from("/etc/nginx/sites-available"),
            sites_enabled: PathBuf::from("/etc/nginx/sites-enabled"),
            log_dir: PathBuf::from("/var/log/nginx"),
            cert_root: PathBuf::from("/etc/letsencrypt/live"),
            ssl_options: PathBuf::from("/etc/letsencrypt/options-ssl-nginx.conf"),
            dhparam: PathBuf::from("/etc/letsencrypt/ssl-dhparams.pem"),
            verify_certificates: true,
        }
    }

    #[must_use]
    pub fn sites_available(mut self, dir: &str) -> Self {
        self.sites_available = PathBuf::from(dir);
        self
    }

    #[must_use]
    pub fn sites_enabled(mut self, dir: &str) -> Self {
        self.sites_enabled = PathBuf::from(dir);
        self
    }

    #[must_use]
    pub fn log_dir(mut self, dir: &str) -> Self {
        self.log_dir = PathBuf::from(dir);
        self
    }

    #[must_use]
    pub fn cert_root(mut self, dir: &str) -> Self {
        self.cert_root = PathBuf::from(dir);
        self
    }

    /// Skip the certificate existence check before the HTTPS
    /// rewrite and leave it to `nginx -t`.
    #[must_use]
    pub const fn skip_certificate_check(mut self) -> Self {
        self.verify_certificates = false;
        self
    }

    #[must_use]
    pub fn config_path(&self, domain: &str) -> PathBuf {
        self.sites_available.join(format!("{domain}.conf"))
    }

    #[must_use]
    pub fn enabled_path(&self, domain: &str) -> PathBuf {
        self.sites_enabled.join(format!("{domain}.conf"))
    }

    #[must_use]
    pub fn certificate_path(&self, domain: &str) -> PathBuf {
        self.cert_root.join(domain).join("fullchain.pem")
    }

    #[must_use]
    pub fn private_key_path(&self, domain: &str) -> PathBuf {
        self.cert_root.join(domain).join("privkey.pem")
    }

    /// Render the site configuration for `revision`.
    #[must_use]
    pub fn render(&self, revision: &ProxyRevision) -> String {
        let site = revision.site();
        let domain = &site.domain;
        let location = location_block(site.upstream_port);

        let mut out = format!(
            "server {{
    listen 80;
    server_name {domain};

{location}
    access_log {access};
    error_log {error};
}}
",
            access = self.log_dir.join(format!("{domain}_access.log")).display(),
            error = self.log_dir.join(format!("{domain}_error.log")).display(),
        );

        if let ProxyRevision::HttpsEnabled(_) = revision {
            out.push_str(&format!(
                "
server {{
    listen 443 ssl;
    server_name {domain};

    ssl_certificate {cert};
    ssl_certificate_key {key};
    include {options};
    ssl_dhparam {dhparam};

{location}}}
",
                cert = self.certificate_path(domain).display(),
                key = self.private_key_path(domain).display(),
                options = self.ssl_options.display(),
                dhparam = self.dhparam.display(),
            ));
        }

        out
    }

    /// Write the HTTP-only site, enable it and reload nginx.
    pub fn write_http(&self, runner: &dyn Runner, site: &Site) -> DeployResult<()> {
        let path = self.config_path(&site.domain);
        self.write(runner, &path, &ProxyRevision::HttpOnly(site.clone()))?;

        let link = CommandLine::new("ln")
            .arg("-sf")
            .arg(path.to_string_lossy())
            .arg(self.enabled_path(&site.domain).to_string_lossy())
            .elevated();
        runner.run(&link)?;

        reload(runner)?;
        eprintln!(
            "Nginx configuration for {} (HTTP only) created and reloaded.",
            site.domain
        );
        Ok(())
    }

    /// Overwrite the site with the HTTPS revision and reload nginx.
    /// Must run after the certificate for the domain was issued.
    pub fn write_https(&self, runner: &dyn Runner, site: &Site) -> DeployResult<()> {
        if self.verify_certificates {
            self.check_certificates(runner, &site.domain)?;
        }

        let path = self.config_path(&site.domain);
        self.write(runner, &path, &ProxyRevision::HttpsEnabled(site.clone()))?;

        reload(runner)?;
        eprintln!(
            "Nginx configuration for {} with SSL created and reloaded.",
            site.domain
        );
        Ok(())
    }

    fn check_certificates(&self, runner: &dyn Runner, domain: &str) -> DeployResult<()> {
        let cert = self.certificate_path(domain);
        let key = self.private_key_path(domain);

        // live/ is only readable by root
        let check = CommandLine::new("test")
            .arg("-f")
            .arg(cert.to_string_lossy())
            .arg("-a")
            .arg("-f")
            .arg(key.to_string_lossy())
            .elevated();

        match runner.run(&check) {
            Ok(_) => Ok(()),
            Err(DeployError::CommandFailed { .. }) => Err(DeployError::CertificateMissing(
                format!("{} or {}", cert.display(), key.display()),
            )),
            Err(e) => Err(e),
        }
    }

    fn write(
        &self,
        runner: &dyn Runner,
        path: &Path,
        revision: &ProxyRevision,
    ) -> DeployResult<()> {
        let tee = CommandLine::new("tee")
            .arg(path.to_string_lossy())
            .stdin(self.render(revision))
            .elevated();
        runner.run(&tee)?;
        Ok(())
    }
}

impl Default for Nginx {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate and reload nginx as one elevated compound command.
pub fn reload(runner: &dyn Runner) -> DeployResult<()> {
    let cmd = CommandLine::new("sh").args(["-c", TEST_AND_RELOAD]).elevated();
    runner
        .run(&cmd)
        .map(|_| ())
        .map_err(|e| DeployError::ProxyReload(Box::new(e)))
}

fn location_block(port: u16) -> String {
    format!(
        "    location / {{
        proxy_pass http://127.0.0.1:{port};
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
    }}
"
    )
}
