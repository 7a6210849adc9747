use crate::cmd::{CommandLine, Runner};
use crate::error::{DeployError, DeployResult};

/// Let's Encrypt certificate issuance through certbot's nginx
/// installer.
///
/// # Example
///
/// ```
/// use balista::Certbot;
///
/// let certbot = Certbot::new().email("ops@example.com").staging();
///
/// assert_eq!(certbot.email.as_deref(), Some("ops@example.com"));
/// assert!(certbot.staging);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Certbot {
    pub email: Option<String>,
    pub staging: bool,
}

impl Certbot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Use the Let's Encrypt staging environment.
    #[must_use]
    pub const fn staging(mut self) -> Self {
        self.staging = true;
        self
    }

    #[must_use]
    pub fn command(&self, domain: &str) -> CommandLine {
        let mut cmd = CommandLine::new("certbot").args(["--nginx", "-d", domain]);
        cmd = cmd.args(["--non-interactive", "--agree-tos"]);

        cmd = match &self.email {
            Some(email) => cmd.args(["-m", email.as_str()]),
            None => cmd.arg("--register-unsafely-without-email"),
        };

        if self.staging {
            cmd = cmd.arg("--staging");
        }

        cmd.elevated()
    }

    /// Obtain and install a certificate for `domain`.
    pub fn issue(&self, runner: &dyn Runner, domain: &str) -> DeployResult<()> {
        eprintln!("Generating SSL certificate for {domain} using Certbot...");
        runner
            .run(&self.command(domain))
            .map_err(|e| DeployError::CertificateIssuance(Box::new(e)))?;
        eprintln!("SSL certificate generated and applied for {domain}.");
        Ok(())
    }
}
