use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::certbot::Certbot;
use crate::cmd::{DryRun, Runner, System};
use crate::compose::Compose;
use crate::env::EnvConfig;
use crate::error::DeployError;
use crate::nginx::{Nginx, Site};
use crate::prompt::Prompter;
use crate::repo;
use crate::validate::{self, DEFAULT_PORT};

/// What to deploy. Unset values are asked for during the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub repository_url: String,
    pub domain_name: Option<String>,
    pub external_port: Option<String>,
}

impl DeploymentRequest {
    #[must_use]
    pub fn new(repository_url: &str) -> Self {
        Self {
            repository_url: repository_url.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn domain(mut self, domain: &str) -> Self {
        self.domain_name = Some(domain.to_string());
        self
    }

    #[must_use]
    pub fn port(mut self, port: &str) -> Self {
        self.external_port = Some(port.to_string());
        self
    }
}

/// Steps of a deployment, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetching,
    ConfiguringEnv,
    ConfiguringHttp,
    IssuingCert,
    ConfiguringHttps,
    Launching,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetching => "fetching repository",
            Self::ConfiguringEnv => "configuring environment",
            Self::ConfiguringHttp => "configuring nginx (HTTP)",
            Self::IssuingCert => "issuing certificate",
            Self::ConfiguringHttps => "configuring nginx (HTTPS)",
            Self::Launching => "launching containers",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentReport {
    pub project_name: String,
    pub project_dir: PathBuf,
    pub domain: String,
    pub external_port: u16,
    pub stages: Vec<Stage>,
}

/// A deployment that stopped at `stage`. Steps completed before it
/// are left in place.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {cause}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub cause: DeployError,
}

impl StageFailure {
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.cause.exit_code()
    }
}

/// Deployment pipeline: clone, configure, put nginx and TLS in
/// front, start the stack.
///
/// # Example
///
/// ```rust,no_run
/// use balista::{Answers, Certbot, DeploymentRequest, Pipeline};
///
/// let pipeline = Pipeline::new()
///     .workdir("/srv")
///     .certbot(Certbot::new().email("ops@example.com"));
///
/// let request = DeploymentRequest::new("https://github.com/acme/widget.git")
///     .domain("widget.example.com")
///     .port("8080");
///
/// let report = pipeline.deploy(&request, &mut Answers::new())?;
/// assert_eq!(report.project_name, "widget");
/// # Ok::<(), balista::pipeline::StageFailure>(())
/// ```
pub struct Pipeline {
    runner: Box<dyn Runner>,
    workdir: PathBuf,
    env: EnvConfig,
    nginx: Nginx,
    certbot: Certbot,
    compose: Compose,
    dry_run: bool,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            runner: Box::new(System::new()),
            workdir: PathBuf::from("."),
            env: EnvConfig::new(),
            nginx: Nginx::new(),
            certbot: Certbot::new(),
            compose: Compose::new(),
            dry_run: false,
        }
    }

    #[must_use]
    pub fn runner(mut self, runner: impl Runner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// Directory the repository is cloned into.
    #[must_use]
    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = dir.into();
        self
    }

    #[must_use]
    pub fn env(mut self, env: EnvConfig) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn nginx(mut self, nginx: Nginx) -> Self {
        self.nginx = nginx;
        self
    }

    #[must_use]
    pub fn certbot(mut self, certbot: Certbot) -> Self {
        self.certbot = certbot;
        self
    }

    #[must_use]
    pub const fn compose(mut self, compose: Compose) -> Self {
        self.compose = compose;
        self
    }

    /// Echo commands instead of running them, whichever runner is
    /// configured. Keeps that runner's elevation program.
    #[must_use]
    pub const fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Run every step in order and stop at the first failure.
    pub fn deploy(
        &self,
        request: &DeploymentRequest,
        prompter: &mut dyn Prompter,
    ) -> Result<DeploymentReport, StageFailure> {
        let echo;
        let runner: &dyn Runner = if self.dry_run {
            echo = DryRun::new(self.runner.elevation());
            &echo
        } else {
            self.runner.as_ref()
        };
        let mut stages = Vec::new();

        let fail = |stage: Stage| move |cause: DeployError| StageFailure { stage, cause };

        if self.dry_run {
            eprintln!("=== Dry run: no changes will be made ===");
        }

        // Fetching
        info!(url = %request.repository_url, "fetching repository");
        let project = repo::fetch(runner, &request.repository_url, &self.workdir)
            .map_err(fail(Stage::Fetching))?;
        stages.push(Stage::Fetching);

        // Domain, asked after the clone like the interactive flow
        let domain = match &request.domain_name {
            Some(d) => d.trim().to_string(),
            None => prompter
                .ask(
                    "Enter the domain name to link with the project (e.g., example.com)",
                    None,
                )
                .map_err(fail(Stage::ConfiguringEnv))?,
        };
        validate::domain(&domain).map_err(fail(Stage::ConfiguringEnv))?;

        // ConfiguringEnv
        let configured = self
            .env
            .configure(&project.dir, request.external_port.as_deref(), prompter)
            .map_err(fail(Stage::ConfiguringEnv))?;
        let external_port = match configured {
            Some(port) => port,
            None => request
                .external_port
                .as_deref()
                .map_or(Ok(DEFAULT_PORT), validate::port)
                .map_err(fail(Stage::ConfiguringEnv))?,
        };
        stages.push(Stage::ConfiguringEnv);

        let site = Site::new(&domain, external_port);

        // ConfiguringHttp
        self.nginx
            .write_http(runner, &site)
            .map_err(fail(Stage::ConfiguringHttp))?;
        stages.push(Stage::ConfiguringHttp);

        // IssuingCert
        self.certbot
            .issue(runner, &domain)
            .map_err(fail(Stage::IssuingCert))?;
        stages.push(Stage::IssuingCert);

        // ConfiguringHttps
        self.nginx
            .write_https(runner, &site)
            .map_err(fail(Stage::ConfiguringHttps))?;
        stages.push(Stage::ConfiguringHttps);

        // Launching
        let launched = if self.dry_run {
            self.compose.launch_unchecked(runner, &project.dir)
        } else {
            self.compose.launch(runner, &project.dir, configured)
        };
        launched.map_err(fail(Stage::Launching))?;
        stages.push(Stage::Launching);

        stages.push(Stage::Done);
        eprintln!(
            "Project {} is successfully deployed and linked to {domain}.",
            project.name
        );

        Ok(DeploymentReport {
            project_name: project.name,
            project_dir: project.dir,
            domain,
            external_port,
            stages,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
