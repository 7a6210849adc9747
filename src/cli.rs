use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::certbot::Certbot;
use crate::cmd::{self, SUDO, System};
use crate::compose::Compose;
use crate::error::{DeployError, DeployResult};
use crate::nginx::Nginx;
use crate::pipeline::{DeploymentReport, DeploymentRequest, Pipeline, StageFailure};
use crate::prompt::{Answers, Prompter, Stdin};

#[derive(Parser, Debug)]
#[command(name = "balista")]
#[command(about = "Deploy a Git repository behind nginx with Let's Encrypt TLS")]
#[command(version)]
#[allow(clippy::struct_excessive_bools)] // one field per command-line switch
pub struct Cli {
    /// Repository to clone
    #[arg(long)]
    pub repo: Option<String>,

    /// Domain to serve the application on
    #[arg(long)]
    pub domain: Option<String>,

    /// External port the application listens on
    #[arg(long)]
    pub port: Option<String>,

    /// Contact email for Let's Encrypt
    #[arg(long, env = "BALISTA_EMAIL")]
    pub email: Option<String>,

    /// Directory to clone into
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    /// Run privileged commands without sudo
    #[arg(long)]
    pub no_sudo: bool,

    /// Use the Let's Encrypt staging environment
    #[arg(long)]
    pub staging: bool,

    /// Use the standalone docker-compose binary
    #[arg(long)]
    pub legacy_compose: bool,

    /// Write the HTTPS config without checking the certificate exists
    #[arg(long)]
    pub skip_cert_check: bool,

    /// Never prompt; use defaults for anything not given
    #[arg(long)]
    pub non_interactive: bool,

    /// Print the commands and generated files without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Print the deployment report as JSON on success
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        let runner = if self.no_sudo {
            System::new().without_elevation()
        } else {
            System::new()
        };

        let mut nginx = Nginx::new();
        if self.skip_cert_check {
            nginx = nginx.skip_certificate_check();
        }

        let mut certbot = Certbot::new();
        if let Some(email) = &self.email {
            certbot = certbot.email(email);
        }
        if self.staging {
            certbot = certbot.staging();
        }

        let compose = if self.legacy_compose {
            Compose::new().legacy()
        } else {
            Compose::new()
        };

        let pipeline = Pipeline::new()
            .runner(runner)
            .workdir(self.workdir.clone())
            .nginx(nginx)
            .certbot(certbot)
            .compose(compose);

        if self.dry_run {
            pipeline.dry_run()
        } else {
            pipeline
        }
    }

    /// Programs that must be on PATH for a real run.
    #[must_use]
    pub fn prerequisites(&self) -> Vec<&'static str> {
        let mut programs = vec!["git", "certbot"];
        programs.push(if self.legacy_compose {
            "docker-compose"
        } else {
            "docker"
        });
        if !self.no_sudo {
            programs.push(SUDO);
        }
        programs
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Ignore a subscriber installed by an embedding program
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Parse the command line, deploy, and map the outcome to an exit
/// code.
#[must_use]
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(&cli) {
        Ok(report) if cli.json => print_report(&report).map_or_else(
            |err| {
                eprintln!("An error occurred: {err}");
                ExitCode::from(err.exit_code())
            },
            |()| ExitCode::SUCCESS,
        ),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("An error occurred: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// Print the report as pretty JSON on stdout.
pub fn print_report(report: &DeploymentReport) -> DeployResult<()> {
    println!("{}", report_json(report)?);
    Ok(())
}

fn report_json(report: &DeploymentReport) -> DeployResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn execute(cli: &Cli) -> anyhow::Result<DeploymentReport> {
    if !cli.dry_run {
        check_prerequisites(cli)?;
    }

    let mut prompter: Box<dyn Prompter> = if cli.non_interactive {
        Box::new(Answers::new())
    } else {
        Box::new(Stdin::new())
    };

    let url = match &cli.repo {
        Some(url) => url.clone(),
        None => prompter
            .ask("Enter the GitHub repository URL to clone", None)
            .context("reading repository URL")?,
    };

    let mut request = DeploymentRequest::new(&url);
    request.domain_name.clone_from(&cli.domain);
    request.external_port.clone_from(&cli.port);

    let report = cli.pipeline().deploy(&request, prompter.as_mut())?;
    Ok(report)
}

fn check_prerequisites(cli: &Cli) -> Result<(), DeployError> {
    let missing: Vec<&str> = cli
        .prerequisites()
        .into_iter()
        .filter(|program| !cmd::command_exists(program))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DeployError::PrerequisiteMissing(missing.join(", ")))
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(failure) = err.downcast_ref::<StageFailure>() {
        return failure.exit_code();
    }
    err.downcast_ref::<DeployError>().map_or(1, DeployError::exit_code)
}
