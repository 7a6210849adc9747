//! One-shot deployment of a Git repository behind nginx.
//!
//! Balista clones a project, writes its `.env`, puts nginx in front
//! of it, obtains a Let's Encrypt certificate with certbot and starts
//! the project's Docker Compose stack. It is the sibling of a
//! catapult: aim once, fire once.
//!
//! # Overview
//!
//! A deployment is a [`Pipeline`] run against a
//! [`DeploymentRequest`]. The pipeline walks a fixed sequence of
//! [`Stage`]s and stops at the first failure:
//!
//! 1. **Fetch** - `git clone` the repository into the working
//!    directory; the project name is the last URL segment without
//!    `.git`
//! 2. **Environment** - copy `.env_example` to `.env` and append
//!    `EXTERNAL_PORT`
//! 3. **HTTP** - write `/etc/nginx/sites-available/<domain>.conf`,
//!    enable it, `nginx -t && systemctl reload nginx`
//! 4. **Certificate** - `certbot --nginx -d <domain>`
//! 5. **HTTPS** - rewrite the site with a TLS server block using the
//!    issued certificate, validate and reload again
//! 6. **Launch** - `docker compose up -d` in the project directory
//!
//! Every external program goes through a [`Runner`](cmd::Runner)
//! with a structured argument list; nothing is interpolated into a
//! shell. Privileged steps are prefixed with `sudo`.
//!
//! # Example
//!
//! ```rust,no_run
//! use balista::{Certbot, DeploymentRequest, Pipeline, Stdin};
//!
//! fn main() -> anyhow::Result<()> {
//!     let pipeline = Pipeline::new()
//!         .workdir("/srv")
//!         .certbot(Certbot::new().email("ops@example.com"));
//!
//!     // Domain and port are asked for on stdin
//!     let request =
//!         DeploymentRequest::new("https://github.com/acme/widget.git");
//!
//!     let report = pipeline.deploy(&request, &mut Stdin::new())?;
//!     println!("deployed {} on {}", report.project_name, report.domain);
//!     Ok(())
//! }
//! ```
//!
//! The `balista` binary wraps the same pipeline; run it without
//! flags to be prompted for everything, or pre-fill answers:
//!
//! ```sh
//! balista --repo https://github.com/acme/widget.git \
//!     --domain widget.example.com --port 8080 --email ops@example.com
//!
//! # Show the commands and generated nginx files only
//! balista --dry-run --non-interactive \
//!     --repo https://github.com/acme/widget.git --domain widget.example.com
//! ```

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod certbot;
pub mod cli;
pub mod cmd;
pub mod compose;
pub mod env;
pub mod error;
pub mod nginx;
pub mod pipeline;
pub mod prompt;
pub mod repo;
pub mod validate;

pub use certbot::Certbot;
pub use compose::Compose;
pub use env::EnvConfig;
pub use nginx::{Nginx, ProxyRevision, Site};
pub use pipeline::{DeploymentReport, DeploymentRequest, Pipeline, Stage, StageFailure};
pub use prompt::{Answers, Stdin};
