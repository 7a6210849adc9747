use std::fs;
use std::path::{Path, PathBuf};

use docker_compose_types::{Compose as Manifest, Ports};
use tracing::{info, warn};

use crate::cmd::{CommandLine, Runner};
use crate::env::EXTERNAL_PORT;
use crate::error::{DeployError, DeployResult};

/// Manifest names looked up in the project directory, in order.
pub const MANIFEST_NAMES: [&str; 4] = [
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

/// What the project's compose manifest declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestSummary {
    pub services: Vec<String>,
    pub publishes_port: bool,
}

/// Starts the project's container stack.
#[derive(Debug, Clone)]
pub struct Compose {
    pub legacy: bool,
}

impl Compose {
    #[must_use]
    pub const fn new() -> Self {
        Self { legacy: false }
    }

    /// Use the standalone `docker-compose` binary instead of the
    /// `docker compose` plugin.
    #[must_use]
    pub const fn legacy(mut self) -> Self {
        self.legacy = true;
        self
    }

    #[must_use]
    pub fn up_command(&self, project_dir: &Path) -> CommandLine {
        let base = if self.legacy {
            CommandLine::new("docker-compose")
        } else {
            CommandLine::new("docker").arg("compose")
        };
        base.args(["up", "-d"]).current_dir(project_dir)
    }

    /// Bring the stack up in detached mode from `project_dir`.
    pub fn launch(
        &self,
        runner: &dyn Runner,
        project_dir: &Path,
        port: Option<u16>,
    ) -> DeployResult<()> {
        let manifest = find_manifest(project_dir).ok_or_else(|| {
            DeployError::Launch(Box::new(DeployError::FileNotFound(format!(
                "no compose manifest in {}",
                project_dir.display()
            ))))
        })?;

        match inspect(&manifest, port) {
            Ok(summary) => {
                info!(services = ?summary.services, "compose manifest");
                if port.is_some() && !summary.publishes_port {
                    warn!(
                        manifest = %manifest.display(),
                        "no service publishes the external port"
                    );
                }
            }
            Err(e) => warn!(
                manifest = %manifest.display(),
                error = %e,
                "could not inspect compose manifest"
            ),
        }

        self.launch_unchecked(runner, project_dir)
    }

    /// Run `up -d` without looking for a manifest first.
    pub fn launch_unchecked(&self, runner: &dyn Runner, project_dir: &Path) -> DeployResult<()> {
        eprintln!("Launching the application using Docker Compose...");
        runner
            .run(&self.up_command(project_dir))
            .map_err(|e| DeployError::Launch(Box::new(e)))?;
        eprintln!("Application is now running.");
        Ok(())
    }
}

impl Default for Compose {
    fn default() -> Self {
        Self::new()
    }
}

/// First compose manifest present in `project_dir`.
#[must_use]
pub fn find_manifest(project_dir: &Path) -> Option<PathBuf> {
    MANIFEST_NAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|path| path.is_file())
}

/// Parse a compose manifest and summarize it.
pub fn inspect(path: &Path, port: Option<u16>) -> DeployResult<ManifestSummary> {
    let content = fs::read_to_string(path)?;
    let manifest: Manifest = serde_yaml::from_str(&content)?;
    Ok(summarize(&manifest, port))
}

#[must_use]
pub fn summarize(manifest: &Manifest, port: Option<u16>) -> ManifestSummary {
    let services = manifest.services.0.keys().cloned().collect();

    let publishes_port = port.is_some_and(|port| {
        manifest
            .services
            .0
            .values()
            .flatten()
            .any(|service| match &service.ports {
                Ports::Short(ports) => ports.iter().any(|p| publishes(p, port)),
                Ports::Long(_) => false,
            })
    });

    ManifestSummary {
        services,
        publishes_port,
    }
}

/// Whether a short port mapping (`[ip:]host:container[/proto]`)
/// binds `port` on the host, literally or through `EXTERNAL_PORT`.
fn publishes(mapping: &str, port: u16) -> bool {
    let mapping = mapping.split('/').next().unwrap_or(mapping);
    let Some((host, _container)) = mapping.rsplit_once(':') else {
        return false;
    };

    if host.contains(&format!("${{{EXTERNAL_PORT}"))
        || host.ends_with(&format!("${EXTERNAL_PORT}"))
    {
        return true;
    }

    host.rsplit(':').next() == Some(port.to_string().as_str())
}
