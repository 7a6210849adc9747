use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use tracing::warn;

use crate::error::DeployResult;
use crate::prompt::Prompter;
use crate::validate::{self, DEFAULT_PORT};

/// Variable appended to the generated environment file.
pub const EXTERNAL_PORT: &str = "EXTERNAL_PORT";

/// Where the environment file is read from and written to, relative
/// to the project directory.
///
/// # Example
///
/// ```
/// use balista::EnvConfig;
///
/// let env = EnvConfig::new();
///
/// assert_eq!(env.template, ".env_example");
/// assert_eq!(env.output, ".env");
/// ```
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub template: String,
    pub output: String,
}

impl EnvConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            template: ".env_example".to_string(),
            output: ".env".to_string(),
        }
    }

    #[must_use]
    pub fn template(mut self, path: &str) -> Self {
        self.template = path.to_string();
        self
    }

    #[must_use]
    pub fn output(mut self, path: &str) -> Self {
        self.output = path.to_string();
        self
    }

    /// Copy the template to the output file and append
    /// `EXTERNAL_PORT`. The port is `port` when given, otherwise the
    /// operator is asked for it.
    ///
    /// Returns `None` without touching anything when the project has
    /// no template.
    pub fn configure(
        &self,
        project_dir: &Path,
        port: Option<&str>,
        prompter: &mut dyn Prompter,
    ) -> DeployResult<Option<u16>> {
        let template = project_dir.join(&self.template);
        if !template.is_file() {
            eprintln!("No {} found.", self.template);
            return Ok(None);
        }

        let content = fs::read_to_string(&template)?;
        let output = project_dir.join(&self.output);
        write_private(&output, &content)?;
        eprintln!("Copied {} to {}.", self.template, self.output);

        let default = DEFAULT_PORT.to_string();
        let raw = match port {
            Some(p) => p.to_string(),
            None => prompter.ask(
                &format!("Enter the external port for the application (default {default})"),
                Some(&default),
            )?,
        };
        let port = validate::port(&raw)?;

        if parse_env(&content).contains_key(EXTERNAL_PORT) {
            warn!(
                template = %template.display(),
                "template already defines {EXTERNAL_PORT}, appended value takes precedence"
            );
        }

        let line = format!("{EXTERNAL_PORT}={port}");
        write_private(&output, &append_line(&content, &line))?;
        eprintln!("Configured {EXTERNAL_PORT}={port} in {}.", self.output);

        Ok(Some(port))
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Append `line` to `content`, keeping the existing text verbatim and
/// making sure the new line starts on its own line.
#[must_use]
pub fn append_line(content: &str, line: &str) -> String {
    let mut out = String::with_capacity(content.len() + line.len() + 2);
    out.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(line);
    out.push('\n');
    out
}

/// Parse dotenv content into ordered key/value pairs. Later
/// assignments of the same key win.
#[must_use]
pub fn parse_env(content: &str) -> IndexMap<String, String> {
    let mut vars = IndexMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Replace the content of `path`. The file is created owner-only and
/// an existing one is narrowed to owner-only before anything is
/// written.
fn write_private(path: &Path, content: &str) -> DeployResult<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    restrict_permissions(&file)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> DeployResult<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn restrict_permissions(_file: &fs::File) -> DeployResult<()> {
    Ok(())
}
