use std::borrow::Cow;
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{DeployError, DeployResult};

/// Program used to elevate commands unless configured otherwise.
pub const SUDO: &str = "sudo";

/// A structured command invocation. Arguments are passed to the
/// program as-is, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub elevated: bool,
    pub current_dir: Option<PathBuf>,
    pub stdin: Option<Vec<u8>>,
}

impl CommandLine {
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            elevated: false,
            current_dir: None,
            stdin: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    #[must_use]
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Full argument vector, including the elevation program when
    /// the command is elevated and an elevation program is set.
    #[must_use]
    pub fn argv(&self, elevation: Option<&str>) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 2);
        if self.elevated {
            if let Some(token) = elevation {
                argv.push(token.to_string());
            }
        }
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }
}

/// Printable form of a command as it will be executed. Arguments a
/// shell would split or interpret are single-quoted.
#[must_use]
pub fn render(command: &CommandLine, elevation: Option<&str>) -> String {
    command
        .argv(elevation)
        .iter()
        .map(|arg| quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(arg: &str) -> Cow<'_, str> {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if plain {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}

/// Captured result of one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Executes commands on behalf of the deployment steps.
pub trait Runner {
    /// Elevation program prepended to elevated commands, if any.
    fn elevation(&self) -> Option<&str> {
        Some(SUDO)
    }

    /// Execute the command and capture its output, whatever the
    /// exit status.
    fn output(&self, command: &CommandLine) -> DeployResult<CommandOutput>;

    /// Execute the command. Fails if it returns a non-zero exit
    /// code, carrying the captured stderr.
    fn run(&self, command: &CommandLine) -> DeployResult<String> {
        let line = render(command, self.elevation());
        debug!(command = %line, "running command");

        let output = self.output(command)?;

        if output.success() {
            Ok(output.stdout.trim().to_string())
        } else {
            let stderr = output.stderr.trim().to_string();
            warn!(command = %line, code = ?output.code, %stderr, "command failed");
            Err(DeployError::CommandFailed {
                command: line,
                code: output.code,
                stderr,
            })
        }
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Clone)]
pub struct System {
    elevation: Option<String>,
}

impl System {
    #[must_use]
    pub fn new() -> Self {
        Self {
            elevation: Some(SUDO.to_string()),
        }
    }

    /// Run elevated commands directly, e.g. when already root.
    #[must_use]
    pub fn without_elevation(mut self) -> Self {
        self.elevation = None;
        self
    }

    #[must_use]
    pub fn elevate_with(mut self, program: &str) -> Self {
        self.elevation = Some(program.to_string());
        self
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner for System {
    fn elevation(&self) -> Option<&str> {
        self.elevation.as_deref()
    }

    fn output(&self, command: &CommandLine) -> DeployResult<CommandOutput> {
        let argv = command.argv(self.elevation());
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| DeployError::Other("empty command line".into()))?;

        let mut child_cmd = Command::new(program);
        child_cmd
            .args(args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.current_dir {
            child_cmd.current_dir(dir);
        }

        let mut child = child_cmd.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                DeployError::CommandNotFound(program.clone())
            } else {
                DeployError::Io(e)
            }
        })?;

        if let (Some(data), Some(pipe)) = (&command.stdin, &mut child.stdin) {
            pipe.write_all(data)?;
        }
        drop(child.stdin.take());

        let output = child.wait_with_output()?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Echoes every command instead of executing it. Always succeeds.
/// Writes to stderr unless given another writer, so stdout stays free
/// for the deployment report.
#[derive(Debug)]
pub struct DryRun<W = io::Stderr> {
    elevation: Option<String>,
    out: RefCell<W>,
}

impl DryRun {
    #[must_use]
    pub fn new(elevation: Option<&str>) -> Self {
        Self::with_writer(elevation, io::stderr())
    }
}

impl<W: Write> DryRun<W> {
    #[must_use]
    pub fn with_writer(elevation: Option<&str>, out: W) -> Self {
        Self {
            elevation: elevation.map(str::to_string),
            out: RefCell::new(out),
        }
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> Runner for DryRun<W> {
    fn elevation(&self) -> Option<&str> {
        self.elevation.as_deref()
    }

    fn output(&self, command: &CommandLine) -> DeployResult<CommandOutput> {
        let line = render(command, self.elevation());
        let mut out = self.out.borrow_mut();
        match &command.current_dir {
            Some(dir) => writeln!(out, "$ (cd {}) {line}", dir.display())?,
            None => writeln!(out, "$ {line}")?,
        }
        if let Some(data) = &command.stdin {
            writeln!(out, "{}", String::from_utf8_lossy(data))?;
        }
        Ok(CommandOutput {
            code: Some(0),
            ..CommandOutput::default()
        })
    }
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}
