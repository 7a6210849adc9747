#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use balista::cmd::{CommandLine, CommandOutput, Runner, SUDO, render};
use balista::error::DeployResult;

/// A command seen by [`Recorder`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub line: String,
    pub stdin: Option<String>,
    pub current_dir: Option<PathBuf>,
}

/// Records commands instead of running them. `git clone` creates the
/// destination directory populated with `files`; commands whose
/// rendered line starts with a registered prefix fail with the given
/// stderr.
#[derive(Default)]
pub struct Recorder {
    pub calls: RefCell<Vec<Recorded>>,
    files: Vec<(String, String)>,
    failures: Vec<(String, String)>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, content: &str) -> Self {
        self.files.push((name.to_string(), content.to_string()));
        self
    }

    pub fn fail_on(mut self, prefix: &str, stderr: &str) -> Self {
        self.failures.push((prefix.to_string(), stderr.to_string()));
        self
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.line.clone()).collect()
    }
}

impl Runner for Recorder {
    fn elevation(&self) -> Option<&str> {
        Some(SUDO)
    }

    fn output(&self, command: &CommandLine) -> DeployResult<CommandOutput> {
        let line = render(command, self.elevation());
        self.calls.borrow_mut().push(Recorded {
            line: line.clone(),
            stdin: command
                .stdin
                .as_ref()
                .map(|d| String::from_utf8_lossy(d).into_owned()),
            current_dir: command.current_dir.clone(),
        });

        let failure = self
            .failures
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()));
        if let Some((_, stderr)) = failure {
            return Ok(CommandOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: stderr.clone(),
            });
        }

        if command.program == "git" && command.args.first().map(String::as_str) == Some("clone") {
            if let Some(dest) = command.args.last() {
                let dest = PathBuf::from(dest);
                fs::create_dir_all(&dest)?;
                for (name, content) in &self.files {
                    fs::write(dest.join(name), content)?;
                }
            }
        }

        Ok(CommandOutput {
            code: Some(0),
            ..CommandOutput::default()
        })
    }
}

/// A runner that shares its recording with the test after being moved
/// into a pipeline.
#[derive(Clone)]
pub struct Shared(pub std::rc::Rc<Recorder>);

impl Runner for Shared {
    fn elevation(&self) -> Option<&str> {
        self.0.elevation()
    }

    fn output(&self, command: &CommandLine) -> DeployResult<CommandOutput> {
        self.0.output(command)
    }
}
