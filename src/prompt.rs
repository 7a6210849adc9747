use std::collections::VecDeque;
use std::io::{BufRead, Write};

use crate::error::{DeployError, DeployResult};

/// Source of operator answers.
pub trait Prompter {
    /// Ask `question`. An empty answer resolves to `default` when one
    /// is given. The returned value is trimmed.
    fn ask(&mut self, question: &str, default: Option<&str>) -> DeployResult<String>;
}

/// Reads answers line by line from a reader, printing questions to
/// stderr. `Stdin::new()` wraps the process's standard input.
pub struct Stdin<R> {
    reader: R,
}

impl Stdin<std::io::StdinLock<'static>> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: std::io::stdin().lock(),
        }
    }
}

impl Default for Stdin<std::io::StdinLock<'static>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: BufRead> Stdin<R> {
    pub const fn from_reader(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Prompter for Stdin<R> {
    fn ask(&mut self, question: &str, default: Option<&str>) -> DeployResult<String> {
        eprint!("{question}: ");
        std::io::stderr().flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return default
                .map(str::to_string)
                .ok_or_else(|| DeployError::PromptClosed(question.to_string()));
        }

        Ok(resolve(&line, default))
    }
}

/// Answers prepared up front, consumed in order. When the queue is
/// empty every question gets its default; a question without one
/// fails with [`DeployError::PromptClosed`].
#[derive(Debug, Clone, Default)]
pub struct Answers {
    queue: VecDeque<String>,
}

impl Answers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn answer(mut self, value: &str) -> Self {
        self.queue.push_back(value.to_string());
        self
    }
}

impl Prompter for Answers {
    fn ask(&mut self, question: &str, default: Option<&str>) -> DeployResult<String> {
        self.queue.pop_front().map_or_else(
            || {
                default
                    .map(str::to_string)
                    .ok_or_else(|| DeployError::PromptClosed(question.to_string()))
            },
            |answer| Ok(resolve(&answer, default)),
        )
    }
}

fn resolve(raw: &str, default: Option<&str>) -> String {
    let trimmed = raw.trim();
    match default {
        Some(d) if trimmed.is_empty() => d.to_string(),
        _ => trimmed.to_string(),
    }
}
