use std::path::{Path, PathBuf};

use crate::cmd::{CommandLine, Runner};
use crate::error::{DeployError, DeployResult};

/// A freshly cloned project and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedProject {
    pub name: String,
    pub dir: PathBuf,
}

/// Derive the project directory name from a repository URL: the last
/// path segment with a trailing `.git` removed.
///
/// ```
/// use balista::repo::project_name;
///
/// assert_eq!(project_name("https://host/ns/repo.git").unwrap(), "repo");
/// assert_eq!(project_name("https://host/ns/repo").unwrap(), "repo");
/// ```
pub fn project_name(url: &str) -> DeployResult<String> {
    let invalid = || DeployError::InvalidRepositoryUrl(url.to_string());

    let trimmed = url.trim().trim_end_matches('/');
    // scp-like remotes (git@host:ns/repo.git) separate with ':'
    let segment = trimmed.rsplit(['/', ':']).next().ok_or_else(invalid)?;
    let name = segment.strip_suffix(".git").unwrap_or(segment);

    if name.is_empty() || name == "." || name == ".." || name == trimmed {
        return Err(invalid());
    }

    Ok(name.to_string())
}

/// Clone `url` into `<workdir>/<project name>`.
pub fn fetch(runner: &dyn Runner, url: &str, workdir: &Path) -> DeployResult<FetchedProject> {
    let name = project_name(url)?;
    let dir = workdir.join(&name);

    if dir.exists() {
        return Err(DeployError::Fetch(Box::new(DeployError::Other(format!(
            "destination {} already exists",
            dir.display()
        )))));
    }

    let clone = CommandLine::new("git")
        .args(["clone", "--", url.trim()])
        .arg(dir.to_string_lossy());
    runner
        .run(&clone)
        .map_err(|e| DeployError::Fetch(Box::new(e)))?;

    eprintln!("Cloned the repository {url} into {name}.");

    Ok(FetchedProject { name, dir })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_git_suffix() {
        assert_eq!(project_name("https://github.com/acme/widget.git").unwrap(), "widget");
    }

    #[test]
    fn keeps_name_without_suffix() {
        assert_eq!(project_name("https://github.com/acme/widget").unwrap(), "widget");
    }

    #[test]
    fn ignores_trailing_slash() {
        assert_eq!(project_name("https://github.com/acme/widget/").unwrap(), "widget");
    }

    #[test]
    fn handles_scp_style_remote() {
        assert_eq!(project_name("git@github.com:acme/widget.git").unwrap(), "widget");
        assert_eq!(project_name("git@github.com:widget.git").unwrap(), "widget");
    }

    #[test]
    fn only_strips_trailing_suffix() {
        assert_eq!(project_name("https://host/ns/my.github.io").unwrap(), "my.github.io");
    }

    #[test]
    fn rejects_empty_and_malformed() {
        for bad in ["", "   ", "https://host/ns/.git", "https://host/..", "widget"] {
            assert!(
                matches!(project_name(bad), Err(DeployError::InvalidRepositoryUrl(_))),
                "{bad:?} accepted"
            );
        }
    }
}
