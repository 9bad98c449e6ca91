//! Git-backed downloader using the system `git` command.
//!
//! Like Cargo, this shells out to the installed `git` binary instead of
//! linking a git library: it picks up the user's existing authentication
//! (credential helpers, SSH agents) and behaves identically to the git the
//! user runs by hand. [`GitCommand`] is a small typed builder over
//! [`tokio::process::Command`] that handles working-directory placement via
//! `git -C`, output capture, timeouts, and error mapping in one place.

use crate::core::ResolveError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use super::Downloader;

/// Default timeout for a single git invocation.
const GIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Builder for constructing and executing git commands.
///
/// ```rust,ignore
/// GitCommand::clone("https://example.com/repo.git", &dest)
///     .execute_success()
///     .await?;
/// GitCommand::checkout("v1.2.0")
///     .current_dir(&dest)
///     .execute_success()
///     .await?;
/// ```
#[derive(Debug)]
pub struct GitCommand {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    timeout_duration: Option<Duration>,
}

impl GitCommand {
    /// Creates a builder with the default timeout.
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            timeout_duration: Some(GIT_COMMAND_TIMEOUT),
        }
    }

    /// `git clone <url> <target>`.
    pub fn clone_repo(url: &str, target: impl AsRef<Path>) -> Self {
        let target = target.as_ref().display().to_string();
        Self::new().args(vec!["clone".to_string(), url.to_string(), target])
    }

    /// `git checkout --detach <ref>`, run inside a repository via
    /// [`current_dir`](Self::current_dir).
    pub fn checkout(ref_name: &str) -> Self {
        Self::new().args(["checkout", "--detach", ref_name])
    }

    /// Appends arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the repository directory, passed to git as `-C <dir>` so the
    /// invocation is independent of the process working directory.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Overrides the default command timeout. `None` disables it.
    pub fn timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Runs the command, requiring a zero exit code.
    ///
    /// # Errors
    ///
    /// [`ResolveError::GitNotFound`] when no git binary is on PATH;
    /// [`ResolveError::GitCommandError`] for non-zero exits and timeouts,
    /// carrying the captured stderr.
    pub async fn execute_success(self) -> Result<()> {
        let git = which::which("git").map_err(|_| ResolveError::GitNotFound)?;

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.clone());

        let operation = self.args.first().cloned().unwrap_or_else(|| "git".to_string());

        tracing::debug!(target: "git", "executing: git {}", full_args.join(" "));

        let mut cmd = Command::new(&git);
        cmd.args(&full_args).stdout(Stdio::piped()).stderr(Stdio::piped());

        let output_future = cmd.output();
        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => {
                    result.with_context(|| format!("failed to execute git {operation}"))?
                }
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "command timed out after {}s: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    );
                    return Err(ResolveError::GitCommandError {
                        operation,
                        stderr: format!(
                            "git command timed out after {} seconds",
                            duration.as_secs()
                        ),
                    }
                    .into());
                }
            },
            None => {
                output_future.await.with_context(|| format!("failed to execute git {operation}"))?
            }
        };

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(target: "git", "command failed ({:?}): {}", output.status.code(), stderr);
            Err(ResolveError::GitCommandError { operation, stderr }.into())
        }
    }
}

impl Default for GitCommand {
    fn default() -> Self {
        Self::new()
    }
}

/// The default [`Downloader`]: clones a git repository and checks out the
/// requested ref.
///
/// Understands base addresses of the forms
///
/// ```text
/// git::https://host/owner/repo.git?ref=v1.2.0
/// https://host/owner/repo.git
/// git::file:///path/to/repo.git
/// git@host:owner/repo.git?ref=main
/// ```
///
/// The optional `ref=` fetch parameter may name a branch, tag, or commit
/// SHA; the repository is cloned in full so any of the three resolves. All
/// other query parameters are ignored.
#[derive(Debug, Clone, Default)]
pub struct GitDownloader {
    command_timeout: Option<Duration>,
}

impl GitDownloader {
    /// Creates a downloader with the default per-command timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            command_timeout: Some(GIT_COMMAND_TIMEOUT),
        }
    }

    /// Overrides the per-command timeout. `None` disables it, leaving any
    /// cancellation to the resolver's fetch timeout.
    #[must_use]
    pub fn with_command_timeout(mut self, duration: Option<Duration>) -> Self {
        self.command_timeout = duration;
        self
    }
}

#[async_trait]
impl Downloader for GitDownloader {
    async fn fetch(&self, address: &str, dest: &Path) -> Result<()> {
        let (url, git_ref) = parse_git_address(address);

        tracing::debug!(target: "git", %url, ?git_ref, "cloning into {}", dest.display());

        GitCommand::clone_repo(&url, dest)
            .timeout(self.command_timeout)
            .execute_success()
            .await
            .with_context(|| format!("cloning '{url}'"))?;

        if let Some(ref_name) = git_ref {
            GitCommand::checkout(&ref_name)
                .current_dir(dest)
                .timeout(self.command_timeout)
                .execute_success()
                .await
                .with_context(|| format!("checking out ref '{ref_name}' in '{url}'"))?;
        }

        Ok(())
    }
}

/// Strips the forced getter prefix and splits off the `ref=` fetch
/// parameter: `git::https://host/r.git?ref=v1` becomes
/// `("https://host/r.git", Some("v1"))`.
fn parse_git_address(address: &str) -> (String, Option<String>) {
    let stripped = address.strip_prefix("git::").unwrap_or(address);

    let (url, query) = match stripped.split_once('?') {
        Some((url, query)) => (url, Some(query)),
        None => (stripped, None),
    };

    let git_ref = query.and_then(|query| {
        query.split('&').find_map(|pair| {
            pair.strip_prefix("ref=").map(str::to_string)
        })
    });

    (url.to_string(), git_ref)
}
