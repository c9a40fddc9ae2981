use crate::infrastructure::process::{
    CommandExecutorError, CommandRunner, CommandSpec, ExecutionConfig,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Git repository operations related errors
#[derive(Debug, Error)]
pub enum GitRepositoryError {
    /// A must-succeed invocation exited non-zero
    #[error("`git {args}` exited with status {exit_code} in {}{}", path.display(), stderr_suffix(stderr))]
    CommandFailed {
        path: PathBuf,
        args: String,
        exit_code: i32,
        stderr: String,
    },

    /// A query could not be answered, e.g. the directory is not a checkout
    #[error("{message} ({})", path.display())]
    Repository { path: PathBuf, message: String },

    #[error("HEAD is detached in {}", path.display())]
    DetachedHead { path: PathBuf },

    #[error("reference '{reference}' does not exist in {}", path.display())]
    MissingReference { path: PathBuf, reference: String },

    #[error("could not run git in {}: {source}", path.display())]
    Executor {
        path: PathBuf,
        #[source]
        source: CommandExecutorError,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

/// Whether an invocation's output is captured or streamed to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Inherit,
    Capture,
}

/// Exit status of one git invocation and, when requested, its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutcome {
    pub exit_code: i32,
    pub captured: Option<String>,
    pub stderr: Option<String>,
}

impl InvocationOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Captured stdout without the trailing newline.
    pub fn trimmed(&self) -> &str {
        self.captured.as_deref().map(str::trim).unwrap_or("")
    }
}

/// What `ensure_remote` had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteChange {
    Unchanged,
    Added,
    Updated { previous_url: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyState {
    /// Unstaged changes in the working directory
    pub workdir: bool,
    /// Staged but uncommitted changes
    pub index: bool,
}

impl DirtyState {
    pub fn is_dirty(&self) -> bool {
        self.workdir || self.index
    }
}

/// Handle on one working directory, driven through the git executable.
///
/// Holds no repository state: every query runs git again.
#[derive(Clone)]
pub struct GitRepository {
    path: PathBuf,
    runner: Arc<dyn CommandRunner>,
    git_executable: String,
    ceiling: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

impl fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitRepository")
            .field("path", &self.path)
            .field("git_executable", &self.git_executable)
            .field("ceiling", &self.ceiling)
            .finish()
    }
}

impl GitRepository {
    /// Bind to a project directory. Git is not allowed to search above the
    /// directory's parent, so a plain directory nested inside some other
    /// checkout is reported as "not a repository".
    pub fn open<P: AsRef<Path>>(path: P, runner: Arc<dyn CommandRunner>) -> Self {
        let path = path.as_ref().to_path_buf();
        let ceiling = path.parent().and_then(absolute);
        Self {
            path,
            runner,
            git_executable: "git".to_string(),
            ceiling,
            timeout_secs: None,
        }
    }

    /// Bind to a directory that may be anywhere inside a checkout.
    pub fn discover<P: AsRef<Path>>(path: P, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            ceiling: None,
            ..Self::open(path, runner)
        }
    }

    pub fn with_git_executable(mut self, git: impl Into<String>) -> Self {
        self.git_executable = git.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn spec_in(&self, dir: &Path, args: &[&str], mode: OutputMode) -> CommandSpec {
        let mut config = ExecutionConfig::new()
            .with_working_directory(dir)
            .with_timeout(self.timeout_secs)
            .with_output_capture(mode == OutputMode::Capture);
        if let Some(ceiling) = &self.ceiling {
            config = config.with_environment_variable(
                "GIT_CEILING_DIRECTORIES",
                ceiling.to_string_lossy().into_owned(),
            );
        }
        CommandSpec::new(self.git_executable.as_str(), args.iter().copied()).with_config(config)
    }

    async fn invoke_in(
        &self,
        dir: &Path,
        args: &[&str],
        mode: OutputMode,
    ) -> Result<InvocationOutcome, GitRepositoryError> {
        let spec = self.spec_in(dir, args, mode);
        debug!("{}: {}", dir.display(), spec.display());

        let result = self
            .runner
            .run(&spec)
            .await
            .map_err(|source| GitRepositoryError::Executor {
                path: self.path.clone(),
                source,
            })?;

        Ok(InvocationOutcome {
            exit_code: result.exit_code,
            captured: result.stdout,
            stderr: result.stderr,
        })
    }

    /// Run git in this directory. A non-zero exit is returned, not raised.
    pub async fn invoke(
        &self,
        args: &[&str],
        mode: OutputMode,
    ) -> Result<InvocationOutcome, GitRepositoryError> {
        self.invoke_in(&self.path, args, mode).await
    }

    /// Run git and treat any non-zero exit as a [`GitRepositoryError::CommandFailed`].
    pub async fn invoke_or_fail(&self, args: &[&str]) -> Result<String, GitRepositoryError> {
        let outcome = self.invoke(args, OutputMode::Capture).await?;
        self.require_success(args, outcome)
    }

    fn require_success(
        &self,
        args: &[&str],
        outcome: InvocationOutcome,
    ) -> Result<String, GitRepositoryError> {
        if outcome.success() {
            Ok(outcome.captured.unwrap_or_default())
        } else {
            Err(GitRepositoryError::CommandFailed {
                path: self.path.clone(),
                args: args.join(" "),
                exit_code: outcome.exit_code,
                stderr: outcome.stderr.unwrap_or_default(),
            })
        }
    }

    fn unexpected(&self, args: &[&str], outcome: &InvocationOutcome) -> GitRepositoryError {
        let stderr = outcome.stderr.as_deref().unwrap_or("").trim();
        let mut message = format!(
            "`git {}` exited with status {}",
            args.join(" "),
            outcome.exit_code
        );
        if !stderr.is_empty() {
            message.push_str(": ");
            message.push_str(stderr);
        }
        GitRepositoryError::Repository {
            path: self.path.clone(),
            message,
        }
    }

    /// Whether the directory already holds a clone.
    pub fn has_git_dir(&self) -> bool {
        self.path.join(".git").exists()
    }

    /// Exit 0 means "no differences", exit 1 means "differences".
    async fn diff_quiet(&self, args: &[&str]) -> Result<bool, GitRepositoryError> {
        let outcome = self.invoke(args, OutputMode::Capture).await?;
        match outcome.exit_code {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(self.unexpected(args, &outcome)),
        }
    }

    pub async fn is_workdir_dirty(&self) -> Result<bool, GitRepositoryError> {
        self.diff_quiet(&["diff", "--quiet"]).await
    }

    pub async fn is_index_dirty(&self) -> Result<bool, GitRepositoryError> {
        self.diff_quiet(&["diff", "--quiet", "--cached"]).await
    }

    pub async fn is_dirty(&self) -> Result<bool, GitRepositoryError> {
        Ok(self.is_workdir_dirty().await? || self.is_index_dirty().await?)
    }

    /// Both dirtiness verdicts, each queried once.
    pub async fn dirty_state(&self) -> Result<DirtyState, GitRepositoryError> {
        Ok(DirtyState {
            workdir: self.is_workdir_dirty().await?,
            index: self.is_index_dirty().await?,
        })
    }

    /// Name of the checked out branch, without `refs/heads/`.
    pub async fn current_branch(&self) -> Result<String, GitRepositoryError> {
        let args = ["symbolic-ref", "-q", "HEAD"];
        let outcome = self.invoke(&args, OutputMode::Capture).await?;
        match outcome.exit_code {
            0 => {
                let reference = outcome.trimmed();
                Ok(reference
                    .strip_prefix("refs/heads/")
                    .unwrap_or(reference)
                    .to_string())
            }
            1 => Err(GitRepositoryError::DetachedHead {
                path: self.path.clone(),
            }),
            _ => Err(self.unexpected(&args, &outcome)),
        }
    }

    pub async fn head_revision(&self) -> Result<String, GitRepositoryError> {
        let args = ["rev-parse", "HEAD"];
        let outcome = self.invoke(&args, OutputMode::Capture).await?;
        if outcome.success() {
            Ok(outcome.trimmed().to_string())
        } else {
            Err(self.unexpected(&args, &outcome))
        }
    }

    pub async fn reference_exists(&self, reference: &str) -> Result<bool, GitRepositoryError> {
        let args = ["rev-parse", "--verify", "-q", reference];
        let outcome = self.invoke(&args, OutputMode::Capture).await?;
        match outcome.exit_code {
            0 => Ok(true),
            1 => Ok(false),
            _ => Err(self.unexpected(&args, &outcome)),
        }
    }

    pub async fn branch_exists(&self, branch: &str) -> Result<bool, GitRepositoryError> {
        self.reference_exists(&format!("refs/heads/{}", branch))
            .await
    }

    /// False right after cloning a repository whose default branch is absent.
    pub async fn has_head(&self) -> Result<bool, GitRepositoryError> {
        self.reference_exists("HEAD").await
    }

    /// `(ahead, behind)` of `local` relative to `remote`.
    ///
    /// Both references must exist; a reference that was never fetched is an
    /// error rather than "up to date".
    pub async fn tracking_status(
        &self,
        local: &str,
        remote: &str,
    ) -> Result<(usize, usize), GitRepositoryError> {
        for reference in [local, remote] {
            if !self.reference_exists(reference).await? {
                return Err(GitRepositoryError::MissingReference {
                    path: self.path.clone(),
                    reference: reference.to_string(),
                });
            }
        }

        let range = format!("{}...{}", local, remote);
        let args = ["rev-list", "--left-right", range.as_str()];
        let outcome = self.invoke(&args, OutputMode::Capture).await?;
        if !outcome.success() {
            return Err(self.unexpected(&args, &outcome));
        }
        Ok(count_left_right(outcome.trimmed()))
    }

    /// Relative path from this directory up to the checkout root.
    pub async fn show_cdup(&self) -> Result<String, GitRepositoryError> {
        let args = ["rev-parse", "--show-cdup"];
        let outcome = self.invoke(&args, OutputMode::Capture).await?;
        if outcome.success() {
            Ok(outcome.trimmed().to_string())
        } else {
            Err(self.unexpected(&args, &outcome))
        }
    }

    /// Root directory of the checkout containing this directory.
    pub async fn toplevel(&self) -> Result<PathBuf, GitRepositoryError> {
        let cdup = self.show_cdup().await?;
        if cdup.is_empty() {
            Ok(self.path.clone())
        } else {
            Ok(self.path.join(cdup))
        }
    }

    /// Configured URL of `remote`, `None` when the remote does not exist.
    pub async fn remote_url(&self, remote: &str) -> Result<Option<String>, GitRepositoryError> {
        let key = format!("remote.{}.url", remote);
        let args = ["config", "--get", key.as_str()];
        let outcome = self.invoke(&args, OutputMode::Capture).await?;
        match outcome.exit_code {
            0 => Ok(Some(outcome.trimmed().to_string())),
            1 => Ok(None),
            _ => Err(self.unexpected(&args, &outcome)),
        }
    }

    /// Make `remote` point at `url`, touching the configuration only when needed.
    pub async fn ensure_remote(
        &self,
        remote: &str,
        url: &str,
    ) -> Result<RemoteChange, GitRepositoryError> {
        match self.remote_url(remote).await? {
            Some(current) if current == url => Ok(RemoteChange::Unchanged),
            Some(current) => {
                self.invoke_or_fail(&["remote", "set-url", remote, url])
                    .await?;
                Ok(RemoteChange::Updated {
                    previous_url: current,
                })
            }
            None => {
                self.invoke_or_fail(&["remote", "add", remote, url]).await?;
                Ok(RemoteChange::Added)
            }
        }
    }

    /// Create `local` tracking `remote` unless it exists. Returns whether a
    /// branch was created.
    pub async fn ensure_tracking_branch(
        &self,
        local: &str,
        remote: &str,
    ) -> Result<bool, GitRepositoryError> {
        if self.branch_exists(local).await? {
            return Ok(false);
        }
        self.invoke_or_fail(&["branch", "--track", local, remote])
            .await?;
        Ok(true)
    }

    pub async fn checkout(&self, branch: &str) -> Result<(), GitRepositoryError> {
        self.invoke_or_fail(&["checkout", branch]).await?;
        Ok(())
    }

    /// Create `local` from `remote` with upstream tracking and check it out.
    pub async fn checkout_tracking(&self, local: &str, remote: &str) -> Result<(), GitRepositoryError> {
        self.invoke_or_fail(&["checkout", "--track", "-b", local, remote])
            .await?;
        Ok(())
    }

    pub async fn reset_hard(&self, reference: &str) -> Result<(), GitRepositoryError> {
        self.invoke_or_fail(&["reset", "--hard", reference]).await?;
        Ok(())
    }

    /// Clone `url` into this handle's directory, naming the remote `origin`.
    ///
    /// Runs from the parent directory, which must exist.
    pub async fn clone_from(&self, url: &str, origin: &str) -> Result<(), GitRepositoryError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let target = self.path.to_string_lossy().into_owned();
        let args = ["clone", "--origin", origin, url, target.as_str()];
        let outcome = self.invoke_in(&parent, &args, OutputMode::Capture).await?;
        self.require_success(&args, outcome)?;
        Ok(())
    }
}

/// Count `rev-list --left-right` output: `<` commits are only on the left
/// side, `>` commits only on the right.
pub fn count_left_right(listing: &str) -> (usize, usize) {
    listing
        .lines()
        .map(str::trim)
        .fold((0, 0), |(left, right), line| match line.chars().next() {
            Some('<') => (left + 1, right),
            Some('>') => (left, right + 1),
            _ => (left, right),
        })
}

fn absolute(path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return std::env::current_dir().ok();
    }
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }
    std::env::current_dir().ok().map(|cwd| cwd.join(path))
}
