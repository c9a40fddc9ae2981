use super::manifest::{Manifest, Project};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default git executable, resolved through `PATH`.
pub const DEFAULT_GIT_EXECUTABLE: &str = "git";

/// Runtime settings that are not part of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    /// Program invoked for every git operation
    pub git_executable: String,

    /// Upper bound on concurrently running project tasks in parallel mode
    pub max_parallel: usize,

    /// Per-invocation timeout, `None` waits forever
    pub command_timeout_secs: Option<u64>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            git_executable: DEFAULT_GIT_EXECUTABLE.to_string(),
            max_parallel: num_cpus::get(),
            command_timeout_secs: None,
        }
    }
}

impl WorkspaceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_git_executable(mut self, git: impl Into<String>) -> Self {
        self.git_executable = git.into();
        self
    }

    /// Cap parallel fan-out. Zero is treated as one.
    pub fn with_max_parallel(mut self, jobs: usize) -> Self {
        self.max_parallel = jobs.max(1);
        self
    }

    pub fn with_command_timeout(mut self, seconds: Option<u64>) -> Self {
        self.command_timeout_secs = seconds;
        self
    }
}

/// A loaded manifest bound to the directory its project paths resolve against.
///
/// Passed explicitly to every use case; the manifest is shared read-only
/// between concurrent project tasks.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Directory that project directories are relative to
    pub root_path: PathBuf,

    /// Location of the manifest file
    pub manifest_path: PathBuf,

    pub manifest: Arc<Manifest>,

    pub config: WorkspaceConfig,
}

impl Workspace {
    pub fn new(root_path: PathBuf, manifest_path: PathBuf, manifest: Manifest) -> Self {
        Self {
            root_path,
            manifest_path,
            manifest: Arc::new(manifest),
            config: WorkspaceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WorkspaceConfig) -> Self {
        self.config = config;
        self
    }

    /// Absolute location of a project's checkout.
    pub fn project_path(&self, project: &Project) -> PathBuf {
        self.root_path.join(project.directory())
    }

    /// Directory containing the manifest file; the controlling repository is
    /// discovered from here.
    pub fn manifest_dir(&self) -> &Path {
        match self.manifest_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => &self.root_path,
        }
    }
}
