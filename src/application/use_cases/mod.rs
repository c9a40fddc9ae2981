pub mod check_dirty;
pub mod checkout_branches;
pub mod foreach_command;
pub mod init_workspace;
pub mod setup_remotes;
pub mod status_check;
pub mod tracking_branches;

use crate::domain::entities::manifest::Project;
use crate::domain::entities::workspace::Workspace;
use crate::infrastructure::git::{GitRepository, GitRepositoryError};
use crate::infrastructure::process::CommandRunner;
use std::sync::Arc;

/// Result of one project's step in a pass that keeps going past failures.
#[derive(Debug)]
pub struct ProjectOutcome<T> {
    pub project: String,
    pub outcome: Result<T, GitRepositoryError>,
}

impl<T> ProjectOutcome<T> {
    pub fn new(project: impl Into<String>, outcome: Result<T, GitRepositoryError>) -> Self {
        Self {
            project: project.into(),
            outcome,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Names of the projects whose step failed, in manifest order.
pub fn failed_projects<T>(outcomes: &[ProjectOutcome<T>]) -> Vec<String> {
    outcomes
        .iter()
        .filter(|o| !o.is_ok())
        .map(|o| o.project.clone())
        .collect()
}

/// Handle bound to a project's checkout, isolated from enclosing repositories.
pub fn project_repository(
    workspace: &Workspace,
    runner: &Arc<dyn CommandRunner>,
    project: &Project,
) -> GitRepository {
    GitRepository::open(workspace.project_path(project), runner.clone())
        .with_git_executable(workspace.config.git_executable.as_str())
        .with_timeout(workspace.config.command_timeout_secs)
}

/// Handle on the directory holding the manifest; git searches upward from it.
pub fn manifest_repository(workspace: &Workspace, runner: &Arc<dyn CommandRunner>) -> GitRepository {
    GitRepository::discover(workspace.manifest_dir(), runner.clone())
        .with_git_executable(workspace.config.git_executable.as_str())
        .with_timeout(workspace.config.command_timeout_secs)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::application::services::manifest_service::{ManifestFormat, ManifestService};
    use crate::domain::entities::workspace::{Workspace, WorkspaceConfig};
    use tempfile::TempDir;

    /// Workspace in a temporary directory, one empty directory per project,
    /// all projects sharing the `origin` remote.
    pub fn workspace(projects: &[&str]) -> (TempDir, Workspace) {
        let root = TempDir::new().unwrap();
        let mut yaml = String::from(
            "remotes:\n  origin:\n    fetch: \"https://example.com/%s.git\"\n  mirror:\n    fetch: \"file:///srv/%s\"\nprojects:",
        );
        if projects.is_empty() {
            yaml.push_str(" {}");
        }
        yaml.push('\n');
        for name in projects {
            yaml.push_str(&format!("  {}: {{}}\n", name));
            std::fs::create_dir_all(root.path().join(name)).unwrap();
        }
        let manifest = ManifestService::new()
            .parse_from_str(&yaml, ManifestFormat::Yaml)
            .unwrap();
        let workspace = Workspace::new(
            root.path().to_path_buf(),
            root.path().join("manifest.yml"),
            manifest,
        )
        .with_config(WorkspaceConfig::new().with_max_parallel(8));
        (root, workspace)
    }
}
