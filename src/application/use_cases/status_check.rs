use super::tracking_branches::EnsureTrackingBranchesUseCase;
use super::{manifest_repository, project_repository};
use crate::domain::entities::manifest::DEFAULT_REMOTE;
use crate::domain::entities::workspace::Workspace;
use crate::domain::value_objects::Divergence;
use crate::infrastructure::git::{DirtyState, GitRepository, GitRepositoryError};
use crate::infrastructure::process::CommandRunner;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Checked-out branch relative to the one the manifest expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchState {
    Tracking,
    /// Some other branch is checked out
    Other(String),
    Detached,
    /// The repository has no expected branch; this is what it is on
    Unmanaged(String),
}

#[derive(Debug)]
pub struct StatusDetails {
    /// Only collected for reference dumps
    pub head_revision: Option<String>,
    pub branch: BranchState,
    pub expected_branch: String,
    pub remote_ref: String,
    /// Fails on its own when either reference is missing
    pub divergence: Result<Divergence, GitRepositoryError>,
    pub dirty: DirtyState,
}

impl StatusDetails {
    pub fn is_complete(&self) -> bool {
        self.divergence.is_ok()
    }
}

#[derive(Debug)]
pub struct RepositoryStatus {
    pub name: String,
    pub path: PathBuf,
    pub details: Result<StatusDetails, GitRepositoryError>,
}

#[derive(Debug, Default)]
pub struct StatusReport {
    /// In manifest order
    pub projects: Vec<RepositoryStatus>,
    pub manifest_repository: Option<RepositoryStatus>,
}

impl StatusReport {
    /// Whether any project could not be queried. The manifest repository is
    /// informational and does not count.
    pub fn has_errors(&self) -> bool {
        self.projects
            .iter()
            .any(|p| !matches!(&p.details, Ok(details) if details.is_complete()))
    }

    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (index, status) in self.projects.iter().enumerate() {
            if index > 0 {
                lines.push(String::new());
            }
            lines.push(format!("Project {}:", status.name));
            render_details(&status.details, &mut lines);
        }

        if let Some(status) = &self.manifest_repository {
            if !self.projects.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("Manifest repository ({}):", status.path.display()));
            render_details(&status.details, &mut lines);
        }
        lines
    }
}

fn render_details(details: &Result<StatusDetails, GitRepositoryError>, lines: &mut Vec<String>) {
    let details = match details {
        Ok(details) => details,
        Err(e) => {
            lines.push(format!("  error: {}", e));
            return;
        }
    };

    if let Some(revision) = &details.head_revision {
        lines.push(format!("  HEAD: {}", revision));
    }

    lines.push(match &details.branch {
        BranchState::Tracking => format!("  On tracking branch {}.", details.expected_branch),
        BranchState::Other(branch) => format!(
            "  On branch {}, expected tracking branch {}.",
            branch, details.expected_branch
        ),
        BranchState::Detached => format!(
            "  HEAD is detached; expected tracking branch {}.",
            details.expected_branch
        ),
        BranchState::Unmanaged(branch) => format!("  On branch {}.", branch),
    });

    lines.push(match &details.divergence {
        Ok(divergence) => format!(
            "  {}",
            divergence.describe(&details.expected_branch, &details.remote_ref)
        ),
        Err(e) => format!("  error: {}", e),
    });

    let dirty = details.dirty;
    if !dirty.is_dirty() {
        lines.push("  Working directory and index are clean.".to_string());
    }
    if dirty.workdir {
        lines.push("  Working directory has unstaged changes.".to_string());
    }
    if dirty.index {
        lines.push("  Index has staged changes.".to_string());
    }
}

/// Read-only report over every project and the repository holding the
/// manifest. A project that cannot be queried becomes an error entry.
pub struct StatusCheckUseCase {
    runner: Arc<dyn CommandRunner>,
}

impl StatusCheckUseCase {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// `include_refs` adds the head revision of every repository.
    pub async fn execute(&self, workspace: &Workspace, include_refs: bool) -> StatusReport {
        EnsureTrackingBranchesUseCase::new(self.runner.clone())
            .execute(workspace)
            .await;

        let mut report = StatusReport::default();
        for project in workspace.manifest.projects() {
            let repo = project_repository(workspace, &self.runner, project);
            let details = if repo.path().is_dir() {
                project_status(
                    &repo,
                    project.tracking_branch(),
                    &project.remote_tracking_ref(),
                    include_refs,
                )
                .await
            } else {
                Err(GitRepositoryError::Repository {
                    path: repo.path().to_path_buf(),
                    message: "project directory does not exist".to_string(),
                })
            };

            match &details {
                Err(e) => warn!("Could not query project {}: {}", project.name(), e),
                Ok(StatusDetails {
                    divergence: Err(e), ..
                }) => warn!("Could not compare project {}: {}", project.name(), e),
                Ok(_) => {}
            }
            report.projects.push(RepositoryStatus {
                name: project.name().to_string(),
                path: repo.path().to_path_buf(),
                details,
            });
        }

        report.manifest_repository = Some(self.manifest_status(workspace, include_refs).await);
        report
    }

    async fn manifest_status(&self, workspace: &Workspace, include_refs: bool) -> RepositoryStatus {
        let discovered = manifest_repository(workspace, &self.runner);
        let (path, details) = match discovered.toplevel().await {
            Ok(top) => {
                debug!("Manifest repository root: {}", top.display());
                let repo = GitRepository::discover(&top, self.runner.clone())
                    .with_git_executable(workspace.config.git_executable.as_str())
                    .with_timeout(workspace.config.command_timeout_secs);
                let details = controlling_status(&repo, include_refs).await;
                (top, details)
            }
            Err(e) => (discovered.path().to_path_buf(), Err(e)),
        };

        RepositoryStatus {
            name: "manifest".to_string(),
            path,
            details,
        }
    }
}

async fn project_status(
    repo: &GitRepository,
    expected_branch: &str,
    remote_ref: &str,
    include_refs: bool,
) -> Result<StatusDetails, GitRepositoryError> {
    let head_revision = match include_refs {
        true => Some(repo.head_revision().await?),
        false => None,
    };

    let branch = match repo.current_branch().await {
        Ok(branch) if branch == expected_branch => BranchState::Tracking,
        Ok(branch) => BranchState::Other(branch),
        Err(GitRepositoryError::DetachedHead { .. }) => BranchState::Detached,
        Err(e) => return Err(e),
    };

    let dirty = repo.dirty_state().await?;
    let divergence = repo
        .tracking_status(expected_branch, remote_ref)
        .await
        .map(|(ahead, behind)| Divergence::from_counts(ahead, behind));

    Ok(StatusDetails {
        head_revision,
        branch,
        expected_branch: expected_branch.to_string(),
        remote_ref: remote_ref.to_string(),
        divergence,
        dirty,
    })
}

/// The manifest repository is compared against `origin/<current branch>`.
async fn controlling_status(
    repo: &GitRepository,
    include_refs: bool,
) -> Result<StatusDetails, GitRepositoryError> {
    let branch = repo.current_branch().await?;
    let remote_ref = format!("{}/{}", DEFAULT_REMOTE, branch);
    let mut details = project_status(repo, &branch, &remote_ref, include_refs).await?;
    details.branch = BranchState::Unmanaged(branch);
    Ok(details)
}
