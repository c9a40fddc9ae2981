use super::checkout_branches::{CheckoutBranchesUseCase, CheckoutReport};
use super::foreach_command::{ForeachCommandConfig, ForeachCommandUseCase};
use super::project_repository;
use super::setup_remotes::SetupRemotesUseCase;
use crate::application::services::fan_out::{fan_out, FanOutMode};
use crate::common::error::CrepoError;
use crate::common::result::{CrepoResult, OptionExt};
use crate::domain::entities::workspace::Workspace;
use crate::infrastructure::git::{GitRepository, GitRepositoryError};
use crate::infrastructure::process::CommandRunner;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What happened to one project during the clone phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneOutcome {
    Cloned,
    /// The directory already held a clone and was left alone
    AlreadyPresent,
}

#[derive(Debug)]
pub struct InitReport {
    pub clones: Vec<(String, CloneOutcome)>,
    pub checkout: CheckoutReport,
}

impl InitReport {
    pub fn cloned(&self) -> Vec<String> {
        self.projects_with(CloneOutcome::Cloned)
    }

    pub fn already_present(&self) -> Vec<String> {
        self.projects_with(CloneOutcome::AlreadyPresent)
    }

    fn projects_with(&self, wanted: CloneOutcome) -> Vec<String> {
        self.clones
            .iter()
            .filter(|(_, outcome)| *outcome == wanted)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

struct CloneJob {
    project: String,
    repo: GitRepository,
    url: String,
    origin: String,
    tracking_branch: String,
    remote_ref: String,
}

/// Brings a fresh workspace into its declared state.
///
/// Every step after cloning assumes all directories exist, so any clone
/// failure ends the whole run. In parallel mode every launched clone is
/// waited for before failing.
pub struct InitWorkspaceUseCase {
    runner: Arc<dyn CommandRunner>,
}

impl InitWorkspaceUseCase {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn execute(&self, workspace: &Workspace, parallel: bool) -> CrepoResult<InitReport> {
        let clones = self.clone_projects(workspace, parallel).await?;

        let remotes = SetupRemotesUseCase::new(self.runner.clone())
            .execute(workspace)
            .await;
        let failed = remotes.failed_projects();
        if !failed.is_empty() {
            return Err(CrepoError::fanout_failed("setup-remotes", failed));
        }

        let fetch = ForeachCommandUseCase::new(
            ForeachCommandConfig::git(["fetch"])
                .with_per_remote(true)
                .with_parallel(parallel),
            self.runner.clone(),
        )
        .execute(workspace)
        .await?;
        if !fetch.is_success() {
            return Err(CrepoError::fanout_failed("fetch", fetch.failed_projects()));
        }

        let checkout = CheckoutBranchesUseCase::new(self.runner.clone())
            .checkout(workspace, false)
            .await?;

        Ok(InitReport { clones, checkout })
    }

    async fn clone_projects(
        &self,
        workspace: &Workspace,
        parallel: bool,
    ) -> CrepoResult<Vec<(String, CloneOutcome)>> {
        let mut jobs = Vec::new();
        for project in workspace.manifest.projects() {
            let url = workspace
                .manifest
                .clone_url(project)
                .ok_or_internal_error(format!("project '{}' has no primary remote", project.name()))?;
            jobs.push(CloneJob {
                project: project.name().to_string(),
                repo: project_repository(workspace, &self.runner, project),
                url,
                origin: project.primary_remote().to_string(),
                tracking_branch: project.tracking_branch().to_string(),
                remote_ref: project.remote_tracking_ref(),
            });
        }

        if !parallel {
            let mut clones = Vec::with_capacity(jobs.len());
            for job in jobs {
                let project = job.project.clone();
                let outcome = init_project(job)
                    .await
                    .map_err(|e| CrepoError::command_error(&project, "clone", e))?;
                clones.push((project, outcome));
            }
            return Ok(clones);
        }

        let mode = FanOutMode::new(true, workspace.config.max_parallel);
        let results = fan_out(jobs, mode, |job| async move {
            let project = job.project.clone();
            (project, init_project(job).await)
        })
        .await?;

        let mut clones = Vec::with_capacity(results.len());
        let mut first_failure = None;
        for (project, result) in results {
            match result {
                Ok(outcome) => clones.push((project, outcome)),
                Err(e) => {
                    error!("Initializing project {} failed: {}", project, e);
                    if first_failure.is_none() {
                        first_failure = Some(CrepoError::command_error(&project, "clone", e));
                    }
                }
            }
        }

        match first_failure {
            Some(error) => Err(error),
            None => Ok(clones),
        }
    }
}

/// Clone one project unless it is already there, then put it on its
/// tracking branch.
async fn init_project(job: CloneJob) -> Result<CloneOutcome, GitRepositoryError> {
    if job.repo.has_git_dir() {
        info!("Project {} is already cloned", job.project);
        return Ok(CloneOutcome::AlreadyPresent);
    }

    info!("Initializing project: {}", job.project);
    if let Some(parent) = job.repo.path().parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| GitRepositoryError::Repository {
                path: job.repo.path().to_path_buf(),
                message: format!("cannot create {}: {}", parent.display(), e),
            })?;
    }
    job.repo.clone_from(&job.url, &job.origin).await?;

    if !job.repo.has_head().await? {
        warn!(
            "Project {} has no HEAD after cloning {}; creating {} from {}",
            job.project, job.url, job.tracking_branch, job.remote_ref
        );
    }

    if job.repo.branch_exists(&job.tracking_branch).await? {
        job.repo.checkout(&job.tracking_branch).await?;
    } else {
        job.repo
            .checkout_tracking(&job.tracking_branch, &job.remote_ref)
            .await?;
    }

    Ok(CloneOutcome::Cloned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::workspace;
    use crate::infrastructure::process::testing::{reply, starts_with, ScriptedRunner};

    /// Simulates `git clone` by creating the `.git` directory it would create.
    fn cloning_runner(fail_clone_of: Option<&'static str>) -> Arc<ScriptedRunner> {
        ScriptedRunner::new(move |spec| {
            if starts_with(spec, &["clone"]) {
                let target = std::path::PathBuf::from(&spec.args[4]);
                let name = target.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if Some(name) == fail_clone_of {
                    return reply(128, "");
                }
                std::fs::create_dir_all(target.join(".git")).unwrap();
                reply(0, "")
            } else if starts_with(spec, &["rev-parse", "--verify", "-q", "refs/heads/master"]) {
                reply(1, "")
            } else if starts_with(spec, &["config", "--get"]) {
                reply(1, "")
            } else {
                reply(0, "")
            }
        })
    }

    #[tokio::test]
    async fn test_init_clones_then_wires_everything_up() {
        let (root, workspace) = workspace(&["a", "b"]);
        let runner = cloning_runner(None);

        let report = InitWorkspaceUseCase::new(runner.clone())
            .execute(&workspace, false)
            .await
            .unwrap();

        assert_eq!(report.cloned(), vec!["a".to_string(), "b".to_string()]);
        let in_a = runner.args_in(&root.path().join("a"));
        assert!(in_a.contains(&"checkout --track -b master origin/master".to_string()));
        assert!(in_a.contains(&"fetch origin".to_string()));
        assert!(in_a.contains(&"checkout master".to_string()));

        let clone = &runner.calls()[0];
        assert_eq!(clone.args[..3], ["clone", "--origin", "origin"]);
        assert_eq!(clone.args[3], "https://example.com/a.git");
    }

    #[tokio::test]
    async fn test_init_is_idempotent_for_existing_clones() {
        let (root, workspace) = workspace(&["a"]);
        std::fs::create_dir_all(root.path().join("a").join(".git")).unwrap();
        let runner = cloning_runner(None);

        let report = InitWorkspaceUseCase::new(runner.clone())
            .execute(&workspace, false)
            .await
            .unwrap();

        assert_eq!(report.already_present(), vec!["a".to_string()]);
        assert!(!runner.args().iter().any(|a| a.starts_with("clone")));
    }

    #[tokio::test]
    async fn test_sequential_init_stops_at_first_failed_clone() {
        let (_root, workspace) = workspace(&["a", "b"]);
        let runner = cloning_runner(Some("a"));

        let error = InitWorkspaceUseCase::new(runner.clone())
            .execute(&workspace, false)
            .await
            .unwrap_err();

        assert!(matches!(error, CrepoError::CommandError { ref project, .. } if project == "a"));
        let clones = runner.args().iter().filter(|a| a.starts_with("clone")).count();
        assert_eq!(clones, 1);
        assert!(!runner.args().iter().any(|a| a.starts_with("fetch")));
    }

    #[tokio::test]
    async fn test_parallel_init_waits_for_every_clone_then_fails() {
        let (_root, workspace) = workspace(&["a", "b", "c"]);
        let runner = cloning_runner(Some("b"));

        let error = InitWorkspaceUseCase::new(runner.clone())
            .execute(&workspace, true)
            .await
            .unwrap_err();

        assert!(matches!(error, CrepoError::CommandError { ref project, .. } if project == "b"));
        let clones = runner.args().iter().filter(|a| a.starts_with("clone")).count();
        assert_eq!(clones, 3);
        assert!(!runner.args().iter().any(|a| a.starts_with("remote add")));
    }
}
