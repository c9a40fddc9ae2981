use super::check_dirty::{CheckDirtyUseCase, DirtyCheckResult};
use super::project_repository;
use super::tracking_branches::{EnsureTrackingBranchesUseCase, TrackingBranchReport};
use crate::common::error::CrepoError;
use crate::common::result::CrepoResult;
use crate::domain::entities::workspace::Workspace;
use crate::infrastructure::process::CommandRunner;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct CheckoutReport {
    pub tracking: TrackingBranchReport,
    pub dirty: DirtyCheckResult,
    /// Whether dirty projects were overridden
    pub forced: bool,
    /// Projects whose tracking branch is now checked out
    pub checked_out: Vec<String>,
    /// Projects hard-reset to their remote reference
    pub reset: Vec<String>,
}

/// Moves every project onto its tracking branch, optionally discarding local
/// commits.
///
/// Both operations refuse up front when any project is dirty or could not be
/// verified, unless forced; nothing is checked out in that case.
pub struct CheckoutBranchesUseCase {
    runner: Arc<dyn CommandRunner>,
}

impl CheckoutBranchesUseCase {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn checkout(&self, workspace: &Workspace, force: bool) -> CrepoResult<CheckoutReport> {
        self.checkout_as("checkout", workspace, force).await
    }

    /// Checkout, then `reset --hard` each tracking branch onto its remote reference.
    pub async fn hard_reset(&self, workspace: &Workspace, force: bool) -> CrepoResult<CheckoutReport> {
        let mut report = self.checkout_as("hard-reset", workspace, force).await?;

        for project in workspace.manifest.projects() {
            let remote_ref = project.remote_tracking_ref();
            info!(
                "Hard resetting tracking branch in project {} to {}",
                project.name(),
                remote_ref
            );
            project_repository(workspace, &self.runner, project)
                .reset_hard(&remote_ref)
                .await
                .map_err(|e| CrepoError::command_error(project.name(), "hard-reset", e))?;
            report.reset.push(project.name().to_string());
        }

        Ok(report)
    }

    async fn checkout_as(
        &self,
        operation: &str,
        workspace: &Workspace,
        force: bool,
    ) -> CrepoResult<CheckoutReport> {
        let tracking = EnsureTrackingBranchesUseCase::new(self.runner.clone())
            .execute(workspace)
            .await;
        let dirty = CheckDirtyUseCase::new(self.runner.clone())
            .execute(workspace)
            .await;

        let offenders = dirty.offenders();
        if !offenders.is_empty() {
            if !force {
                return Err(CrepoError::precondition_refused(operation, offenders));
            }
            warn!(
                "Forcing {} despite changes in project(s): {}",
                operation,
                offenders.join(", ")
            );
        }

        let mut checked_out = Vec::new();
        for project in workspace.manifest.projects() {
            info!("Checking out tracking branch in project: {}", project.name());
            project_repository(workspace, &self.runner, project)
                .checkout(project.tracking_branch())
                .await
                .map_err(|e| CrepoError::command_error(project.name(), "checkout", e))?;
            checked_out.push(project.name().to_string());
        }

        Ok(CheckoutReport {
            tracking,
            dirty,
            forced: force,
            checked_out,
            reset: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::workspace;
    use crate::infrastructure::process::testing::{reply, starts_with, ScriptedRunner};
    use std::path::PathBuf;

    /// Project `b` has unstaged changes; everything else succeeds.
    fn dirty_b(root: PathBuf) -> Arc<ScriptedRunner> {
        let b = root.join("b");
        ScriptedRunner::new(move |spec| {
            let in_b = spec.config.working_directory.as_deref() == Some(b.as_path());
            if in_b && spec.args == ["diff", "--quiet"] {
                reply(1, "")
            } else {
                reply(0, "")
            }
        })
    }

    fn mutations(runner: &ScriptedRunner) -> Vec<String> {
        runner
            .args()
            .into_iter()
            .filter(|a| a.starts_with("checkout") || a.starts_with("reset"))
            .collect()
    }

    #[tokio::test]
    async fn test_checkout_refuses_dirty_workspace() {
        let (root, workspace) = workspace(&["a", "b"]);
        let runner = dirty_b(root.path().to_path_buf());

        let error = CheckoutBranchesUseCase::new(runner.clone())
            .checkout(&workspace, false)
            .await
            .unwrap_err();

        assert!(error.is_refusal());
        match error {
            CrepoError::PreconditionRefused {
                operation,
                projects,
            } => {
                assert_eq!(operation, "checkout");
                assert_eq!(projects, vec!["b".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(mutations(&runner).is_empty());
    }

    #[tokio::test]
    async fn test_hard_reset_refuses_without_resetting() {
        let (root, workspace) = workspace(&["a", "b"]);
        let runner = dirty_b(root.path().to_path_buf());

        let error = CheckoutBranchesUseCase::new(runner.clone())
            .hard_reset(&workspace, false)
            .await
            .unwrap_err();

        assert!(error.is_refusal());
        assert!(mutations(&runner).is_empty());
    }

    #[tokio::test]
    async fn test_force_proceeds_despite_dirt() {
        let (root, workspace) = workspace(&["a", "b"]);
        let runner = dirty_b(root.path().to_path_buf());

        let report = CheckoutBranchesUseCase::new(runner.clone())
            .hard_reset(&workspace, true)
            .await
            .unwrap();

        assert!(report.forced);
        assert_eq!(report.checked_out, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(report.reset, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            mutations(&runner),
            vec![
                "checkout master".to_string(),
                "checkout master".to_string(),
                "reset --hard origin/master".to_string(),
                "reset --hard origin/master".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_unverifiable_project_blocks_checkout() {
        let (root, workspace) = workspace(&["a", "b"]);
        let a = root.path().join("a");
        let runner = ScriptedRunner::new(move |spec| {
            let in_a = spec.config.working_directory.as_deref() == Some(a.as_path());
            if in_a && starts_with(spec, &["diff"]) {
                reply(128, "")
            } else {
                reply(0, "")
            }
        });

        let error = CheckoutBranchesUseCase::new(runner)
            .checkout(&workspace, false)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("project(s): a"));
    }

    #[tokio::test]
    async fn test_failed_checkout_is_fatal() {
        let (_root, workspace) = workspace(&["a", "b"]);
        let runner = ScriptedRunner::new(|spec| {
            if starts_with(spec, &["checkout"]) {
                reply(1, "")
            } else {
                reply(0, "")
            }
        });

        let error = CheckoutBranchesUseCase::new(runner.clone())
            .checkout(&workspace, false)
            .await
            .unwrap_err();

        assert!(matches!(error, CrepoError::CommandError { ref project, .. } if project == "a"));
        assert_eq!(mutations(&runner).len(), 1);
    }
}
