use super::{failed_projects, project_repository, ProjectOutcome};
use crate::domain::entities::workspace::Workspace;
use crate::infrastructure::process::CommandRunner;
use std::sync::Arc;
use tracing::warn;

/// Per project: whether the tracking branch had to be created.
#[derive(Debug, Default)]
pub struct TrackingBranchReport {
    pub outcomes: Vec<ProjectOutcome<bool>>,
}

impl TrackingBranchReport {
    pub fn created(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Ok(true)))
            .map(|o| o.project.clone())
            .collect()
    }

    pub fn failed_projects(&self) -> Vec<String> {
        failed_projects(&self.outcomes)
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ProjectOutcome::is_ok)
    }
}

pub struct EnsureTrackingBranchesUseCase {
    runner: Arc<dyn CommandRunner>,
}

impl EnsureTrackingBranchesUseCase {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn execute(&self, workspace: &Workspace) -> TrackingBranchReport {
        let mut report = TrackingBranchReport::default();

        for project in workspace.manifest.projects() {
            let repo = project_repository(workspace, &self.runner, project);
            let remote_ref = project.remote_tracking_ref();
            let outcome = repo
                .ensure_tracking_branch(project.tracking_branch(), &remote_ref)
                .await;

            match &outcome {
                Ok(true) => warn!(
                    "Branch {} did not exist in project {}; created it tracking {}",
                    project.tracking_branch(),
                    project.name(),
                    remote_ref
                ),
                Ok(false) => {}
                Err(e) => warn!(
                    "Could not ensure tracking branch in project {}: {}",
                    project.name(),
                    e
                ),
            }

            report
                .outcomes
                .push(ProjectOutcome::new(project.name(), outcome));
        }

        report
    }
}
