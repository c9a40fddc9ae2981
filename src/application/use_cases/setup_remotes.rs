use super::{failed_projects, project_repository, ProjectOutcome};
use crate::domain::entities::workspace::Workspace;
use crate::infrastructure::git::RemoteChange;
use crate::infrastructure::process::CommandRunner;
use std::sync::Arc;
use tracing::{info, warn};

/// Remote configuration changes made in one project.
pub type RemoteChanges = Vec<(String, RemoteChange)>;

#[derive(Debug, Default)]
pub struct SetupRemotesReport {
    pub outcomes: Vec<ProjectOutcome<RemoteChanges>>,
}

impl SetupRemotesReport {
    pub fn failed_projects(&self) -> Vec<String> {
        failed_projects(&self.outcomes)
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ProjectOutcome::is_ok)
    }
}

/// Points every declared remote of every project at its manifest URL.
pub struct SetupRemotesUseCase {
    runner: Arc<dyn CommandRunner>,
}

impl SetupRemotesUseCase {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// A failing project is reported and the pass moves on to the next one.
    pub async fn execute(&self, workspace: &Workspace) -> SetupRemotesReport {
        let mut report = SetupRemotesReport::default();

        for project in workspace.manifest.projects() {
            let repo = project_repository(workspace, &self.runner, project);
            let mut changes = Vec::new();
            let mut failure = None;

            for (remote, url) in workspace.manifest.remote_urls(project) {
                match repo.ensure_remote(remote, &url).await {
                    Ok(change) => {
                        match &change {
                            RemoteChange::Added => {
                                info!("Added remote {} ({}) in project {}", remote, url, project.name())
                            }
                            RemoteChange::Updated { previous_url } => info!(
                                "Remote {} in project {} moved from {} to {}",
                                remote,
                                project.name(),
                                previous_url,
                                url
                            ),
                            RemoteChange::Unchanged => {}
                        }
                        changes.push((remote.to_string(), change));
                    }
                    Err(e) => {
                        warn!("Could not set up remote {} in project {}: {}", remote, project.name(), e);
                        failure = Some(e);
                        break;
                    }
                }
            }

            let outcome = match failure {
                Some(e) => Err(e),
                None => Ok(changes),
            };
            report
                .outcomes
                .push(ProjectOutcome::new(project.name(), outcome));
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::workspace;
    use crate::infrastructure::process::testing::{reply, starts_with, ScriptedRunner};

    #[tokio::test]
    async fn test_adds_missing_remotes_and_keeps_going() {
        let (root, workspace) = workspace(&["a", "b"]);
        let broken = root.path().join("a");
        let runner = ScriptedRunner::new(move |spec| {
            if spec.config.working_directory.as_deref() == Some(broken.as_path()) {
                reply(128, "")
            } else if starts_with(spec, &["config", "--get"]) {
                reply(1, "")
            } else {
                reply(0, "")
            }
        });

        let report = SetupRemotesUseCase::new(runner.clone())
            .execute(&workspace)
            .await;

        assert_eq!(report.failed_projects(), vec!["a".to_string()]);
        assert!(!report.is_success());
        let b = &report.outcomes[1];
        assert_eq!(
            b.outcome.as_ref().unwrap(),
            &vec![("origin".to_string(), RemoteChange::Added)]
        );
        assert!(runner
            .args_in(&root.path().join("b"))
            .contains(&"remote add origin https://example.com/b.git".to_string()));
    }

    #[tokio::test]
    async fn test_second_run_is_read_only() {
        let (root, workspace) = workspace(&["a"]);
        let runner = ScriptedRunner::new(|_| reply(0, "https://example.com/a.git\n"));

        let report = SetupRemotesUseCase::new(runner.clone())
            .execute(&workspace)
            .await;

        assert!(report.is_success());
        assert_eq!(
            runner.args_in(&root.path().join("a")),
            vec!["config --get remote.origin.url".to_string()]
        );
    }
}
