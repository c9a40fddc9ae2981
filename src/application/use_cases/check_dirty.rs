use super::{project_repository, ProjectOutcome};
use crate::domain::entities::workspace::Workspace;
use crate::infrastructure::git::DirtyState;
use crate::infrastructure::process::CommandRunner;
use std::sync::Arc;
use tracing::warn;

/// Dirtiness verdict for every project, in manifest order.
#[derive(Debug, Default)]
pub struct DirtyCheckResult {
    pub projects: Vec<ProjectOutcome<DirtyState>>,
}

impl DirtyCheckResult {
    /// True when at least one project is known to be dirty. Projects whose
    /// state could not be determined do not count.
    pub fn any_dirty(&self) -> bool {
        self.projects
            .iter()
            .any(|p| matches!(&p.outcome, Ok(state) if state.is_dirty()))
    }

    /// Projects that block a checkout: dirty ones and those that could not
    /// be checked.
    pub fn offenders(&self) -> Vec<String> {
        self.projects
            .iter()
            .filter(|p| match &p.outcome {
                Ok(state) => state.is_dirty(),
                Err(_) => true,
            })
            .map(|p| p.project.clone())
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.projects.iter().any(|p| !p.is_ok())
    }

    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for project in &self.projects {
            match &project.outcome {
                Ok(state) => {
                    if state.workdir {
                        lines.push(format!(
                            "Project {} has a dirty working directory (unstaged changes).",
                            project.project
                        ));
                    }
                    if state.index {
                        lines.push(format!(
                            "Project {} has a dirty index (staged changes).",
                            project.project
                        ));
                    }
                }
                Err(e) => lines.push(format!(
                    "Project {}: could not determine dirtiness: {}",
                    project.project, e
                )),
            }
        }
        lines
    }
}

pub struct CheckDirtyUseCase {
    runner: Arc<dyn CommandRunner>,
}

impl CheckDirtyUseCase {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Read only. A project that cannot be queried is recorded and the rest
    /// are still checked.
    pub async fn execute(&self, workspace: &Workspace) -> DirtyCheckResult {
        let mut result = DirtyCheckResult::default();

        for project in workspace.manifest.projects() {
            let repo = project_repository(workspace, &self.runner, project);
            let outcome = repo.dirty_state().await;
            if let Err(e) = &outcome {
                warn!("Could not check project {}: {}", project.name(), e);
            }
            result
                .projects
                .push(ProjectOutcome::new(project.name(), outcome));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::workspace;
    use crate::infrastructure::process::testing::{reply, ScriptedRunner};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn runner_for(root: PathBuf) -> Arc<ScriptedRunner> {
        ScriptedRunner::new(move |spec| {
            let dir = spec.config.working_directory.clone().unwrap_or_default();
            let cached = spec.args.iter().any(|a| a == "--cached");
            match dir.strip_prefix(&root).ok().and_then(|p| p.to_str()) {
                Some("a") if !cached => reply(1, ""),
                Some("b") if cached => reply(1, ""),
                Some("broken") => reply(128, ""),
                _ => reply(0, ""),
            }
        })
    }

    #[tokio::test]
    async fn test_aggregate_is_or_of_projects() {
        let (root, workspace) = workspace(&["a", "b", "clean", "broken"]);
        let result = CheckDirtyUseCase::new(runner_for(root.path().to_path_buf()))
            .execute(&workspace)
            .await;

        assert!(result.any_dirty());
        assert!(result.has_errors());
        assert_eq!(
            result.offenders(),
            vec!["a".to_string(), "b".to_string(), "broken".to_string()]
        );

        let lines = result.render_lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Project a has a dirty working directory (unstaged changes)."
        );
        assert_eq!(lines[1], "Project b has a dirty index (staged changes).");
        assert!(lines[2].starts_with("Project broken: could not determine dirtiness"));
    }

    #[tokio::test]
    async fn test_errors_alone_are_not_dirty() {
        let (root, workspace) = workspace(&["broken", "clean"]);
        let result = CheckDirtyUseCase::new(runner_for(root.path().to_path_buf()))
            .execute(&workspace)
            .await;

        assert!(!result.any_dirty());
        assert_eq!(result.offenders(), vec!["broken".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_workspace_is_clean() {
        let (_root, workspace) = workspace(&[]);
        let runner = ScriptedRunner::succeeding();
        let result = CheckDirtyUseCase::new(runner.clone())
            .execute(&workspace)
            .await;

        assert!(!result.any_dirty());
        assert!(result.offenders().is_empty());
        assert!(runner.calls().is_empty());
    }
}
