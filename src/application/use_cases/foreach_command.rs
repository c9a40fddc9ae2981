use crate::application::services::fan_out::{fan_out, FanOutMode};
use crate::common::error::CrepoError;
use crate::common::result::CrepoResult;
use crate::domain::entities::workspace::Workspace;
use crate::infrastructure::process::{
    CommandExecutorError, CommandRunner, CommandSpec, ExecutionConfig,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// What the caller's arguments are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// A git subcommand, run through the configured git executable
    Git,
    /// A program followed by its arguments
    Program,
}

/// How and where the command runs.
#[derive(Debug, Clone)]
pub struct ForeachCommandConfig {
    /// Arguments as given on the command line
    pub args: Vec<String>,

    pub kind: CommandKind,

    /// Run every project at once instead of one after another
    pub parallel: bool,

    /// Run once per declared remote with the remote name appended
    pub per_remote: bool,
}

impl ForeachCommandConfig {
    pub fn new(kind: CommandKind, args: Vec<String>) -> Self {
        Self {
            args,
            kind,
            parallel: false,
            per_remote: false,
        }
    }

    /// A git subcommand such as `fetch` or `log -1`.
    pub fn git<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CommandKind::Git, args.into_iter().map(Into::into).collect())
    }

    pub fn program<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            CommandKind::Program,
            args.into_iter().map(Into::into).collect(),
        )
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_per_remote(mut self, per_remote: bool) -> Self {
        self.per_remote = per_remote;
        self
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommandStatus {
    Success,
    /// Non-zero exit, a command that could not start, or a missing project
    /// directory
    Failed,
    Timeout,
}

/// One invocation in one project.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub project: String,

    /// Remote appended to the command, for per-remote runs
    pub remote: Option<String>,

    /// The command line as it was run
    pub command: String,

    pub status: CommandStatus,

    pub exit_code: Option<i32>,

    /// Captured output; `None` when it went straight to the terminal
    pub stdout: Option<String>,
    pub stderr: Option<String>,

    pub execution_time_ms: u64,

    pub error_message: Option<String>,
}

impl CommandResult {
    fn new(project: &str, remote: Option<&str>, command: String) -> Self {
        Self {
            project: project.to_string(),
            remote: remote.map(str::to_string),
            command,
            status: CommandStatus::Failed,
            exit_code: None,
            stdout: None,
            stderr: None,
            execution_time_ms: 0,
            error_message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, CommandStatus::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, CommandStatus::Failed | CommandStatus::Timeout)
    }
}

/// Every invocation of one do-all run.
#[derive(Debug, Clone)]
pub struct ForeachResult {
    /// Results in manifest order, remotes in declaration order
    pub results: Vec<CommandResult>,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_execution_time_ms: u64,
    pub was_parallel: bool,
}

impl ForeachResult {
    pub fn new(was_parallel: bool) -> Self {
        Self {
            results: Vec::new(),
            success_count: 0,
            failure_count: 0,
            total_execution_time_ms: 0,
            was_parallel,
        }
    }

    pub fn add_result(&mut self, result: CommandResult) {
        match result.status {
            CommandStatus::Success => self.success_count += 1,
            CommandStatus::Failed | CommandStatus::Timeout => self.failure_count += 1,
        }

        if !self.was_parallel {
            self.total_execution_time_ms += result.execution_time_ms;
        }

        self.results.push(result);
    }

    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }

    pub fn failed_results(&self) -> Vec<&CommandResult> {
        self.results.iter().filter(|r| r.is_failure()).collect()
    }

    /// Distinct projects with at least one failed invocation.
    pub fn failed_projects(&self) -> Vec<String> {
        let mut projects: Vec<String> = Vec::new();
        for result in self.failed_results() {
            if !projects.contains(&result.project) {
                projects.push(result.project.clone());
            }
        }
        projects
    }
}

/// Everything a project task needs, owned so it can move into a spawned task.
struct ProjectJob {
    name: String,
    path: PathBuf,
    remotes: Vec<Option<String>>,
    environment: HashMap<String, String>,
}

/// Runs a caller-supplied command in every project directory.
///
/// Best effort: every project runs no matter how the others fare, and each
/// invocation reports its own exit status.
pub struct ForeachCommandUseCase {
    config: ForeachCommandConfig,
    runner: Arc<dyn CommandRunner>,
}

impl ForeachCommandUseCase {
    pub fn new(config: ForeachCommandConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub async fn execute(&self, workspace: &Workspace) -> CrepoResult<ForeachResult> {
        self.validate_command()?;

        let start_time = std::time::Instant::now();
        let mode = FanOutMode::new(self.config.parallel, workspace.config.max_parallel);
        let jobs = self.prepare_jobs(workspace);

        let (program, base_args) = self.program_and_args(workspace);
        let runner = self.runner.clone();
        let timeout = workspace.config.command_timeout_secs;
        // Parallel runs interleave, so their output is captured and shown in order.
        let capture = mode.is_parallel();

        let per_project = fan_out(jobs, mode, move |job| {
            let runner = runner.clone();
            let program = program.clone();
            let base_args = base_args.clone();
            async move {
                let mut results = Vec::with_capacity(job.remotes.len());
                for remote in &job.remotes {
                    let mut args = base_args.clone();
                    if let Some(remote) = remote {
                        args.push(remote.clone());
                    }
                    results.push(
                        run_in_project(&*runner, &job, remote.as_deref(), &program, args, capture, timeout)
                            .await,
                    );
                }
                results
            }
        })
        .await?;

        let mut result = ForeachResult::new(mode.is_parallel());
        for command_result in per_project.into_iter().flatten() {
            result.add_result(command_result);
        }
        if result.was_parallel {
            result.total_execution_time_ms = start_time.elapsed().as_millis() as u64;
        }

        for failed in result.failed_results() {
            warn!(
                "`{}` failed in project {}: {}",
                failed.command,
                failed.project,
                failed.error_message.as_deref().unwrap_or("unknown error")
            );
        }

        Ok(result)
    }

    fn validate_command(&self) -> CrepoResult<()> {
        if self.config.args.iter().all(|a| a.trim().is_empty()) {
            return Err(CrepoError::InvalidCommand(
                "no command given".to_string(),
            ));
        }
        Ok(())
    }

    fn program_and_args(&self, workspace: &Workspace) -> (String, Vec<String>) {
        match self.config.kind {
            CommandKind::Git => (
                workspace.config.git_executable.clone(),
                self.config.args.clone(),
            ),
            CommandKind::Program => {
                let mut args = self.config.args.clone();
                let program = args.remove(0);
                (program, args)
            }
        }
    }

    fn prepare_jobs(&self, workspace: &Workspace) -> Vec<ProjectJob> {
        workspace
            .manifest
            .projects()
            .map(|project| {
                let remotes = if self.config.per_remote {
                    project.remote_names().iter().cloned().map(Some).collect()
                } else {
                    vec![None]
                };

                let mut environment = HashMap::new();
                environment.insert(
                    "CREPO_WORKSPACE_ROOT".to_string(),
                    workspace.root_path.display().to_string(),
                );
                environment.insert("CREPO_PROJECT".to_string(), project.name().to_string());
                environment.insert(
                    "CREPO_PROJECT_DIR".to_string(),
                    project.directory().to_string(),
                );
                environment.insert(
                    "CREPO_TRACKING_BRANCH".to_string(),
                    project.tracking_branch().to_string(),
                );
                environment.insert(
                    "CREPO_REMOTE_REF".to_string(),
                    project.remote_tracking_ref(),
                );

                ProjectJob {
                    name: project.name().to_string(),
                    path: workspace.project_path(project),
                    remotes,
                    environment,
                }
            })
            .collect()
    }
}

async fn run_in_project(
    runner: &dyn CommandRunner,
    job: &ProjectJob,
    remote: Option<&str>,
    program: &str,
    args: Vec<String>,
    capture: bool,
    timeout: Option<u64>,
) -> CommandResult {
    let spec_line = if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    };
    let result = CommandResult::new(&job.name, remote, spec_line);

    if !job.path.is_dir() {
        return CommandResult {
            status: CommandStatus::Failed,
            error_message: Some(format!("directory {} does not exist", job.path.display())),
            ..result
        };
    }

    let mut config = ExecutionConfig::new()
        .with_working_directory(&job.path)
        .with_environment_variables(job.environment.clone())
        .with_timeout(timeout)
        .with_output_capture(capture);
    if let Some(remote) = remote {
        config = config.with_environment_variable("CREPO_REMOTE", remote);
    }
    let spec = CommandSpec::new(program, args).with_config(config);

    if !capture {
        info!("In project {}: running {}", job.name, result.command);
    }

    match runner.run(&spec).await {
        Ok(outcome) => CommandResult {
            status: if outcome.success {
                CommandStatus::Success
            } else {
                CommandStatus::Failed
            },
            exit_code: Some(outcome.exit_code),
            error_message: (!outcome.success)
                .then(|| format!("exited with status {}", outcome.exit_code)),
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            execution_time_ms: outcome.execution_time_ms,
            ..result
        },
        Err(CommandExecutorError::Timeout { timeout_seconds }) => CommandResult {
            status: CommandStatus::Timeout,
            error_message: Some(format!("timed out after {} seconds", timeout_seconds)),
            ..result
        },
        Err(e) => CommandResult {
            status: CommandStatus::Failed,
            error_message: Some(e.to_string()),
            ..result
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::manifest_service::{ManifestFormat, ManifestService};
    use crate::application::use_cases::test_support::workspace;
    use crate::infrastructure::process::testing::{reply, ScriptedRunner};
    use crate::infrastructure::process::ExecutionResult;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn test_sequential_runs_in_manifest_order_and_streams() {
        let (_root, workspace) = workspace(&["c", "a", "b"]);
        let runner = ScriptedRunner::succeeding();

        let result = ForeachCommandUseCase::new(
            ForeachCommandConfig::git(["log", "-1"]),
            runner.clone(),
        )
        .execute(&workspace)
        .await
        .unwrap();

        assert!(result.is_success());
        let order: Vec<&str> = result.results.iter().map(|r| r.project.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert!(runner.calls().iter().all(|c| !c.config.capture_output));
        assert!(runner.calls().iter().all(|c| c.program == "git"));
        assert_eq!(result.results[0].command, "git log -1");
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_other_projects() {
        let (root, workspace) = workspace(&["a", "b", "c"]);
        let b = root.path().join("b");
        let runner = ScriptedRunner::new(move |spec| {
            if spec.config.working_directory.as_deref() == Some(b.as_path()) {
                reply(1, "")
            } else {
                reply(0, "")
            }
        });

        let result = ForeachCommandUseCase::new(
            ForeachCommandConfig::program(["grep", "-q", "TODO", "README"]),
            runner.clone(),
        )
        .execute(&workspace)
        .await
        .unwrap();

        assert_eq!(runner.calls().len(), 3);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.failed_projects(), vec!["b".to_string()]);
        assert!(!result.is_success());
        assert_eq!(runner.calls()[0].program, "grep");
        assert_eq!(runner.calls()[0].args, vec!["-q", "TODO", "README"]);
    }

    #[tokio::test]
    async fn test_missing_directory_fails_that_project() {
        let (root, workspace) = workspace(&["a", "b"]);
        std::fs::remove_dir(root.path().join("a")).unwrap();
        let runner = ScriptedRunner::succeeding();

        let result = ForeachCommandUseCase::new(ForeachCommandConfig::git(["status"]), runner.clone())
            .execute(&workspace)
            .await
            .unwrap();

        assert!(!result.is_success());
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.success_count, 1);
        assert_eq!(result.results[0].status, CommandStatus::Failed);
        assert_eq!(result.failed_projects(), vec!["a".to_string()]);
        assert!(result.results[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("does not exist"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_per_remote_appends_remote_name() {
        let root = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("x")).unwrap();
        let manifest = ManifestService::new()
            .parse_from_str(
                "remotes:\n  origin: { fetch: \"a/%s\" }\n  mirror: { fetch: \"b/%s\" }\nprojects:\n  x: { remotes: [origin, mirror] }\n",
                ManifestFormat::Yaml,
            )
            .unwrap();
        let workspace = Workspace::new(
            root.path().to_path_buf(),
            root.path().join("manifest.yml"),
            manifest,
        );
        let runner = ScriptedRunner::succeeding();

        let result = ForeachCommandUseCase::new(
            ForeachCommandConfig::git(["fetch"]).with_per_remote(true),
            runner.clone(),
        )
        .execute(&workspace)
        .await
        .unwrap();

        assert_eq!(
            runner.args(),
            vec!["fetch origin".to_string(), "fetch mirror".to_string()]
        );
        assert_eq!(result.results[1].remote.as_deref(), Some("mirror"));
        assert_eq!(
            runner.calls()[1]
                .config
                .environment_variables
                .get("CREPO_REMOTE")
                .map(String::as_str),
            Some("mirror")
        );
    }

    #[tokio::test]
    async fn test_empty_command_is_rejected() {
        let (_root, workspace) = workspace(&["a"]);
        let error = ForeachCommandUseCase::new(
            ForeachCommandConfig::program(Vec::<String>::new()),
            ScriptedRunner::succeeding(),
        )
        .execute(&workspace)
        .await
        .unwrap_err();
        assert!(matches!(error, CrepoError::InvalidCommand(_)));
    }

    /// Blocks every invocation until `count` of them are in flight.
    struct BarrierRunner {
        barrier: Barrier,
    }

    #[async_trait]
    impl CommandRunner for BarrierRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult, CommandExecutorError> {
            self.barrier.wait().await;
            Ok(ExecutionResult::new(
                0,
                Some(format!("{}\n", spec.args.join(" "))),
                Some(String::new()),
                0,
            ))
        }
    }

    #[tokio::test]
    async fn test_parallel_launches_all_before_joining() {
        let (_root, workspace) = workspace(&["p1", "p2", "p3", "p4", "p5"]);
        let runner = Arc::new(BarrierRunner {
            barrier: Barrier::new(5),
        });

        let use_case = ForeachCommandUseCase::new(
            ForeachCommandConfig::program(["echo", "hi"]).with_parallel(true),
            runner,
        );
        let work = use_case.execute(&workspace);
        let result = tokio::time::timeout(Duration::from_secs(10), work)
            .await
            .expect("parallel do-all waited on a project before launching all")
            .unwrap();

        assert!(result.was_parallel);
        assert_eq!(result.success_count, 5);
        let order: Vec<&str> = result.results.iter().map(|r| r.project.as_str()).collect();
        assert_eq!(order, vec!["p1", "p2", "p3", "p4", "p5"]);
        assert!(result
            .results
            .iter()
            .all(|r| r.stdout.as_deref() == Some("hi\n")));
    }
}
