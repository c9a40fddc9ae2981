use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

/// Command executor errors
#[derive(Debug, Error)]
pub enum CommandExecutorError {
    #[error("Command timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Process spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Process termination failed: {0}")]
    TerminationFailed(String),
}

/// Configuration for command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Working directory for command execution
    pub working_directory: Option<PathBuf>,

    /// Environment variables to set for the process
    pub environment_variables: HashMap<String, String>,

    /// Timeout for command execution in seconds
    pub timeout_seconds: Option<u64>,

    /// Whether to capture stdout and stderr instead of inheriting them
    pub capture_output: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            working_directory: None,
            environment_variables: HashMap::new(),
            timeout_seconds: None,
            capture_output: true,
        }
    }
}

impl ExecutionConfig {
    /// Create a new execution config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set working directory
    pub fn with_working_directory<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_directory = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Add environment variable
    pub fn with_environment_variable(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.environment_variables.insert(key.into(), value.into());
        self
    }

    /// Add multiple environment variables
    pub fn with_environment_variables(mut self, vars: HashMap<String, String>) -> Self {
        self.environment_variables.extend(vars);
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout_seconds: Option<u64>) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Capture output, or let the child write straight to our stdout/stderr
    pub fn with_output_capture(mut self, capture_output: bool) -> Self {
        self.capture_output = capture_output;
        self
    }
}

/// One external program invocation: program, argument vector and how to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub config: ExecutionConfig,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            config: ExecutionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// The command as a user would type it.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Result of command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code of the process (-1 when killed by a signal)
    pub exit_code: i32,

    /// Captured standard output, `None` when output was inherited
    pub stdout: Option<String>,

    /// Captured standard error, `None` when output was inherited
    pub stderr: Option<String>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,

    /// Whether the command was successful (exit code 0)
    pub success: bool,
}

impl ExecutionResult {
    /// Create a new execution result
    pub fn new(
        exit_code: i32,
        stdout: Option<String>,
        stderr: Option<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            execution_time_ms,
            success: exit_code == 0,
        }
    }
}

/// Seam between the orchestration engine and the operating system.
///
/// The production implementation is [`CommandExecutor`]; tests substitute a
/// scripted runner to observe which invocations the engine issues.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run one command to completion. A non-zero exit status is not an error.
    async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult, CommandExecutorError>;
}

/// Command executor for running external processes
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Execute a single command
    pub async fn execute(spec: &CommandSpec) -> Result<ExecutionResult, CommandExecutorError> {
        if spec.program.trim().is_empty() {
            return Err(CommandExecutorError::InvalidCommand(
                "Command is empty".to_string(),
            ));
        }

        let start_time = Instant::now();
        let config = &spec.config;

        let mut cmd = TokioCommand::new(&spec.program);
        cmd.args(&spec.args);

        if let Some(working_dir) = &config.working_directory {
            cmd.current_dir(working_dir);
        }

        for (key, value) in &config.environment_variables {
            cmd.env(key, value);
        }

        if config.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        cmd.stdin(Stdio::null());
        // A timed out child is dropped together with its future; take it down too.
        cmd.kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            CommandExecutorError::SpawnFailed(format!("Failed to spawn '{}': {}", spec.display(), e))
        })?;

        let output = match config.timeout_seconds {
            Some(timeout_secs) => {
                match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
                    Ok(output) => output,
                    Err(_) => {
                        return Err(CommandExecutorError::Timeout {
                            timeout_seconds: timeout_secs,
                        })
                    }
                }
            }
            None => child.wait_with_output().await,
        }
        .map_err(|e| {
            CommandExecutorError::TerminationFailed(format!("Failed to wait for process: {}", e))
        })?;

        let (stdout, stderr) = if config.capture_output {
            (
                Some(String::from_utf8_lossy(&output.stdout).into_owned()),
                Some(String::from_utf8_lossy(&output.stderr).into_owned()),
            )
        } else {
            (None, None)
        };

        Ok(ExecutionResult::new(
            output.status.code().unwrap_or(-1),
            stdout,
            stderr,
            start_time.elapsed().as_millis() as u64,
        ))
    }
}

#[async_trait]
impl CommandRunner for CommandExecutor {
    async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult, CommandExecutorError> {
        Self::execute(spec).await
    }
}
