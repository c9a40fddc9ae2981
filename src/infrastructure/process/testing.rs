//! Scripted stand-in for the process runner, for unit tests.

use super::command_executor::{CommandExecutorError, CommandRunner, CommandSpec, ExecutionResult};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

type Responder = Box<dyn Fn(&CommandSpec) -> ExecutionResult + Send + Sync>;

/// Answers every invocation through a closure and records what was asked.
pub struct ScriptedRunner {
    responder: Responder,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&CommandSpec) -> ExecutionResult + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Runner that succeeds with empty output for everything.
    pub fn succeeding() -> Arc<Self> {
        Self::new(|_| reply(0, ""))
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Argument vectors joined by spaces, in call order.
    pub fn args(&self) -> Vec<String> {
        self.calls().iter().map(|spec| spec.args.join(" ")).collect()
    }

    /// Argument vectors of the calls made in `dir`.
    pub fn args_in(&self, dir: &Path) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|spec| spec.config.working_directory.as_deref() == Some(dir))
            .map(|spec| spec.args.join(" "))
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult, CommandExecutorError> {
        self.calls.lock().unwrap().push(spec.clone());
        let mut result = (self.responder)(spec);
        if !spec.config.capture_output {
            result.stdout = None;
            result.stderr = None;
        }
        Ok(result)
    }
}

/// Captured result with the given exit status and stdout.
pub fn reply(exit_code: i32, stdout: &str) -> ExecutionResult {
    ExecutionResult::new(exit_code, Some(stdout.to_string()), Some(String::new()), 0)
}

/// Whether the call's arguments start with `prefix`.
pub fn starts_with(spec: &CommandSpec, prefix: &[&str]) -> bool {
    spec.args.len() >= prefix.len() && spec.args.iter().zip(prefix).all(|(arg, want)| arg == want)
}
