use thiserror::Error;

use crate::infrastructure::git::repository::GitRepositoryError;

#[derive(Error, Debug)]
pub enum CrepoError {
    #[error("{operation} failed in project '{project}': {source}")]
    CommandError {
        project: String,
        operation: String,
        #[source]
        source: GitRepositoryError,
    },

    #[error("{operation} failed in project(s): {}", projects.join(", "))]
    FanoutFailed {
        operation: String,
        projects: Vec<String>,
    },

    #[error(
        "Refusing to {operation}: uncommitted or unverifiable changes in project(s): {}",
        projects.join(", ")
    )]
    PreconditionRefused {
        operation: String,
        projects: Vec<String>,
    },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl CrepoError {
    pub fn command_error(
        project: impl Into<String>,
        operation: impl Into<String>,
        source: GitRepositoryError,
    ) -> Self {
        Self::CommandError {
            project: project.into(),
            operation: operation.into(),
            source,
        }
    }

    pub fn fanout_failed(operation: impl Into<String>, projects: Vec<String>) -> Self {
        Self::FanoutFailed {
            operation: operation.into(),
            projects,
        }
    }

    pub fn precondition_refused(operation: impl Into<String>, projects: Vec<String>) -> Self {
        Self::PreconditionRefused {
            operation: operation.into(),
            projects,
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Whether this error is a workspace-level refusal rather than a tool failure.
    pub fn is_refusal(&self) -> bool {
        matches!(self, Self::PreconditionRefused { .. })
    }
}

impl From<tokio::task::JoinError> for CrepoError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::internal_error(format!("Task join error: {}", error))
    }
}
