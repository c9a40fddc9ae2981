//! Use cases driving git across every project of a workspace.
pub mod orchestrator;
pub mod services;
pub mod use_cases;

pub use orchestrator::{Operation, OperationReport, Orchestrator};
