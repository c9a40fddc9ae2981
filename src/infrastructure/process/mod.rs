pub mod command_executor;
#[cfg(test)]
pub mod testing;

pub use command_executor::{
    CommandExecutor, CommandExecutorError, CommandRunner, CommandSpec, ExecutionConfig,
    ExecutionResult,
};
