/// Infrastructure layer modules
///
/// This layer provides concrete implementations for external system interactions:
/// - Git operations through the git executable
/// - File system operations (manifest discovery and storage)
/// - Process execution (command runners)
pub mod filesystem;
pub mod git;
pub mod process;

// Re-export commonly used types
pub use filesystem::manifest_store::ManifestStore;
pub use git::GitRepository;
pub use process::{CommandExecutor, CommandRunner};
