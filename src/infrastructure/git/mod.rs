pub mod repository;

pub use repository::{
    DirtyState, GitRepository, GitRepositoryError, InvocationOutcome, OutputMode, RemoteChange,
};
