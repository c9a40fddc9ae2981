pub mod manifest;
pub mod workspace;

pub use manifest::{Manifest, ManifestDocument, Project, ProjectDocument, Remote, RemoteDocument};
pub use workspace::{Workspace, WorkspaceConfig};
