use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs as async_fs;

use crate::application::services::manifest_service::{
    ManifestFormat, ManifestService, ManifestServiceError,
};
use crate::domain::entities::manifest::Manifest;

/// File names looked for when no manifest path is given, in priority order.
pub const MANIFEST_FILE_NAMES: [&str; 3] = ["manifest.json", "manifest.yml", "manifest.yaml"];

/// Manifest store related errors
#[derive(Debug, Error)]
pub enum ManifestStoreError {
    #[error("Manifest file not found at path: {0}")]
    ManifestFileNotFound(String),

    #[error("No manifest ({}) found in {} or any parent directory", MANIFEST_FILE_NAMES.join(", "), .0.display())]
    NoManifestFound(PathBuf),

    #[error("Manifest file write failed: {0}")]
    WriteFailed(String),

    #[error("Invalid manifest {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: ManifestServiceError,
    },
}

/// Locates, reads and writes manifest files.
#[derive(Debug, Clone, Default)]
pub struct ManifestStore {
    manifest_service: ManifestService,
}

impl ManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the nearest manifest at or above `start`.
    pub fn discover<P: AsRef<Path>>(start: P) -> Result<PathBuf, ManifestStoreError> {
        let start = start.as_ref();
        for dir in start.ancestors() {
            for name in MANIFEST_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }
        Err(ManifestStoreError::NoManifestFound(start.to_path_buf()))
    }

    /// Read and validate the manifest at `manifest_path`.
    pub async fn read_manifest<P: AsRef<Path>>(
        &self,
        manifest_path: P,
    ) -> Result<Manifest, ManifestStoreError> {
        let manifest_path = manifest_path.as_ref();

        if !manifest_path.is_file() {
            return Err(ManifestStoreError::ManifestFileNotFound(
                manifest_path.display().to_string(),
            ));
        }

        self.manifest_service
            .parse_from_file(manifest_path)
            .await
            .map_err(|source| ManifestStoreError::Invalid {
                path: manifest_path.to_path_buf(),
                source,
            })
    }

    /// Write `manifest` with every default explicit, in the format implied by
    /// the file extension.
    pub async fn write_manifest<P: AsRef<Path>>(
        &self,
        manifest_path: P,
        manifest: &Manifest,
    ) -> Result<(), ManifestStoreError> {
        let manifest_path = manifest_path.as_ref();
        let content = self
            .manifest_service
            .serialize(manifest, ManifestFormat::from_path(manifest_path))
            .map_err(|source| ManifestStoreError::Invalid {
                path: manifest_path.to_path_buf(),
                source,
            })?;

        if let Some(parent) = manifest_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                async_fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ManifestStoreError::WriteFailed(e.to_string()))?;
            }
        }

        async_fs::write(manifest_path, content)
            .await
            .map_err(|e| ManifestStoreError::WriteFailed(e.to_string()))
    }
}
