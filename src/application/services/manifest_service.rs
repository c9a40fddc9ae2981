use crate::domain::entities::manifest::{
    Manifest, ManifestDocument, Project, Remote, DEFAULT_REMOTE, DEFAULT_REVISION,
};
use crate::domain::value_objects::named_entries::NamedEntries;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised while turning a manifest document into a [`Manifest`].
#[derive(Debug, Error)]
pub enum ManifestServiceError {
    #[error("default remote '{0}' is not declared under remotes")]
    UnknownDefaultRemote(String),

    #[error("project '{project}' declares no remotes")]
    NoRemotes { project: String },

    #[error("project '{project}' references undeclared remote '{remote}'")]
    UnknownRemote { project: String, remote: String },

    #[error(
        "project '{project}' has several remotes and none is the default remote \
         '{default_remote}'; set from-remote"
    )]
    AmbiguousPrimaryRemote {
        project: String,
        default_remote: String,
    },

    #[error("project '{project}' pulls from '{remote}', which is not one of its remotes")]
    PrimaryRemoteNotDeclared { project: String, remote: String },

    #[error("projects '{first}' and '{second}' share the directory '{directory}'")]
    SharedDirectory {
        first: String,
        second: String,
        directory: String,
    },

    #[error("Invalid YAML format: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid JSON format: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// On-disk encodings of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Yaml,
}

impl ManifestFormat {
    /// `.json` files are JSON, anything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Parses, validates and re-serializes manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestService;

impl ManifestService {
    pub fn new() -> Self {
        Self
    }

    /// Read and validate a manifest file.
    pub async fn parse_from_file(&self, path: &Path) -> Result<Manifest, ManifestServiceError> {
        let content = tokio::fs::read_to_string(path).await?;
        self.parse_from_str(&content, ManifestFormat::from_path(path))
    }

    pub fn parse_from_str(
        &self,
        content: &str,
        format: ManifestFormat,
    ) -> Result<Manifest, ManifestServiceError> {
        let document = self.parse_document(content, format)?;
        self.load_document(&document)
    }

    /// Decode without validating. Duplicate keys are rejected here.
    pub fn parse_document(
        &self,
        content: &str,
        format: ManifestFormat,
    ) -> Result<ManifestDocument, ManifestServiceError> {
        let document = match format {
            ManifestFormat::Json => serde_json::from_str(content)?,
            ManifestFormat::Yaml => serde_yaml::from_str(content)?,
        };
        Ok(document)
    }

    /// Validate a decoded document and resolve every default.
    pub fn load_document(
        &self,
        document: &ManifestDocument,
    ) -> Result<Manifest, ManifestServiceError> {
        let default_refspec = document
            .default_revision
            .clone()
            .unwrap_or_else(|| DEFAULT_REVISION.to_string());
        let default_remote = document
            .default_remote
            .clone()
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());

        let remotes: NamedEntries<Remote> = document
            .remotes
            .iter()
            .map(|(name, remote)| (name.to_string(), Remote::new(name, remote.fetch.as_str())))
            .collect();

        if !remotes.contains(&default_remote) {
            return Err(ManifestServiceError::UnknownDefaultRemote(default_remote));
        }

        let mut directories: HashMap<String, String> = HashMap::new();
        let mut projects = NamedEntries::new();

        for (name, spec) in document.projects.iter() {
            let mut remote_names: Vec<String> = Vec::new();
            match &spec.remotes {
                Some(declared) => {
                    for remote in declared {
                        if !remote_names.contains(remote) {
                            remote_names.push(remote.clone());
                        }
                    }
                }
                None => remote_names.push(default_remote.clone()),
            }

            if remote_names.is_empty() {
                return Err(ManifestServiceError::NoRemotes {
                    project: name.to_string(),
                });
            }
            if let Some(unknown) = remote_names.iter().find(|r| !remotes.contains(r)) {
                return Err(ManifestServiceError::UnknownRemote {
                    project: name.to_string(),
                    remote: unknown.clone(),
                });
            }

            let primary_remote = resolve_primary_remote(
                name,
                spec.from_remote.as_deref(),
                &remote_names,
                &default_remote,
            )?;

            let directory = spec.dir.clone().unwrap_or_else(|| name.to_string());
            let key = normalize_directory(&directory);
            if let Some(first) = directories.insert(key, name.to_string()) {
                return Err(ManifestServiceError::SharedDirectory {
                    first,
                    second: name.to_string(),
                    directory,
                });
            }

            let refspec = spec
                .refspec
                .clone()
                .unwrap_or_else(|| default_refspec.clone());

            projects.insert(
                name,
                Project::new(
                    name.to_string(),
                    directory,
                    refspec,
                    remote_names,
                    primary_remote,
                ),
            );
        }

        Ok(Manifest::from_parts(
            remotes,
            projects,
            default_refspec,
            default_remote,
        ))
    }

    pub fn serialize(
        &self,
        manifest: &Manifest,
        format: ManifestFormat,
    ) -> Result<String, ManifestServiceError> {
        let document = manifest.to_persistable();
        let content = match format {
            ManifestFormat::Json => serde_json::to_string_pretty(&document)?,
            ManifestFormat::Yaml => serde_yaml::to_string(&document)?,
        };
        Ok(content)
    }
}

/// Explicit `from-remote`, else the only remote, else the default remote.
fn resolve_primary_remote(
    project: &str,
    explicit: Option<&str>,
    remote_names: &[String],
    default_remote: &str,
) -> Result<String, ManifestServiceError> {
    if let Some(explicit) = explicit {
        if remote_names.iter().any(|r| r == explicit) {
            return Ok(explicit.to_string());
        }
        return Err(ManifestServiceError::PrimaryRemoteNotDeclared {
            project: project.to_string(),
            remote: explicit.to_string(),
        });
    }

    match remote_names {
        [only] => Ok(only.clone()),
        _ if remote_names.iter().any(|r| r == default_remote) => Ok(default_remote.to_string()),
        _ => Err(ManifestServiceError::AmbiguousPrimaryRemote {
            project: project.to_string(),
            default_remote: default_remote.to_string(),
        }),
    }
}

fn normalize_directory(directory: &str) -> String {
    directory
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}
