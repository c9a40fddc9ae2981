use crate::domain::value_objects::named_entries::NamedEntries;
use serde::{Deserialize, Serialize};

/// Branch tracked by projects that do not name one.
pub const DEFAULT_REVISION: &str = "master";

/// Remote used to disambiguate projects with several remotes.
pub const DEFAULT_REMOTE: &str = "origin";

/// Substitution slot in a remote's fetch template.
pub const PROJECT_PLACEHOLDER: &str = "%s";

/// A named upstream location shared by projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    name: String,
    fetch: String,
}

impl Remote {
    pub fn new(name: impl Into<String>, fetch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fetch: fetch.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The URL template as written in the manifest.
    pub fn fetch(&self) -> &str {
        &self.fetch
    }

    /// Concrete clone/fetch URL for `project`.
    ///
    /// ```
    /// use crepo::domain::entities::manifest::Remote;
    ///
    /// let remote = Remote::new("origin", "git@example.com:team/%s.git");
    /// assert_eq!(remote.url_for("core"), "git@example.com:team/core.git");
    /// ```
    pub fn url_for(&self, project: &str) -> String {
        self.fetch.replacen(PROJECT_PLACEHOLDER, project, 1)
    }
}

/// One managed repository with every default already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    name: String,
    directory: String,
    refspec: String,
    remote_names: Vec<String>,
    primary_remote: String,
}

impl Project {
    pub(crate) fn new(
        name: String,
        directory: String,
        refspec: String,
        remote_names: Vec<String>,
        primary_remote: String,
    ) -> Self {
        Self {
            name,
            directory,
            refspec,
            remote_names,
            primary_remote,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Workspace-relative directory of the checkout.
    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn refspec(&self) -> &str {
        &self.refspec
    }

    /// Remotes in declaration order, without duplicates.
    pub fn remote_names(&self) -> &[String] {
        &self.remote_names
    }

    /// Remote used for the initial clone and as upstream of the tracking branch.
    pub fn primary_remote(&self) -> &str {
        &self.primary_remote
    }

    /// Local branch the project is expected to keep checked out.
    pub fn tracking_branch(&self) -> &str {
        &self.refspec
    }

    /// Fully qualified remote reference, e.g. `origin/master`.
    pub fn remote_tracking_ref(&self) -> String {
        format!("{}/{}", self.primary_remote, self.refspec)
    }
}

/// The validated, immutable description of a workspace.
///
/// Built by `ManifestService`; there is no way to mutate a manifest once it
/// has been loaded.
#[derive(Debug, Clone)]
pub struct Manifest {
    remotes: NamedEntries<Remote>,
    projects: NamedEntries<Project>,
    default_refspec: String,
    default_remote_name: String,
}

impl Manifest {
    pub(crate) fn from_parts(
        remotes: NamedEntries<Remote>,
        projects: NamedEntries<Project>,
        default_refspec: String,
        default_remote_name: String,
    ) -> Self {
        Self {
            remotes,
            projects,
            default_refspec,
            default_remote_name,
        }
    }

    pub fn default_refspec(&self) -> &str {
        &self.default_refspec
    }

    pub fn default_remote_name(&self) -> &str {
        &self.default_remote_name
    }

    pub fn remote(&self, name: &str) -> Option<&Remote> {
        self.remotes.get(name)
    }

    pub fn remotes(&self) -> impl Iterator<Item = &Remote> {
        self.remotes.iter().map(|(_, remote)| remote)
    }

    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    /// Projects in declaration order.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter().map(|(_, project)| project)
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// URL the project is cloned from.
    pub fn clone_url(&self, project: &Project) -> Option<String> {
        self.remote(project.primary_remote())
            .map(|remote| remote.url_for(project.name()))
    }

    /// `(remote name, url)` for every remote declared by the project.
    pub fn remote_urls<'a>(&'a self, project: &'a Project) -> Vec<(&'a str, String)> {
        project
            .remote_names()
            .iter()
            .filter_map(|name| {
                self.remote(name)
                    .map(|remote| (remote.name(), remote.url_for(project.name())))
            })
            .collect()
    }

    /// Re-emit the manifest with every derived default written out.
    pub fn to_persistable(&self) -> ManifestDocument {
        ManifestDocument {
            default_revision: Some(self.default_refspec.clone()),
            default_remote: Some(self.default_remote_name.clone()),
            remotes: self
                .remotes()
                .map(|remote| {
                    (
                        remote.name().to_string(),
                        RemoteDocument {
                            fetch: remote.fetch().to_string(),
                        },
                    )
                })
                .collect(),
            projects: self
                .projects()
                .map(|project| {
                    (
                        project.name().to_string(),
                        ProjectDocument {
                            refspec: Some(project.refspec().to_string()),
                            dir: Some(project.directory().to_string()),
                            remotes: Some(project.remote_names().to_vec()),
                            from_remote: Some(project.primary_remote().to_string()),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Equality ignores the order of remotes and projects.
impl PartialEq for Manifest {
    fn eq(&self, other: &Self) -> bool {
        self.default_refspec == other.default_refspec
            && self.default_remote_name == other.default_remote_name
            && self.remotes.len() == other.remotes.len()
            && self.projects.len() == other.projects.len()
            && self
                .remotes()
                .all(|remote| other.remote(remote.name()) == Some(remote))
            && self
                .projects()
                .all(|project| other.project(project.name()) == Some(project))
    }
}

impl Eq for Manifest {}

/// Manifest as written on disk, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(
        rename = "default-revision",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default_revision: Option<String>,

    #[serde(
        rename = "default-remote",
        alias = "default_remote",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default_remote: Option<String>,

    #[serde(default)]
    pub remotes: NamedEntries<RemoteDocument>,

    #[serde(default)]
    pub projects: NamedEntries<ProjectDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub fetch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refspec: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remotes: Option<Vec<String>>,

    #[serde(
        rename = "from-remote",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub from_remote: Option<String>,
}
