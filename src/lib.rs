//! # crepo - Manifest-driven multi-repository git workspace
//!
//! `crepo` treats a set of git repositories, declared in one manifest, as a
//! single workspace. It clones them, keeps their remotes in line with the
//! manifest, checks out the branch each project tracks, and runs commands
//! across all of them, sequentially or in parallel.
//!
//! ## Manifest
//!
//! ```yaml
//! default-revision: master
//! default-remote: origin
//! remotes:
//!   origin:
//!     fetch: "git@github.com:example/%s.git"
//!   upstream:
//!     fetch: "https://git.example.org/%s"
//! projects:
//!   frontend: {}
//!   backend:
//!     refspec: release
//!     dir: services/backend
//!     remotes: [origin, upstream]
//!     from-remote: upstream
//! ```
//!
//! `%s` in a fetch template is replaced by the project name. Manifests ending
//! in `.json` are read as JSON, anything else as YAML.
//!
//! ## Quick Start
//!
//! ```bash
//! crepo init -p        # clone, set up remotes, fetch, check out
//! crepo status         # branch, divergence and dirtiness per project
//! crepo do-all -p fetch --prune
//! crepo do-all -x make test
//! ```
//!
//! ## Architecture
//!
//! - [`domain`]: manifest model and divergence classification
//! - [`application`]: use cases and the [`application::Orchestrator`]
//! - [`infrastructure`]: git driven through the executable, process
//!   execution, manifest files
//! - [`presentation`]: CLI interface and report rendering
//! - [`common`]: shared error handling
//!
//! ## Using the Library
//!
//! ```rust,no_run
//! use crepo::application::{Operation, Orchestrator};
//! use crepo::domain::entities::Workspace;
//! use crepo::infrastructure::{CommandExecutor, ManifestStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let manifest_path = ManifestStore::discover(".")?;
//! let manifest = ManifestStore::new().read_manifest(&manifest_path).await?;
//! let root = manifest_path.parent().unwrap().to_path_buf();
//! let workspace = Workspace::new(root, manifest_path, manifest);
//!
//! let orchestrator = Orchestrator::new(workspace, Arc::new(CommandExecutor::new()));
//! let report = orchestrator.run(Operation::Status).await?;
//! std::process::exit(report.exit_code());
//! # }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types for convenience
pub use crate::common::error::CrepoError;
pub use crate::common::result::CrepoResult as Result;
