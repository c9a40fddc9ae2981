//! Test helper functions and utilities
//!
//! Helpers that drive the real git executable to build upstream repositories
//! and a workspace manifest pointing at them.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use crepo::domain::entities::workspace::{Workspace, WorkspaceConfig};
use crepo::infrastructure::filesystem::manifest_store::ManifestStore;

/// Whether a usable git executable is on the PATH.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Run git in `dir` with a fixed identity, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=crepo tests",
            "-c",
            "user.email=tests@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {} failed in {}: {}",
        args.join(" "),
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Create a repository whose HEAD points at `master` regardless of the
/// local `init.defaultBranch`.
pub fn init_repo(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/master"]);
}

/// Write `file` and commit it.
pub fn commit(dir: &Path, file: &str, content: &str) {
    std::fs::write(dir.join(file), content).unwrap();
    git(dir, &["add", file]);
    git(dir, &["commit", "-q", "-m", &format!("update {}", file)]);
}

/// Upstream repositories plus a manifest naming them.
///
/// Layout: `<temp>/upstream/<project>` holds one commit each, and
/// `<temp>/ws/manifest.yml` declares every project against a single
/// `origin` remote. Nothing is cloned until init runs.
pub struct GitWorkspace {
    pub temp: TempDir,
    pub upstream: PathBuf,
    pub root: PathBuf,
    pub manifest_path: PathBuf,
}

impl GitWorkspace {
    pub fn new(projects: &[&str]) -> Self {
        let temp = TempDir::new().unwrap();
        let upstream = temp.path().join("upstream");
        for project in projects {
            let dir = upstream.join(project);
            init_repo(&dir);
            commit(&dir, "README", project);
        }

        let root = temp.path().join("ws");
        std::fs::create_dir_all(&root).unwrap();

        let mut manifest = format!(
            "remotes:\n  origin:\n    fetch: \"{}/%s\"\nprojects:",
            upstream.display()
        );
        if projects.is_empty() {
            manifest.push_str(" {}");
        }
        manifest.push('\n');
        for project in projects {
            manifest.push_str(&format!("  {}: {{}}\n", project));
        }
        let manifest_path = root.join("manifest.yml");
        std::fs::write(&manifest_path, manifest).unwrap();

        Self {
            temp,
            upstream,
            root,
            manifest_path,
        }
    }

    pub async fn workspace(&self) -> Workspace {
        let manifest = ManifestStore::new()
            .read_manifest(&self.manifest_path)
            .await
            .unwrap();
        Workspace::new(self.root.clone(), self.manifest_path.clone(), manifest)
            .with_config(WorkspaceConfig::new().with_max_parallel(4))
    }

    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project)
    }
}
