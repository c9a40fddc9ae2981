use serde::Serialize;
use std::fmt;

/// How a local branch relates to the remote reference it tracks.
///
/// The four cases are mutually exclusive and derive only from the
/// ahead/behind counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "state")]
pub enum Divergence {
    UpToDate,
    RemoteAhead { behind: usize },
    LocalAhead { ahead: usize },
    Diverged { ahead: usize, behind: usize },
}

impl Divergence {
    /// Classify `(ahead, behind)` where `ahead` counts commits only on the
    /// local side and `behind` counts commits only on the remote side.
    pub fn from_counts(ahead: usize, behind: usize) -> Self {
        match (ahead, behind) {
            (0, 0) => Self::UpToDate,
            (0, behind) => Self::RemoteAhead { behind },
            (ahead, 0) => Self::LocalAhead { ahead },
            (ahead, behind) => Self::Diverged { ahead, behind },
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Self::UpToDate)
    }

    /// Human readable line naming both references.
    pub fn describe(&self, local: &str, remote: &str) -> String {
        match *self {
            Self::UpToDate => format!("up to date: {} matches {}", local, remote),
            Self::RemoteAhead { behind } => format!(
                "remote ahead by {}: {} has {} {} not in {}",
                behind,
                remote,
                behind,
                commits(behind),
                local
            ),
            Self::LocalAhead { ahead } => format!(
                "local ahead by {}: {} has {} {} not in {}",
                ahead,
                local,
                ahead,
                commits(ahead),
                remote
            ),
            Self::Diverged { ahead, behind } => format!(
                "diverged by {}/{}: {} and {} have {} and {} distinct {}",
                ahead,
                behind,
                local,
                remote,
                ahead,
                behind,
                commits(ahead.max(behind))
            ),
        }
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UpToDate => write!(f, "up to date"),
            Self::RemoteAhead { behind } => write!(f, "remote ahead by {}", behind),
            Self::LocalAhead { ahead } => write!(f, "local ahead by {}", ahead),
            Self::Diverged { ahead, behind } => write!(f, "diverged by {}/{}", ahead, behind),
        }
    }
}

fn commits(count: usize) -> &'static str {
    if count == 1 {
        "commit"
    } else {
        "commits"
    }
}
