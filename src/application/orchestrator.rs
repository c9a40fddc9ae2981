use crate::application::use_cases::check_dirty::{CheckDirtyUseCase, DirtyCheckResult};
use crate::application::use_cases::checkout_branches::{CheckoutBranchesUseCase, CheckoutReport};
use crate::application::use_cases::foreach_command::{
    CommandKind, ForeachCommandConfig, ForeachCommandUseCase, ForeachResult,
};
use crate::application::use_cases::init_workspace::{InitReport, InitWorkspaceUseCase};
use crate::application::use_cases::setup_remotes::{SetupRemotesReport, SetupRemotesUseCase};
use crate::application::use_cases::status_check::{StatusCheckUseCase, StatusReport};
use crate::application::use_cases::tracking_branches::{
    EnsureTrackingBranchesUseCase, TrackingBranchReport,
};
use crate::common::result::CrepoResult;
use crate::domain::entities::workspace::Workspace;
use crate::infrastructure::process::CommandRunner;
use std::sync::Arc;
use tracing::info;

/// Every workspace command the tool knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Init { parallel: bool },
    SetupRemotes,
    EnsureTrackingBranches,
    CheckDirty,
    Checkout { force: bool },
    HardReset { force: bool },
    DoAll {
        args: Vec<String>,
        kind: CommandKind,
        parallel: bool,
    },
    /// Like `DoAll`, once per remote with the remote name appended
    DoAllRemotes { args: Vec<String>, parallel: bool },
    Fetch { parallel: bool },
    Pull { parallel: bool },
    Status,
    /// Status plus the head revision of every repository
    DumpRefs,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::SetupRemotes => "setup-remotes",
            Self::EnsureTrackingBranches => "ensure-tracking-branches",
            Self::CheckDirty => "check-dirty",
            Self::Checkout { .. } => "checkout",
            Self::HardReset { .. } => "hard-reset",
            Self::DoAll { .. } => "do-all",
            Self::DoAllRemotes { .. } => "do-all-remotes",
            Self::Fetch { .. } => "fetch",
            Self::Pull { .. } => "pull",
            Self::Status => "status",
            Self::DumpRefs => "dump-refs",
        }
    }
}

#[derive(Debug)]
pub enum OperationReport {
    Init(InitReport),
    SetupRemotes(SetupRemotesReport),
    TrackingBranches(TrackingBranchReport),
    Dirty(DirtyCheckResult),
    Checkout(CheckoutReport),
    Foreach(ForeachResult),
    Status(StatusReport),
}

impl OperationReport {
    /// Process exit status for a completed operation.
    ///
    /// `check-dirty` answers a question, so it exits non-zero only when
    /// something is dirty, not when a project could not be queried.
    pub fn exit_code(&self) -> i32 {
        let ok = match self {
            Self::Init(_) | Self::Checkout(_) => true,
            Self::SetupRemotes(report) => report.is_success(),
            Self::TrackingBranches(report) => report.is_success(),
            Self::Dirty(result) => !result.any_dirty(),
            Self::Foreach(result) => result.is_success(),
            Self::Status(report) => !report.has_errors(),
        };
        if ok {
            0
        } else {
            1
        }
    }
}

/// Runs operations against one loaded workspace.
pub struct Orchestrator {
    workspace: Workspace,
    runner: Arc<dyn CommandRunner>,
}

impl Orchestrator {
    pub fn new(workspace: Workspace, runner: Arc<dyn CommandRunner>) -> Self {
        Self { workspace, runner }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub async fn run(&self, operation: Operation) -> CrepoResult<OperationReport> {
        info!(
            "Running {} over {} project(s) in {}",
            operation.name(),
            self.workspace.manifest.project_count(),
            self.workspace.root_path.display()
        );

        let runner = self.runner.clone();
        let workspace = &self.workspace;

        let report = match operation {
            Operation::Init { parallel } => OperationReport::Init(
                InitWorkspaceUseCase::new(runner)
                    .execute(workspace, parallel)
                    .await?,
            ),
            Operation::SetupRemotes => OperationReport::SetupRemotes(
                SetupRemotesUseCase::new(runner).execute(workspace).await,
            ),
            Operation::EnsureTrackingBranches => OperationReport::TrackingBranches(
                EnsureTrackingBranchesUseCase::new(runner)
                    .execute(workspace)
                    .await,
            ),
            Operation::CheckDirty => {
                OperationReport::Dirty(CheckDirtyUseCase::new(runner).execute(workspace).await)
            }
            Operation::Checkout { force } => OperationReport::Checkout(
                CheckoutBranchesUseCase::new(runner)
                    .checkout(workspace, force)
                    .await?,
            ),
            Operation::HardReset { force } => OperationReport::Checkout(
                CheckoutBranchesUseCase::new(runner)
                    .hard_reset(workspace, force)
                    .await?,
            ),
            Operation::DoAll {
                args,
                kind,
                parallel,
            } => {
                let config = ForeachCommandConfig::new(kind, args).with_parallel(parallel);
                self.foreach(config).await?
            }
            Operation::DoAllRemotes { args, parallel } => {
                let config = ForeachCommandConfig::git(args)
                    .with_parallel(parallel)
                    .with_per_remote(true);
                self.foreach(config).await?
            }
            Operation::Fetch { parallel } => {
                let config = ForeachCommandConfig::git(["fetch"])
                    .with_parallel(parallel)
                    .with_per_remote(true);
                self.foreach(config).await?
            }
            Operation::Pull { parallel } => {
                let config = ForeachCommandConfig::git(["pull"])
                    .with_parallel(parallel)
                    .with_per_remote(true);
                self.foreach(config).await?
            }
            Operation::Status => OperationReport::Status(
                StatusCheckUseCase::new(runner)
                    .execute(workspace, false)
                    .await,
            ),
            Operation::DumpRefs => OperationReport::Status(
                StatusCheckUseCase::new(runner)
                    .execute(workspace, true)
                    .await,
            ),
        };

        Ok(report)
    }

    async fn foreach(&self, config: ForeachCommandConfig) -> CrepoResult<OperationReport> {
        let result = ForeachCommandUseCase::new(config, self.runner.clone())
            .execute(&self.workspace)
            .await?;
        Ok(OperationReport::Foreach(result))
    }
}
