pub mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::application::orchestrator::{Operation, OperationReport, Orchestrator};
use crate::application::use_cases::foreach_command::CommandKind;
use crate::domain::entities::workspace::{Workspace, WorkspaceConfig, DEFAULT_GIT_EXECUTABLE};
use crate::infrastructure::filesystem::manifest_store::ManifestStore;
use crate::infrastructure::git::RemoteChange;
use crate::infrastructure::process::CommandExecutor;
use commands::{print_dirty, print_foreach, print_status, DumpManifestCommand, OutputFormat};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    " ",
    env!("BUILD_DATE"),
    ")"
);

/// crepo - Operate on a manifest of git repositories as one workspace
#[derive(Parser, Debug)]
#[command(name = "crepo")]
#[command(about = "Operate on a manifest of git repositories as one workspace")]
#[command(version = VERSION)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Working directory (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Manifest file (searched upward from the working directory by default)
    #[arg(short, long, global = true, env = "CREPO_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Maximum number of concurrent projects in parallel mode
    #[arg(short, long, global = true, env = "CREPO_JOBS")]
    pub jobs: Option<usize>,

    /// Git executable to run
    #[arg(long, global = true, env = "CREPO_GIT", default_value = DEFAULT_GIT_EXECUTABLE)]
    pub git: String,

    /// Kill any single git or do-all invocation after this many seconds
    #[arg(long, global = true, env = "CREPO_TIMEOUT")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clone every project, set up remotes, fetch and check out tracking branches
    Init {
        /// Clone all projects at once
        #[arg(short, long)]
        parallel: bool,
    },

    /// Check out the tracking branch of every project
    Checkout {
        /// Proceed even if some projects have uncommitted changes
        #[arg(short, long)]
        force: bool,
    },

    /// Check out tracking branches and reset them to their remote references
    HardReset {
        /// Proceed even if some projects have uncommitted changes
        #[arg(short, long)]
        force: bool,
    },

    /// Run a git subcommand (or, with -x, any program) in every project
    DoAll {
        /// Run in every project at once
        #[arg(short, long)]
        parallel: bool,

        /// Treat the arguments as a program instead of a git subcommand
        #[arg(short = 'x', long)]
        exec: bool,

        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Run a git subcommand once per remote of every project, remote name appended
    DoAllRemotes {
        /// Run in every project at once
        #[arg(short, long)]
        parallel: bool,

        /// Git subcommand and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Fetch every remote of every project
    Fetch {
        #[arg(short, long)]
        parallel: bool,
    },

    /// Pull from every remote of every project
    Pull {
        #[arg(short, long)]
        parallel: bool,
    },

    /// Show branch, divergence and dirtiness of every project
    Status,

    /// Exit non-zero if any project has uncommitted changes
    CheckDirty,

    /// Point every project's remotes at the URLs from the manifest
    SetupRemotes,

    /// Create missing tracking branches
    EnsureTrackingBranches,

    /// Show head revisions together with status
    DumpRefs,

    /// Print the manifest with every default written out
    DumpManifest {
        /// Output format (defaults to the manifest's own format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file path (if not specified, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    /// The workspace operation behind this command; `None` for commands that
    /// only read the manifest.
    pub fn operation(&self) -> Option<Operation> {
        let operation = match self {
            Commands::Init { parallel } => Operation::Init {
                parallel: *parallel,
            },
            Commands::Checkout { force } => Operation::Checkout { force: *force },
            Commands::HardReset { force } => Operation::HardReset { force: *force },
            Commands::DoAll {
                parallel,
                exec,
                command,
            } => Operation::DoAll {
                args: command.clone(),
                kind: if *exec {
                    CommandKind::Program
                } else {
                    CommandKind::Git
                },
                parallel: *parallel,
            },
            Commands::DoAllRemotes { parallel, command } => Operation::DoAllRemotes {
                args: command.clone(),
                parallel: *parallel,
            },
            Commands::Fetch { parallel } => Operation::Fetch {
                parallel: *parallel,
            },
            Commands::Pull { parallel } => Operation::Pull {
                parallel: *parallel,
            },
            Commands::Status => Operation::Status,
            Commands::CheckDirty => Operation::CheckDirty,
            Commands::SetupRemotes => Operation::SetupRemotes,
            Commands::EnsureTrackingBranches => Operation::EnsureTrackingBranches,
            Commands::DumpRefs => Operation::DumpRefs,
            Commands::DumpManifest { .. } => return None,
        };
        Some(operation)
    }
}

/// Install the stderr log subscriber. `RUST_LOG` overrides `--verbose`.
pub fn init_logging(verbose: bool) {
    let default_directive = if verbose { "crepo=debug" } else { "crepo=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
}

impl CliApp {
    pub fn new() -> Self {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the selected command and return the process exit status.
    pub async fn run(self) -> Result<i32> {
        colored::control::set_override(!self.cli.no_color);

        if let Some(ref dir) = self.cli.directory {
            env::set_current_dir(dir)
                .with_context(|| format!("Cannot change directory to {}", dir.display()))?;
        }

        let workspace = self.load_workspace().await?;

        let operation = match self.cli.command.operation() {
            Some(operation) => operation,
            None => return self.handle_dump_manifest_command(&workspace).await,
        };

        let runner = Arc::new(CommandExecutor::new());
        let report = Orchestrator::new(workspace, runner).run(operation).await?;
        self.print_report(&report);
        Ok(report.exit_code())
    }

    async fn handle_dump_manifest_command(&self, workspace: &Workspace) -> Result<i32> {
        if let Commands::DumpManifest { format, output } = &self.cli.command {
            DumpManifestCommand::new(*format, output.clone(), self.cli.verbose)
                .execute(&workspace.manifest, &workspace.manifest_path)
                .await?;
        }
        Ok(0)
    }

    /// Load the manifest and build the workspace around it. Project
    /// directories resolve against the manifest's directory.
    async fn load_workspace(&self) -> Result<Workspace> {
        let current_dir = env::current_dir()?;

        let manifest_path = match &self.cli.manifest {
            Some(path) => current_dir.join(path),
            None => ManifestStore::discover(&current_dir)?,
        };

        let manifest = ManifestStore::new().read_manifest(&manifest_path).await?;

        let root = manifest_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or(current_dir);

        let mut config = WorkspaceConfig::new()
            .with_git_executable(self.cli.git.as_str())
            .with_command_timeout(self.cli.timeout);
        if let Some(jobs) = self.cli.jobs {
            config = config.with_max_parallel(jobs);
        }

        Ok(Workspace::new(root, manifest_path, manifest).with_config(config))
    }

    fn print_report(&self, report: &OperationReport) {
        match report {
            OperationReport::Init(init) => {
                let cloned = init.cloned();
                let present = init.already_present();
                println!(
                    "{} Workspace initialized: {} cloned, {} already present",
                    "✓".green().bold(),
                    cloned.len(),
                    present.len()
                );
                if self.cli.verbose {
                    for project in cloned {
                        println!("  cloned {}", project);
                    }
                }
            }
            OperationReport::SetupRemotes(remotes) => {
                for outcome in &remotes.outcomes {
                    match &outcome.outcome {
                        Ok(changes) => {
                            for (remote, change) in changes {
                                match change {
                                    RemoteChange::Added => println!(
                                        "  {}: added remote {}",
                                        outcome.project.bold(),
                                        remote
                                    ),
                                    RemoteChange::Updated { previous_url } => println!(
                                        "  {}: remote {} updated (was {})",
                                        outcome.project.bold(),
                                        remote,
                                        previous_url
                                    ),
                                    RemoteChange::Unchanged => {}
                                }
                            }
                        }
                        Err(e) => println!("  {}: {}", outcome.project.bold(), e.to_string().red()),
                    }
                }
                if remotes.is_success() {
                    println!("{} Remotes are set up", "✓".green().bold());
                }
            }
            OperationReport::TrackingBranches(tracking) => {
                for project in tracking.created() {
                    println!("  {}: created tracking branch", project.bold());
                }
                for outcome in tracking.outcomes.iter().filter(|o| !o.is_ok()) {
                    if let Err(e) = &outcome.outcome {
                        println!("  {}: {}", outcome.project.bold(), e.to_string().red());
                    }
                }
                if tracking.is_success() {
                    println!("{} Tracking branches are in place", "✓".green().bold());
                }
            }
            OperationReport::Dirty(result) => print_dirty(result),
            OperationReport::Checkout(checkout) => {
                if checkout.forced {
                    for line in checkout.dirty.render_lines() {
                        println!("{}", line.yellow());
                    }
                }
                println!(
                    "{} Checked out tracking branch in {} project(s)",
                    "✓".green().bold(),
                    checkout.checked_out.len()
                );
                if !checkout.reset.is_empty() {
                    println!(
                        "{} Hard reset {} project(s) to their remote references",
                        "✓".green().bold(),
                        checkout.reset.len()
                    );
                }
            }
            OperationReport::Foreach(result) => print_foreach(result, self.cli.verbose),
            OperationReport::Status(status) => print_status(status),
        }
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_do_all_keeps_hyphenated_arguments() {
        let cli = Cli::try_parse_from(["crepo", "do-all", "-p", "log", "-1", "--oneline"]).unwrap();
        assert_eq!(
            cli.command.operation(),
            Some(Operation::DoAll {
                args: vec!["log".to_string(), "-1".to_string(), "--oneline".to_string()],
                kind: CommandKind::Git,
                parallel: true,
            })
        );
    }

    #[test]
    fn test_exec_runs_a_program() {
        let cli = Cli::try_parse_from(["crepo", "do-all", "-x", "echo", "hi"]).unwrap();
        assert!(matches!(
            cli.command.operation(),
            Some(Operation::DoAll {
                kind: CommandKind::Program,
                parallel: false,
                ..
            })
        ));
    }

    #[test]
    fn test_fetch_and_dump_manifest() {
        let cli = Cli::try_parse_from(["crepo", "fetch", "-p"]).unwrap();
        assert_eq!(cli.command.operation(), Some(Operation::Fetch { parallel: true }));

        let cli = Cli::try_parse_from(["crepo", "dump-manifest", "--format", "json"]).unwrap();
        assert!(cli.command.operation().is_none());
    }

    #[test]
    fn test_do_all_requires_a_command() {
        assert!(Cli::try_parse_from(["crepo", "do-all"]).is_err());
    }
}
