use clap::Parser;
use colored::Colorize;

use crepo::presentation::cli::{init_logging, Cli, CliApp};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match CliApp::from_cli(cli).run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            1
        }
    };
    std::process::exit(code);
}
