use colored::Colorize;

use crate::application::use_cases::foreach_command::{CommandResult, ForeachResult};

/// Print a do-all style result.
///
/// Sequential runs already streamed their output; parallel runs captured
/// it, so it is replayed here in manifest order.
pub fn print_foreach(result: &ForeachResult, verbose: bool) {
    if result.was_parallel {
        for command_result in &result.results {
            print_captured(command_result);
        }
    }

    let failed_results = result.failed_results();
    if failed_results.is_empty() {
        println!(
            "{} Command completed in {} invocation(s)",
            "✓".green().bold(),
            result.success_count
        );
    } else {
        println!("{} Some commands failed:", "⚠".yellow().bold());
        for failed in failed_results {
            println!(
                "  {}: {}",
                label(failed).bold(),
                failed
                    .error_message
                    .as_deref()
                    .unwrap_or("unknown error")
                    .red()
            );
        }
    }

    if verbose {
        println!("  Successful executions: {}", result.success_count);
        println!("  Failed executions: {}", result.failure_count);
        println!("  Total time: {} ms", result.total_execution_time_ms);
    }
}

fn print_captured(command_result: &CommandResult) {
    println!("{} {}", "::".blue().bold(), label(command_result).bold());
    if let Some(stdout) = command_result.stdout.as_deref().filter(|s| !s.is_empty()) {
        print!("{}", stdout);
        if !stdout.ends_with('\n') {
            println!();
        }
    }
    if let Some(stderr) = command_result.stderr.as_deref().filter(|s| !s.is_empty()) {
        eprint!("{}", stderr);
        if !stderr.ends_with('\n') {
            eprintln!();
        }
    }
}

fn label(command_result: &CommandResult) -> String {
    match &command_result.remote {
        Some(remote) => format!("{} ({})", command_result.project, remote),
        None => command_result.project.clone(),
    }
}
