use colored::{ColoredString, Colorize};

use crate::application::use_cases::check_dirty::DirtyCheckResult;
use crate::application::use_cases::status_check::StatusReport;

/// Print a status or dump-refs report.
pub fn print_status(report: &StatusReport) {
    for line in report.render_lines() {
        println!("{}", paint_status_line(&line));
    }
}

/// Print the check-dirty verdict, one line per finding.
pub fn print_dirty(result: &DirtyCheckResult) {
    let lines = result.render_lines();
    if lines.is_empty() {
        println!("{} All projects are clean.", "✓".green().bold());
        return;
    }
    for line in lines {
        if line.contains("could not determine") {
            println!("{}", line.red());
        } else {
            println!("{}", line.yellow());
        }
    }
}

fn paint_status_line(line: &str) -> ColoredString {
    if !line.starts_with(' ') {
        line.bold()
    } else if line.starts_with("  error:") {
        line.red()
    } else if line.contains("are clean") || line.contains("up to date") {
        line.green()
    } else if line.contains("changes") || line.contains("ahead") || line.contains("diverged") {
        line.yellow()
    } else if line.contains("expected tracking branch") {
        line.cyan()
    } else {
        line.normal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_keeps_text() {
        colored::control::set_override(false);
        for line in [
            "Project a:",
            "  error: boom",
            "  up to date: master matches origin/master",
            "  Index has staged changes.",
        ] {
            assert_eq!(paint_status_line(line).to_string(), line);
        }
    }
}
