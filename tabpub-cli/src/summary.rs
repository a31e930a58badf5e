//! End-of-run summary printed to the terminal.

use colored::Colorize;
use tabpub_publish::{ItemOutcome, RunOutcome};

pub fn summary_lines(outcome: &RunOutcome) -> Vec<String> {
    let RunOutcome::Completed { report, delivered } = outcome else {
        return vec!["No file changes detected.".dimmed().to_string()];
    };

    let mut lines: Vec<String> = report.items().iter().map(item_line).collect();
    lines.push(format!(
        "{} published, {} failed, {} skipped",
        report.published(),
        report.failed(),
        report.skipped()
    ));
    if !report.is_empty() && !delivered {
        lines.push(format!(
            "{} report was not posted to the pull request",
            "warning:".yellow().bold()
        ));
    }
    lines
}

fn item_line(item: &ItemOutcome) -> String {
    match item {
        ItemOutcome::Published {
            display_name,
            destination_path,
            url,
        } => {
            let mut line = format!(
                "{} {display_name} -> {destination_path}",
                "published".green().bold()
            );
            if let Some(url) = url {
                line.push_str(&format!(" ({url})"));
            }
            line
        }
        ItemOutcome::Failed {
            display_name,
            destination_path,
            cause,
        } => format!(
            "{} {display_name} -> {destination_path}: {cause}",
            "failed".red().bold()
        ),
        ItemOutcome::Skipped { file_name } => {
            format!("{} {file_name} (not in config)", "skipped".bright_black())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabpub_publish::{DestinationResolutionError, OutcomeReport};

    #[test]
    fn completed_run_lists_items_then_totals() {
        colored::control::set_override(false);
        let mut report = OutcomeReport::new();
        report.push(ItemOutcome::Published {
            display_name: "A".into(),
            destination_path: "Sales".into(),
            url: None,
        });
        report.push(ItemOutcome::Failed {
            display_name: "B".into(),
            destination_path: "Ops".into(),
            cause: DestinationResolutionError::NotFound { query: "Ops".into() }.into(),
        });
        let lines = summary_lines(&RunOutcome::Completed {
            report,
            delivered: false,
        });
        assert_eq!(lines[0], "published A -> Sales");
        assert_eq!(lines[1], "failed B -> Ops: no destination matches `Ops`");
        assert_eq!(lines[2], "1 published, 1 failed, 0 skipped");
        assert!(lines[3].contains("not posted"));
    }

    #[test]
    fn no_changes_is_one_line() {
        colored::control::set_override(false);
        assert_eq!(summary_lines(&RunOutcome::NoChanges), ["No file changes detected."]);
    }
}
