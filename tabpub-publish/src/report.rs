//! Per-workbook outcomes and the report delivered at the end of a run.
//!
//! Report lines are user-facing: they carry the workbook name and destination
//! only. Error details stay in the operator log.

use tabpub_core::WorkbookFile;

use crate::error::{PublishFailure, ReportDeliveryError};

/// Marker appended to a published line.
pub const PUBLISHED_MARKER: &str = ":heavy_check_mark:";
/// Marker appended to a failed line.
pub const FAILED_MARKER: &str = ":x:";
/// Marker appended to a skipped line.
pub const SKIPPED_MARKER: &str = ":information_source:";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Terminal state of one candidate.
#[derive(Debug)]
pub enum ItemOutcome {
    /// The file is not declared in any fragment.
    Skipped { file_name: WorkbookFile },
    Published {
        display_name: String,
        destination_path: String,
        url: Option<String>,
    },
    Failed {
        display_name: String,
        destination_path: String,
        cause: PublishFailure,
    },
}

impl ItemOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ItemOutcome::Failed { .. })
    }

    /// The line this outcome contributes to the report.
    pub fn line(&self) -> String {
        match self {
            ItemOutcome::Skipped { file_name } => format!(
                "Workbook file : {file_name} skipped, not listed in config files {SKIPPED_MARKER}"
            ),
            ItemOutcome::Published {
                display_name,
                destination_path,
                ..
            } => format!(
                "Workbook : {display_name} published to {destination_path} {PUBLISHED_MARKER}"
            ),
            ItemOutcome::Failed { display_name, .. } => {
                format!("Workbook : {display_name} not published to Tableau {FAILED_MARKER}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Ordered outcomes of a run plus the overall verdict.
#[derive(Debug)]
pub struct OutcomeReport {
    items: Vec<ItemOutcome>,
    success: bool,
}

impl Default for OutcomeReport {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeReport {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            success: true,
        }
    }

    pub fn push(&mut self, outcome: ItemOutcome) {
        if outcome.is_failure() {
            self.success = false;
        }
        self.items.push(outcome);
    }

    /// `true` unless some item failed.
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn items(&self) -> &[ItemOutcome] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn published(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Published { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(ItemOutcome::is_failure)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|o| pred(*o)).count()
    }

    /// One line per item, in processing order.
    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(ItemOutcome::line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Destination for the rendered report (a PR comment, a chat message, ...).
pub trait ReportSink {
    fn publish(&mut self, report_text: &str) -> Result<(), ReportDeliveryError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
