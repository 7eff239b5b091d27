//! Row reconciliation: turning spreadsheet rows into student records.

mod append;
mod import;
mod profiles;
pub mod semester;

pub use append::{append_results, AppendCourse, AppendSummary};
pub use import::{import_history, ImportSummary};
pub use profiles::{import_profiles, ProfileSummary};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingId,
    MissingMark,
    UnmatchedStudent,
    AmbiguousStudent,
}

/// A row left out of a batch, by zero-based input index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub(crate) struct SkipLog {
    rows: Vec<SkippedRow>,
}

impl SkipLog {
    pub(crate) fn skip(&mut self, row: usize, reason: SkipReason) {
        tracing::debug!(row, ?reason, "row skipped");
        self.rows.push(SkippedRow { row, reason });
    }

    pub(crate) fn into_rows(self) -> Vec<SkippedRow> {
        self.rows
    }
}
