use super::{SkipLog, SkipReason, SkippedRow};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::fields::{Field, Row};
use crate::model::{Dataset, Student};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub skipped_rows: Vec<SkippedRow>,
}

/// Month-year cohort label, e.g. `03-2024`.
fn is_intake_label(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 7
        && b[2] == b'-'
        && b[..2].iter().all(u8::is_ascii_digit)
        && b[3..].iter().all(u8::is_ascii_digit)
}

/// Creates students that do not exist yet and refreshes the identity fields
/// of those that do. Transcripts are never touched.
pub fn import_profiles(
    dataset: &mut Dataset,
    rows: &[Row],
    intake: Option<&str>,
    config: &EngineConfig,
) -> EngineResult<ProfileSummary> {
    if rows.is_empty() {
        return Err(EngineError::EmptyInput { what: "profile sheet" });
    }
    let intake = intake.map(str::trim).filter(|s| !s.is_empty());
    if let Some(label) = intake {
        if !is_intake_label(label) {
            return Err(EngineError::InvalidIntake(format!(
                "{} is not in mm-yyyy format",
                label
            )));
        }
    }

    let aliases = &config.aliases;
    let mut skips = SkipLog::default();
    let mut created = 0usize;
    let mut updated = 0usize;

    for (idx, row) in rows.iter().enumerate() {
        let Some(id) = aliases.pick_text(row, Field::Id) else {
            skips.skip(idx, SkipReason::MissingId);
            continue;
        };
        let name = aliases.pick_text(row, Field::Name);
        let ic = aliases.pick_text(row, Field::Ic);
        let row_intake = intake
            .map(str::to_string)
            .or_else(|| aliases.pick_text(row, Field::Intake));

        match dataset.students.get_mut(&id) {
            Some(existing) => {
                if let Some(v) = name {
                    existing.name = v;
                }
                if let Some(v) = ic {
                    existing.ic = v;
                }
                if let Some(v) = row_intake {
                    existing.intake = v;
                }
                updated += 1;
            }
            None => {
                let student = Student::new(
                    &id,
                    name.as_deref(),
                    ic.as_deref(),
                    row_intake.as_deref(),
                );
                dataset.students.insert(id.clone(), student);
                dataset.recent.insert(id);
                created += 1;
            }
        }
    }

    let skipped_rows = skips.into_rows();
    tracing::info!(created, updated, skipped = skipped_rows.len(), "student profiles imported");
    Ok(ProfileSummary {
        created,
        updated,
        skipped: skipped_rows.len(),
        skipped_rows,
    })
}
