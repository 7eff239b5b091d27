use super::semester::{build_course, grade_for, resolve_semester, CourseOverrides, SemesterKey};
use super::{SkipLog, SkipReason, SkippedRow};
use crate::calc::recalculate;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::fields::{Field, Row};
use crate::model::{CatalogEntry, Dataset, Student};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub processed_rows: usize,
    pub skipped: usize,
    pub skipped_rows: Vec<SkippedRow>,
}

/// Destructive full reload: rebuilds every student and the catalog from
/// `rows` alone, then replaces the dataset's student set and catalog. The
/// active session survives.
pub fn import_history(
    dataset: &mut Dataset,
    rows: &[Row],
    config: &EngineConfig,
) -> EngineResult<ImportSummary> {
    if rows.is_empty() {
        return Err(EngineError::EmptyInput { what: "worksheet" });
    }
    let aliases = &config.aliases;
    let scale = &config.grade_scale;

    let mut grouped: BTreeMap<String, Student> = BTreeMap::new();
    let mut catalog: BTreeMap<String, CatalogEntry> = BTreeMap::new();
    let mut skips = SkipLog::default();
    let mut processed_rows = 0usize;

    for (idx, row) in rows.iter().enumerate() {
        processed_rows += 1;
        let Some(id) = aliases.pick_text(row, Field::Id) else {
            skips.skip(idx, SkipReason::MissingId);
            continue;
        };

        let student = grouped.entry(id.clone()).or_insert_with(|| {
            Student::new(
                &id,
                aliases.pick_text(row, Field::Name).as_deref(),
                aliases.pick_text(row, Field::Ic).as_deref(),
                aliases.pick_text(row, Field::Intake).as_deref(),
            )
        });

        let number = aliases
            .pick(row, Field::Semester)
            .and_then(|v| v.to_int())
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n >= 1)
            .unwrap_or(1);
        let label = aliases.pick_text(row, Field::Session).unwrap_or_default();
        let semester = resolve_semester(student, SemesterKey::Number { number, label: &label });

        let code = aliases
            .pick_text(row, Field::CourseCode)
            .unwrap_or_else(|| format!("CRS-{}", semester.courses.len() + 1));
        let credits = aliases.pick_f64(row, Field::Credits).unwrap_or(0.0);
        let title = aliases
            .pick_text(row, Field::CourseTitle)
            .unwrap_or_else(|| code.clone());
        let mark = aliases.pick(row, Field::Mark).unwrap_or_default();
        let letter = aliases.pick_text(row, Field::GradeLetter);
        let grade = grade_for(scale, &mark, letter.as_deref());
        let overrides = CourseOverrides {
            grade_points: aliases.pick_f64(row, Field::GradePoints),
            credits_attempted: aliases.pick_f64(row, Field::CreditsAttempted),
            credits_earned: aliases.pick_f64(row, Field::CreditsEarned),
        };

        semester
            .courses
            .push(build_course(&code, &title, credits, mark, &grade, overrides));
        catalog.entry(code.clone()).or_insert_with(|| CatalogEntry {
            code,
            title,
            credits,
        });
    }

    for student in grouped.values_mut() {
        recalculate(student);
    }

    let skipped_rows = skips.into_rows();
    let summary = ImportSummary {
        imported: grouped.len(),
        processed_rows,
        skipped: skipped_rows.len(),
        skipped_rows,
    };

    dataset.students = grouped;
    dataset.catalog = catalog;
    dataset.recent.clear();

    tracing::info!(
        imported = summary.imported,
        processed = summary.processed_rows,
        skipped = summary.skipped,
        "history import replaced dataset"
    );
    Ok(summary)
}
