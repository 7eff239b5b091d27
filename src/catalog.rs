use crate::calc::recalculate;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::fields::FieldValue;
use crate::model::{CatalogEntry, Dataset};
use crate::reconcile::semester::regrade_course;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub credits: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSyncSummary {
    pub updated_student_count: usize,
    pub entry: CatalogEntry,
}

/// Edits a catalog entry and pushes the new credits (and title, when given)
/// into every enrollment of that code, recalculating each touched student
/// once.
pub fn update_catalog_entry(
    dataset: &mut Dataset,
    code: &str,
    update: &CatalogUpdate,
    config: &EngineConfig,
) -> EngineResult<CatalogSyncSummary> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(EngineError::InvalidCourse("course code is required".into()));
    }
    let credits = match update.credits.to_f64() {
        Some(v) if v > 0.0 => v,
        _ => {
            return Err(EngineError::InvalidCredits(format!(
                "credits must be a number greater than 0, got {:?}",
                update.credits.as_text()
            )))
        }
    };
    let title = update
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    // Entries differing only in case describe the same course as the
    // enrollments below, so all of them take the new values.
    for (_, variant) in dataset
        .catalog
        .iter_mut()
        .filter(|(k, _)| k.eq_ignore_ascii_case(&code))
    {
        variant.credits = credits;
        if let Some(t) = title {
            variant.title = t.to_string();
        }
    }
    let key = dataset.catalog_key(&code).unwrap_or_else(|| code.clone());
    let entry = dataset
        .catalog
        .entry(key.clone())
        .or_insert_with(|| CatalogEntry {
            code: key.clone(),
            title: title.map(str::to_string).unwrap_or(key),
            credits,
        })
        .clone();

    let scale = &config.grade_scale;
    let mut dirty: BTreeSet<String> = BTreeSet::new();
    for student in dataset.students.values_mut() {
        for semester in &mut student.semesters {
            for course in &mut semester.courses {
                if !course.code.eq_ignore_ascii_case(&code) {
                    continue;
                }
                if let Some(t) = title {
                    course.title = t.to_string();
                }
                regrade_course(course, scale, credits);
                dirty.insert(student.id.clone());
            }
        }
    }
    for id in &dirty {
        if let Some(student) = dataset.students.get_mut(id) {
            recalculate(student);
        }
    }

    tracing::info!(
        code = %entry.code,
        credits,
        students = dirty.len(),
        "catalog entry synchronized"
    );
    Ok(CatalogSyncSummary {
        updated_student_count: dirty.len(),
        entry,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogListing {
    pub code: String,
    pub title: String,
    pub credits: f64,
    pub enrolled: usize,
}

/// Stored catalog merged with codes only seen on enrollments. Stored entries
/// win; otherwise the first enrollment supplies title and credits.
pub fn list_catalog(dataset: &Dataset) -> Vec<CatalogListing> {
    let mut merged: BTreeMap<String, CatalogEntry> = dataset.catalog.clone();
    let mut enrolled: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();

    for student in dataset.students.values() {
        for course in student.courses() {
            if course.code.is_empty() {
                continue;
            }
            enrolled
                .entry(course.code.clone())
                .or_default()
                .insert(student.id.as_str());
            merged
                .entry(course.code.clone())
                .or_insert_with(|| CatalogEntry {
                    code: course.code.clone(),
                    title: if course.title.is_empty() {
                        course.code.clone()
                    } else {
                        course.title.clone()
                    },
                    credits: if course.credits.is_finite() {
                        course.credits
                    } else {
                        0.0
                    },
                });
        }
    }

    merged
        .into_iter()
        .map(|(code, entry)| CatalogListing {
            enrolled: enrolled.get(&code).map(|s| s.len()).unwrap_or(0),
            title: if entry.title.is_empty() {
                code.clone()
            } else {
                entry.title
            },
            credits: entry.credits,
            code,
        })
        .collect()
}
