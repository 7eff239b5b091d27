use super::semester::{build_course, resolve_semester, CourseOverrides, SemesterKey};
use super::{SkipLog, SkipReason, SkippedRow};
use crate::calc::recalculate;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::fields::{normalize_ic, normalize_name, Field, Row};
use crate::model::{CatalogEntry, Dataset};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// The single course a batch of marks belongs to.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendCourse {
    pub course_code: String,
    pub course_title: String,
    #[serde(default)]
    pub credits: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendSummary {
    /// Distinct students whose transcript changed. Several rows for one
    /// student count once, so `updated + skipped` can be below the row count.
    pub updated: usize,
    pub skipped: usize,
    pub skipped_rows: Vec<SkippedRow>,
    pub course: CatalogEntry,
}

/// Credits for the batch: explicit positive value, else the catalog entry,
/// else the first enrollment carrying the code, else 0.
fn resolve_credits(dataset: &Dataset, code: &str, explicit: Option<f64>) -> f64 {
    let usable = |v: &f64| v.is_finite() && *v > 0.0;
    if let Some(v) = explicit.filter(usable) {
        return v;
    }
    if let Some(v) = dataset
        .catalog_key(code)
        .and_then(|k| dataset.catalog.get(&k))
        .map(|e| e.credits)
        .filter(usable)
    {
        return v;
    }
    dataset
        .students
        .values()
        .flat_map(|s| s.courses())
        .filter(|c| c.code.eq_ignore_ascii_case(code))
        .map(|c| c.credits)
        .find(usable)
        .unwrap_or(0.0)
}

fn name_index(dataset: &Dataset) -> HashMap<String, Vec<String>> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    for student in dataset.students.values() {
        index
            .entry(normalize_name(&student.name))
            .or_default()
            .push(student.id.clone());
    }
    index
}

fn match_student(
    dataset: &Dataset,
    index: &HashMap<String, Vec<String>>,
    config: &EngineConfig,
    row: &Row,
) -> Result<String, SkipReason> {
    let aliases = &config.aliases;
    if let Some(id) = aliases.pick_text(row, Field::Id) {
        if dataset.students.contains_key(&id) {
            return Ok(id);
        }
    }
    let Some(name) = aliases.pick_text(row, Field::Name) else {
        return Err(SkipReason::UnmatchedStudent);
    };
    let candidates = match index.get(&normalize_name(&name)) {
        Some(c) if !c.is_empty() => c,
        _ => return Err(SkipReason::UnmatchedStudent),
    };
    if let [only] = candidates.as_slice() {
        return Ok(only.clone());
    }

    let row_ic = aliases
        .pick_text(row, Field::Ic)
        .map(|ic| normalize_ic(&ic))
        .unwrap_or_default();
    if row_ic.is_empty() {
        return Err(SkipReason::AmbiguousStudent);
    }
    let by_ic: Vec<&String> = candidates
        .iter()
        .filter(|id| {
            dataset
                .students
                .get(*id)
                .map(|s| normalize_ic(&s.ic) == row_ic)
                .unwrap_or(false)
        })
        .collect();
    match by_ic.as_slice() {
        [only] => Ok((*only).clone()),
        _ => Err(SkipReason::AmbiguousStudent),
    }
}

/// Upserts marks for one course into the active session of each matched
/// student. Row problems are absorbed into the skip list.
pub fn append_results(
    dataset: &mut Dataset,
    rows: &[Row],
    course: &AppendCourse,
    config: &EngineConfig,
) -> EngineResult<AppendSummary> {
    let session = dataset.session.trim().to_string();
    if session.is_empty() {
        return Err(EngineError::NoSession);
    }
    if rows.is_empty() {
        return Err(EngineError::EmptyInput { what: "append file" });
    }
    let code = course.course_code.trim().to_uppercase();
    let title = course.course_title.trim().to_uppercase();
    if code.is_empty() {
        return Err(EngineError::InvalidCourse("course code is required".into()));
    }
    if title.is_empty() {
        return Err(EngineError::InvalidCourse("course title is required".into()));
    }

    let credits = resolve_credits(dataset, &code, course.credits);
    let key = dataset.catalog_key(&code).unwrap_or_else(|| code.clone());
    let entry = dataset
        .catalog
        .entry(key.clone())
        .or_insert_with(|| CatalogEntry {
            code: key,
            title: title.clone(),
            credits,
        });
    entry.title = title.clone();
    entry.credits = credits;
    let catalog_entry = entry.clone();

    let index = name_index(dataset);
    let scale = &config.grade_scale;
    let mut skips = SkipLog::default();
    let mut touched: BTreeSet<String> = BTreeSet::new();

    for (idx, row) in rows.iter().enumerate() {
        let Some(mark) = config.aliases.pick(row, Field::Mark) else {
            skips.skip(idx, SkipReason::MissingMark);
            continue;
        };
        let id = match match_student(dataset, &index, config, row) {
            Ok(id) => id,
            Err(reason) => {
                skips.skip(idx, reason);
                continue;
            }
        };
        let Some(student) = dataset.students.get_mut(&id) else {
            skips.skip(idx, SkipReason::UnmatchedStudent);
            continue;
        };

        let grade = scale.grade_from_mark(&mark);
        let enrollment = build_course(
            &code,
            &title,
            credits,
            mark,
            &grade,
            CourseOverrides::default(),
        );
        resolve_semester(student, SemesterKey::Session(&session)).upsert_course(enrollment);
        recalculate(student);
        touched.insert(id);
    }

    let skipped_rows = skips.into_rows();
    tracing::info!(
        course = %code,
        session = %session,
        updated = touched.len(),
        skipped = skipped_rows.len(),
        "appended results"
    );
    Ok(AppendSummary {
        updated: touched.len(),
        skipped: skipped_rows.len(),
        skipped_rows,
        course: catalog_entry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldValue;
    use crate::model::{Semester, Student};
    use serde_json::json;

    fn rows(v: serde_json::Value) -> Vec<Row> {
        v.as_array()
            .expect("array")
            .iter()
            .map(|r| r.as_object().cloned().expect("object"))
            .collect()
    }

    fn course(code: &str, title: &str, credits: Option<f64>) -> AppendCourse {
        AppendCourse {
            course_code: code.into(),
            course_title: title.into(),
            credits,
        }
    }

    fn dataset_with(students: &[(&str, &str, &str)]) -> Dataset {
        let mut ds = Dataset {
            session: "2024S1".into(),
            ..Dataset::default()
        };
        for (id, name, ic) in students {
            ds.students
                .insert(id.to_string(), Student::new(id, Some(name), Some(ic), None));
        }
        ds
    }

    #[test]
    fn appends_new_course_into_new_session_semester() {
        let mut ds = dataset_with(&[("S1", "Ann", "")]);
        ds.students
            .get_mut("S1")
            .expect("S1")
            .semesters
            .push(Semester::new(1, "2023S2"));
        let summary = append_results(
            &mut ds,
            &rows(json!([{ "ID": "S1", "Mark": 70 }])),
            &course("CS3", "DATA STRUCTURES", Some(3.0)),
            &EngineConfig::default(),
        )
        .expect("append");
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.skipped, 0);

        let s = &ds.students["S1"];
        assert_eq!(s.semesters.len(), 2);
        let sem = &s.semesters[1];
        assert_eq!(sem.session_label, "2024S1");
        assert_eq!(sem.number, 2);
        let c = &sem.courses[0];
        assert_eq!(c.code, "CS3");
        assert_eq!(c.letter, "B+");
        assert!((c.grade_points - 9.99).abs() < 1e-9);
        assert_eq!(s.cgpa, "3.33");
        assert_eq!(ds.catalog["CS3"].title, "DATA STRUCTURES");
        assert_eq!(ds.catalog["CS3"].credits, 3.0);
    }

    #[test]
    fn new_session_after_maximal_semester_number_takes_a_free_slot() {
        let mut ds = dataset_with(&[("S1", "Ann", "")]);
        ds.students
            .get_mut("S1")
            .expect("S1")
            .semesters
            .push(Semester::new(u32::MAX, "OLD"));
        let summary = append_results(
            &mut ds,
            &rows(json!([{ "ID": "S1", "Mark": 70 }])),
            &course("CS3", "DATA STRUCTURES", Some(3.0)),
            &EngineConfig::default(),
        )
        .expect("append");
        assert_eq!(summary.updated, 1);

        let numbers: Vec<(u32, &str)> = ds.students["S1"]
            .semesters
            .iter()
            .map(|s| (s.number, s.session_label.as_str()))
            .collect();
        assert_eq!(numbers, vec![(1, "2024S1"), (u32::MAX, "OLD")]);
    }

    #[test]
    fn updated_counts_students_not_rows() {
        let mut ds = dataset_with(&[("S1", "Ann", ""), ("S2", "Bob", "")]);
        let summary = append_results(
            &mut ds,
            &rows(json!([
                { "ID": "S1", "Mark": 50 },
                { "ID": "S1", "Mark": 70 },
                { "ID": "S2", "Mark": 80 }
            ])),
            &course("CS3", "DATA STRUCTURES", Some(3.0)),
            &EngineConfig::default(),
        )
        .expect("append");
        assert_eq!(summary.updated, 2);
        assert_eq!(summary.skipped, 0);
        // Second row for S1 replaced the first.
        let s1 = &ds.students["S1"].semesters[0];
        assert_eq!(s1.courses.len(), 1);
        assert_eq!(s1.courses[0].letter, "B+");
    }

    #[test]
    fn preconditions_fail_before_mutation() {
        let cfg = EngineConfig::default();
        let input = rows(json!([{ "ID": "S1", "Mark": 70 }]));

        let mut no_session = dataset_with(&[("S1", "Ann", "")]);
        no_session.session.clear();
        let err = append_results(&mut no_session, &input, &course("CS3", "DS", None), &cfg)
            .unwrap_err();
        assert_eq!(err, EngineError::NoSession);

        let mut ds = dataset_with(&[("S1", "Ann", "")]);
        let err = append_results(&mut ds, &[], &course("CS3", "DS", None), &cfg).unwrap_err();
        assert_eq!(err.code(), "empty_input");
        let err = append_results(&mut ds, &input, &course("  ", "DS", None), &cfg).unwrap_err();
        assert_eq!(err.code(), "invalid_course");
        let err = append_results(&mut ds, &input, &course("CS3", "", None), &cfg).unwrap_err();
        assert_eq!(err.code(), "invalid_course");
        assert!(ds.catalog.is_empty());
        assert!(ds.students["S1"].semesters.is_empty());
    }

    #[test]
    fn ambiguous_names_are_skipped_unless_ic_decides() {
        let mut ds = dataset_with(&[
            ("S1", "John Tan", "900101-14-1111"),
            ("S2", "john tan ", "900101-14-2222"),
        ]);
        let summary = append_results(
            &mut ds,
            &rows(json!([
                { "Name": "John Tan", "Mark": 60 },
                { "Name": "John Tan", "IC": "999", "Mark": 60 },
                { "Name": "JOHN TAN", "IC": "900101141111", "Mark": 60 },
                { "Name": "Nobody", "Mark": 60 },
                { "Name": "John Tan" }
            ])),
            &course("CS1", "INTRO", Some(3.0)),
            &EngineConfig::default(),
        )
        .expect("append");
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.skipped, 4);
        let reasons: Vec<_> = summary.skipped_rows.iter().map(|s| (s.row, s.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (0, SkipReason::AmbiguousStudent),
                (1, SkipReason::AmbiguousStudent),
                (3, SkipReason::UnmatchedStudent),
                (4, SkipReason::MissingMark),
            ]
        );
        assert_eq!(ds.students["S1"].semesters.len(), 1);
        assert!(ds.students["S2"].semesters.is_empty());
    }

    #[test]
    fn unknown_id_falls_back_to_unique_name() {
        let mut ds = dataset_with(&[("S1", "Ann Lee", "")]);
        let summary = append_results(
            &mut ds,
            &rows(json!([{ "ID": "X9", "Name": " ann lee", "Mark": "82" }])),
            &course("cs4", "algorithms", Some(4.0)),
            &EngineConfig::default(),
        )
        .expect("append");
        assert_eq!(summary.updated, 1);
        let c = &ds.students["S1"].semesters[0].courses[0];
        assert_eq!(c.code, "CS4");
        assert_eq!(c.title, "ALGORITHMS");
        assert_eq!(c.mark, FieldValue::Text("82".into()));
        assert_eq!(c.grade_points, 16.0);
    }

    #[test]
    fn repeated_rows_upsert_same_course() {
        let mut ds = dataset_with(&[("S1", "Ann", "")]);
        let summary = append_results(
            &mut ds,
            &rows(json!([
                { "ID": "S1", "Mark": 30 },
                { "ID": "S1", "Mark": 90 }
            ])),
            &course("CS3", "DS", Some(3.0)),
            &EngineConfig::default(),
        )
        .expect("append");
        assert_eq!(summary.updated, 1);
        let sem = &ds.students["S1"].semesters[0];
        assert_eq!(sem.courses.len(), 1);
        assert_eq!(sem.courses[0].letter, "A");
        assert_eq!(sem.gpa, "4.00");
    }

    #[test]
    fn credits_fall_back_to_catalog_then_enrollments() {
        let cfg = EngineConfig::default();
        let input = rows(json!([{ "ID": "S1", "Mark": 80 }]));

        let mut ds = dataset_with(&[("S1", "Ann", "")]);
        ds.catalog.insert(
            "CS5".into(),
            CatalogEntry {
                code: "CS5".into(),
                title: "OLD".into(),
                credits: 2.0,
            },
        );
        let summary = append_results(&mut ds, &input, &course("CS5", "NEW", None), &cfg)
            .expect("append");
        assert_eq!(summary.course.credits, 2.0);
        assert_eq!(ds.catalog["CS5"].title, "NEW");

        let mut ds = dataset_with(&[("S1", "Ann", ""), ("S2", "Bob", "")]);
        let mut old = Semester::new(1, "2023S1");
        old.courses.push(build_course(
            "CS6",
            "CS6",
            4.0,
            FieldValue::Empty,
            &crate::rubric::Grade::new("A", 4.0),
            CourseOverrides::default(),
        ));
        ds.students.get_mut("S2").expect("S2").semesters.push(old);
        let summary = append_results(&mut ds, &input, &course("CS6", "T", Some(-1.0)), &cfg)
            .expect("append");
        assert_eq!(summary.course.credits, 4.0);

        let mut ds = dataset_with(&[("S1", "Ann", "")]);
        let summary = append_results(&mut ds, &input, &course("CS7", "T", None), &cfg)
            .expect("append");
        assert_eq!(summary.course.credits, 0.0);
        assert_eq!(ds.students["S1"].semesters[0].gpa, "0.00");
    }
}
