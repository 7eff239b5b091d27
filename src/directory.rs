//! Read-only views over the dataset.

use crate::error::{EngineError, EngineResult};
use crate::fields::{normalize_ic, normalize_name, FieldValue};
use crate::model::{Dataset, Student};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_PAGE_SIZE: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub catalog: usize,
    pub students: usize,
}

pub fn stats(dataset: &Dataset) -> Stats {
    Stats {
        catalog: dataset.catalog.len(),
        students: dataset.students.len(),
    }
}

pub fn set_session(dataset: &mut Dataset, label: &str) -> EngineResult<String> {
    let label = label.trim();
    if label.is_empty() {
        return Err(EngineError::InvalidSession("enter a session label".into()));
    }
    dataset.session = label.to_string();
    Ok(dataset.session.clone())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentQuery {
    pub page: Option<usize>,
    pub size: Option<usize>,
    pub filter: String,
    pub intake: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentListItem {
    pub id: String,
    pub name: String,
    pub intake: String,
    pub cgpa: String,
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPage {
    pub items: Vec<StudentListItem>,
    pub total: usize,
    pub page: usize,
    pub page_count: usize,
    pub size: usize,
}

pub fn list_students(dataset: &Dataset, query: &StudentQuery) -> StudentPage {
    let size = query.size.filter(|s| *s > 0).unwrap_or(DEFAULT_PAGE_SIZE);
    let keyword = query.filter.trim().to_lowercase();
    let intake = query.intake.trim().to_lowercase();

    let mut matching: Vec<&Student> = dataset
        .students
        .values()
        .filter(|s| {
            keyword.is_empty()
                || s.id.to_lowercase().contains(&keyword)
                || s.name.to_lowercase().contains(&keyword)
        })
        .filter(|s| intake.is_empty() || s.intake.to_lowercase() == intake)
        .collect();
    matching.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });

    let total = matching.len();
    let page_count = total.div_ceil(size).max(1);
    let page = query.page.unwrap_or(1).clamp(1, page_count);
    let items = matching
        .into_iter()
        .skip((page - 1) * size)
        .take(size)
        .map(|s| StudentListItem {
            id: s.id.clone(),
            name: s.name.clone(),
            intake: s.intake.clone(),
            cgpa: s.cgpa.clone(),
            is_new: dataset.recent.contains(&s.id),
        })
        .collect();

    StudentPage {
        items,
        total,
        page,
        page_count,
        size,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub ic: String,
    pub intake: String,
}

pub fn list_profiles(dataset: &Dataset) -> Vec<Profile> {
    dataset
        .students
        .values()
        .map(|s| Profile {
            id: s.id.clone(),
            name: s.name.clone(),
            ic: s.ic.clone(),
            intake: s.intake.clone(),
        })
        .collect()
}

pub fn list_intakes(dataset: &Dataset) -> Vec<String> {
    dataset
        .students
        .values()
        .map(|s| s.intake.trim())
        .filter(|i| !i.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn transcript(dataset: &Dataset, id: &str) -> Option<Student> {
    dataset.students.get(id.trim()).map(Student::deep_copy)
}

/// Self-service lookup: IC must match exactly (digits only) and the name
/// must contain the supplied fragment.
pub fn find_by_ic_and_name(dataset: &Dataset, ic: &str, name: &str) -> Option<Student> {
    let wanted_ic = normalize_ic(ic);
    if wanted_ic.is_empty() {
        return None;
    }
    let fragment = normalize_name(name);
    dataset
        .students
        .values()
        .find(|s| normalize_ic(&s.ic) == wanted_ic && s.name.to_lowercase().contains(&fragment))
        .map(Student::deep_copy)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub student_id: String,
    pub name: String,
    pub ic: String,
    pub course_code: String,
    pub course_title: String,
    pub mark: FieldValue,
    pub letter: String,
    pub semester_taken: String,
}

pub fn report_rows(dataset: &Dataset) -> Vec<ReportRow> {
    let mut out = Vec::new();
    for student in dataset.students.values() {
        let mut semesters: Vec<_> = student.semesters.iter().collect();
        semesters.sort_by_key(|s| s.number);
        for semester in semesters {
            let taken = if semester.session_label.trim().is_empty() {
                format!("Semester {}", semester.number)
            } else {
                semester.session_label.clone()
            };
            for course in &semester.courses {
                out.push(ReportRow {
                    student_id: student.id.clone(),
                    name: student.name.clone(),
                    ic: student.ic.clone(),
                    course_code: course.code.clone(),
                    course_title: course.title.clone(),
                    mark: course.mark.clone(),
                    letter: course.letter.clone(),
                    semester_taken: taken.clone(),
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::fields::Row;
    use crate::reconcile::import_history;
    use serde_json::json;

    fn dataset() -> Dataset {
        let rows: Vec<Row> = json!([
            { "ID": "S2", "Name": "bob", "Intake": "01-2024", "IC": "900101-14-2222", "Code": "CS1", "Credits": 3, "Mark": 70 },
            { "ID": "S1", "Name": "Ann", "Intake": "03-2024", "IC": "900101-14-1111", "Sem": 2, "Session": "2024S2", "Code": "CS2", "Credits": 3, "Mark": 90 },
            { "ID": "S1", "Sem": 1, "Code": "CS1", "Credits": 3, "Mark": 60 },
            { "ID": "S3", "Name": "Ann", "Code": "CS1", "Credits": 3 }
        ])
        .as_array()
        .expect("array")
        .iter()
        .map(|r| r.as_object().cloned().expect("object"))
        .collect();
        let mut ds = Dataset::default();
        import_history(&mut ds, &rows, &EngineConfig::default()).expect("import");
        ds
    }

    #[test]
    fn list_sorts_by_name_then_id_and_pages() {
        let mut ds = dataset();
        ds.recent.insert("S3".into());
        let page = list_students(
            &ds,
            &StudentQuery {
                size: Some(2),
                ..StudentQuery::default()
            },
        );
        assert_eq!(page.total, 3);
        assert_eq!(page.page_count, 2);
        let ids: Vec<_> = page.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S3"]);
        assert!(page.items[1].is_new);

        let last = list_students(
            &ds,
            &StudentQuery {
                page: Some(9),
                size: Some(2),
                ..StudentQuery::default()
            },
        );
        assert_eq!(last.page, 2);
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, "S2");
    }

    #[test]
    fn list_filters_by_keyword_and_intake() {
        let ds = dataset();
        let page = list_students(
            &ds,
            &StudentQuery {
                filter: "ANN".into(),
                intake: "03-2024".into(),
                ..StudentQuery::default()
            },
        );
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, "S1");

        let empty = list_students(
            &ds,
            &StudentQuery {
                filter: "zzz".into(),
                ..StudentQuery::default()
            },
        );
        assert_eq!(empty.total, 0);
        assert_eq!(empty.page, 1);
        assert_eq!(empty.page_count, 1);
        assert!(empty.items.is_empty());
    }

    #[test]
    fn intakes_are_distinct_and_sorted() {
        assert_eq!(list_intakes(&dataset()), vec!["01-2024", "03-2024"]);
    }

    #[test]
    fn lookup_by_ic_and_name_fragment() {
        let ds = dataset();
        let found = find_by_ic_and_name(&ds, "900101141111", "an").expect("found");
        assert_eq!(found.id, "S1");
        assert!(find_by_ic_and_name(&ds, "900101141111", "bob").is_none());
        assert!(find_by_ic_and_name(&ds, "", "ann").is_none());
    }

    #[test]
    fn transcript_is_a_copy() {
        let ds = dataset();
        let mut t = transcript(&ds, " S1 ").expect("transcript");
        t.semesters.clear();
        assert_eq!(ds.students["S1"].semesters.len(), 2);
        assert!(transcript(&ds, "nope").is_none());
    }

    #[test]
    fn report_rows_label_semesters() {
        let rows = report_rows(&dataset());
        let s1: Vec<_> = rows
            .iter()
            .filter(|r| r.student_id == "S1")
            .map(|r| (r.course_code.as_str(), r.semester_taken.as_str()))
            .collect();
        assert_eq!(s1, vec![("CS1", "Semester 1"), ("CS2", "2024S2")]);
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn session_must_not_be_blank() {
        let mut ds = Dataset::default();
        assert_eq!(
            set_session(&mut ds, "   ").map_err(|e| e.code()),
            Err("invalid_session")
        );
        assert_eq!(set_session(&mut ds, " 2024S1 ").as_deref(), Ok("2024S1"));
        assert_eq!(stats(&ds), Stats { catalog: 0, students: 0 });
    }
}
