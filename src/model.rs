use crate::fields::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const UNNAMED_STUDENT: &str = "Unnamed Student";
pub const ZERO_GPA: &str = "0.00";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub code: String,
    pub title: String,
    pub credits: f64,
    #[serde(default)]
    pub mark: FieldValue,
    pub letter: String,
    pub grade_points: f64,
    pub credits_attempted: f64,
    pub credits_earned: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Semester {
    pub number: u32,
    #[serde(default)]
    pub session_label: String,
    #[serde(default)]
    pub courses: Vec<Course>,
    pub gpa: String,
    pub total_credits_attempted: f64,
    pub total_credits_earned: f64,
    pub total_points: f64,
}

impl Semester {
    pub fn new(number: u32, session_label: &str) -> Self {
        Self {
            number,
            session_label: session_label.to_string(),
            courses: Vec::new(),
            gpa: ZERO_GPA.to_string(),
            total_credits_attempted: 0.0,
            total_credits_earned: 0.0,
            total_points: 0.0,
        }
    }

    /// Replaces a same-code course in place, otherwise appends.
    pub fn upsert_course(&mut self, course: Course) {
        match self
            .courses
            .iter_mut()
            .find(|c| c.code.eq_ignore_ascii_case(&course.code))
        {
            Some(existing) => *existing = course,
            None => self.courses.push(course),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ic: String,
    #[serde(default)]
    pub intake: String,
    #[serde(default)]
    pub semesters: Vec<Semester>,
    pub cgpa: String,
    pub total_credits_earned: f64,
}

impl Student {
    pub fn new(id: &str, name: Option<&str>, ic: Option<&str>, intake: Option<&str>) -> Self {
        let name = name.map(str::trim).filter(|s| !s.is_empty());
        Self {
            id: id.trim().to_string(),
            name: name.unwrap_or(UNNAMED_STUDENT).to_string(),
            ic: ic.map(str::trim).unwrap_or_default().to_string(),
            intake: intake.map(str::trim).unwrap_or_default().to_string(),
            semesters: Vec::new(),
            cgpa: ZERO_GPA.to_string(),
            total_credits_earned: 0.0,
        }
    }

    /// Independent copy for read-only consumers; nothing is shared with `self`.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.semesters.iter().flat_map(|s| s.courses.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub code: String,
    pub title: String,
    pub credits: f64,
}

/// The one mutable dataset every engine operation works against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dataset {
    pub session: String,
    pub catalog: BTreeMap<String, CatalogEntry>,
    pub students: BTreeMap<String, Student>,
    /// Students created since the last full import.
    pub recent: BTreeSet<String>,
}

impl Dataset {
    /// Catalog key matching `code` case-insensitively, if one exists.
    pub fn catalog_key(&self, code: &str) -> Option<String> {
        if self.catalog.contains_key(code) {
            return Some(code.to_string());
        }
        self.catalog
            .keys()
            .find(|k| k.eq_ignore_ascii_case(code))
            .cloned()
    }
}
