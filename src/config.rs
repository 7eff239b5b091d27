use crate::error::{EngineError, EngineResult};
use crate::fields::{resolve_field, Field, FieldValue, Row};
use crate::rubric::GradeScale;
use serde::{Deserialize, Serialize};

/// Ordered header aliases per logical field. Earlier aliases take priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldAliases {
    pub id: Vec<String>,
    pub name: Vec<String>,
    pub ic: Vec<String>,
    pub intake: Vec<String>,
    pub session: Vec<String>,
    pub course_code: Vec<String>,
    pub course_title: Vec<String>,
    pub credits: Vec<String>,
    pub mark: Vec<String>,
    pub grade_letter: Vec<String>,
    pub grade_points: Vec<String>,
    pub credits_attempted: Vec<String>,
    pub credits_earned: Vec<String>,
    pub semester: Vec<String>,
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            id: list(&[
                "ID",
                "Id",
                "id",
                "Student ID",
                "StudentID",
                "Matric",
                "MatricNo",
                "Matric No",
                "Student_Id",
            ]),
            name: list(&["Name", "StudentName", "Student Name"]),
            ic: list(&[
                "IC", "Ic", "ic", "IC No", "ICNo", "MyKad", "MyKad No", "identity",
            ]),
            intake: list(&["Intake", "IntakeCode", "Intake Code", "Cohort"]),
            session: list(&["Session", "SessionLabel", "AcademicSession", "Session Label"]),
            course_code: list(&[
                "CourseCode",
                "Course Code",
                "Coursecode",
                "SubjectCode",
                "Code",
            ]),
            course_title: list(&["Title", "CourseTitle", "Course Title", "Subject"]),
            credits: list(&["Credits", "Credit", "CreditHour", "Credit Hour", "CR"]),
            mark: list(&["Mark", "Marks", "Score"]),
            grade_letter: list(&["Letter", "Grade", "GradeLetter"]),
            grade_points: list(&["GradePoints", "Grade Points"]),
            credits_attempted: list(&["CreditsAttempted", "Credits Attempted"]),
            credits_earned: list(&["CreditsEarned", "Credits Earned"]),
            semester: list(&["Semester", "Sem", "Sem No", "Term"]),
        }
    }
}

impl FieldAliases {
    pub fn aliases(&self, field: Field) -> &[String] {
        match field {
            Field::Id => &self.id,
            Field::Name => &self.name,
            Field::Ic => &self.ic,
            Field::Intake => &self.intake,
            Field::Session => &self.session,
            Field::CourseCode => &self.course_code,
            Field::CourseTitle => &self.course_title,
            Field::Credits => &self.credits,
            Field::Mark => &self.mark,
            Field::GradeLetter => &self.grade_letter,
            Field::GradePoints => &self.grade_points,
            Field::CreditsAttempted => &self.credits_attempted,
            Field::CreditsEarned => &self.credits_earned,
            Field::Semester => &self.semester,
        }
    }

    pub fn pick(&self, row: &Row, field: Field) -> Option<FieldValue> {
        resolve_field(row, self.aliases(field))
    }

    pub fn pick_text(&self, row: &Row, field: Field) -> Option<String> {
        self.pick(row, field).map(|v| v.as_text())
    }

    pub fn pick_f64(&self, row: &Row, field: Field) -> Option<f64> {
        self.pick(row, field).and_then(|v| v.to_f64())
    }

    pub fn validated(self) -> EngineResult<Self> {
        let all = [
            ("id", &self.id),
            ("name", &self.name),
            ("ic", &self.ic),
            ("intake", &self.intake),
            ("session", &self.session),
            ("courseCode", &self.course_code),
            ("courseTitle", &self.course_title),
            ("credits", &self.credits),
            ("mark", &self.mark),
            ("gradeLetter", &self.grade_letter),
            ("gradePoints", &self.grade_points),
            ("creditsAttempted", &self.credits_attempted),
            ("creditsEarned", &self.credits_earned),
            ("semester", &self.semester),
        ];
        for (name, aliases) in all {
            if aliases.iter().all(|a| a.trim().is_empty()) {
                return Err(EngineError::InvalidConfig(format!(
                    "field {} needs at least one alias",
                    name
                )));
            }
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub aliases: FieldAliases,
    pub grade_scale: GradeScale,
}

/// Sections that can be stored and patched independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigSection {
    FieldAliases,
    GradeScale,
}

impl ConfigSection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fieldAliases" => Some(Self::FieldAliases),
            "gradeScale" => Some(Self::GradeScale),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::FieldAliases => "engine.fieldAliases",
            Self::GradeScale => "engine.gradeScale",
        }
    }

    pub const ALL: [ConfigSection; 2] = [Self::FieldAliases, Self::GradeScale];
}

impl EngineConfig {
    /// Replaces one section with a caller-supplied JSON value. Alias patches
    /// only need the fields they change; omitted fields keep their defaults.
    pub fn apply_section(
        &mut self,
        section: ConfigSection,
        value: &serde_json::Value,
    ) -> EngineResult<()> {
        match section {
            ConfigSection::FieldAliases => {
                let mut merged = serde_json::to_value(&self.aliases)
                    .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
                let Some(patch) = value.as_object() else {
                    return Err(EngineError::InvalidConfig(
                        "fieldAliases must be an object".into(),
                    ));
                };
                if let Some(obj) = merged.as_object_mut() {
                    for (k, v) in patch {
                        if !obj.contains_key(k) {
                            return Err(EngineError::InvalidConfig(format!(
                                "unknown field: {}",
                                k
                            )));
                        }
                        obj.insert(k.clone(), v.clone());
                    }
                }
                let aliases: FieldAliases = serde_json::from_value(merged)
                    .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
                self.aliases = aliases.validated()?;
            }
            ConfigSection::GradeScale => {
                let scale: GradeScale = serde_json::from_value(value.clone())
                    .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
                self.grade_scale = scale.validated()?;
            }
        }
        Ok(())
    }

    pub fn section_value(&self, section: ConfigSection) -> serde_json::Value {
        let value = match section {
            ConfigSection::FieldAliases => serde_json::to_value(&self.aliases),
            ConfigSection::GradeScale => serde_json::to_value(&self.grade_scale),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}
