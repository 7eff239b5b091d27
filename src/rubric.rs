use crate::error::{EngineError, EngineResult};
use crate::fields::FieldValue;
use serde::{Deserialize, Serialize};

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub letter: String,
    pub point: f64,
}

impl Grade {
    pub fn new(letter: &str, point: f64) -> Self {
        Self {
            letter: letter.to_string(),
            point,
        }
    }

    pub fn not_available() -> Self {
        Self::new(NOT_AVAILABLE, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub minimum_mark: f64,
    pub letter: String,
    pub point: f64,
}

/// Mark bands plus the grade given below the lowest band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeScale {
    pub bands: Vec<GradeBand>,
    pub fail: Grade,
}

impl Default for GradeScale {
    fn default() -> Self {
        let bands = [
            (80.0, "A", 4.0),
            (75.0, "A-", 3.67),
            (70.0, "B+", 3.33),
            (65.0, "B", 3.0),
            (60.0, "B-", 2.67),
            (55.0, "C+", 2.33),
            (50.0, "C", 2.0),
            (45.0, "D+", 1.67),
            (40.0, "D", 1.33),
        ]
        .into_iter()
        .map(|(minimum_mark, letter, point)| GradeBand {
            minimum_mark,
            letter: letter.to_string(),
            point,
        })
        .collect();
        Self {
            bands,
            fail: Grade::new("F", 0.0),
        }
    }
}

impl GradeScale {
    /// Checks a caller-supplied scale and orders its bands highest minimum first.
    pub fn validated(mut self) -> EngineResult<Self> {
        if self.bands.is_empty() {
            return Err(EngineError::InvalidConfig(
                "grade scale needs at least one band".into(),
            ));
        }
        for band in &self.bands {
            if !band.minimum_mark.is_finite() || !band.point.is_finite() {
                return Err(EngineError::InvalidConfig(format!(
                    "band {} must have finite minimum and point",
                    band.letter
                )));
            }
            if band.letter.trim().is_empty() {
                return Err(EngineError::InvalidConfig("band letter is empty".into()));
            }
        }
        if self.fail.letter.trim().is_empty() || !self.fail.point.is_finite() {
            return Err(EngineError::InvalidConfig("fail grade is malformed".into()));
        }
        self.bands
            .sort_by(|a, b| b.minimum_mark.total_cmp(&a.minimum_mark));
        Ok(self)
    }

    pub fn grade_from_number(&self, mark: f64) -> Grade {
        if !mark.is_finite() {
            return Grade::not_available();
        }
        // Bands may come straight from deserialization, so scan for the best
        // qualifying minimum instead of trusting the stored order.
        self.bands
            .iter()
            .filter(|band| band.minimum_mark <= mark)
            .max_by(|a, b| a.minimum_mark.total_cmp(&b.minimum_mark))
            .map(|band| Grade::new(&band.letter, band.point))
            .unwrap_or_else(|| self.fail.clone())
    }

    /// Total: unparseable or blank marks yield `N/A` with point 0.
    pub fn grade_from_mark(&self, mark: &FieldValue) -> Grade {
        match mark.to_f64() {
            Some(v) => self.grade_from_number(v),
            None => Grade::not_available(),
        }
    }

    /// Case-insensitive; unknown letters are worth 0.
    pub fn point_from_letter(&self, letter: &str) -> f64 {
        let wanted = letter.trim();
        if wanted.is_empty() {
            return 0.0;
        }
        if self.fail.letter.eq_ignore_ascii_case(wanted) {
            return self.fail.point;
        }
        self.bands
            .iter()
            .find(|band| band.letter.eq_ignore_ascii_case(wanted))
            .map(|band| band.point)
            .unwrap_or(0.0)
    }
}
