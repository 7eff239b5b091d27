use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One spreadsheet row as handed over by the external parser: header -> cell.
pub type Row = serde_json::Map<String, Value>;

/// A cell value after resolution. Marks on stored courses keep this shape so
/// a blank mark stays distinguishable from a zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
            Self::Empty => String::new(),
        }
    }

    /// Lenient float read: numbers pass through, text yields its leading
    /// numeric prefix ("3 credits" -> 3.0). Non-finite results are `None`.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) => None,
            Self::Text(s) => leading_number(s),
            Self::Empty => None,
        }
    }

    /// Lenient integer read ("2.5" -> 2, "Sem 2" -> None).
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            Self::Number(_) => None,
            Self::Text(s) => leading_integer(s),
            Self::Empty => None,
        }
    }

    fn from_cell(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(Self::Text(t.to_string()))
                }
            }
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::Bool(b) => Some(Self::Text(b.to_string())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Logical fields the engine reads from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Name,
    Ic,
    Intake,
    Session,
    CourseCode,
    CourseTitle,
    Credits,
    Mark,
    GradeLetter,
    GradePoints,
    CreditsAttempted,
    CreditsEarned,
    Semester,
}

/// First alias present in `row` with a non-blank value wins; alias order is
/// priority order.
pub fn resolve_field(row: &Row, aliases: &[String]) -> Option<FieldValue> {
    aliases
        .iter()
        .filter_map(|alias| row.get(alias))
        .find_map(FieldValue::from_cell)
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn numeric_prefix_len(s: &str, allow_fraction: bool) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if !allow_fraction {
        return if digits > 0 { i } else { 0 };
    }
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - frac_start;
        if digits > 0 {
            i = j;
        }
    }
    if digits == 0 {
        return 0;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

pub fn leading_number(s: &str) -> Option<f64> {
    let t = s.trim_start();
    let len = numeric_prefix_len(t, true);
    if len == 0 {
        return None;
    }
    t[..len].parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn leading_integer(s: &str) -> Option<i64> {
    let t = s.trim_start();
    let len = numeric_prefix_len(t, false);
    if len == 0 {
        return None;
    }
    t[..len].parse::<i64>().ok()
}

/// Case-folded, trimmed name used for matching.
pub fn normalize_name(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Digits-only IC used for matching.
pub fn normalize_ic(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}
