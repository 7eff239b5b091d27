use crate::calc::{credits_earned_from_grade, grade_points_from_grade};
use crate::fields::FieldValue;
use crate::model::{Course, Semester, Student};
use crate::rubric::{Grade, GradeScale, NOT_AVAILABLE};
use std::collections::BTreeSet;

/// How a row's semester is located on a student.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SemesterKey<'a> {
    /// Full import: the row names the semester number. The label is only
    /// used when the semester has to be created.
    Number { number: u32, label: &'a str },
    /// Append: the active session label identifies the semester; a new one
    /// takes the next free number.
    Session(&'a str),
}

pub fn resolve_semester<'s>(student: &'s mut Student, key: SemesterKey<'_>) -> &'s mut Semester {
    let found = student.semesters.iter().position(|s| match key {
        SemesterKey::Number { number, .. } => s.number == number,
        SemesterKey::Session(label) => s.session_label == label,
    });
    let idx = match found {
        Some(idx) => idx,
        None => {
            let semester = match key {
                SemesterKey::Number { number, label } => Semester::new(number, label),
                SemesterKey::Session(label) => Semester::new(next_free_number(student), label),
            };
            student.semesters.push(semester);
            student.semesters.len() - 1
        }
    };
    &mut student.semesters[idx]
}

/// One past the highest number in use. When that would overflow, the lowest
/// unused number from 1 is taken instead so numbers stay unique and >= 1.
fn next_free_number(student: &Student) -> u32 {
    let taken: BTreeSet<u32> = student.semesters.iter().map(|s| s.number).collect();
    match taken.last() {
        None => 1,
        Some(max) => max
            .checked_add(1)
            .or_else(|| (1..=u32::MAX).find(|n| !taken.contains(n)))
            .unwrap_or(1),
    }
}

/// Explicit per-row values that win over derived ones when finite.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CourseOverrides {
    pub grade_points: Option<f64>,
    pub credits_attempted: Option<f64>,
    pub credits_earned: Option<f64>,
}

/// Grade for a course: a present mark goes through the scale, otherwise the
/// manual letter is looked up, otherwise `N/A`.
pub fn grade_for(scale: &GradeScale, mark: &FieldValue, letter: Option<&str>) -> Grade {
    if !mark.is_empty() {
        return scale.grade_from_mark(mark);
    }
    match letter.map(str::trim).filter(|l| !l.is_empty()) {
        Some(l) => Grade::new(l, scale.point_from_letter(l)),
        None => Grade::not_available(),
    }
}

pub fn build_course(
    code: &str,
    title: &str,
    credits: f64,
    mark: FieldValue,
    grade: &Grade,
    overrides: CourseOverrides,
) -> Course {
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
    Course {
        code: code.to_string(),
        title: title.to_string(),
        credits,
        mark,
        letter: if grade.letter.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            grade.letter.clone()
        },
        grade_points: grade_points_from_grade(grade.point, credits, overrides.grade_points),
        credits_attempted: finite(overrides.credits_attempted).unwrap_or(credits),
        credits_earned: finite(overrides.credits_earned)
            .unwrap_or_else(|| credits_earned_from_grade(grade.point, credits)),
    }
}

/// Recomputes a stored course's derived fields against new credits.
pub fn regrade_course(course: &mut Course, scale: &GradeScale, credits: f64) {
    let grade = if course.mark.is_empty() {
        Grade::new(&course.letter, scale.point_from_letter(&course.letter))
    } else {
        scale.grade_from_mark(&course.mark)
    };
    course.credits = credits;
    if !grade.letter.is_empty() {
        course.letter = grade.letter.clone();
    }
    course.grade_points = grade_points_from_grade(grade.point, credits, None);
    course.credits_attempted = credits;
    course.credits_earned = credits_earned_from_grade(grade.point, credits);
}
