use crate::model::{Student, ZERO_GPA};

/// Two-decimal GPA string; `"0.00"` when nothing was attempted. Negative
/// quotients (only reachable through negative overrides) clamp to zero.
pub fn format_gpa(points: f64, attempted: f64) -> String {
    if attempted <= 0.0 || !attempted.is_finite() || !points.is_finite() {
        return ZERO_GPA.to_string();
    }
    let gpa = points / attempted;
    if gpa <= 0.0 {
        return ZERO_GPA.to_string();
    }
    format!("{:.2}", gpa)
}

pub fn credits_earned_from_grade(point: f64, credits: f64) -> f64 {
    if point > 0.0 {
        credits
    } else {
        0.0
    }
}

pub fn grade_points_from_grade(point: f64, credits: f64, override_points: Option<f64>) -> f64 {
    if let Some(v) = override_points.filter(|v| v.is_finite()) {
        return v;
    }
    if point.is_finite() && credits.is_finite() {
        point * credits
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Totals {
    points: f64,
    attempted: f64,
    earned: f64,
}

impl Totals {
    /// Sums that overflow to infinity collapse to zero, the same rule
    /// `format_gpa` applies, so stored totals always serialize as numbers.
    fn add(&mut self, points: f64, attempted: f64, earned: f64) {
        self.points = finite_or_zero(self.points + finite_or_zero(points));
        self.attempted = finite_or_zero(self.attempted + finite_or_zero(attempted));
        self.earned = finite_or_zero(self.earned + finite_or_zero(earned));
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Re-sorts semesters by number, then rebuilds every semester aggregate and
/// the cumulative CGPA from course-level fields only.
pub fn recalculate(student: &mut Student) -> &mut Student {
    student.semesters.sort_by_key(|s| s.number);

    let mut cumulative = Totals::default();
    for semester in &mut student.semesters {
        let mut sem = Totals::default();
        for course in &semester.courses {
            sem.add(
                course.grade_points,
                course.credits_attempted,
                course.credits_earned,
            );
        }
        semester.total_points = sem.points;
        semester.total_credits_attempted = sem.attempted;
        semester.total_credits_earned = sem.earned;
        semester.gpa = format_gpa(sem.points, sem.attempted);
        cumulative.add(sem.points, sem.attempted, sem.earned);
    }

    student.cgpa = format_gpa(cumulative.points, cumulative.attempted);
    student.total_credits_earned = cumulative.earned;
    student
}
