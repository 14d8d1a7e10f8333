//! Aggregate queries behind the dashboard and monitoring endpoints.

use std::collections::BTreeMap;

use diesel::dsl::{count_star, sql, sum};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{Double, Nullable};
use serde::Serialize;

use crate::{
    db::PgPool,
    error::AppResult,
    models::{Complaint, LectureReport},
    schema::{classes, complaints, courses, lecture_reports, users},
    workflow::{ComplaintStatus, ReportStatus, Role},
};

const AVG_ATTENDANCE_SQL: &str = "AVG(students_present::FLOAT / total_students * 100)";
const RECENT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportSummary {
    pub total_reports: i64,
    pub pending_approval: i64,
    pub student_approved: i64,
    pub prl_reviewed: i64,
    pub completed: i64,
    pub rejected: i64,
    pub avg_attendance_rate: Option<f64>,
}

impl ReportSummary {
    fn from_counts(rows: Vec<(String, i64)>, avg_attendance_rate: Option<f64>) -> Self {
        let mut summary = ReportSummary {
            avg_attendance_rate,
            ..Default::default()
        };
        for (status, count) in rows {
            summary.total_reports += count;
            match status.parse::<ReportStatus>() {
                Ok(ReportStatus::PendingStudentApproval) => summary.pending_approval += count,
                Ok(ReportStatus::StudentApproved) => summary.student_approved += count,
                Ok(ReportStatus::PrlReviewed) => summary.prl_reviewed += count,
                Ok(ReportStatus::Completed) => summary.completed += count,
                Ok(ReportStatus::Rejected) => summary.rejected += count,
                Err(_) => tracing::warn!(status = %status, "report row with unknown status"),
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ComplaintSummary {
    pub total_complaints: i64,
    pub pending: i64,
    pub in_review: i64,
    pub resolved: i64,
    pub dismissed: i64,
    pub by_target_role: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserSummary {
    pub total_users: i64,
    pub pending_students: i64,
    pub by_role: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CourseSummary {
    pub total_courses: i64,
    pub active_courses: i64,
    pub by_faculty: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassSummary {
    pub total_classes: i64,
    pub active_classes: i64,
    pub total_students: i64,
    pub by_faculty: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacultyCount {
    pub faculty: String,
    pub reports: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PublicSummary {
    pub students: i64,
    pub staff: i64,
    pub courses: i64,
    pub classes: i64,
    pub reports: i64,
}

pub fn report_summary(conn: &mut PgConnection, faculty: Option<&str>) -> QueryResult<ReportSummary> {
    let (rows, avg): (Vec<(String, i64)>, Option<f64>) = match faculty {
        Some(faculty) => (
            lecture_reports::table
                .filter(lecture_reports::faculty_name.eq(faculty))
                .group_by(lecture_reports::status)
                .select((lecture_reports::status, count_star()))
                .load(conn)?,
            lecture_reports::table
                .filter(lecture_reports::faculty_name.eq(faculty))
                .select(sql::<Nullable<Double>>(AVG_ATTENDANCE_SQL))
                .first(conn)?,
        ),
        None => (
            lecture_reports::table
                .group_by(lecture_reports::status)
                .select((lecture_reports::status, count_star()))
                .load(conn)?,
            lecture_reports::table
                .select(sql::<Nullable<Double>>(AVG_ATTENDANCE_SQL))
                .first(conn)?,
        ),
    };
    Ok(ReportSummary::from_counts(rows, avg))
}

pub fn reports_per_faculty(conn: &mut PgConnection) -> QueryResult<Vec<FacultyCount>> {
    let rows: Vec<(String, i64)> = lecture_reports::table
        .group_by(lecture_reports::faculty_name)
        .select((lecture_reports::faculty_name, count_star()))
        .order(lecture_reports::faculty_name.asc())
        .load(conn)?;
    Ok(rows
        .into_iter()
        .map(|(faculty, reports)| FacultyCount { faculty, reports })
        .collect())
}

/// Complaint counters. With a faculty, only complaints filed by members of
/// that faculty are counted.
pub fn complaint_summary(
    conn: &mut PgConnection,
    faculty: Option<&str>,
) -> QueryResult<ComplaintSummary> {
    let rows: Vec<(String, String, String)> = match faculty {
        Some(faculty) => complaints::table
            .inner_join(users::table.on(users::id.eq(complaints::complainant_id)))
            .filter(users::faculty.eq(faculty))
            .select((
                complaints::status,
                complaints::against_role,
                complaints::priority,
            ))
            .load(conn)?,
        None => complaints::table
            .select((
                complaints::status,
                complaints::against_role,
                complaints::priority,
            ))
            .load(conn)?,
    };

    let mut summary = ComplaintSummary::default();
    for (status, against_role, priority) in rows {
        summary.total_complaints += 1;
        match status.parse::<ComplaintStatus>() {
            Ok(ComplaintStatus::Pending) => summary.pending += 1,
            Ok(ComplaintStatus::InReview) => summary.in_review += 1,
            Ok(ComplaintStatus::Resolved) => summary.resolved += 1,
            Ok(ComplaintStatus::Dismissed) => summary.dismissed += 1,
            Err(_) => tracing::warn!(status = %status, "complaint row with unknown status"),
        }
        *summary.by_target_role.entry(against_role).or_default() += 1;
        *summary.by_priority.entry(priority).or_default() += 1;
    }
    Ok(summary)
}

pub fn user_summary(conn: &mut PgConnection, faculty: Option<&str>) -> QueryResult<UserSummary> {
    let rows: Vec<(String, bool)> = match faculty {
        Some(faculty) => users::table
            .filter(users::faculty.eq(faculty))
            .select((users::role, users::is_approved))
            .load(conn)?,
        None => users::table
            .select((users::role, users::is_approved))
            .load(conn)?,
    };

    let mut summary = UserSummary::default();
    for (role, approved) in rows {
        summary.total_users += 1;
        if role == Role::Student.as_str() && !approved {
            summary.pending_students += 1;
        }
        *summary.by_role.entry(role).or_default() += 1;
    }
    Ok(summary)
}

pub fn course_summary(conn: &mut PgConnection) -> QueryResult<CourseSummary> {
    let rows: Vec<(String, bool)> = courses::table
        .select((courses::faculty, courses::is_active))
        .load(conn)?;

    let mut summary = CourseSummary::default();
    for (faculty, active) in rows {
        summary.total_courses += 1;
        if active {
            summary.active_courses += 1;
        }
        *summary.by_faculty.entry(faculty).or_default() += 1;
    }
    Ok(summary)
}

pub fn class_summary(conn: &mut PgConnection) -> QueryResult<ClassSummary> {
    let rows: Vec<(String, bool, i32)> = classes::table
        .select((classes::faculty, classes::is_active, classes::total_students))
        .load(conn)?;

    let mut summary = ClassSummary::default();
    for (faculty, active, students) in rows {
        summary.total_classes += 1;
        if active {
            summary.active_classes += 1;
        }
        summary.total_students += i64::from(students);
        *summary.by_faculty.entry(faculty).or_default() += 1;
    }
    Ok(summary)
}

pub fn public_summary(conn: &mut PgConnection) -> QueryResult<PublicSummary> {
    let students = users::table
        .filter(users::role.eq(Role::Student.as_str()))
        .filter(users::is_approved.eq(true))
        .select(count_star())
        .first(conn)?;
    let staff = users::table
        .filter(users::role.ne(Role::Student.as_str()))
        .filter(users::is_approved.eq(true))
        .select(count_star())
        .first(conn)?;
    let courses = courses::table
        .filter(courses::is_active.eq(true))
        .select(count_star())
        .first(conn)?;
    let classes = classes::table
        .filter(classes::is_active.eq(true))
        .select(count_star())
        .first(conn)?;
    let reports = lecture_reports::table.select(count_star()).first(conn)?;

    Ok(PublicSummary {
        students,
        staff,
        courses,
        classes,
        reports,
    })
}

pub fn recent_reports(conn: &mut PgConnection) -> QueryResult<Vec<LectureReport>> {
    lecture_reports::table
        .order(lecture_reports::created_at.desc())
        .limit(RECENT_LIMIT)
        .load(conn)
}

pub fn recent_complaints(conn: &mut PgConnection) -> QueryResult<Vec<Complaint>> {
    complaints::table
        .order(complaints::created_at.desc())
        .limit(RECENT_LIMIT)
        .load(conn)
}

/// Enrolled head count across active classes of one faculty.
pub fn enrolled_students(conn: &mut PgConnection, faculty: &str) -> QueryResult<i64> {
    let total: Option<i64> = classes::table
        .filter(classes::faculty.eq(faculty))
        .filter(classes::is_active.eq(true))
        .select(sum(classes::total_students))
        .first(conn)?;
    Ok(total.unwrap_or(0))
}

/// Runs `query` on its own pooled connection on the blocking thread pool so
/// independent aggregates can be awaited together.
pub async fn run_blocking<T, F>(pool: &PgPool, query: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> QueryResult<T> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> AppResult<T> {
        let mut conn = pool.get()?;
        Ok(query(&mut *conn)?)
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_fold_into_status_buckets() {
        let summary = ReportSummary::from_counts(
            vec![
                ("pending_student_approval".into(), 3),
                ("prl_reviewed".into(), 2),
                ("completed".into(), 1),
            ],
            Some(81.5),
        );
        assert_eq!(summary.total_reports, 6);
        assert_eq!(summary.pending_approval, 3);
        assert_eq!(summary.prl_reviewed, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.student_approved, 0);
        assert_eq!(summary.avg_attendance_rate, Some(81.5));
    }

    #[test]
    fn unknown_statuses_still_count_towards_the_total() {
        let summary = ReportSummary::from_counts(vec![("draft".into(), 4)], None);
        assert_eq!(summary.total_reports, 4);
        assert_eq!(summary.pending_approval, 0);
    }
}
