use axum::{
    extract::{Path, State},
    Json,
};
use futures_util::try_join;
use serde::Serialize;

use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    models::{Complaint, LectureReport},
    state::AppState,
    stats::{
        self, ClassSummary, ComplaintSummary, CourseSummary, FacultyCount, PublicSummary,
        ReportSummary, UserSummary,
    },
    workflow::Operation,
};

#[derive(Serialize)]
pub struct SystemStats {
    pub users: UserSummary,
    pub reports: ReportSummary,
    pub complaints: ComplaintSummary,
    pub courses: CourseSummary,
    pub classes: ClassSummary,
    pub reports_by_faculty: Vec<FacultyCount>,
    pub recent_reports: Vec<LectureReport>,
    pub recent_complaints: Vec<Complaint>,
}

#[derive(Serialize)]
pub struct FacultyStats {
    pub faculty: String,
    pub users: UserSummary,
    pub reports: ReportSummary,
    pub complaints: ComplaintSummary,
    pub enrolled_students: i64,
}

#[derive(Serialize)]
pub struct PublicStats {
    pub stats: PublicSummary,
}

/// System-wide dashboard. Each block is fetched on its own pooled
/// connection and the queries run side by side.
pub async fn system_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<SystemStats>> {
    user.actor().require(Operation::ViewStatistics)?;

    let pool = &state.pool;
    let (
        users,
        reports,
        complaints,
        courses,
        classes,
        reports_by_faculty,
        recent_reports,
        recent_complaints,
    ) = try_join!(
        stats::run_blocking(pool, |conn| stats::user_summary(conn, None)),
        stats::run_blocking(pool, |conn| stats::report_summary(conn, None)),
        stats::run_blocking(pool, |conn| stats::complaint_summary(conn, None)),
        stats::run_blocking(pool, stats::course_summary),
        stats::run_blocking(pool, stats::class_summary),
        stats::run_blocking(pool, stats::reports_per_faculty),
        stats::run_blocking(pool, stats::recent_reports),
        stats::run_blocking(pool, stats::recent_complaints),
    )?;

    Ok(Json(SystemStats {
        users,
        reports,
        complaints,
        courses,
        classes,
        reports_by_faculty,
        recent_reports,
        recent_complaints,
    }))
}

pub async fn faculty_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(faculty): Path<String>,
) -> AppResult<Json<FacultyStats>> {
    user.actor().require(Operation::ViewStatistics)?;

    let pool = &state.pool;
    let users_faculty = faculty.clone();
    let reports_faculty = faculty.clone();
    let complaints_faculty = faculty.clone();
    let classes_faculty = faculty.clone();
    let (users, reports, complaints, enrolled_students) = try_join!(
        stats::run_blocking(pool, move |conn| {
            stats::user_summary(conn, Some(&users_faculty))
        }),
        stats::run_blocking(pool, move |conn| {
            stats::report_summary(conn, Some(&reports_faculty))
        }),
        stats::run_blocking(pool, move |conn| {
            stats::complaint_summary(conn, Some(&complaints_faculty))
        }),
        stats::run_blocking(pool, move |conn| {
            stats::enrolled_students(conn, &classes_faculty)
        }),
    )?;

    Ok(Json(FacultyStats {
        faculty,
        users,
        reports,
        complaints,
        enrolled_students,
    }))
}

/// Landing-page counters; served without authentication.
pub async fn public_stats(State(state): State<AppState>) -> AppResult<Json<PublicStats>> {
    let summary = stats::run_blocking(&state.pool, stats::public_summary).await?;
    Ok(Json(PublicStats { stats: summary }))
}
