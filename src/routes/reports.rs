use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult, JsonBody},
    models::{LectureReport, NewLectureReport},
    notify,
    schema::lecture_reports,
    state::AppState,
    stats::{self, ReportSummary},
    utils::text::{self, non_blank},
    workflow::{Actor, Operation, ReportAction, ReportStatus},
};

#[derive(Debug, Default, Deserialize)]
pub struct CreateReportRequest {
    pub faculty_name: Option<String>,
    pub class_name: Option<String>,
    pub week_of_reporting: Option<String>,
    pub date_of_lecture: Option<String>,
    pub course_name: Option<String>,
    pub course_code: Option<String>,
    pub students_present: Option<i32>,
    pub total_students: Option<i32>,
    pub venue: Option<String>,
    pub scheduled_time: Option<String>,
    pub topic_taught: Option<String>,
    pub learning_outcomes: Option<String>,
    pub recommendations: Option<String>,
}

impl CreateReportRequest {
    /// Validates the submission and builds the row, authored by `actor`.
    pub fn into_new_report(self, actor: &Actor) -> AppResult<NewLectureReport> {
        let faculty_name = required_max("faculty_name", self.faculty_name, 64)?;
        let class_name = required_max("class_name", self.class_name, 255)?;
        let week_of_reporting = required_max("week_of_reporting", self.week_of_reporting, 32)?;
        let date_of_lecture = parse_lecture_date(&required("date_of_lecture", self.date_of_lecture)?)?;
        let course_name = required_max("course_name", self.course_name, 255)?;
        let course_code = required_max("course_code", self.course_code, 32)?;
        let students_present = self
            .students_present
            .ok_or_else(|| AppError::bad_request("students_present is required"))?;
        let total_students = self
            .total_students
            .ok_or_else(|| AppError::bad_request("total_students is required"))?;
        let venue = required_max("venue", self.venue, 255)?;
        let scheduled_time = required_max("scheduled_time", self.scheduled_time, 64)?;
        let topic_taught = required("topic_taught", self.topic_taught)?;
        let learning_outcomes = required("learning_outcomes", self.learning_outcomes)?;

        if total_students <= 0 {
            return Err(AppError::bad_request(
                "total_students must be greater than zero",
            ));
        }
        if students_present < 0 {
            return Err(AppError::bad_request("students_present cannot be negative"));
        }
        if students_present > total_students {
            return Err(AppError::bad_request(
                "Students present cannot exceed total students",
            ));
        }

        Ok(NewLectureReport {
            id: Uuid::new_v4(),
            faculty_name,
            class_name,
            week_of_reporting,
            date_of_lecture,
            course_name,
            course_code,
            lecturer_id: actor.id,
            lecturer_name: actor.name.clone(),
            students_present,
            total_students,
            venue,
            scheduled_time,
            topic_taught,
            learning_outcomes,
            recommendations: non_blank(self.recommendations),
            status: ReportStatus::INITIAL.as_str().to_string(),
        })
    }
}

fn required(field: &str, value: Option<String>) -> AppResult<String> {
    text::required(field, value).map_err(AppError::bad_request)
}

fn required_max(field: &str, value: Option<String>, max: usize) -> AppResult<String> {
    text::required_max(field, value, max).map_err(AppError::bad_request)
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time component.
fn parse_lecture_date(raw: &str) -> AppResult<NaiveDate> {
    raw.get(..10)
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .ok_or_else(|| AppError::bad_request("date_of_lecture must be a YYYY-MM-DD date"))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub feedback_prl: Option<String>,
    pub feedback_pl: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = lecture_reports)]
struct StatusChangeset<'a> {
    status: &'a str,
    feedback_prl: Option<String>,
    feedback_pl: Option<String>,
    updated_at: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub message: String,
    pub report: LectureReport,
}

#[derive(Serialize)]
pub struct ReportDetail {
    pub report: LectureReport,
}

#[derive(Serialize)]
pub struct ReportList {
    pub reports: Vec<LectureReport>,
}

#[derive(Serialize)]
pub struct ReportStatsResponse {
    pub stats: ReportSummary,
    pub by_faculty: Vec<stats::FacultyCount>,
}

pub async fn create_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(payload), _): JsonBody<CreateReportRequest>,
) -> AppResult<(StatusCode, Json<ReportResponse>)> {
    let actor = user.actor();
    actor.require(Operation::CreateReport)?;

    let new_report = payload.into_new_report(&actor)?;
    let mut conn = state.db()?;
    let report: LectureReport = diesel::insert_into(lecture_reports::table)
        .values(&new_report)
        .get_result(&mut conn)?;

    tracing::info!(
        report_id = %report.id,
        lecturer_id = %actor.id,
        faculty = %report.faculty_name,
        "lecture report submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(ReportResponse {
            message: "Report created successfully and sent for student approval".to_string(),
            report,
        }),
    ))
}

pub async fn list_reports(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ReportList>> {
    user.actor().require(Operation::ListAllReports)?;

    let mut conn = state.db()?;
    let reports = lecture_reports::table
        .order(lecture_reports::created_at.desc())
        .load(&mut conn)?;
    Ok(Json(ReportList { reports }))
}

pub async fn my_reports(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ReportList>> {
    user.actor().require(Operation::ListOwnReports)?;

    let mut conn = state.db()?;
    let reports = lecture_reports::table
        .filter(lecture_reports::lecturer_id.eq(user.id))
        .order(lecture_reports::created_at.desc())
        .load(&mut conn)?;
    Ok(Json(ReportList { reports }))
}

pub async fn get_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<ReportDetail>> {
    user.actor().require(Operation::ViewReport)?;

    let mut conn = state.db()?;
    let report = lecture_reports::table
        .find(report_id)
        .first::<LectureReport>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_entity("Report"))?;
    Ok(Json(ReportDetail { report }))
}

pub async fn reports_by_faculty(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(faculty): Path<String>,
) -> AppResult<Json<ReportList>> {
    user.actor().require(Operation::ListAllReports)?;

    let mut conn = state.db()?;
    let reports = lecture_reports::table
        .filter(lecture_reports::faculty_name.eq(&faculty))
        .order(lecture_reports::created_at.desc())
        .load(&mut conn)?;
    Ok(Json(ReportList { reports }))
}

pub async fn search_reports(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<ReportList>> {
    user.actor().require(Operation::ListAllReports)?;

    let term = params
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::bad_request("search query is required"))?;
    let pattern = format!("%{term}%");

    let mut conn = state.db()?;
    let reports = lecture_reports::table
        .filter(
            lecture_reports::course_name
                .ilike(&pattern)
                .or(lecture_reports::course_code.ilike(&pattern))
                .or(lecture_reports::lecturer_name.ilike(&pattern))
                .or(lecture_reports::class_name.ilike(&pattern))
                .or(lecture_reports::topic_taught.ilike(&pattern)),
        )
        .order(lecture_reports::created_at.desc())
        .load(&mut conn)?;
    Ok(Json(ReportList { reports }))
}

pub async fn report_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ReportStatsResponse>> {
    user.actor().require(Operation::ViewStatistics)?;

    let mut conn = state.db()?;
    let summary = stats::report_summary(&mut conn, None)?;
    let by_faculty = stats::reports_per_faculty(&mut conn)?;
    Ok(Json(ReportStatsResponse {
        stats: summary,
        by_faculty,
    }))
}

/// Reports in the student's faculty that still wait for a class
/// representative's signature.
pub async fn pending_signature(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ReportList>> {
    user.actor().require(Operation::ListPendingSignatures)?;

    let mut conn = state.db()?;
    let reports = lecture_reports::table
        .filter(lecture_reports::status.eq(ReportStatus::PendingStudentApproval.as_str()))
        .filter(lecture_reports::faculty_name.eq(&user.faculty))
        .order(lecture_reports::created_at.desc())
        .load(&mut conn)?;
    Ok(Json(ReportList { reports }))
}

pub async fn reports_for_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ReportList>> {
    let actor = user.actor();
    actor.require(Operation::ReviewReports)?;
    let scope = actor.report_review_scope().ok_or_else(AppError::forbidden)?;

    let mut conn = state.db()?;
    let mut query = lecture_reports::table
        .filter(lecture_reports::status.eq(scope.target.as_str()))
        .order(lecture_reports::created_at.desc())
        .into_boxed();
    if let Some(faculty) = scope.faculty {
        query = query.filter(lecture_reports::faculty_name.eq(faculty));
    }
    let reports = query.load(&mut conn)?;
    Ok(Json(ReportList { reports }))
}

pub async fn update_report_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(report_id): Path<Uuid>,
    WithRejection(Json(payload), _): JsonBody<UpdateStatusRequest>,
) -> AppResult<Json<ReportResponse>> {
    let actor = user.actor();
    actor.require(Operation::UpdateReportStatus)?;

    let target: ReportStatus = payload.status.parse()?;
    let action = ReportAction::for_target(target)?;

    let mut conn = state.db()?;
    let (report, previous) = conn.transaction::<_, AppError, _>(|conn| {
        let current = lecture_reports::table
            .find(report_id)
            .for_update()
            .first::<LectureReport>(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found_entity("Report"))?;
        let previous: ReportStatus = current.status.parse()?;
        let next = actor.authorize_transition(previous, action)?;

        let changes = StatusChangeset {
            status: next.as_str(),
            feedback_prl: non_blank(payload.feedback_prl),
            feedback_pl: non_blank(payload.feedback_pl),
            updated_at: Utc::now().naive_utc(),
        };
        let updated = diesel::update(lecture_reports::table.find(report_id))
            .set(&changes)
            .get_result::<LectureReport>(conn)?;
        Ok((updated, previous))
    })?;

    tracing::info!(
        report_id = %report.id,
        actor_id = %actor.id,
        from = %previous,
        to = %report.status,
        "report status changed"
    );

    notify::notify_user(
        &state,
        &mut conn,
        report.lecturer_id,
        "Report status updated",
        &format!(
            "Your report for {} ({}) is now {}",
            report.course_name, report.week_of_reporting, report.status
        ),
    )
    .await?;

    Ok(Json(ReportResponse {
        message: format!("Report status updated to {}", report.status),
        report,
    }))
}
