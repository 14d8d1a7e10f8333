use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
    Json,
};
use bytes::Bytes;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    export::{self, XLSX_CONTENT_TYPE},
    models::{Complaint, LectureReport, Rating},
    schema::{complaints, lecture_reports, ratings},
    state::AppState,
    workflow::Operation,
};

const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.');

fn attachment_disposition(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();

    let encoded = utf8_percent_encode(&sanitized, FILENAME_ENCODE_SET);
    format!("attachment; filename=\"{sanitized}\"; filename*=UTF-8''{encoded}")
}

fn dated_filename(stem: &str) -> String {
    format!("{stem}-{}.xlsx", Utc::now().format("%Y-%m-%d"))
}

fn xlsx_response(filename: &str, bytes: Vec<u8>) -> AppResult<Response> {
    let body = Bytes::from(bytes);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, XLSX_CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, attachment_disposition(filename))
        .body(Body::from(body))
        .map_err(AppError::internal)
}

pub async fn download_reports(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Response> {
    let actor = user.actor();
    actor.require(Operation::ExportRecords)?;

    let mut conn = state.db()?;
    let reports: Vec<LectureReport> = lecture_reports::table
        .order(lecture_reports::created_at.desc())
        .load(&mut conn)?;
    drop(conn);

    let bytes = export::reports_workbook(&reports)?;
    tracing::info!(
        actor_id = %actor.id,
        rows = reports.len(),
        size_bytes = bytes.len(),
        "report export generated"
    );
    xlsx_response(&dated_filename("lecture-reports"), bytes)
}

pub async fn download_complaints(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Response> {
    let actor = user.actor();
    actor.require(Operation::ExportRecords)?;

    let mut conn = state.db()?;
    let complaints: Vec<Complaint> = complaints::table
        .order(complaints::created_at.desc())
        .load(&mut conn)?;
    drop(conn);

    let bytes = export::complaints_workbook(&complaints)?;
    tracing::info!(
        actor_id = %actor.id,
        rows = complaints.len(),
        size_bytes = bytes.len(),
        "complaint export generated"
    );
    xlsx_response(&dated_filename("complaints"), bytes)
}

#[derive(Serialize)]
pub struct PersonalData {
    pub user: AuthenticatedUser,
    pub reports: Vec<LectureReport>,
    pub complaints: Vec<Complaint>,
    pub ratings: Vec<Rating>,
}

#[derive(Serialize)]
pub struct PersonalDataResponse {
    pub message: String,
    pub data: PersonalData,
    pub downloaded_at: NaiveDateTime,
}

pub async fn download_my_data(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<PersonalDataResponse>> {
    let actor = user.actor();
    actor.require(Operation::ExportOwnData)?;

    let mut conn = state.db()?;
    let reports: Vec<LectureReport> = if actor.can(Operation::ListOwnReports) {
        lecture_reports::table
            .filter(lecture_reports::lecturer_id.eq(actor.id))
            .order(lecture_reports::created_at.desc())
            .load(&mut conn)?
    } else {
        Vec::new()
    };
    let complaints: Vec<Complaint> = complaints::table
        .filter(complaints::complainant_id.eq(actor.id))
        .order(complaints::created_at.desc())
        .load(&mut conn)?;
    let ratings: Vec<Rating> = ratings::table
        .filter(ratings::rater_id.eq(actor.id))
        .order(ratings::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(PersonalDataResponse {
        message: "User data retrieved successfully".to_string(),
        data: PersonalData {
            user,
            reports,
            complaints,
            ratings,
        },
        downloaded_at: Utc::now().naive_utc(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_escapes_quotes_and_encodes_utf8() {
        let value = attachment_disposition("rapport \"é\".xlsx");
        assert!(value.starts_with("attachment; filename=\"rapport _é_.xlsx\""));
        assert!(value.contains("filename*=UTF-8''rapport%20_%C3%A9_.xlsx"));
    }

    #[test]
    fn export_filenames_carry_the_date() {
        let name = dated_filename("complaints");
        assert!(name.starts_with("complaints-"));
        assert!(attachment_disposition(&name).contains(&format!("filename*=UTF-8''{name}")));
        assert!(name.ends_with(".xlsx"));
        assert_eq!(name.len(), "complaints-2024-01-01.xlsx".len());
    }
}
