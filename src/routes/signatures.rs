use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{is_unique_violation, AppError, AppResult, JsonBody},
    models::{LectureReport, NewStudentSignature, StudentSignature},
    notify,
    schema::{lecture_reports, student_signatures, users},
    state::AppState,
    workflow::{Operation, ReportAction, ReportStatus, WorkflowError},
};

#[derive(Deserialize)]
pub struct SignReportRequest {
    pub report_id: Uuid,
    pub signature_data: String,
}

#[derive(Serialize)]
pub struct SignatureResponse {
    pub message: String,
    pub signature: StudentSignature,
}

#[derive(Serialize)]
pub struct SignatureEntry {
    pub id: Uuid,
    pub report_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub signature_data: String,
    pub signed_at: NaiveDateTime,
}

#[derive(Serialize)]
pub struct SignatureList {
    pub signatures: Vec<SignatureEntry>,
}

/// Signatures are either typed names or canvas captures sent as
/// `data:image/png;base64,...`. Captures must carry a decodable payload.
fn validate_signature_data(raw: &str) -> AppResult<String> {
    let data = raw.trim();
    if data.is_empty() {
        return Err(AppError::bad_request("signature_data is required"));
    }

    if let Some(rest) = data.strip_prefix("data:") {
        let (_, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| AppError::bad_request("signature_data must be a base64 data URL"))?;
        let decoded = STANDARD
            .decode(payload)
            .map_err(|_| AppError::bad_request("signature_data is not valid base64"))?;
        if decoded.is_empty() {
            return Err(AppError::bad_request("signature_data is empty"));
        }
    }

    Ok(data.to_string())
}

pub async fn sign_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(payload), _): JsonBody<SignReportRequest>,
) -> AppResult<(StatusCode, Json<SignatureResponse>)> {
    let actor = user.actor();
    actor.require(Operation::SignReport)?;
    let signature_data = validate_signature_data(&payload.signature_data)?;

    let mut conn = state.db()?;
    let (signature, report) = conn.transaction::<_, AppError, _>(|conn| {
        let report = lecture_reports::table
            .find(payload.report_id)
            .for_update()
            .first::<LectureReport>(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found_entity("Report"))?;
        // Repeat attempts are conflicts whatever state the report reached since.
        let already_signed = diesel::select(diesel::dsl::exists(
            student_signatures::table
                .filter(student_signatures::report_id.eq(report.id))
                .filter(student_signatures::student_id.eq(actor.id)),
        ))
        .get_result::<bool>(conn)?;
        if already_signed {
            return Err(WorkflowError::AlreadySigned.into());
        }

        let current: ReportStatus = report.status.parse()?;
        let next = actor.authorize_transition(current, ReportAction::Sign)?;

        let signature = diesel::insert_into(student_signatures::table)
            .values(&NewStudentSignature {
                id: Uuid::new_v4(),
                report_id: report.id,
                student_id: actor.id,
                signature_data,
            })
            .get_result::<StudentSignature>(conn)
            .map_err(|err| {
                if is_unique_violation(&err) {
                    AppError::from(WorkflowError::AlreadySigned)
                } else {
                    AppError::from(err)
                }
            })?;

        let report = if next != current {
            diesel::update(lecture_reports::table.find(report.id))
                .set((
                    lecture_reports::status.eq(next.as_str()),
                    lecture_reports::updated_at.eq(Utc::now().naive_utc()),
                ))
                .get_result::<LectureReport>(conn)?
        } else {
            report
        };
        Ok((signature, report))
    })?;

    tracing::info!(
        report_id = %report.id,
        student_id = %actor.id,
        status = %report.status,
        "report signed by class representative"
    );

    notify::notify_user(
        &state,
        &mut conn,
        report.lecturer_id,
        "Report signed",
        &format!(
            "{} signed your report for {} ({})",
            actor.name, report.course_name, report.week_of_reporting
        ),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignatureResponse {
            message: "Signature added successfully and report approved".to_string(),
            signature,
        }),
    ))
}

pub async fn report_signatures(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<SignatureList>> {
    user.actor().require(Operation::ViewSignatures)?;

    let mut conn = state.db()?;
    let rows: Vec<(StudentSignature, String)> = student_signatures::table
        .inner_join(users::table)
        .filter(student_signatures::report_id.eq(report_id))
        .order(student_signatures::signed_at.asc())
        .select((student_signatures::all_columns, users::name))
        .load(&mut conn)?;

    let signatures = rows
        .into_iter()
        .map(|(signature, student_name)| SignatureEntry {
            id: signature.id,
            report_id: signature.report_id,
            student_id: signature.student_id,
            student_name,
            signature_data: signature.signature_data,
            signed_at: signature.signed_at,
        })
        .collect();
    Ok(Json(SignatureList { signatures }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_signatures_are_accepted_verbatim() {
        assert_eq!(
            validate_signature_data("  Thabo Molefe ").unwrap(),
            "Thabo Molefe"
        );
    }

    #[test]
    fn canvas_captures_must_decode() {
        assert!(validate_signature_data("data:image/png;base64,iVBORw0KGgo=").is_ok());
        assert!(validate_signature_data("data:image/png;base64,@@@").is_err());
        assert!(validate_signature_data("data:image/png,raw").is_err());
    }

    #[test]
    fn blank_signatures_are_rejected() {
        let err = validate_signature_data("   ").unwrap_err();
        assert_eq!(err.message(), "signature_data is required");
    }
}
