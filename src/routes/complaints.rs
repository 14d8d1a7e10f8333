use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult, JsonBody},
    models::{Complaint, ComplaintResponse, NewComplaint, NewComplaintResponse, User},
    notify,
    schema::{complaint_responses, complaints, users},
    state::AppState,
    stats::{self, ComplaintSummary},
    utils::text::{self, non_blank},
    workflow::{ComplaintPriority, ComplaintStatus, Operation, Role, WorkflowError},
};

const DEFAULT_CATEGORY: &str = "general";
const ANONYMOUS: &str = "Anonymous";

#[derive(Deserialize)]
pub struct CreateComplaintRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub against_user_id: Uuid,
    pub against_role: String,
    pub category: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub response_text: String,
}

#[derive(Deserialize)]
pub struct UpdateComplaintRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = complaints)]
struct ComplaintChangeset<'a> {
    status: Option<&'a str>,
    priority: Option<&'a str>,
    updated_at: NaiveDateTime,
}

#[derive(Serialize)]
pub struct ComplaintCreated {
    pub message: String,
    pub complaint: Complaint,
}

#[derive(Serialize)]
pub struct ComplaintEntry {
    #[serde(flatten)]
    pub complaint: Complaint,
    pub counterpart_name: String,
    pub counterpart_faculty: String,
}

#[derive(Serialize)]
pub struct ComplaintList {
    pub complaints: Vec<ComplaintEntry>,
}

#[derive(Serialize)]
pub struct ResponseCreated {
    pub message: String,
    pub response: ComplaintResponse,
    pub complaint_status: String,
}

#[derive(Serialize)]
pub struct ResponseEntry {
    #[serde(flatten)]
    pub response: ComplaintResponse,
    pub responder_name: String,
    pub responder_role: String,
}

#[derive(Serialize)]
pub struct ResponseList {
    pub responses: Vec<ResponseEntry>,
}

#[derive(Serialize)]
pub struct ComplaintDetail {
    pub complaint: Complaint,
}

#[derive(Serialize)]
pub struct ComplaintStatsResponse {
    pub stats: ComplaintSummary,
}

pub async fn create_complaint(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(payload), _): JsonBody<CreateComplaintRequest>,
) -> AppResult<(StatusCode, Json<ComplaintCreated>)> {
    let actor = user.actor();
    actor.require(Operation::FileComplaint)?;

    let title = non_blank(payload.title)
        .ok_or_else(|| AppError::bad_request("All complaint fields are required"))?;
    let description = non_blank(payload.description)
        .ok_or_else(|| AppError::bad_request("All complaint fields are required"))?;
    text::check_length("title", &title, 255).map_err(AppError::bad_request)?;
    let category = text::optional_max("category", payload.category, 64)
        .map_err(AppError::bad_request)?
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    // A role outside the enum can never be a valid route.
    let against_role: Role = payload
        .against_role
        .parse()
        .map_err(|_| WorkflowError::InvalidRoute)?;
    actor.authorize_route(payload.against_user_id, against_role)?;

    let mut conn = state.db()?;
    let target = users::table
        .find(payload.against_user_id)
        .first::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_entity("Target user"))?;
    if target.role != against_role.as_str() {
        return Err(AppError::bad_request(format!(
            "Target user is not a {against_role}"
        )));
    }

    let complaint: Complaint = diesel::insert_into(complaints::table)
        .values(&NewComplaint {
            id: Uuid::new_v4(),
            title,
            description,
            complainant_id: actor.id,
            complainant_role: actor.role.as_str().to_string(),
            against_user_id: target.id,
            against_role: against_role.as_str().to_string(),
            category,
            is_anonymous: payload.is_anonymous,
            status: ComplaintStatus::INITIAL.as_str().to_string(),
        })
        .get_result(&mut conn)?;

    tracing::info!(
        complaint_id = %complaint.id,
        complainant_role = %actor.role,
        against_role = %against_role,
        "complaint filed"
    );

    Ok((
        StatusCode::CREATED,
        Json(ComplaintCreated {
            message: "Complaint submitted successfully".to_string(),
            complaint,
        }),
    ))
}

pub async fn my_complaints(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ComplaintList>> {
    user.actor().require(Operation::ListOwnComplaints)?;

    let mut conn = state.db()?;
    let rows: Vec<(Complaint, String, String)> = complaints::table
        .inner_join(users::table.on(users::id.eq(complaints::against_user_id)))
        .filter(complaints::complainant_id.eq(user.id))
        .order(complaints::created_at.desc())
        .select((complaints::all_columns, users::name, users::faculty))
        .load(&mut conn)?;

    let complaints = rows
        .into_iter()
        .map(|(complaint, name, faculty)| ComplaintEntry {
            complaint,
            counterpart_name: name,
            counterpart_faculty: faculty,
        })
        .collect();
    Ok(Json(ComplaintList { complaints }))
}

/// Complaints waiting on the caller's review level; anonymous complainants
/// are masked.
pub async fn complaints_for_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ComplaintList>> {
    let actor = user.actor();
    actor.require(Operation::ReviewComplaints)?;
    let scope = actor
        .complaint_review_scope()
        .ok_or_else(AppError::forbidden)?;

    let mut conn = state.db()?;
    let mut query = complaints::table
        .inner_join(users::table.on(users::id.eq(complaints::complainant_id)))
        .filter(complaints::against_role.eq(scope.target.as_str()))
        .order(complaints::created_at.desc())
        .select((complaints::all_columns, users::name, users::faculty))
        .into_boxed();
    if let Some(faculty) = scope.faculty {
        query = query.filter(users::faculty.eq(faculty));
    }
    let rows: Vec<(Complaint, String, String)> = query.load(&mut conn)?;

    let complaints = rows
        .into_iter()
        .map(|(complaint, name, faculty)| {
            let counterpart_name = if complaint.is_anonymous {
                ANONYMOUS.to_string()
            } else {
                name
            };
            ComplaintEntry {
                complaint,
                counterpart_name,
                counterpart_faculty: faculty,
            }
        })
        .collect();
    Ok(Json(ComplaintList { complaints }))
}

pub async fn respond_to_complaint(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(complaint_id): Path<Uuid>,
    WithRejection(Json(payload), _): JsonBody<RespondRequest>,
) -> AppResult<(StatusCode, Json<ResponseCreated>)> {
    let actor = user.actor();
    actor.require(Operation::RespondToComplaint)?;

    let response_text = non_blank(Some(payload.response_text))
        .ok_or_else(|| AppError::bad_request("response_text is required"))?;

    let mut conn = state.db()?;
    let (response, complaint) = conn.transaction::<_, AppError, _>(|conn| {
        let complaint = complaints::table
            .find(complaint_id)
            .for_update()
            .first::<Complaint>(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found_entity("Complaint"))?;
        let current: ComplaintStatus = complaint.status.parse()?;
        let next = current.respond();

        let response = diesel::insert_into(complaint_responses::table)
            .values(&NewComplaintResponse {
                id: Uuid::new_v4(),
                complaint_id: complaint.id,
                responder_id: actor.id,
                response_text,
            })
            .get_result::<ComplaintResponse>(conn)?;

        let complaint = diesel::update(complaints::table.find(complaint.id))
            .set((
                complaints::status.eq(next.as_str()),
                complaints::updated_at.eq(Utc::now().naive_utc()),
            ))
            .get_result::<Complaint>(conn)?;
        Ok((response, complaint))
    })?;

    tracing::info!(
        complaint_id = %complaint.id,
        responder_id = %actor.id,
        status = %complaint.status,
        "complaint answered"
    );

    notify::notify_user(
        &state,
        &mut conn,
        complaint.complainant_id,
        "Complaint response",
        &format!("Your complaint \"{}\" received a response", complaint.title),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ResponseCreated {
            message: "Response added successfully".to_string(),
            response,
            complaint_status: complaint.status,
        }),
    ))
}

pub async fn complaint_responses(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(complaint_id): Path<Uuid>,
) -> AppResult<Json<ResponseList>> {
    let actor = user.actor();
    actor.require(Operation::ViewComplaintResponses)?;

    let mut conn = state.db()?;
    let complaint = complaints::table
        .find(complaint_id)
        .first::<Complaint>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_entity("Complaint"))?;
    if complaint.complainant_id != actor.id && !actor.can(Operation::ReviewComplaints) {
        return Err(AppError::forbidden());
    }

    let rows: Vec<(ComplaintResponse, String, String)> = complaint_responses::table
        .inner_join(users::table)
        .filter(complaint_responses::complaint_id.eq(complaint_id))
        .order(complaint_responses::created_at.asc())
        .select((complaint_responses::all_columns, users::name, users::role))
        .load(&mut conn)?;

    let responses = rows
        .into_iter()
        .map(|(response, responder_name, responder_role)| ResponseEntry {
            response,
            responder_name,
            responder_role,
        })
        .collect();
    Ok(Json(ResponseList { responses }))
}

pub async fn update_complaint(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(complaint_id): Path<Uuid>,
    WithRejection(Json(payload), _): JsonBody<UpdateComplaintRequest>,
) -> AppResult<Json<ComplaintDetail>> {
    let actor = user.actor();
    actor.require(Operation::UpdateComplaint)?;

    let requested_status = payload
        .status
        .as_deref()
        .map(str::parse::<ComplaintStatus>)
        .transpose()?;
    let priority = payload
        .priority
        .as_deref()
        .map(str::parse::<ComplaintPriority>)
        .transpose()?;
    if requested_status.is_none() && priority.is_none() {
        return Err(AppError::bad_request("No valid fields to update"));
    }

    let mut conn = state.db()?;
    let complaint = conn.transaction::<_, AppError, _>(|conn| {
        let existing = complaints::table
            .find(complaint_id)
            .for_update()
            .first::<Complaint>(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found_entity("Complaint"))?;

        let status = match requested_status {
            Some(next) => {
                let current: ComplaintStatus = existing.status.parse()?;
                Some(current.transition_to(next)?)
            }
            None => None,
        };

        let changes = ComplaintChangeset {
            status: status.map(ComplaintStatus::as_str),
            priority: priority.map(ComplaintPriority::as_str),
            updated_at: Utc::now().naive_utc(),
        };
        Ok(diesel::update(complaints::table.find(existing.id))
            .set(&changes)
            .get_result::<Complaint>(conn)?)
    })?;

    tracing::info!(
        complaint_id = %complaint.id,
        actor_id = %actor.id,
        status = %complaint.status,
        priority = %complaint.priority,
        "complaint updated"
    );

    Ok(Json(ComplaintDetail { complaint }))
}

pub async fn complaint_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ComplaintStatsResponse>> {
    user.actor().require(Operation::ViewStatistics)?;

    let mut conn = state.db()?;
    let summary = stats::complaint_summary(&mut conn, None)?;
    Ok(Json(ComplaintStatsResponse { stats: summary }))
}
