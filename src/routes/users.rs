use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::{NaiveDateTime, Utc};
use diesel::{pg::PgConnection, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult, JsonBody},
    models::{Notification, User, UserProfile},
    notify,
    routes::auth::{insert_user, RegisterRequest},
    schema::{notifications, users},
    state::AppState,
    utils::json::{classify_nullable, optional_bool, optional_string},
    workflow::{Operation, Role},
};

const NOTIFICATION_LIMIT: i64 = 50;

#[derive(Deserialize)]
pub struct RoleFilter {
    pub faculty: Option<String>,
}

#[derive(Deserialize)]
pub struct BulkApproveRequest {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

#[derive(AsChangeset)]
#[diesel(table_name = users)]
struct UserChangeset {
    name: Option<String>,
    faculty: Option<String>,
    program: Option<Option<String>>,
    class_id: Option<Option<String>>,
    is_approved: Option<bool>,
    updated_at: NaiveDateTime,
}

impl UserChangeset {
    fn from_body(body: &Value, admin: bool) -> AppResult<Self> {
        let changes = UserChangeset {
            name: optional_string(body, "name").map_err(AppError::bad_request)?,
            faculty: if admin {
                optional_string(body, "faculty").map_err(AppError::bad_request)?
            } else {
                None
            },
            program: classify_nullable(body.get("program"))
                .map_err(AppError::bad_request)?
                .into_change(),
            class_id: classify_nullable(body.get("class_id"))
                .map_err(AppError::bad_request)?
                .into_change(),
            is_approved: if admin {
                optional_bool(body, "is_approved").map_err(AppError::bad_request)?
            } else {
                None
            },
            updated_at: Utc::now().naive_utc(),
        };

        if changes.name.is_none()
            && changes.faculty.is_none()
            && changes.program.is_none()
            && changes.class_id.is_none()
            && changes.is_approved.is_none()
        {
            return Err(AppError::bad_request("No valid fields to update"));
        }
        Ok(changes)
    }
}

#[derive(Serialize)]
pub struct UserList {
    pub users: Vec<UserProfile>,
}

#[derive(Serialize)]
pub struct UserDetail {
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct UserUpdated {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct BulkApproveResponse {
    pub message: String,
    pub approved: usize,
}

#[derive(Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread: usize,
}

#[derive(Serialize)]
pub struct NotificationDetail {
    pub notification: Notification,
}

fn profiles(rows: Vec<User>) -> Vec<UserProfile> {
    rows.into_iter().map(UserProfile::from).collect()
}

fn load_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<User> {
    users::table
        .find(user_id)
        .first::<User>(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_entity("User"))
}

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<UserList>> {
    user.actor().require(Operation::ListUsers)?;

    let mut conn = state.db()?;
    let rows = users::table
        .order((users::role.asc(), users::name.asc()))
        .load(&mut conn)?;
    Ok(Json(UserList {
        users: profiles(rows),
    }))
}

/// Account creation by faculty management; any role, approved on creation.
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(payload), _): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserUpdated>)> {
    let actor = user.actor();
    actor.require(Operation::CreateUser)?;

    let new_user = payload.into_new_user(Some(true))?;
    let mut conn = state.db()?;
    let created = insert_user(&mut conn, &new_user)?;
    tracing::info!(
        user_id = %created.id,
        role = %created.role,
        created_by = %actor.id,
        "account created by administrator"
    );

    Ok((
        StatusCode::CREATED,
        Json(UserUpdated {
            message: "User created successfully".to_string(),
            user: created.into(),
        }),
    ))
}

pub async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserDetail>> {
    user.actor().require(Operation::ViewUser)?;

    let mut conn = state.db()?;
    let found = load_user(&mut conn, user_id)?;
    Ok(Json(UserDetail { user: found.into() }))
}

pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
    WithRejection(Json(body), _): JsonBody<Value>,
) -> AppResult<Json<UserUpdated>> {
    user.actor().require(Operation::UpdateUser)?;

    let changes = UserChangeset::from_body(&body, true)?;
    let mut conn = state.db()?;
    let updated = diesel::update(users::table.find(user_id))
        .set(&changes)
        .get_result::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_entity("User"))?;

    Ok(Json(UserUpdated {
        message: "User updated successfully".to_string(),
        user: updated.into(),
    }))
}

pub async fn users_by_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(role): Path<String>,
    Query(filter): Query<RoleFilter>,
) -> AppResult<Json<UserList>> {
    user.actor().require(Operation::ViewUser)?;
    let role: Role = role.parse()?;

    let mut conn = state.db()?;
    let mut query = users::table
        .filter(users::role.eq(role.as_str()))
        .filter(users::is_approved.eq(true))
        .order(users::name.asc())
        .into_boxed();
    if let Some(faculty) = filter.faculty.filter(|f| !f.trim().is_empty()) {
        query = query.filter(users::faculty.eq(faculty));
    }
    let rows = query.load(&mut conn)?;
    Ok(Json(UserList {
        users: profiles(rows),
    }))
}

/// Student accounts in the program leader's faculty that still wait for
/// approval.
pub async fn pending_class_reps(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<UserList>> {
    user.actor().require(Operation::ApproveStudents)?;

    let mut conn = state.db()?;
    let rows = users::table
        .filter(users::role.eq(Role::Student.as_str()))
        .filter(users::is_approved.eq(false))
        .filter(users::faculty.eq(&user.faculty))
        .order(users::created_at.asc())
        .load(&mut conn)?;
    Ok(Json(UserList {
        users: profiles(rows),
    }))
}

pub async fn approve_student(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserUpdated>> {
    let actor = user.actor();
    actor.require(Operation::ApproveStudents)?;

    let mut conn = state.db()?;
    let student = load_user(&mut conn, user_id)?;
    let role: Role = student.role.parse()?;
    if !role.requires_approval() {
        return Err(AppError::bad_request(
            "Only student accounts require approval",
        ));
    }

    let approved = diesel::update(users::table.find(student.id))
        .set((
            users::is_approved.eq(true),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result::<User>(&mut conn)?;

    tracing::info!(user_id = %approved.id, approved_by = %actor.id, "student approved");

    notify::notify_user(
        &state,
        &mut conn,
        approved.id,
        "Account approved",
        "Your class representative account has been approved. You can now sign in.",
    )
    .await?;

    Ok(Json(UserUpdated {
        message: "Class representative approved successfully".to_string(),
        user: approved.into(),
    }))
}

pub async fn bulk_approve_students(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(payload), _): JsonBody<BulkApproveRequest>,
) -> AppResult<Json<BulkApproveResponse>> {
    let actor = user.actor();
    actor.require(Operation::ApproveStudents)?;

    if payload.user_ids.is_empty() {
        return Err(AppError::bad_request("User IDs array is required"));
    }

    let mut conn = state.db()?;
    let approved: Vec<Uuid> = diesel::update(
        users::table
            .filter(users::id.eq_any(payload.user_ids))
            .filter(users::role.eq(Role::Student.as_str()))
            .filter(users::is_approved.eq(false)),
    )
    .set((
        users::is_approved.eq(true),
        users::updated_at.eq(Utc::now().naive_utc()),
    ))
    .returning(users::id)
    .get_results(&mut conn)?;

    tracing::info!(count = approved.len(), approved_by = %actor.id, "students approved in bulk");

    for student_id in &approved {
        notify::notify_user(
            &state,
            &mut conn,
            *student_id,
            "Account approved",
            "Your class representative account has been approved. You can now sign in.",
        )
        .await?;
    }

    Ok(Json(BulkApproveResponse {
        message: format!("{} class representatives approved", approved.len()),
        approved: approved.len(),
    }))
}

pub async fn my_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<UserDetail>> {
    let mut conn = state.db()?;
    let found = load_user(&mut conn, user.id)?;
    Ok(Json(UserDetail { user: found.into() }))
}

pub async fn update_my_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(body), _): JsonBody<Value>,
) -> AppResult<Json<UserUpdated>> {
    let changes = UserChangeset::from_body(&body, false)?;
    let mut conn = state.db()?;
    let updated = diesel::update(users::table.find(user.id))
        .set(&changes)
        .get_result::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_entity("User"))?;

    Ok(Json(UserUpdated {
        message: "Profile updated successfully".to_string(),
        user: updated.into(),
    }))
}

pub async fn my_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<NotificationList>> {
    let mut conn = state.db()?;
    let notifications: Vec<Notification> = notifications::table
        .filter(notifications::user_id.eq(user.id))
        .order(notifications::created_at.desc())
        .limit(NOTIFICATION_LIMIT)
        .load(&mut conn)?;
    let unread = notifications.iter().filter(|n| !n.is_read).count();
    Ok(Json(NotificationList {
        notifications,
        unread,
    }))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<NotificationDetail>> {
    let mut conn = state.db()?;
    let notification = diesel::update(
        notifications::table
            .filter(notifications::id.eq(notification_id))
            .filter(notifications::user_id.eq(user.id)),
    )
    .set(notifications::is_read.eq(true))
    .get_result::<Notification>(&mut conn)
    .optional()?
    .ok_or_else(|| AppError::not_found_entity("Notification"))?;
    Ok(Json(NotificationDetail { notification }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn self_service_cannot_touch_admin_fields() {
        let body = json!({ "is_approved": true, "faculty": "FBMG" });
        let err = UserChangeset::from_body(&body, false).err().unwrap();
        assert_eq!(err.message(), "No valid fields to update");

        let changes = UserChangeset::from_body(&body, true).unwrap();
        assert_eq!(changes.is_approved, Some(true));
        assert_eq!(changes.faculty.as_deref(), Some("FBMG"));
    }

    #[test]
    fn explicit_null_clears_optional_profile_fields() {
        let body = json!({ "class_id": null });
        let changes = UserChangeset::from_body(&body, false).unwrap();
        assert_eq!(changes.class_id, Some(None));
        assert_eq!(changes.name, None);
    }
}
