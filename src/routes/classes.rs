use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult, JsonBody},
    models::{Class, NewClass, User, UserProfile},
    routes::courses::conflict_or,
    schema::{classes, users},
    state::AppState,
    stats::{self, ClassSummary},
    utils::{
        json::{classify_nullable, optional_bool, optional_int, optional_string},
        text,
    },
    workflow::{Operation, Role},
};

const DUPLICATE_CODE: &str = "Class code already exists";

#[derive(Deserialize)]
pub struct CreateClassRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub faculty: Option<String>,
    pub program: Option<String>,
    pub total_students: Option<i32>,
    pub academic_year: Option<String>,
    pub semester: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = classes)]
struct ClassChangeset {
    name: Option<String>,
    code: Option<String>,
    program: Option<Option<String>>,
    total_students: Option<i32>,
    academic_year: Option<String>,
    semester: Option<String>,
    is_active: Option<bool>,
}

impl ClassChangeset {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.code.is_none()
            && self.program.is_none()
            && self.total_students.is_none()
            && self.academic_year.is_none()
            && self.semester.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Serialize)]
pub struct ClassResponse {
    pub message: String,
    pub class: Class,
}

#[derive(Serialize)]
pub struct ClassList {
    pub classes: Vec<Class>,
}

#[derive(Serialize)]
pub struct StudentList {
    pub students: Vec<UserProfile>,
}

#[derive(Serialize)]
pub struct ClassStatsResponse {
    pub stats: ClassSummary,
}

pub async fn list_classes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ClassList>> {
    user.actor().require(Operation::ViewCatalog)?;

    let mut conn = state.db()?;
    let classes = classes::table
        .order((classes::faculty.asc(), classes::code.asc()))
        .load(&mut conn)?;
    Ok(Json(ClassList { classes }))
}

pub async fn classes_by_faculty(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(faculty): Path<String>,
) -> AppResult<Json<ClassList>> {
    user.actor().require(Operation::ViewCatalog)?;

    let mut conn = state.db()?;
    let classes = classes::table
        .filter(classes::faculty.eq(&faculty))
        .filter(classes::is_active.eq(true))
        .order(classes::code.asc())
        .load(&mut conn)?;
    Ok(Json(ClassList { classes }))
}

pub async fn create_class(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(payload), _): JsonBody<CreateClassRequest>,
) -> AppResult<(StatusCode, Json<ClassResponse>)> {
    user.actor().require(Operation::ManageCatalog)?;

    let total_students = payload.total_students.unwrap_or(0);
    if total_students < 0 {
        return Err(AppError::bad_request("total_students cannot be negative"));
    }

    let new_class = NewClass {
        id: Uuid::new_v4(),
        name: text::required_max("name", payload.name, 255).map_err(AppError::bad_request)?,
        code: text::required_max("code", payload.code, 64).map_err(AppError::bad_request)?,
        faculty: text::required_max("faculty", payload.faculty, 64)
            .map_err(AppError::bad_request)?,
        program: text::optional_max("program", payload.program, 255)
            .map_err(AppError::bad_request)?,
        total_students,
        academic_year: text::optional_max("academic_year", payload.academic_year, 16)
            .map_err(AppError::bad_request)?
            .unwrap_or_else(|| state.config.default_academic_year.clone()),
        semester: text::optional_max("semester", payload.semester, 16)
            .map_err(AppError::bad_request)?
            .unwrap_or_else(|| state.config.default_semester.clone()),
    };

    let mut conn = state.db()?;
    let class: Class = diesel::insert_into(classes::table)
        .values(&new_class)
        .get_result(&mut conn)
        .map_err(|err| conflict_or(err, DUPLICATE_CODE))?;

    tracing::info!(class_id = %class.id, code = %class.code, "class created");

    Ok((
        StatusCode::CREATED,
        Json(ClassResponse {
            message: "Class created successfully".to_string(),
            class,
        }),
    ))
}

pub async fn update_class(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(class_id): Path<Uuid>,
    WithRejection(Json(body), _): JsonBody<Value>,
) -> AppResult<Json<ClassResponse>> {
    user.actor().require(Operation::ManageCatalog)?;

    let changes = ClassChangeset {
        name: optional_string(&body, "name").map_err(AppError::bad_request)?,
        code: optional_string(&body, "code").map_err(AppError::bad_request)?,
        program: classify_nullable(body.get("program"))
            .map_err(AppError::bad_request)?
            .into_change(),
        total_students: optional_int(&body, "total_students").map_err(AppError::bad_request)?,
        academic_year: optional_string(&body, "academic_year").map_err(AppError::bad_request)?,
        semester: optional_string(&body, "semester").map_err(AppError::bad_request)?,
        is_active: optional_bool(&body, "is_active").map_err(AppError::bad_request)?,
    };
    if changes.is_empty() {
        return Err(AppError::bad_request("No valid fields to update"));
    }
    if changes.total_students.is_some_and(|total| total < 0) {
        return Err(AppError::bad_request("total_students cannot be negative"));
    }

    let mut conn = state.db()?;
    let class = diesel::update(classes::table.find(class_id))
        .set(&changes)
        .get_result::<Class>(&mut conn)
        .optional()
        .map_err(|err| conflict_or(err, DUPLICATE_CODE))?
        .ok_or_else(|| AppError::not_found_entity("Class"))?;

    Ok(Json(ClassResponse {
        message: "Class updated successfully".to_string(),
        class,
    }))
}

/// Students are linked to a class through its code.
pub async fn class_students(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(class_id): Path<Uuid>,
) -> AppResult<Json<StudentList>> {
    user.actor().require(Operation::ViewCatalog)?;

    let mut conn = state.db()?;
    let class = classes::table
        .find(class_id)
        .first::<Class>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_entity("Class"))?;

    let students: Vec<User> = users::table
        .filter(users::role.eq(Role::Student.as_str()))
        .filter(users::class_id.eq(&class.code))
        .order(users::name.asc())
        .load(&mut conn)?;

    Ok(Json(StudentList {
        students: students.into_iter().map(UserProfile::from).collect(),
    }))
}

pub async fn class_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ClassStatsResponse>> {
    user.actor().require(Operation::ViewCatalog)?;

    let mut conn = state.db()?;
    let summary = stats::class_summary(&mut conn)?;
    Ok(Json(ClassStatsResponse { stats: summary }))
}
