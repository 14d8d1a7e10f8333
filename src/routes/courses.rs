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
    error::{is_unique_violation, AppError, AppResult, JsonBody},
    models::{Assignment, Class, Course, NewAssignment, NewCourse, User},
    schema::{assignments, classes, courses, users},
    state::AppState,
    stats::{self, CourseSummary},
    utils::{
        json::{classify_nullable, classify_nullable_int, optional_bool, optional_string},
        text::{self, non_blank},
    },
    workflow::{Operation, Role},
};

const DUPLICATE_CODE: &str = "Course code already exists";
const DUPLICATE_ASSIGNMENT: &str =
    "Course is already assigned to this lecturer for this class and semester";

#[derive(Deserialize)]
pub struct CreateCourseRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub faculty: Option<String>,
    pub program: Option<String>,
    pub credits: Option<i32>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct AssignCourseRequest {
    pub lecturer_id: Uuid,
    pub course_id: Uuid,
    pub class_id: Uuid,
    pub academic_year: Option<String>,
    pub semester: Option<String>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = courses)]
struct CourseChangeset {
    name: Option<String>,
    code: Option<String>,
    program: Option<Option<String>>,
    credits: Option<Option<i32>>,
    description: Option<Option<String>>,
    is_active: Option<bool>,
}

impl CourseChangeset {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.code.is_none()
            && self.program.is_none()
            && self.credits.is_none()
            && self.description.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Serialize)]
pub struct CourseResponse {
    pub message: String,
    pub course: Course,
}

#[derive(Serialize)]
pub struct CourseList {
    pub courses: Vec<Course>,
}

#[derive(Serialize)]
pub struct AssignmentResponse {
    pub message: String,
    pub assignment: Assignment,
}

#[derive(Serialize)]
pub struct AssignmentEntry {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub lecturer_name: String,
    pub lecturer_email: String,
    pub course_name: String,
    pub course_code: String,
    pub course_faculty: String,
    pub class_name: String,
    pub class_code: String,
    pub class_faculty: String,
}

#[derive(Serialize)]
pub struct AssignmentList {
    pub assignments: Vec<AssignmentEntry>,
}

#[derive(Serialize)]
pub struct CourseStatsResponse {
    pub stats: CourseSummary,
}

pub async fn list_courses(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<CourseList>> {
    user.actor().require(Operation::ViewCatalog)?;

    let mut conn = state.db()?;
    let courses = courses::table
        .order((courses::faculty.asc(), courses::code.asc()))
        .load(&mut conn)?;
    Ok(Json(CourseList { courses }))
}

pub async fn courses_by_faculty(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(faculty): Path<String>,
) -> AppResult<Json<CourseList>> {
    user.actor().require(Operation::ViewCatalog)?;

    let mut conn = state.db()?;
    let courses = courses::table
        .filter(courses::faculty.eq(&faculty))
        .filter(courses::is_active.eq(true))
        .order(courses::code.asc())
        .load(&mut conn)?;
    Ok(Json(CourseList { courses }))
}

pub async fn create_course(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(payload), _): JsonBody<CreateCourseRequest>,
) -> AppResult<(StatusCode, Json<CourseResponse>)> {
    user.actor().require(Operation::ManageCatalog)?;

    let new_course = NewCourse {
        id: Uuid::new_v4(),
        name: text::required_max("name", payload.name, 255).map_err(AppError::bad_request)?,
        code: text::required_max("code", payload.code, 32).map_err(AppError::bad_request)?,
        faculty: text::required_max("faculty", payload.faculty, 64)
            .map_err(AppError::bad_request)?,
        program: text::optional_max("program", payload.program, 255)
            .map_err(AppError::bad_request)?,
        credits: payload.credits,
        description: non_blank(payload.description),
    };

    let mut conn = state.db()?;
    let course: Course = diesel::insert_into(courses::table)
        .values(&new_course)
        .get_result(&mut conn)
        .map_err(|err| conflict_or(err, DUPLICATE_CODE))?;

    tracing::info!(course_id = %course.id, code = %course.code, "course created");

    Ok((
        StatusCode::CREATED,
        Json(CourseResponse {
            message: "Course created successfully".to_string(),
            course,
        }),
    ))
}

pub async fn update_course(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(course_id): Path<Uuid>,
    WithRejection(Json(body), _): JsonBody<Value>,
) -> AppResult<Json<CourseResponse>> {
    user.actor().require(Operation::ManageCatalog)?;

    let changes = CourseChangeset {
        name: optional_string(&body, "name").map_err(AppError::bad_request)?,
        code: optional_string(&body, "code").map_err(AppError::bad_request)?,
        program: classify_nullable(body.get("program"))
            .map_err(AppError::bad_request)?
            .into_change(),
        credits: classify_nullable_int(body.get("credits"))
            .map_err(AppError::bad_request)?
            .into_change(),
        description: classify_nullable(body.get("description"))
            .map_err(AppError::bad_request)?
            .into_change(),
        is_active: optional_bool(&body, "is_active").map_err(AppError::bad_request)?,
    };
    if changes.is_empty() {
        return Err(AppError::bad_request("No valid fields to update"));
    }

    let mut conn = state.db()?;
    let course = diesel::update(courses::table.find(course_id))
        .set(&changes)
        .get_result::<Course>(&mut conn)
        .optional()
        .map_err(|err| conflict_or(err, DUPLICATE_CODE))?
        .ok_or_else(|| AppError::not_found_entity("Course"))?;

    Ok(Json(CourseResponse {
        message: "Course updated successfully".to_string(),
        course,
    }))
}

pub async fn assign_course(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(payload), _): JsonBody<AssignCourseRequest>,
) -> AppResult<(StatusCode, Json<AssignmentResponse>)> {
    let actor = user.actor();
    actor.require(Operation::ManageCatalog)?;

    let mut conn = state.db()?;
    let lecturer = users::table
        .find(payload.lecturer_id)
        .first::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_entity("Lecturer"))?;
    if lecturer.role != Role::Lecturer.as_str() {
        return Err(AppError::bad_request("Courses can only be assigned to lecturers"));
    }
    courses::table
        .find(payload.course_id)
        .first::<Course>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_entity("Course"))?;
    classes::table
        .find(payload.class_id)
        .first::<Class>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_entity("Class"))?;

    let new_assignment = NewAssignment {
        id: Uuid::new_v4(),
        lecturer_id: lecturer.id,
        course_id: payload.course_id,
        class_id: payload.class_id,
        assigned_by: Some(actor.id),
        academic_year: text::optional_max("academic_year", payload.academic_year, 16)
            .map_err(AppError::bad_request)?
            .unwrap_or_else(|| state.config.default_academic_year.clone()),
        semester: text::optional_max("semester", payload.semester, 16)
            .map_err(AppError::bad_request)?
            .unwrap_or_else(|| state.config.default_semester.clone()),
    };
    let assignment: Assignment = diesel::insert_into(assignments::table)
        .values(&new_assignment)
        .get_result(&mut conn)
        .map_err(|err| conflict_or(err, DUPLICATE_ASSIGNMENT))?;

    tracing::info!(
        assignment_id = %assignment.id,
        lecturer_id = %assignment.lecturer_id,
        course_id = %assignment.course_id,
        class_id = %assignment.class_id,
        "course assigned"
    );

    Ok((
        StatusCode::CREATED,
        Json(AssignmentResponse {
            message: "Course assigned successfully".to_string(),
            assignment,
        }),
    ))
}

type AssignmentRow = (
    Assignment,
    (String, String),
    (String, String, String),
    (String, String, String),
);

pub async fn list_assignments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<AssignmentList>> {
    user.actor().require(Operation::ViewCatalog)?;

    let mut conn = state.db()?;
    let rows: Vec<AssignmentRow> = assignments::table
        .inner_join(users::table.on(users::id.eq(assignments::lecturer_id)))
        .inner_join(courses::table)
        .inner_join(classes::table)
        .order(assignments::assigned_at.desc())
        .select((
            assignments::all_columns,
            (users::name, users::email),
            (courses::name, courses::code, courses::faculty),
            (classes::name, classes::code, classes::faculty),
        ))
        .load(&mut conn)?;

    let assignments = rows
        .into_iter()
        .map(
            |(
                assignment,
                (lecturer_name, lecturer_email),
                (course_name, course_code, course_faculty),
                (class_name, class_code, class_faculty),
            )| AssignmentEntry {
                assignment,
                lecturer_name,
                lecturer_email,
                course_name,
                course_code,
                course_faculty,
                class_name,
                class_code,
                class_faculty,
            },
        )
        .collect();
    Ok(Json(AssignmentList { assignments }))
}

pub async fn course_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<CourseStatsResponse>> {
    user.actor().require(Operation::ViewCatalog)?;

    let mut conn = state.db()?;
    let summary = stats::course_summary(&mut conn)?;
    Ok(Json(CourseStatsResponse { stats: summary }))
}

/// Maps a unique violation onto the endpoint's own conflict message.
pub(crate) fn conflict_or(err: diesel::result::Error, message: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::bad_request(message)
    } else {
        AppError::from(err)
    }
}
