use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub faculty: String,
    pub program: Option<String>,
    pub class_id: Option<String>,
    pub is_approved: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub faculty: String,
    pub program: Option<String>,
    pub class_id: Option<String>,
    pub is_approved: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = refresh_tokens)]
#[diesel(belongs_to(User))]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = courses)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub faculty: String,
    pub program: Option<String>,
    pub credits: Option<i32>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = courses)]
pub struct NewCourse {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub faculty: String,
    pub program: Option<String>,
    pub credits: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = classes)]
pub struct Class {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub faculty: String,
    pub program: Option<String>,
    pub total_students: i32,
    pub academic_year: String,
    pub semester: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = classes)]
pub struct NewClass {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub faculty: String,
    pub program: Option<String>,
    pub total_students: i32,
    pub academic_year: String,
    pub semester: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Associations)]
#[diesel(table_name = assignments)]
#[diesel(belongs_to(Course))]
#[diesel(belongs_to(Class))]
pub struct Assignment {
    pub id: Uuid,
    pub lecturer_id: Uuid,
    pub course_id: Uuid,
    pub class_id: Uuid,
    pub assigned_by: Option<Uuid>,
    pub academic_year: String,
    pub semester: String,
    pub assigned_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = assignments)]
pub struct NewAssignment {
    pub id: Uuid,
    pub lecturer_id: Uuid,
    pub course_id: Uuid,
    pub class_id: Uuid,
    pub assigned_by: Option<Uuid>,
    pub academic_year: String,
    pub semester: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = lecture_reports)]
pub struct LectureReport {
    pub id: Uuid,
    pub faculty_name: String,
    pub class_name: String,
    pub week_of_reporting: String,
    pub date_of_lecture: NaiveDate,
    pub course_name: String,
    pub course_code: String,
    pub lecturer_id: Uuid,
    pub lecturer_name: String,
    pub students_present: i32,
    pub total_students: i32,
    pub venue: String,
    pub scheduled_time: String,
    pub topic_taught: String,
    pub learning_outcomes: String,
    pub recommendations: Option<String>,
    pub status: String,
    pub feedback_prl: Option<String>,
    pub feedback_pl: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = lecture_reports)]
pub struct NewLectureReport {
    pub id: Uuid,
    pub faculty_name: String,
    pub class_name: String,
    pub week_of_reporting: String,
    pub date_of_lecture: NaiveDate,
    pub course_name: String,
    pub course_code: String,
    pub lecturer_id: Uuid,
    pub lecturer_name: String,
    pub students_present: i32,
    pub total_students: i32,
    pub venue: String,
    pub scheduled_time: String,
    pub topic_taught: String,
    pub learning_outcomes: String,
    pub recommendations: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Associations)]
#[diesel(table_name = student_signatures)]
#[diesel(belongs_to(LectureReport, foreign_key = report_id))]
pub struct StudentSignature {
    pub id: Uuid,
    pub report_id: Uuid,
    pub student_id: Uuid,
    pub signature_data: String,
    pub signed_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = student_signatures)]
pub struct NewStudentSignature {
    pub id: Uuid,
    pub report_id: Uuid,
    pub student_id: Uuid,
    pub signature_data: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = complaints)]
pub struct Complaint {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub complainant_id: Uuid,
    pub complainant_role: String,
    pub against_user_id: Uuid,
    pub against_role: String,
    pub category: String,
    pub is_anonymous: bool,
    pub status: String,
    pub priority: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = complaints)]
pub struct NewComplaint {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub complainant_id: Uuid,
    pub complainant_role: String,
    pub against_user_id: Uuid,
    pub against_role: String,
    pub category: String,
    pub is_anonymous: bool,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Associations)]
#[diesel(table_name = complaint_responses)]
#[diesel(belongs_to(Complaint))]
pub struct ComplaintResponse {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub responder_id: Uuid,
    pub response_text: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = complaint_responses)]
pub struct NewComplaintResponse {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub responder_id: Uuid,
    pub response_text: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = ratings)]
pub struct Rating {
    pub id: Uuid,
    pub rater_id: Uuid,
    pub rated_entity_type: String,
    pub rated_entity_id: Uuid,
    pub rating_value: i32,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ratings)]
pub struct NewRating {
    pub id: Uuid,
    pub rater_id: Uuid,
    pub rated_entity_type: String,
    pub rated_entity_id: Uuid,
    pub rating_value: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
}

/// Public view of a user row; the password hash never leaves the store.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub faculty: String,
    pub program: Option<String>,
    pub class_id: Option<String>,
    pub is_approved: bool,
    pub created_at: NaiveDateTime,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            faculty: user.faculty,
            program: user.program,
            class_id: user.class_id,
            is_approved: user.is_approved,
            created_at: user.created_at,
        }
    }
}
