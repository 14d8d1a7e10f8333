use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod auth;
pub mod classes;
pub mod complaints;
pub mod courses;
pub mod downloads;
pub mod health;
pub mod monitoring;
pub mod ratings;
pub mod reports;
pub mod signatures;
pub mod users;

/// Signature canvases arrive as data URLs, so the limit sits above axum's
/// 2 MiB default.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let allow_origin = match allowed_origins {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    // Handlers below the auth nest extract `AuthenticatedUser` themselves
    // where they need it.
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/change-password", post(auth::change_password));

    let reports_routes = Router::new()
        .route(
            "/",
            get(reports::list_reports).post(reports::create_report),
        )
        .route("/my-reports", get(reports::my_reports))
        .route("/search", get(reports::search_reports))
        .route("/stats", get(reports::report_stats))
        .route("/pending-signature", get(reports::pending_signature))
        .route("/for-review", get(reports::reports_for_review))
        .route("/faculty/:faculty", get(reports::reports_by_faculty))
        .route("/:id", get(reports::get_report))
        .route("/:id/status", patch(reports::update_report_status));

    let signatures_routes = Router::new()
        .route("/", post(signatures::sign_report))
        .route("/report/:report_id", get(signatures::report_signatures));

    let complaints_routes = Router::new()
        .route("/", post(complaints::create_complaint))
        .route("/my-complaints", get(complaints::my_complaints))
        .route("/for-review", get(complaints::complaints_for_review))
        .route("/stats", get(complaints::complaint_stats))
        .route("/:id", patch(complaints::update_complaint))
        .route("/:id/response", post(complaints::respond_to_complaint))
        .route("/:id/responses", get(complaints::complaint_responses));

    let courses_routes = Router::new()
        .route(
            "/",
            get(courses::list_courses).post(courses::create_course),
        )
        .route("/assign", post(courses::assign_course))
        .route("/assignments", get(courses::list_assignments))
        .route("/stats", get(courses::course_stats))
        .route("/faculty/:faculty", get(courses::courses_by_faculty))
        .route("/:id", patch(courses::update_course));

    let classes_routes = Router::new()
        .route(
            "/",
            get(classes::list_classes).post(classes::create_class),
        )
        .route("/stats", get(classes::class_stats))
        .route("/faculty/:faculty", get(classes::classes_by_faculty))
        .route("/:id", patch(classes::update_class))
        .route("/:id/students", get(classes::class_students));

    let users_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/profile/me",
            get(users::my_profile).patch(users::update_my_profile),
        )
        .route("/notifications/me", get(users::my_notifications))
        .route(
            "/notifications/:id/read",
            patch(users::mark_notification_read),
        )
        .route("/role/:role", get(users::users_by_role))
        .route("/class-reps/pending", get(users::pending_class_reps))
        .route("/class-reps/approve", post(users::bulk_approve_students))
        .route("/:id", get(users::get_user).patch(users::update_user))
        .route("/:id/approve", patch(users::approve_student));

    let ratings_routes = Router::new()
        .route("/", post(ratings::create_rating))
        .route("/my-ratings", get(ratings::my_ratings))
        .route("/entity/:entity_type/:entity_id", get(ratings::entity_ratings));

    let monitoring_routes = Router::new()
        .route("/stats", get(monitoring::system_stats))
        .route("/stats/faculty/:faculty", get(monitoring::faculty_stats));

    let download_routes = Router::new()
        .route("/reports", get(downloads::download_reports))
        .route("/complaints", get(downloads::download_complaints))
        .route("/my-data", get(downloads::download_my_data));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/reports", reports_routes)
        .nest("/api/signatures", signatures_routes)
        .nest("/api/complaints", complaints_routes)
        .nest("/api/courses", courses_routes)
        .nest("/api/classes", classes_routes)
        .nest("/api/users", users_routes)
        .nest("/api/ratings", ratings_routes)
        .nest("/api/monitoring", monitoring_routes)
        .nest("/api/download", download_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/public/stats", get(monitoring::public_stats))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_origins_are_skipped() {
        // Builds without panicking even though one entry is not a header value.
        let _layer = cors_layer(Some("https://portal.example.edu, bad\norigin ,"));
        let _mirror = cors_layer(None);
    }
}
