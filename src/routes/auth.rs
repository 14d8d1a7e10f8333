use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use axum_extra::{extract::WithRejection, headers::Cookie, typed_header::TypedHeader};
use chrono::{Duration as ChronoDuration, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    auth::{password, AuthenticatedUser},
    error::{is_unique_violation, AppError, AppResult, JsonBody},
    models::{NewRefreshToken, NewUser, RefreshToken, User, UserProfile},
    schema::{refresh_tokens, users},
    state::AppState,
    utils::text,
    workflow::Role,
};

use crate::schema::refresh_tokens::dsl as refresh_dsl;

const REFRESH_COOKIE_NAME: &str = "refresh_token";
const DUPLICATE_EMAIL: &str = "User already exists with this email";
const PENDING_APPROVAL: &str = "Your account is pending approval from Program Leader";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub faculty: Option<String>,
    pub program: Option<String>,
    pub class_id: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl RegisterRequest {
    /// Validates the account fields and hashes the password. `approved`
    /// overrides the role's default approval state.
    pub(crate) fn into_new_user(self, approved: Option<bool>) -> AppResult<NewUser> {
        let email = text::required_max("email", self.email, 255)
            .map_err(AppError::bad_request)?
            .to_ascii_lowercase();
        if !email.contains('@') {
            return Err(AppError::bad_request("email must be a valid address"));
        }
        let password = self
            .password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| AppError::bad_request("password is required"))?;
        validate_new_password(&password)?;
        let name = text::required_max("name", self.name, 255).map_err(AppError::bad_request)?;
        let role: Role = text::required("role", self.role)
            .map_err(AppError::bad_request)?
            .parse()?;
        let faculty =
            text::required_max("faculty", self.faculty, 64).map_err(AppError::bad_request)?;
        let program =
            text::optional_max("program", self.program, 255).map_err(AppError::bad_request)?;
        let class_id =
            text::optional_max("class_id", self.class_id, 64).map_err(AppError::bad_request)?;

        Ok(NewUser {
            id: Uuid::new_v4(),
            email,
            password_hash: password::hash_password(&password)?,
            name,
            role: role.as_str().to_string(),
            faculty,
            program,
            class_id,
            is_approved: approved.unwrap_or(!role.requires_approval()),
        })
    }
}

fn validate_new_password(password: &str) -> AppResult<()> {
    if password.chars().count() < password::MIN_PASSWORD_LENGTH {
        return Err(AppError::bad_request(format!(
            "Password must be at least {} characters long",
            password::MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Inserts a new account, answering duplicates with the registration message.
pub(crate) fn insert_user(conn: &mut PgConnection, new_user: &NewUser) -> AppResult<User> {
    diesel::insert_into(users::table)
        .values(new_user)
        .get_result(conn)
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::bad_request(DUPLICATE_EMAIL)
            } else {
                AppError::from(err)
            }
        })
}

/// Public self-registration. Only students and lecturers may sign
/// themselves up; students then wait for program leader approval.
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let new_user = payload.into_new_user(None)?;
    let role: Role = new_user.role.parse()?;
    if !matches!(role, Role::Student | Role::Lecturer) {
        return Err(AppError::bad_request(
            "Only students and lecturers can self-register",
        ));
    }

    let mut conn = state.db()?;
    let user = insert_user(&mut conn, &new_user)?;
    tracing::info!(user_id = %user.id, role = %user.role, "account registered");

    let message = if user.is_approved {
        "User registered successfully"
    } else {
        "Registration successful. Your account is pending approval from Program Leader"
    };
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: message.to_string(),
            user: user.into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<LoginRequest>,
) -> AppResult<(HeaderMap, Json<LoginResponse>)> {
    let mut conn = state.db()?;

    let user: User = users::table
        .filter(users::email.eq(payload.email.trim().to_ascii_lowercase()))
        .first(&mut conn)
        .optional()?
        .ok_or_else(invalid_credentials)?;

    let valid = password::verify_password(&payload.password, &user.password_hash)
        .map_err(|_| invalid_credentials())?;

    if !valid {
        tracing::info!(user_id = %user.id, "login rejected: wrong password");
        return Err(invalid_credentials());
    }

    if !user.is_approved {
        return Err(AppError::new(StatusCode::FORBIDDEN, PENDING_APPROVAL));
    }

    let (headers, response) = issue_session(&state, &mut conn, user)?;
    Ok((headers, Json(response)))
}

pub async fn refresh(
    State(state): State<AppState>,
    jar: Option<TypedHeader<Cookie>>,
) -> AppResult<(HeaderMap, Json<LoginResponse>)> {
    let cookies = jar.ok_or_else(AppError::unauthorized)?;
    let refresh_value = cookies
        .get(REFRESH_COOKIE_NAME)
        .ok_or_else(AppError::unauthorized)?;

    let hashed = hash_refresh_token(refresh_value);
    let mut conn = state.db()?;
    let now_naive = Utc::now().naive_utc();

    let (headers, response) = conn.transaction::<_, AppError, _>(|conn| {
        let token = refresh_dsl::refresh_tokens
            .filter(refresh_dsl::token_hash.eq(&hashed))
            .filter(refresh_dsl::revoked_at.is_null())
            .filter(refresh_dsl::expires_at.gt(now_naive))
            .first::<RefreshToken>(conn)
            .optional()?
            .ok_or_else(AppError::unauthorized)?;

        // Only one rotation may consume a given token.
        let revoked = diesel::update(
            refresh_dsl::refresh_tokens
                .filter(refresh_dsl::id.eq(token.id))
                .filter(refresh_dsl::revoked_at.is_null()),
        )
        .set((
            refresh_dsl::revoked_at.eq(now_naive),
            refresh_dsl::updated_at.eq(now_naive),
        ))
        .execute(conn)?;
        if revoked != 1 {
            tracing::warn!(token_id = %token.id, "refresh token already consumed");
            return Err(AppError::unauthorized());
        }

        let user: User = users::table.find(token.user_id).first(conn)?;
        if !user.is_approved {
            return Err(AppError::new(StatusCode::FORBIDDEN, PENDING_APPROVAL));
        }

        issue_session(&state, conn, user)
    })?;
    Ok((headers, Json(response)))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    jar: Option<TypedHeader<Cookie>>,
) -> AppResult<(HeaderMap, StatusCode)> {
    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let mut rows_affected = 0;

    if let Some(cookies) = jar {
        if let Some(value) = cookies.get(REFRESH_COOKIE_NAME) {
            let hashed = hash_refresh_token(value);
            rows_affected = diesel::update(
                refresh_dsl::refresh_tokens
                    .filter(refresh_dsl::token_hash.eq(hashed))
                    .filter(refresh_dsl::user_id.eq(user.id))
                    .filter(refresh_dsl::revoked_at.is_null()),
            )
            .set((
                refresh_dsl::revoked_at.eq(now),
                refresh_dsl::updated_at.eq(now),
            ))
            .execute(&mut conn)?;
        }
    }

    if rows_affected == 0 {
        diesel::update(
            refresh_dsl::refresh_tokens
                .filter(refresh_dsl::user_id.eq(user.id))
                .filter(refresh_dsl::revoked_at.is_null()),
        )
        .set((
            refresh_dsl::revoked_at.eq(now),
            refresh_dsl::updated_at.eq(now),
        ))
        .execute(&mut conn)?;
    }

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_clear_refresh_cookie(&state)?);
    Ok((headers, StatusCode::NO_CONTENT))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(payload), _): JsonBody<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    if payload.current_password.is_empty() || payload.new_password.is_empty() {
        return Err(AppError::bad_request(
            "Current password and new password are required",
        ));
    }
    validate_new_password(&payload.new_password)?;

    let mut conn = state.db()?;
    let account: User = users::table
        .find(user.id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_entity("User"))?;

    if !password::verify_password(&payload.current_password, &account.password_hash)? {
        return Err(AppError::bad_request("Current password is incorrect"));
    }

    let now = Utc::now().naive_utc();
    let new_hash = password::hash_password(&payload.new_password)?;
    conn.transaction::<_, AppError, _>(|conn| {
        diesel::update(users::table.find(account.id))
            .set((users::password_hash.eq(new_hash), users::updated_at.eq(now)))
            .execute(conn)?;
        diesel::update(
            refresh_dsl::refresh_tokens
                .filter(refresh_dsl::user_id.eq(account.id))
                .filter(refresh_dsl::revoked_at.is_null()),
        )
        .set((
            refresh_dsl::revoked_at.eq(now),
            refresh_dsl::updated_at.eq(now),
        ))
        .execute(conn)?;
        Ok(())
    })?;

    tracing::info!(user_id = %account.id, "password changed");
    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}

fn invalid_credentials() -> AppError {
    AppError::new(StatusCode::UNAUTHORIZED, "Invalid email or password")
}

/// Signs an access token and stores a fresh refresh token for `user`.
fn issue_session(
    state: &AppState,
    conn: &mut PgConnection,
    user: User,
) -> AppResult<(HeaderMap, LoginResponse)> {
    let access_token = state.jwt.generate_token(&user)?;

    let now = Utc::now();
    let refresh_value = generate_refresh_token();
    let refresh_expires_at = now + ChronoDuration::days(state.config.refresh_token_expiry_days);

    let new_refresh = NewRefreshToken {
        id: Uuid::new_v4(),
        user_id: user.id,
        token_hash: hash_refresh_token(&refresh_value),
        issued_at: now.naive_utc(),
        expires_at: refresh_expires_at.naive_utc(),
    };

    diesel::insert_into(refresh_tokens::table)
        .values(&new_refresh)
        .execute(conn)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        build_refresh_cookie(state, &refresh_value, refresh_expires_at)?,
    );

    Ok((
        headers,
        LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.config.jwt_expiry_minutes * 60,
            user: user.into(),
        },
    ))
}

fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn build_refresh_cookie(
    state: &AppState,
    token: &str,
    expires_at: chrono::DateTime<Utc>,
) -> AppResult<HeaderValue> {
    let max_age = ChronoDuration::days(state.config.refresh_token_expiry_days).num_seconds();

    let mut parts = vec![format!("{}={}", REFRESH_COOKIE_NAME, token)];
    parts.push("Path=/api/auth".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Strict".into());
    parts.push(format!("Max-Age={}", max_age));
    parts.push(format!("Expires={}", expires_at.to_rfc2822()));
    cookie_attributes(state, &mut parts);

    HeaderValue::from_str(&parts.join("; ")).map_err(AppError::internal)
}

fn build_clear_refresh_cookie(state: &AppState) -> AppResult<HeaderValue> {
    let mut parts = vec![format!("{}=", REFRESH_COOKIE_NAME)];
    parts.push("Path=/api/auth".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Strict".into());
    parts.push("Max-Age=0".into());
    parts.push("Expires=Thu, 01 Jan 1970 00:00:00 GMT".into());
    cookie_attributes(state, &mut parts);

    HeaderValue::from_str(&parts.join("; ")).map_err(AppError::internal)
}

fn cookie_attributes(state: &AppState, parts: &mut Vec<String>) {
    if state.config.refresh_cookie_secure {
        parts.push("Secure".into());
    }
    if let Some(domain) = &state.config.refresh_cookie_domain {
        parts.push(format!("Domain={}", domain));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(role: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some(" Lerato@Example.ac.ls ".into()),
            password: Some("secret1".into()),
            name: Some("Lerato Nthako".into()),
            role: Some(role.into()),
            faculty: Some("FICT".into()),
            program: None,
            class_id: Some("BSCSM-Y2".into()),
        }
    }

    #[test]
    fn students_start_unapproved() {
        let user = registration("student").into_new_user(None).unwrap();
        assert!(!user.is_approved);
        assert_eq!(user.email, "lerato@example.ac.ls");
        assert_ne!(user.password_hash, "secret1");

        let lecturer = registration("lecturer").into_new_user(None).unwrap();
        assert!(lecturer.is_approved);
    }

    #[test]
    fn short_passwords_are_rejected() {
        let mut request = registration("student");
        request.password = Some("12345".into());
        let err = request.into_new_user(None).unwrap_err();
        assert_eq!(err.message(), "Password must be at least 6 characters long");
    }

    #[test]
    fn unknown_roles_are_rejected() {
        let err = registration("dean").into_new_user(None).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn refresh_tokens_are_hashed_hex() {
        let token = generate_refresh_token();
        assert_eq!(token.len(), 64);
        let hashed = hash_refresh_token(&token);
        assert_eq!(hashed.len(), 64);
        assert_ne!(hashed, token);
        assert_eq!(hashed, hash_refresh_token(&token));
    }
}
