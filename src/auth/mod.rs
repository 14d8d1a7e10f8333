pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    state::AppState,
    workflow::{Actor, Role},
};

/// Identity established from a bearer token. Handlers take this as an
/// extractor and consult [`AuthenticatedUser::actor`] for every rule check.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub faculty: String,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role, self.faculty.clone(), self.name.clone())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state.jwt.verify_token(bearer.token()).map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            AppError::unauthorized()
        })?;

        let role: Role = claims.role.parse().map_err(|_| {
            tracing::warn!(user_id = %claims.sub, role = %claims.role, "token carries unknown role");
            AppError::unauthorized()
        })?;

        Ok(AuthenticatedUser {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            role,
            faculty: claims.faculty,
        })
    }
}
