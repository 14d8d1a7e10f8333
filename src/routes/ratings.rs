use std::{fmt, str::FromStr};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{is_unique_violation, AppError, AppResult, JsonBody},
    models::{NewRating, Rating},
    schema::{ratings, users},
    state::AppState,
    utils::text::non_blank,
    workflow::Operation,
};

const MIN_RATING: i32 = 1;
const MAX_RATING: i32 = 5;

/// Things a user can put a score on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatedEntity {
    Lecturer,
    Course,
    Class,
    Report,
}

impl RatedEntity {
    pub fn as_str(self) -> &'static str {
        match self {
            RatedEntity::Lecturer => "lecturer",
            RatedEntity::Course => "course",
            RatedEntity::Class => "class",
            RatedEntity::Report => "report",
        }
    }
}

impl fmt::Display for RatedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatedEntity {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "lecturer" => Ok(RatedEntity::Lecturer),
            "course" => Ok(RatedEntity::Course),
            "class" => Ok(RatedEntity::Class),
            "report" => Ok(RatedEntity::Report),
            other => Err(AppError::bad_request(format!(
                "Invalid rated entity type: {other}"
            ))),
        }
    }
}

#[derive(Deserialize)]
pub struct CreateRatingRequest {
    pub rated_entity_type: String,
    pub rated_entity_id: Uuid,
    pub rating_value: i32,
    pub comment: Option<String>,
}

fn validate_value(value: i32) -> AppResult<i32> {
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(value)
    } else {
        Err(AppError::bad_request(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )))
    }
}

fn average(values: impl IntoIterator<Item = i32>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0i64, 0i64), |(sum, count), value| {
            (sum + i64::from(value), count + 1)
        });
    (count > 0).then(|| sum as f64 / count as f64)
}

#[derive(Serialize)]
pub struct RatingCreated {
    pub message: String,
    pub rating: Rating,
}

#[derive(Serialize)]
pub struct RatingEntry {
    #[serde(flatten)]
    pub rating: Rating,
    pub rater_name: String,
}

#[derive(Serialize)]
pub struct EntityRatings {
    pub ratings: Vec<RatingEntry>,
    pub average_rating: Option<f64>,
    pub total_ratings: usize,
}

#[derive(Serialize)]
pub struct RatingList {
    pub ratings: Vec<Rating>,
}

pub async fn create_rating(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(payload), _): JsonBody<CreateRatingRequest>,
) -> AppResult<(StatusCode, Json<RatingCreated>)> {
    let actor = user.actor();
    actor.require(Operation::SubmitRating)?;

    let entity: RatedEntity = payload.rated_entity_type.parse()?;
    let rating_value = validate_value(payload.rating_value)?;

    let mut conn = state.db()?;
    let rating: Rating = diesel::insert_into(ratings::table)
        .values(&NewRating {
            id: Uuid::new_v4(),
            rater_id: actor.id,
            rated_entity_type: entity.as_str().to_string(),
            rated_entity_id: payload.rated_entity_id,
            rating_value,
            comment: non_blank(payload.comment),
        })
        .get_result(&mut conn)
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::bad_request(format!("You have already rated this {entity}"))
            } else {
                AppError::from(err)
            }
        })?;

    tracing::info!(
        rating_id = %rating.id,
        entity = %entity,
        entity_id = %rating.rated_entity_id,
        value = rating.rating_value,
        "rating submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(RatingCreated {
            message: "Rating submitted successfully".to_string(),
            rating,
        }),
    ))
}

pub async fn entity_ratings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
) -> AppResult<Json<EntityRatings>> {
    user.actor().require(Operation::ViewRatings)?;
    let entity: RatedEntity = entity_type.parse()?;

    let mut conn = state.db()?;
    let rows: Vec<(Rating, String)> = ratings::table
        .inner_join(users::table)
        .filter(ratings::rated_entity_type.eq(entity.as_str()))
        .filter(ratings::rated_entity_id.eq(entity_id))
        .order(ratings::created_at.desc())
        .select((ratings::all_columns, users::name))
        .load(&mut conn)?;

    let average_rating = average(rows.iter().map(|(rating, _)| rating.rating_value));
    let ratings: Vec<RatingEntry> = rows
        .into_iter()
        .map(|(rating, rater_name)| RatingEntry { rating, rater_name })
        .collect();

    Ok(Json(EntityRatings {
        total_ratings: ratings.len(),
        ratings,
        average_rating,
    }))
}

pub async fn my_ratings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<RatingList>> {
    user.actor().require(Operation::ViewRatings)?;

    let mut conn = state.db()?;
    let ratings = ratings::table
        .filter(ratings::rater_id.eq(user.id))
        .order(ratings::created_at.desc())
        .load(&mut conn)?;
    Ok(Json(RatingList { ratings }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_values_outside_the_scale() {
        assert!(validate_value(0).is_err());
        assert!(validate_value(6).is_err());
        assert_eq!(validate_value(1).unwrap(), 1);
        assert_eq!(validate_value(5).unwrap(), 5);
    }

    #[test]
    fn parses_known_entity_types_only() {
        assert_eq!("class".parse::<RatedEntity>().unwrap(), RatedEntity::Class);
        let err = "faculty".parse::<RatedEntity>().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn average_of_nothing_is_none() {
        assert_eq!(average(Vec::new()), None);
        assert_eq!(average([4, 5]), Some(4.5));
    }
}
