//! Profile endpoints, scoped to the caller's own profile.
//!
//! The profile is provisioned by the account write path, so a 404 here means
//! self-healing has not caught up yet; it is a defensive case, not a normal
//! one.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::principal::require_auth;
use super::auth::utils::{normalize_optional, valid_date_format};
use super::auth::AuthState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: String,
    pub account_id: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub birth_date: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdateRequest {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub birth_date: Option<String>,
}

#[derive(Debug)]
enum ServiceError {
    NotFound,
    BadRequest(&'static str),
    Database(sqlx::Error),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Database(err) => {
                error!("Failed to handle profile request: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/profile",
    responses(
        (status = 200, description = "The caller's profile.", body = ProfileResponse),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 404, description = "Profile missing (should self-heal on the next account save)."),
    ),
    tag = "profile"
)]
pub async fn get_profile(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match fetch_profile(&pool, principal.account_id).await {
        Ok(Some(profile)) => (StatusCode::OK, Json(profile)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch profile: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/v1/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated.", body = ProfileResponse),
        (status = 400, description = "Invalid update payload."),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 404, description = "Profile missing."),
    ),
    tag = "profile"
)]
pub async fn put_profile(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ProfileUpdateRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    let request: ProfileUpdateRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload").into_response(),
    };

    let bio = normalize_optional(request.bio);
    let avatar_url = normalize_optional(request.avatar_url);
    let birth_date = normalize_optional(request.birth_date);

    if bio.is_none() && avatar_url.is_none() && birth_date.is_none() {
        return (StatusCode::BAD_REQUEST, "No updates provided.").into_response();
    }

    if let Some(birth_date) = birth_date.as_deref() {
        if !valid_date_format(birth_date) {
            return (StatusCode::BAD_REQUEST, "Invalid birth_date; expected YYYY-MM-DD.")
                .into_response();
        }
    }

    match update_profile(&pool, principal.account_id, bio, avatar_url, birth_date).await {
        Ok(Some(profile)) => (StatusCode::OK, Json(profile)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => err.into_response(),
    }
}

fn profile_from_row(row: &sqlx::postgres::PgRow) -> ProfileResponse {
    ProfileResponse {
        id: row.get("id"),
        account_id: row.get("account_id"),
        bio: row.get("bio"),
        avatar_url: row.get("avatar_url"),
        birth_date: row.get("birth_date"),
    }
}

const PROFILE_COLUMNS: &str = r"
            id::text AS id,
            account_id::text AS account_id,
            bio,
            avatar_url,
            to_char(birth_date, 'YYYY-MM-DD') AS birth_date
";

async fn fetch_profile(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Option<ProfileResponse>, sqlx::Error> {
    let query = format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE account_id = $1 LIMIT 1"
    );
    let row = sqlx::query(&query)
        .bind(account_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| profile_from_row(&row)))
}

async fn update_profile(
    pool: &PgPool,
    account_id: Uuid,
    bio: Option<String>,
    avatar_url: Option<String>,
    birth_date: Option<String>,
) -> Result<Option<ProfileResponse>, ServiceError> {
    // Date range checks run against the database clock, like every other
    // time comparison in this service.
    if let Some(birth_date) = birth_date.as_deref() {
        let row = sqlx::query("SELECT $1::date > CURRENT_DATE AS future")
            .bind(birth_date)
            .fetch_one(pool)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(_) => {
                    ServiceError::BadRequest("Invalid birth_date; expected YYYY-MM-DD.")
                }
                other => ServiceError::Database(other),
            })?;
        if row.get::<bool, _>("future") {
            return Err(ServiceError::BadRequest(
                "Birth date cannot be in the future.",
            ));
        }
    }

    let query = format!(
        "UPDATE profiles \
         SET bio = COALESCE($1, bio), \
             avatar_url = COALESCE($2, avatar_url), \
             birth_date = COALESCE($3::date, birth_date), \
             updated_at = NOW() \
         WHERE account_id = $4 \
         RETURNING {PROFILE_COLUMNS}"
    );
    let row = sqlx::query(&query)
        .bind(bio)
        .bind(avatar_url)
        .bind(birth_date)
        .bind(account_id)
        .fetch_optional(pool)
        .await
        .map_err(ServiceError::Database)?;
    Ok(row.map(|row| profile_from_row(&row)))
}
