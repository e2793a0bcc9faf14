//! Login-method binding endpoints, scoped to the caller's own account.
//!
//! Bindings usually appear as a side effect of logging in; these endpoints
//! exist to inspect them, to register a channel ahead of its first login, and
//! to detach a channel. Another account's bindings are never reachable here.

use axum::{
    extract::{Extension, Path},
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

use super::auth::principal::{require_auth, Principal};
use super::auth::storage::{upsert_login_method, BindingOutcome};
use super::auth::types::LoginType;
use super::auth::utils::{
    is_unique_violation, normalize_email, valid_email, valid_national_id, valid_phone_number,
};
use super::auth::AuthState;

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginMethodResponse {
    pub id: String,
    pub account_id: String,
    pub login_type: LoginType,
    pub identifier: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginMethodCreateRequest {
    pub login_type: String,
    pub identifier: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginMethodUpdateRequest {
    pub identifier: String,
}

#[derive(Debug)]
enum ServiceError {
    Forbidden,
    NotFound,
    BadRequest(&'static str),
    Conflict,
    Database(sqlx::Error),
    Internal(anyhow::Error),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Conflict => (
                StatusCode::BAD_REQUEST,
                "This identifier is already associated with another account.",
            )
                .into_response(),
            Self::Database(err) => {
                error!("Failed to handle login method request: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Internal(err) => {
                error!("Failed to handle login method request: {err:#}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/login-methods",
    responses(
        (status = 200, description = "The caller's bindings.", body = [LoginMethodResponse]),
        (status = 401, description = "Missing or invalid bearer token."),
    ),
    tag = "login-methods"
)]
pub async fn list_login_methods(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match fetch_login_methods(&pool, principal.account_id).await {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(err) => {
            error!("Failed to list login methods: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/login-methods",
    request_body = LoginMethodCreateRequest,
    responses(
        (status = 201, description = "Binding created or replaced for the channel.", body = LoginMethodResponse),
        (status = 400, description = "Unsupported channel, invalid identifier, or identifier bound elsewhere."),
        (status = 401, description = "Missing or invalid bearer token."),
    ),
    tag = "login-methods"
)]
pub async fn create_login_method(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginMethodCreateRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    let request: LoginMethodCreateRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload").into_response(),
    };

    let Some(login_type) = LoginType::parse(request.login_type.trim()) else {
        return (StatusCode::BAD_REQUEST, "Unsupported login channel.").into_response();
    };
    let identifier = match normalize_identifier(login_type, &request.identifier) {
        Ok(identifier) => identifier,
        Err(err) => return err.into_response(),
    };

    match bind_channel(&pool, principal.account_id, login_type, &identifier).await {
        Ok(binding) => (StatusCode::CREATED, Json(binding)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/login-methods/{id}",
    params(
        ("id" = String, Path, description = "Binding id")
    ),
    responses(
        (status = 200, description = "Binding detail.", body = LoginMethodResponse),
        (status = 400, description = "Invalid binding id."),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 403, description = "Binding belongs to another account."),
        (status = 404, description = "Binding not found."),
    ),
    tag = "login-methods"
)]
pub async fn get_login_method(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    let binding_id = match Uuid::parse_str(id.trim()) {
        Ok(id) => id,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    match owned_login_method(&pool, &principal, binding_id).await {
        Ok(binding) => (StatusCode::OK, Json(binding)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/v1/login-methods/{id}",
    request_body = LoginMethodUpdateRequest,
    responses(
        (status = 200, description = "Binding identifier replaced.", body = LoginMethodResponse),
        (status = 400, description = "Invalid identifier or identifier bound elsewhere."),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 403, description = "Binding belongs to another account."),
        (status = 404, description = "Binding not found."),
    ),
    tag = "login-methods"
)]
pub async fn put_login_method(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginMethodUpdateRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    let binding_id = match Uuid::parse_str(id.trim()) {
        Ok(id) => id,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let request: LoginMethodUpdateRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload").into_response(),
    };

    let current = match owned_login_method(&pool, &principal, binding_id).await {
        Ok(binding) => binding,
        Err(err) => return err.into_response(),
    };
    let identifier = match normalize_identifier(current.login_type, &request.identifier) {
        Ok(identifier) => identifier,
        Err(err) => return err.into_response(),
    };

    match update_login_method(&pool, binding_id, &identifier).await {
        Ok(Some(binding)) => (StatusCode::OK, Json(binding)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/login-methods/{id}",
    responses(
        (status = 204, description = "Binding removed."),
        (status = 400, description = "Invalid binding id."),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 403, description = "Binding belongs to another account."),
        (status = 404, description = "Binding not found."),
    ),
    tag = "login-methods"
)]
pub async fn delete_login_method(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    let binding_id = match Uuid::parse_str(id.trim()) {
        Ok(id) => id,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    // Ownership first: deleting someone else's binding must 403, not 404.
    if let Err(err) = owned_login_method(&pool, &principal, binding_id).await {
        return err.into_response();
    }

    match delete_login_method_record(&pool, binding_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to delete login method: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Validate and normalize an identifier for its channel.
fn normalize_identifier(login_type: LoginType, raw: &str) -> Result<String, ServiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::BadRequest("Identifier is required."));
    }
    match login_type {
        LoginType::Email => {
            let email = normalize_email(trimmed);
            if valid_email(&email) {
                Ok(email)
            } else {
                Err(ServiceError::BadRequest("Invalid email."))
            }
        }
        LoginType::NationalId => {
            if valid_national_id(trimmed) {
                Ok(trimmed.to_string())
            } else {
                Err(ServiceError::BadRequest("Invalid national_id."))
            }
        }
        LoginType::PhoneNumber => {
            if valid_phone_number(trimmed) {
                Ok(trimmed.to_string())
            } else {
                Err(ServiceError::BadRequest("Invalid phone_number."))
            }
        }
    }
}

fn login_method_from_row(row: &sqlx::postgres::PgRow) -> Option<LoginMethodResponse> {
    let login_type = LoginType::parse(row.get("login_type"))?;
    Some(LoginMethodResponse {
        id: row.get::<Uuid, _>("id").to_string(),
        account_id: row.get::<Uuid, _>("account_id").to_string(),
        login_type,
        identifier: row.get("identifier"),
    })
}

async fn fetch_login_methods(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Vec<LoginMethodResponse>, sqlx::Error> {
    let query = "SELECT id, account_id, login_type, identifier \
         FROM login_methods \
         WHERE account_id = $1 \
         ORDER BY created_at";
    let rows = sqlx::query(query).bind(account_id).fetch_all(pool).await?;
    Ok(rows.iter().filter_map(login_method_from_row).collect())
}

async fn fetch_login_method(
    pool: &PgPool,
    binding_id: Uuid,
) -> Result<Option<LoginMethodResponse>, sqlx::Error> {
    let query = "SELECT id, account_id, login_type, identifier \
         FROM login_methods \
         WHERE id = $1 \
         LIMIT 1";
    let row = sqlx::query(query)
        .bind(binding_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().and_then(login_method_from_row))
}

/// Load a binding and enforce that the caller owns it.
async fn owned_login_method(
    pool: &PgPool,
    principal: &Principal,
    binding_id: Uuid,
) -> Result<LoginMethodResponse, ServiceError> {
    let binding = fetch_login_method(pool, binding_id)
        .await
        .map_err(ServiceError::Database)?
        .ok_or(ServiceError::NotFound)?;
    if binding.account_id != principal.account_id.to_string() {
        return Err(ServiceError::Forbidden);
    }
    Ok(binding)
}

/// Bind a channel through the shared upsert, then read the row back.
async fn bind_channel(
    pool: &PgPool,
    account_id: Uuid,
    login_type: LoginType,
    identifier: &str,
) -> Result<LoginMethodResponse, ServiceError> {
    let outcome = upsert_login_method(pool, account_id, login_type, identifier)
        .await
        .map_err(ServiceError::Internal)?;

    let binding_id = match outcome {
        BindingOutcome::Bound(id) => id,
        BindingOutcome::Conflict => return Err(ServiceError::Conflict),
    };

    fetch_login_method(pool, binding_id)
        .await
        .map_err(ServiceError::Database)?
        .ok_or(ServiceError::NotFound)
}

async fn update_login_method(
    pool: &PgPool,
    binding_id: Uuid,
    identifier: &str,
) -> Result<Option<LoginMethodResponse>, ServiceError> {
    let query = "UPDATE login_methods \
         SET identifier = $1, updated_at = NOW() \
         WHERE id = $2 \
         RETURNING id, account_id, login_type, identifier";
    let result = sqlx::query(query)
        .bind(identifier)
        .bind(binding_id)
        .fetch_optional(pool)
        .await;

    match result {
        Ok(row) => Ok(row.as_ref().and_then(login_method_from_row)),
        Err(err) if is_unique_violation(&err) => Err(ServiceError::Conflict),
        Err(err) => Err(ServiceError::Database(err)),
    }
}

async fn delete_login_method_record(
    pool: &PgPool,
    binding_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let query = "DELETE FROM login_methods WHERE id = $1";
    let result = sqlx::query(query).bind(binding_id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_identifier_per_channel() {
        assert_eq!(
            normalize_identifier(LoginType::Email, " Alice@Example.COM ").ok(),
            Some("alice@example.com".to_string())
        );
        assert_eq!(
            normalize_identifier(LoginType::NationalId, "1234567890123").ok(),
            Some("1234567890123".to_string())
        );
        assert_eq!(
            normalize_identifier(LoginType::PhoneNumber, "+66812345678").ok(),
            Some("+66812345678".to_string())
        );
    }

    #[test]
    fn normalize_identifier_rejects_bad_shapes() {
        assert!(normalize_identifier(LoginType::Email, "not-an-email").is_err());
        assert!(normalize_identifier(LoginType::NationalId, "with-dashes").is_err());
        assert!(normalize_identifier(LoginType::PhoneNumber, "letters").is_err());
        assert!(normalize_identifier(LoginType::Email, "  ").is_err());
    }

    #[tokio::test]
    async fn service_error_status_mapping() {
        assert_eq!(
            ServiceError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::BadRequest("bad").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Conflict.into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
