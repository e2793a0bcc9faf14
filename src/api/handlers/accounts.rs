//! Account management endpoints.
//!
//! Flow Overview:
//! 1) Registration is open; everything else requires a bearer token.
//! 2) Listing is admin-only; mutation is owner-or-admin.
//! 3) Every write path ends by making sure the account's profile exists.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{debug, error, instrument, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::password::hash_password;
use super::auth::principal::{require_auth, Principal};
use super::auth::utils::{
    is_unique_violation, normalize_email, normalize_optional, valid_email, valid_national_id,
    valid_password, valid_phone_number,
};
use super::auth::AuthState;

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountResponse {
    pub id: String,
    pub email: Option<String>,
    pub national_id: Option<String>,
    pub phone_number: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub date_joined: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AccountCreateRequest {
    pub email: Option<String>,
    pub national_id: Option<String>,
    pub phone_number: Option<String>,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AccountUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug)]
enum ServiceError {
    Forbidden,
    Conflict(&'static str),
    Database(sqlx::Error),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
            Self::Conflict(message) => (StatusCode::CONFLICT, message).into_response(),
            Self::Database(err) => {
                error!("Failed to handle account request: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/accounts",
    request_body = AccountCreateRequest,
    responses(
        (status = 201, description = "Account created; the password is never echoed back", body = AccountResponse),
        (status = 400, description = "Missing identifier or invalid field."),
        (status = 409, description = "An identifier is already registered to another account."),
    ),
    tag = "accounts"
)]
#[instrument(skip_all)]
pub async fn create_account(
    pool: Extension<PgPool>,
    payload: Option<Json<AccountCreateRequest>>,
) -> impl IntoResponse {
    let request: AccountCreateRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload").into_response(),
    };

    let email = normalize_optional(request.email).map(|email| normalize_email(&email));
    let national_id = normalize_optional(request.national_id);
    let phone_number = normalize_optional(request.phone_number);

    if email.is_none() && national_id.is_none() && phone_number.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            "At least one identifier is required: email, national_id, or phone_number.",
        )
            .into_response();
    }

    if let Some(email) = email.as_deref() {
        if !valid_email(email) {
            return (StatusCode::BAD_REQUEST, "Invalid email.").into_response();
        }
    }
    if let Some(national_id) = national_id.as_deref() {
        if !valid_national_id(national_id) {
            return (StatusCode::BAD_REQUEST, "Invalid national_id.").into_response();
        }
    }
    if let Some(phone_number) = phone_number.as_deref() {
        if !valid_phone_number(phone_number) {
            return (StatusCode::BAD_REQUEST, "Invalid phone_number.").into_response();
        }
    }
    if !valid_password(&request.password) {
        return (
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters long.",
        )
            .into_response();
    }

    let password_hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let first_name = normalize_optional(request.first_name).unwrap_or_default();
    let last_name = normalize_optional(request.last_name).unwrap_or_default();

    match insert_account(
        &pool,
        email.as_deref(),
        national_id.as_deref(),
        phone_number.as_deref(),
        &password_hash,
        &first_name,
        &last_name,
    )
    .await
    {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/accounts",
    responses(
        (status = 200, description = "List accounts (admin-only).", body = [AccountResponse]),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 403, description = "Caller is not an admin."),
    ),
    tag = "accounts"
)]
pub async fn list_accounts(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    if !principal.is_admin {
        return StatusCode::FORBIDDEN.into_response();
    }

    match fetch_accounts(&pool).await {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(err) => {
            error!("Failed to list accounts: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/accounts/{id}",
    params(
        ("id" = String, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "Account detail.", body = AccountResponse),
        (status = 400, description = "Invalid account id."),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 404, description = "Account not found."),
    ),
    tag = "accounts"
)]
pub async fn get_account(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(status) = require_auth(&headers, &pool, &auth_state).await {
        return status.into_response();
    }
    let account_id = match Uuid::parse_str(id.trim()) {
        Ok(id) => id,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    match fetch_account(&pool, account_id).await {
        Ok(Some(account)) => (StatusCode::OK, Json(account)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch account: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/v1/accounts/{id}",
    request_body = AccountUpdateRequest,
    responses(
        (status = 200, description = "Account updated (owner or admin).", body = AccountResponse),
        (status = 400, description = "Invalid input."),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 403, description = "Caller owns a different account."),
        (status = 404, description = "Account not found."),
    ),
    tag = "accounts"
)]
pub async fn put_account(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<AccountUpdateRequest>>,
) -> impl IntoResponse {
    update_account(id, headers, &pool, &auth_state, payload).await
}

#[utoipa::path(
    patch,
    path = "/v1/accounts/{id}",
    request_body = AccountUpdateRequest,
    responses(
        (status = 200, description = "Account updated (owner or admin).", body = AccountResponse),
        (status = 400, description = "Invalid input."),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 403, description = "Caller owns a different account."),
        (status = 404, description = "Account not found."),
    ),
    tag = "accounts"
)]
pub async fn patch_account(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<AccountUpdateRequest>>,
) -> impl IntoResponse {
    // PUT and PATCH share partial-update semantics: absent fields are untouched.
    update_account(id, headers, &pool, &auth_state, payload).await
}

async fn update_account(
    id: String,
    headers: HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
    payload: Option<Json<AccountUpdateRequest>>,
) -> Response {
    let principal = match require_auth(&headers, pool, auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    let account_id = match Uuid::parse_str(id.trim()) {
        Ok(id) => id,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    let request: AccountUpdateRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload").into_response(),
    };

    let first_name = normalize_optional(request.first_name);
    let last_name = normalize_optional(request.last_name);

    if first_name.is_none() && last_name.is_none() {
        return (StatusCode::BAD_REQUEST, "No updates provided.").into_response();
    }

    match update_account_names(pool, &principal, account_id, first_name, last_name).await {
        Ok(Some(account)) => {
            // Self-healing: the account save already succeeded, so a missing
            // profile is repaired best-effort and failures only get logged.
            if let Err(err) = ensure_profile(pool, account_id).await {
                error!("Failed to ensure profile for account {account_id}: {err}");
            }
            (StatusCode::OK, Json(account)).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/accounts/{id}",
    responses(
        (status = 204, description = "Account deleted with its profile and bindings."),
        (status = 400, description = "Invalid account id."),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 403, description = "Caller owns a different account."),
        (status = 404, description = "Account not found."),
    ),
    tag = "accounts"
)]
pub async fn delete_account(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };
    let account_id = match Uuid::parse_str(id.trim()) {
        Ok(id) => id,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    match delete_account_record(&pool, &principal, account_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => err.into_response(),
    }
}

fn ensure_owner_or_admin(principal: &Principal, account_id: Uuid) -> Result<(), ServiceError> {
    if principal.account_id == account_id || principal.is_admin {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

const ACCOUNT_RETURNING: &str = r#"
            id::text AS id,
            email,
            national_id,
            phone_number,
            first_name,
            last_name,
            is_active,
            is_admin,
            to_char(date_joined AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS date_joined
"#;

fn account_from_row(row: &sqlx::postgres::PgRow) -> AccountResponse {
    AccountResponse {
        id: row.get("id"),
        email: row.get("email"),
        national_id: row.get("national_id"),
        phone_number: row.get("phone_number"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        is_active: row.get("is_active"),
        is_admin: row.get("is_admin"),
        date_joined: row.get("date_joined"),
    }
}

async fn insert_account(
    pool: &PgPool,
    email: Option<&str>,
    national_id: Option<&str>,
    phone_number: Option<&str>,
    password_hash: &str,
    first_name: &str,
    last_name: &str,
) -> Result<AccountResponse, ServiceError> {
    // One transaction covers the account row and its profile so no account is
    // ever visible without one.
    let mut tx = pool.begin().await.map_err(ServiceError::Database)?;

    let query = format!(
        "INSERT INTO accounts \
             (email, national_id, phone_number, password_hash, first_name, last_name) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id AS account_uuid, {ACCOUNT_RETURNING}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .bind(national_id)
        .bind(phone_number)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;

    let row = match row {
        Ok(row) => row,
        Err(err) if is_unique_violation(&err) => {
            let _ = tx.rollback().await;
            return Err(ServiceError::Conflict(
                "An account with this identifier already exists.",
            ));
        }
        Err(err) => return Err(ServiceError::Database(err)),
    };

    let account = account_from_row(&row);
    let account_id: Uuid = row.get("account_uuid");

    ensure_profile_tx(&mut tx, account_id).await?;

    tx.commit().await.map_err(ServiceError::Database)?;

    Ok(account)
}

/// Provision the profile during account creation, inside the same transaction.
///
/// A concurrent creation losing the race on the unique index is treated as
/// already-created.
async fn ensure_profile_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: Uuid,
) -> Result<(), ServiceError> {
    let query = "INSERT INTO profiles (account_id) VALUES ($1) \
         ON CONFLICT (account_id) DO NOTHING";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(account_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .map_err(ServiceError::Database)?;

    if result.rows_affected() == 0 {
        debug!("Profile for account {account_id} already exists; skipping");
    }
    Ok(())
}

/// Idempotently repair a missing profile after an account save.
pub(super) async fn ensure_profile(pool: &PgPool, account_id: Uuid) -> Result<(), sqlx::Error> {
    let query = "INSERT INTO profiles (account_id) VALUES ($1) \
         ON CONFLICT (account_id) DO NOTHING";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .execute(pool)
        .instrument(span)
        .await?;
    Ok(())
}

async fn fetch_accounts(pool: &PgPool) -> Result<Vec<AccountResponse>, sqlx::Error> {
    let query = format!(
        "SELECT {ACCOUNT_RETURNING} FROM accounts ORDER BY date_joined DESC"
    );
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    Ok(rows.iter().map(account_from_row).collect())
}

async fn fetch_account(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Option<AccountResponse>, sqlx::Error> {
    let query = format!(
        "SELECT {ACCOUNT_RETURNING} FROM accounts WHERE id = $1 LIMIT 1"
    );
    let row = sqlx::query(&query)
        .bind(account_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| account_from_row(&row)))
}

async fn update_account_names(
    pool: &PgPool,
    principal: &Principal,
    account_id: Uuid,
    first_name: Option<String>,
    last_name: Option<String>,
) -> Result<Option<AccountResponse>, ServiceError> {
    ensure_owner_or_admin(principal, account_id)?;
    let query = format!(
        "UPDATE accounts \
         SET first_name = COALESCE($1, first_name), \
             last_name = COALESCE($2, last_name), \
             updated_at = NOW() \
         WHERE id = $3 \
         RETURNING {ACCOUNT_RETURNING}"
    );
    let row = sqlx::query(&query)
        .bind(first_name)
        .bind(last_name)
        .bind(account_id)
        .fetch_optional(pool)
        .await
        .map_err(ServiceError::Database)?;
    Ok(row.map(|row| account_from_row(&row)))
}

async fn delete_account_record(
    pool: &PgPool,
    principal: &Principal,
    account_id: Uuid,
) -> Result<bool, ServiceError> {
    ensure_owner_or_admin(principal, account_id)?;
    // Bindings, profile, and refresh tokens go with the account (FK cascade).
    let query = "DELETE FROM accounts WHERE id = $1";
    let result = sqlx::query(query)
        .bind(account_id)
        .execute(pool)
        .await
        .map_err(ServiceError::Database)?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(account_id: Uuid, is_admin: bool) -> Principal {
        Principal {
            account_id,
            is_admin,
        }
    }

    #[test]
    fn owner_can_touch_own_account() {
        let id = Uuid::new_v4();
        assert!(ensure_owner_or_admin(&principal(id, false), id).is_ok());
    }

    #[test]
    fn admin_can_touch_any_account() {
        let id = Uuid::new_v4();
        assert!(ensure_owner_or_admin(&principal(Uuid::new_v4(), true), id).is_ok());
    }

    #[test]
    fn cross_account_access_is_forbidden() {
        let id = Uuid::new_v4();
        let result = ensure_owner_or_admin(&principal(Uuid::new_v4(), false), id);
        assert!(matches!(result, Err(ServiceError::Forbidden)));
    }

    #[tokio::test]
    async fn service_error_status_mapping() {
        assert_eq!(
            ServiceError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::Conflict("dup").into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Database(sqlx::Error::RowNotFound)
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
