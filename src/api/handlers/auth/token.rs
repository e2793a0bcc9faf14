//! Token issuance endpoints: login and refresh rotation.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use super::jwt::{decode_token, mint_pair, TokenUse};
use super::resolver::{resolve_fields, resolve_identifier, AuthError};
use super::state::AuthState;
use super::storage::{
    consume_refresh_token, insert_refresh_token, load_account, upsert_login_method, AccountRecord,
    BindingOutcome,
};
use super::types::{LoginType, RefreshRequest, TokenPairResponse, TokenRequest};
use super::utils::{normalize_email, normalize_optional};

#[utoipa::path(
    post,
    path = "/v1/auth/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenPairResponse),
        (status = 400, description = "No identifier supplied, or the identifier is bound to another account"),
        (status = 401, description = "Invalid credentials or disabled account"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn token(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<TokenRequest>>,
) -> impl IntoResponse {
    let request: TokenRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_optional(request.email).map(|email| normalize_email(&email));
    let national_id = normalize_optional(request.national_id);
    let phone_number = normalize_optional(request.phone_number);
    let identifier = normalize_optional(request.identifier);

    let typed = email.is_some() || national_id.is_some() || phone_number.is_some();

    let resolved = if typed {
        // Typed channels: direct column match, then record the channel used.
        match resolve_fields(
            &pool,
            email.as_deref(),
            national_id.as_deref(),
            phone_number.as_deref(),
            &request.password,
        )
        .await
        {
            Ok((account, login_type, value)) => Some((account, Some((login_type, value)))),
            Err(err) => return err.into_response(),
        }
    } else if let Some(candidate) = identifier {
        // Untyped fallback: binding index first, canonical email second.
        // The channel is unknown here, so no binding is recorded.
        match resolve_identifier(&pool, &candidate, &request.password).await {
            Ok(account) => Some((account, None)),
            Err(err) => return err.into_response(),
        }
    } else {
        None
    };

    let Some((account, channel)) = resolved else {
        return AuthError::MissingIdentifier.into_response();
    };

    // The binding upsert runs before any token is minted: a conflicting
    // identifier fails the whole login and no tokens leave the service.
    if let Some((login_type, value)) = channel {
        match record_login_channel(&pool, &account, login_type, &value).await {
            Ok(()) => {}
            Err(err) => return err.into_response(),
        }
    }

    issue_pair(&pool, &auth_state, account.id).await.into_response()
}

/// Upsert the binding for the channel that logged the account in.
async fn record_login_channel(
    pool: &PgPool,
    account: &AccountRecord,
    login_type: LoginType,
    value: &str,
) -> Result<(), AuthError> {
    match upsert_login_method(pool, account.id, login_type, value)
        .await
        .map_err(AuthError::Storage)?
    {
        BindingOutcome::Bound(_) => Ok(()),
        BindingOutcome::Conflict => Err(AuthError::IdentifierConflict),
    }
}

/// Mint a pair and persist the refresh side of it.
async fn issue_pair(
    pool: &PgPool,
    auth_state: &AuthState,
    account_id: Uuid,
) -> axum::response::Response {
    let pair = match mint_pair(auth_state.config(), account_id) {
        Ok(pair) => pair,
        Err(err) => {
            error!("Failed to mint token pair: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Err(err) = insert_refresh_token(
        pool,
        pair.refresh_jti,
        account_id,
        auth_state.config().refresh_token_ttl_seconds(),
    )
    .await
    {
        error!("Failed to record refresh token: {err:#}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    debug!("Issued token pair for account {account_id}");

    (
        StatusCode::OK,
        Json(TokenPairResponse {
            access: pair.access,
            refresh: pair.refresh,
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Refresh successful; the presented token is now invalid", body = TokenPairResponse),
        (status = 401, description = "Expired, revoked, or malformed refresh token"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let request: RefreshRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let Some(claims) = decode_token(auth_state.config(), &request.refresh, TokenUse::Refresh)
    else {
        return AuthError::InvalidCredentials.into_response();
    };
    let Ok(jti) = Uuid::parse_str(&claims.jti) else {
        return AuthError::InvalidCredentials.into_response();
    };

    // Single-use chain: exactly one concurrent refresh of the same token can
    // win this revocation; everyone else sees an already-consumed token.
    let account_id = match consume_refresh_token(&pool, jti).await {
        Ok(Some(account_id)) => account_id,
        Ok(None) => return AuthError::InvalidCredentials.into_response(),
        Err(err) => return AuthError::Storage(err).into_response(),
    };

    match load_account(&pool, account_id).await {
        Ok(Some(account)) if account.is_active => {}
        Ok(Some(_)) => return AuthError::AccountDisabled.into_response(),
        Ok(None) => return AuthError::InvalidCredentials.into_response(),
        Err(err) => return AuthError::Storage(err).into_response(),
    }

    issue_pair(&pool, &auth_state, account_id).await.into_response()
}
