//! Authenticated principal extraction from bearer access tokens.
//!
//! Flow Overview: read the `Authorization: Bearer` header, validate the access
//! token, and re-check the account against the database so disabled or deleted
//! accounts lose access immediately, not at token expiry.

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::jwt::{decode_token, TokenUse};
use super::state::AuthState;
use super::storage::load_account;

/// Authenticated account context derived from the access token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub account_id: Uuid,
    pub is_admin: bool,
}

/// Resolve the bearer token into a principal, or return 401.
pub(crate) async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
) -> Result<Principal, StatusCode> {
    let Some(token) = extract_bearer_token(headers) else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let Some(claims) = decode_token(auth_state.config(), &token, TokenUse::Access) else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let Ok(account_id) = Uuid::parse_str(&claims.sub) else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let account = match load_account(pool, account_id).await {
        Ok(Some(account)) => account,
        Ok(None) => return Err(StatusCode::UNAUTHORIZED),
        Err(err) => {
            error!("Failed to load account for bearer token: {err:#}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    if !account.is_active {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(Principal {
        account_id: account.id,
        is_admin: account.is_admin,
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extract_bearer_token_reads_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def".to_string()));
    }

    #[test]
    fn extract_bearer_token_accepts_lowercase_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def".to_string()));
    }

    #[test]
    fn extract_bearer_token_rejects_other_schemes_and_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);

        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
