//! Account resolution: identifier in, authenticated account out.
//!
//! Two entry points share the status and secret checks:
//! - [`resolve_identifier`] takes one untyped identifier and consults the
//!   login-method index before falling back to the canonical email column.
//! - [`resolve_fields`] takes the typed fields of a token request and tries
//!   only the first non-empty channel as a direct column match.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use tracing::error;

use super::password::verify_password;
use super::storage::{find_account_by_binding, find_account_by_column, AccountRecord};
use super::types::LoginType;

/// Failure kinds surfaced by resolution and issuance.
///
/// Unknown identifiers are folded into `InvalidCredentials` so callers cannot
/// probe which identifiers exist. `AccountDisabled` carries its own message
/// on purpose, matching the service's documented behavior.
#[derive(Debug)]
pub(crate) enum AuthError {
    MissingIdentifier,
    InvalidCredentials,
    AccountDisabled,
    IdentifierConflict,
    Storage(anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingIdentifier => (
                StatusCode::BAD_REQUEST,
                "An identifier is required: email, national_id, or phone_number.",
            )
                .into_response(),
            Self::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials.").into_response()
            }
            Self::AccountDisabled => {
                (StatusCode::UNAUTHORIZED, "Account is disabled.").into_response()
            }
            Self::IdentifierConflict => (
                StatusCode::BAD_REQUEST,
                "This identifier is already associated with another account.",
            )
                .into_response(),
            Self::Storage(err) => {
                error!("Failed to resolve account: {err:#}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Status and secret checks shared by both resolution paths.
fn verify_account(account: AccountRecord, password: &str) -> Result<AccountRecord, AuthError> {
    if !account.is_active {
        return Err(AuthError::AccountDisabled);
    }
    if !verify_password(password, &account.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(account)
}

/// Resolve one untyped identifier to an authenticated account.
///
/// The binding index wins over the email column so an identifier rebound to
/// another account resolves to its current owner even while stale in the old
/// account's email field. A miss on both paths is reported as
/// `InvalidCredentials`, indistinguishable from a wrong password.
pub(crate) async fn resolve_identifier(
    pool: &PgPool,
    candidate: &str,
    password: &str,
) -> Result<AccountRecord, AuthError> {
    let account = match find_account_by_binding(pool, candidate)
        .await
        .map_err(AuthError::Storage)?
    {
        Some(account) => account,
        None => find_account_by_column(pool, LoginType::Email, candidate)
            .await
            .map_err(AuthError::Storage)?
            .ok_or(AuthError::InvalidCredentials)?,
    };

    verify_account(account, password)
}

/// Resolve the typed fields of a token request.
///
/// Precedence is email, then national id, then phone number; only the first
/// non-empty field is tried, as a direct column match. Returns the channel and
/// value that matched so the caller can record the binding.
pub(crate) async fn resolve_fields(
    pool: &PgPool,
    email: Option<&str>,
    national_id: Option<&str>,
    phone_number: Option<&str>,
    password: &str,
) -> Result<(AccountRecord, LoginType, String), AuthError> {
    let (login_type, value) = if let Some(email) = email {
        (LoginType::Email, email)
    } else if let Some(national_id) = national_id {
        (LoginType::NationalId, national_id)
    } else if let Some(phone_number) = phone_number {
        (LoginType::PhoneNumber, phone_number)
    } else {
        return Err(AuthError::MissingIdentifier);
    };

    let account = find_account_by_column(pool, login_type, value)
        .await
        .map_err(AuthError::Storage)?
        .ok_or(AuthError::InvalidCredentials)?;

    let account = verify_account(account, password)?;
    Ok((account, login_type, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::password::hash_password;
    use uuid::Uuid;

    fn account(is_active: bool, password: &str) -> AccountRecord {
        AccountRecord {
            id: Uuid::new_v4(),
            email: Some("a@example.com".to_string()),
            national_id: None,
            phone_number: None,
            password_hash: hash_password(password).expect("hash"),
            is_active,
            is_admin: false,
        }
    }

    #[test]
    fn verify_account_accepts_valid_secret() {
        let record = account(true, "pw123456");
        assert!(verify_account(record, "pw123456").is_ok());
    }

    #[test]
    fn verify_account_rejects_wrong_secret() {
        let record = account(true, "pw123456");
        let result = verify_account(record, "wrong-password");
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn verify_account_reports_disabled_before_secret_check() {
        // Disabled accounts fail even with the correct secret,
        // and also when the secret is wrong.
        let record = account(false, "pw123456");
        let result = verify_account(record, "pw123456");
        assert!(matches!(result, Err(AuthError::AccountDisabled)));

        let record = account(false, "pw123456");
        let result = verify_account(record, "wrong-password");
        assert!(matches!(result, Err(AuthError::AccountDisabled)));
    }

    #[tokio::test]
    async fn auth_error_responses_are_uniform_for_unknown_and_wrong() {
        use axum::body::to_bytes;

        let unknown = AuthError::InvalidCredentials.into_response();
        let wrong = AuthError::InvalidCredentials.into_response();
        assert_eq!(unknown.status(), wrong.status());

        let unknown_body = to_bytes(unknown.into_body(), 1024).await.expect("body");
        let wrong_body = to_bytes(wrong.into_body(), 1024).await.expect("body");
        assert_eq!(unknown_body, wrong_body);
    }

    #[test]
    fn auth_error_status_mapping() {
        assert_eq!(
            AuthError::MissingIdentifier.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::AccountDisabled.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::IdentifierConflict.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Storage(anyhow::anyhow!("boom"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
