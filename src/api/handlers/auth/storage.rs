//! Database helpers for resolution, bindings, and the refresh token chain.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::LoginType;
use super::utils::is_unique_violation;

/// Account fields needed to authenticate and issue tokens.
#[derive(Debug, Clone)]
pub(crate) struct AccountRecord {
    pub(crate) id: Uuid,
    pub(crate) email: Option<String>,
    pub(crate) national_id: Option<String>,
    pub(crate) phone_number: Option<String>,
    pub(crate) password_hash: String,
    pub(crate) is_active: bool,
    pub(crate) is_admin: bool,
}

/// Outcome of a binding upsert.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum BindingOutcome {
    /// Bound (created or replaced); carries the binding's id.
    Bound(Uuid),
    /// The identifier value already belongs to a different account.
    Conflict,
}

fn account_from_row(row: &sqlx::postgres::PgRow) -> AccountRecord {
    AccountRecord {
        id: row.get("id"),
        email: row.get("email"),
        national_id: row.get("national_id"),
        phone_number: row.get("phone_number"),
        password_hash: row.get("password_hash"),
        is_active: row.get("is_active"),
        is_admin: row.get("is_admin"),
    }
}

/// Exact-match lookup through the login-method index, any channel type.
pub(crate) async fn find_account_by_binding(
    pool: &PgPool,
    identifier: &str,
) -> Result<Option<AccountRecord>> {
    let query = "SELECT a.id, a.email, a.national_id, a.phone_number, a.password_hash, \
         a.is_active, a.is_admin \
         FROM login_methods lm \
         JOIN accounts a ON a.id = lm.account_id \
         WHERE lm.identifier = $1 \
         LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(identifier)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup login method binding")?;

    Ok(row.map(|row| account_from_row(&row)))
}

/// Direct lookup against one typed account column.
pub(crate) async fn find_account_by_column(
    pool: &PgPool,
    login_type: LoginType,
    value: &str,
) -> Result<Option<AccountRecord>> {
    // Column names cannot be bound; pick the statement per channel.
    let query = match login_type {
        LoginType::Email => {
            "SELECT id, email, national_id, phone_number, password_hash, is_active, is_admin \
             FROM accounts WHERE email = $1 LIMIT 1"
        }
        LoginType::NationalId => {
            "SELECT id, email, national_id, phone_number, password_hash, is_active, is_admin \
             FROM accounts WHERE national_id = $1 LIMIT 1"
        }
        LoginType::PhoneNumber => {
            "SELECT id, email, national_id, phone_number, password_hash, is_active, is_admin \
             FROM accounts WHERE phone_number = $1 LIMIT 1"
        }
    };
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(value)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by identifier column")?;

    Ok(row.map(|row| account_from_row(&row)))
}

/// Load an account by id (used by bearer auth and the refresh flow).
pub(crate) async fn load_account(pool: &PgPool, id: Uuid) -> Result<Option<AccountRecord>> {
    let query = "SELECT id, email, national_id, phone_number, password_hash, is_active, is_admin \
         FROM accounts WHERE id = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to load account")?;

    Ok(row.map(|row| account_from_row(&row)))
}

/// Record the channel used to log in: one binding per type per account.
///
/// The statement replaces the account's existing binding of that type in
/// place. Uniqueness across all identifiers is the store's job: a 23505 on
/// the identifier index means the value is bound to a different account.
pub(crate) async fn upsert_login_method(
    pool: &PgPool,
    account_id: Uuid,
    login_type: LoginType,
    identifier: &str,
) -> Result<BindingOutcome> {
    let query = "INSERT INTO login_methods (account_id, login_type, identifier) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (account_id, login_type) \
         DO UPDATE SET identifier = EXCLUDED.identifier, updated_at = NOW() \
         RETURNING id";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(account_id)
        .bind(login_type.as_str())
        .bind(identifier)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match result {
        Ok(row) => Ok(BindingOutcome::Bound(row.get("id"))),
        Err(err) if is_unique_violation(&err) => Ok(BindingOutcome::Conflict),
        Err(err) => Err(err).context("failed to upsert login method"),
    }
}

/// Record a freshly minted refresh token so it can be rotated exactly once.
pub(crate) async fn insert_refresh_token(
    pool: &PgPool,
    jti: Uuid,
    account_id: Uuid,
    ttl_seconds: u64,
) -> Result<()> {
    let query = "INSERT INTO refresh_tokens (jti, account_id, expires_at) \
         VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(jti)
        .bind(account_id)
        .bind(i64::try_from(ttl_seconds).unwrap_or(i64::MAX))
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert refresh token")?;
    Ok(())
}

/// Atomically revoke a refresh token, returning its owner.
///
/// `None` means the token was unknown, expired, or already rotated; exactly
/// one concurrent refresh of the same token can win this update.
pub(crate) async fn consume_refresh_token(pool: &PgPool, jti: Uuid) -> Result<Option<Uuid>> {
    let query = "UPDATE refresh_tokens \
         SET revoked_at = NOW() \
         WHERE jti = $1 \
           AND revoked_at IS NULL \
           AND expires_at > NOW() \
         RETURNING account_id";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(jti)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume refresh token")?;

    Ok(row.map(|row| row.get("account_id")))
}

#[cfg(test)]
mod tests {
    use super::{AccountRecord, BindingOutcome};
    use uuid::Uuid;

    #[test]
    fn binding_outcome_debug_names() {
        assert_eq!(
            format!("{:?}", BindingOutcome::Bound(Uuid::nil())),
            format!("Bound({})", Uuid::nil())
        );
        assert_eq!(format!("{:?}", BindingOutcome::Conflict), "Conflict");
    }

    #[test]
    fn account_record_holds_values() {
        let record = AccountRecord {
            id: Uuid::nil(),
            email: Some("a@example.com".to_string()),
            national_id: None,
            phone_number: None,
            password_hash: "$argon2id$...".to_string(),
            is_active: true,
            is_admin: false,
        };
        assert_eq!(record.id, Uuid::nil());
        assert_eq!(record.email.as_deref(), Some("a@example.com"));
        assert!(record.is_active);
        assert!(!record.is_admin);
    }
}
