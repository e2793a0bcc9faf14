//! Signed token pair minting and validation.
//!
//! Both tokens are HS256 JWTs carrying the account id as `sub`, a `jti`, and
//! a `token_use` discriminator so an access token can never be replayed as a
//! refresh token (or vice versa). The refresh token's `jti` is additionally
//! persisted so refreshes form a single-use chain.

use anyhow::{Context, Result};
use jsonwebtoken::{
    decode, encode, get_current_timestamp, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::AuthConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenUse {
    Access,
    Refresh,
}

impl TokenUse {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    /// Account id the token was minted for.
    pub(crate) sub: String,
    /// Unique token id; persisted for refresh tokens.
    pub(crate) jti: String,
    /// "access" or "refresh".
    pub(crate) token_use: String,
    pub(crate) iat: u64,
    pub(crate) exp: u64,
}

/// Freshly minted access/refresh pair.
pub(crate) struct TokenPair {
    pub(crate) access: String,
    pub(crate) refresh: String,
    /// The refresh token's id, to be recorded in the refresh chain.
    pub(crate) refresh_jti: Uuid,
}

/// Mint an access/refresh token pair for an account.
///
/// # Errors
/// Returns an error if signing fails.
pub(crate) fn mint_pair(config: &AuthConfig, account_id: Uuid) -> Result<TokenPair> {
    let now = get_current_timestamp();
    let key = EncodingKey::from_secret(config.token_secret());

    let access_claims = Claims {
        sub: account_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        token_use: TokenUse::Access.as_str().to_string(),
        iat: now,
        exp: now + config.access_token_ttl_seconds(),
    };
    let access =
        encode(&Header::default(), &access_claims, &key).context("failed to sign access token")?;

    let refresh_jti = Uuid::new_v4();
    let refresh_claims = Claims {
        sub: account_id.to_string(),
        jti: refresh_jti.to_string(),
        token_use: TokenUse::Refresh.as_str().to_string(),
        iat: now,
        exp: now + config.refresh_token_ttl_seconds(),
    };
    let refresh = encode(&Header::default(), &refresh_claims, &key)
        .context("failed to sign refresh token")?;

    Ok(TokenPair {
        access,
        refresh,
        refresh_jti,
    })
}

/// Decode a token and check its signature, expiry, and `token_use`.
///
/// Returns `None` for anything invalid; callers never learn why.
pub(crate) fn decode_token(config: &AuthConfig, token: &str, expected: TokenUse) -> Option<Claims> {
    let key = DecodingKey::from_secret(config.token_secret());
    let validation = Validation::default();
    let data = decode::<Claims>(token, &key, &validation).ok()?;
    if data.claims.token_use == expected.as_str() {
        Some(data.claims)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn test_config() -> AuthConfig {
        AuthConfig::new(SecretString::from("test-secret"))
    }

    #[test]
    fn mint_and_decode_access() {
        let config = test_config();
        let account_id = Uuid::new_v4();
        let pair = mint_pair(&config, account_id).expect("mint");

        let claims = decode_token(&config, &pair.access, TokenUse::Access).expect("decode");
        assert_eq!(claims.sub, account_id.to_string());
        assert_eq!(claims.token_use, "access");
        assert_eq!(claims.exp - claims.iat, config.access_token_ttl_seconds());
    }

    #[test]
    fn mint_and_decode_refresh() {
        let config = test_config();
        let account_id = Uuid::new_v4();
        let pair = mint_pair(&config, account_id).expect("mint");

        let claims = decode_token(&config, &pair.refresh, TokenUse::Refresh).expect("decode");
        assert_eq!(claims.sub, account_id.to_string());
        assert_eq!(claims.jti, pair.refresh_jti.to_string());
        assert_eq!(claims.exp - claims.iat, config.refresh_token_ttl_seconds());
    }

    #[test]
    fn token_use_is_enforced() {
        let config = test_config();
        let pair = mint_pair(&config, Uuid::new_v4()).expect("mint");

        assert!(decode_token(&config, &pair.access, TokenUse::Refresh).is_none());
        assert!(decode_token(&config, &pair.refresh, TokenUse::Access).is_none());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = test_config();
        let pair = mint_pair(&config, Uuid::new_v4()).expect("mint");

        let other = AuthConfig::new(SecretString::from("other-secret"));
        assert!(decode_token(&other, &pair.access, TokenUse::Access).is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let now = get_current_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            jti: Uuid::new_v4().to_string(),
            token_use: TokenUse::Access.as_str().to_string(),
            iat: now.saturating_sub(7200),
            // past the default 60s validation leeway
            exp: now.saturating_sub(3600),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.token_secret()),
        )
        .expect("encode");

        assert!(decode_token(&config, &token, TokenUse::Access).is_none());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let config = test_config();
        assert!(decode_token(&config, "not-a-jwt", TokenUse::Access).is_none());
    }
}
