//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Channels an identifier can belong to.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoginType {
    Email,
    NationalId,
    PhoneNumber,
}

impl LoginType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::NationalId => "national_id",
            Self::PhoneNumber => "phone_number",
        }
    }

    /// Parse the stored/text form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "email" => Some(Self::Email),
            "national_id" => Some(Self::NationalId),
            "phone_number" => Some(Self::PhoneNumber),
            _ => None,
        }
    }
}

/// Body for `POST /v1/auth/token`.
///
/// Typed fields take precedence (email, then national id, then phone number);
/// `identifier` is the untyped fallback resolved through the binding index.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct TokenRequest {
    pub identifier: Option<String>,
    pub email: Option<String>,
    pub national_id: Option<String>,
    pub phone_number: Option<String>,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

/// Body for `POST /v1/auth/refresh`.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn login_type_round_trips_text_form() {
        for login_type in [
            LoginType::Email,
            LoginType::NationalId,
            LoginType::PhoneNumber,
        ] {
            assert_eq!(LoginType::parse(login_type.as_str()), Some(login_type));
        }
        assert_eq!(LoginType::parse("passkey"), None);
    }

    #[test]
    fn login_type_serde_uses_snake_case() -> Result<()> {
        let value = serde_json::to_value(LoginType::NationalId)?;
        assert_eq!(value, serde_json::json!("national_id"));
        let decoded: LoginType = serde_json::from_value(serde_json::json!("phone_number"))?;
        assert_eq!(decoded, LoginType::PhoneNumber);
        Ok(())
    }

    #[test]
    fn token_request_accepts_partial_fields() -> Result<()> {
        let request: TokenRequest = serde_json::from_value(serde_json::json!({
            "email": "a@x.com",
            "password": "pw123456",
        }))?;
        assert_eq!(request.email.as_deref(), Some("a@x.com"));
        assert!(request.identifier.is_none());
        assert!(request.national_id.is_none());
        assert!(request.phone_number.is_none());
        Ok(())
    }

    #[test]
    fn token_pair_response_round_trips() -> Result<()> {
        let response = TokenPairResponse {
            access: "a.b.c".to_string(),
            refresh: "d.e.f".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        let access = value
            .get("access")
            .and_then(serde_json::Value::as_str)
            .context("missing access")?;
        assert_eq!(access, "a.b.c");
        let decoded: TokenPairResponse = serde_json::from_value(value)?;
        assert_eq!(decoded.refresh, "d.e.f");
        Ok(())
    }
}
