use crate::api;
use anyhow::Result;
use secrecy::SecretString;

pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub token_secret: SecretString,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &self.dsn)
            .field("token_secret", &"***")
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_seconds", &self.refresh_token_ttl_seconds)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = api::handlers::auth::AuthConfig::new(args.token_secret)
        .with_access_token_ttl_seconds(args.access_token_ttl_seconds)
        .with_refresh_token_ttl_seconds(args.refresh_token_ttl_seconds);

    let result = api::new(args.port, args.dsn, auth_config).await;

    // Flush any buffered spans before the process exits.
    crate::cli::telemetry::shutdown_tracer();

    result
}

#[cfg(test)]
mod tests {
    use super::Args;
    use secrecy::SecretString;

    #[test]
    fn debug_redacts_token_secret() {
        let args = Args {
            port: 8080,
            dsn: "postgres://localhost:5432/konto".to_string(),
            token_secret: SecretString::from("sekreta"),
            access_token_ttl_seconds: 1800,
            refresh_token_ttl_seconds: 432_000,
        };
        let rendered = format!("{args:?}");
        assert!(rendered.contains("***"));
        assert!(!rendered.contains("sekreta"));
    }
}
