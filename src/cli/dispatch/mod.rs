//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::auth;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let token_secret = matches
        .get_one::<String>(auth::ARG_TOKEN_SECRET)
        .cloned()
        .context("missing required argument: --token-secret")?;

    let access_token_ttl_seconds = matches
        .get_one::<u64>(auth::ARG_ACCESS_TOKEN_TTL)
        .copied()
        .unwrap_or(1800);

    let refresh_token_ttl_seconds = matches
        .get_one::<u64>(auth::ARG_REFRESH_TOKEN_TTL)
        .copied()
        .unwrap_or(432_000);

    Ok(Action::Server(Args {
        port,
        dsn,
        token_secret: SecretString::from(token_secret),
        access_token_ttl_seconds,
        refresh_token_ttl_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_matches() {
        temp_env::with_vars(
            [
                ("KONTO_DSN", None::<&str>),
                ("KONTO_TOKEN_SECRET", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "konto",
                    "--dsn",
                    "postgres://user@localhost:5432/konto",
                    "--token-secret",
                    "sekreta",
                    "--access-token-ttl-seconds",
                    "900",
                ]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 8080);
                    assert_eq!(args.dsn, "postgres://user@localhost:5432/konto");
                    assert_eq!(args.token_secret.expose_secret(), "sekreta");
                    assert_eq!(args.access_token_ttl_seconds, 900);
                    assert_eq!(args.refresh_token_ttl_seconds, 432_000);
                }
            },
        );
    }
}
