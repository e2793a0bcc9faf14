//! # Konto (User Accounts & Authentication)
//!
//! `konto` is a user-account service where several identifiers are
//! interchangeable as the login username: an email address, a national ID, or
//! a phone number. Password verification yields a short-lived JWT access token
//! plus a rotating refresh token.
//!
//! ## Identifiers & Login Methods
//!
//! Every identifier value is globally unique across all accounts, whichever
//! column or binding it lives in. A successful login records (or replaces)
//! a `login method` binding for the channel that was used, so each account
//! holds at most one binding per channel.
//!
//! ## Authentication
//!
//! Resolution tries the login-method index first and falls back to the
//! canonical email column. Unknown identifiers and wrong passwords are
//! indistinguishable to callers; only the disabled-account case carries its
//! own message.
//!
//! ## Profiles
//!
//! Each account owns exactly one profile. The account write path provisions
//! it on creation and re-creates it on the next save if it ever goes missing.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
