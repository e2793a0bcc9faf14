//! API handlers for Konto.
//!
//! Account CRUD, token issuance, login-method bindings, and the caller's
//! profile. Shared validation helpers live in `auth::utils`; each handler
//! file keeps its own storage queries next to the endpoints that use them.

pub mod accounts;
pub mod auth;
pub mod health;
pub mod login_methods;
pub mod profile;
pub mod root;
