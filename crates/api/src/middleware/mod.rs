//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`]: an active user authenticated by Bearer token.
//! - [`rbac::RequireAdmin`]: requires the `admin` role.
//! - [`rbac::require_party`]: restricts a record to the users named on it.

pub mod auth;
pub mod rbac;
