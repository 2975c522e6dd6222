//! Authentication primitives.
//!
//! - [`password`]: Argon2id hashing and the password policy.
//! - [`jwt`]: HS256 access tokens.

pub mod jwt;
pub mod password;
