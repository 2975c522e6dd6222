//! Startup seeding of the first admin account.
//!
//! A fresh database has no admin, and admins cannot register through the
//! public API. When `ADMIN_EMAIL` and `ADMIN_PASSWORD` are set the server
//! creates that account at startup if it does not exist yet.

use altme_core::roles::ROLE_ADMIN;
use altme_core::validation::validate_email;
use altme_db::models::user::CreateUser;
use altme_db::repositories::UserRepo;
use altme_db::DbPool;

use crate::auth::password::{hash_password, validate_password};
use crate::error::{AppError, AppResult};

const DEFAULT_ADMIN_NAME: &str = "Administrator";

/// Credentials of the admin account to seed.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

impl AdminSeed {
    /// Read `ADMIN_EMAIL`, `ADMIN_PASSWORD` and optional `ADMIN_NAME`.
    /// Returns `None` unless both credentials are set.
    pub fn from_env() -> Option<Self> {
        let email = std::env::var("ADMIN_EMAIL").ok().filter(|v| !v.is_empty())?;
        let password = std::env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty())?;
        Some(Self {
            email: email.trim().to_lowercase(),
            password,
            display_name: std::env::var("ADMIN_NAME")
                .unwrap_or_else(|_| DEFAULT_ADMIN_NAME.to_string()),
        })
    }
}

/// Create the seeded admin unless a user with that email already exists.
///
/// Returns `true` if an account was created. An existing account is left
/// untouched, whatever its role.
pub async fn ensure_admin(pool: &DbPool, seed: &AdminSeed) -> AppResult<bool> {
    validate_email(&seed.email)?;
    if UserRepo::find_by_email(pool, &seed.email).await?.is_some() {
        return Ok(false);
    }
    validate_password(&seed.password)?;

    let password_hash = hash_password(&seed.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: seed.email.clone(),
            display_name: seed.display_name.clone(),
            password_hash,
            role: ROLE_ADMIN.to_string(),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, email = %user.email, "Seeded admin account");
    Ok(true)
}
