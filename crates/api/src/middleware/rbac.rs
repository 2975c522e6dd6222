//! Role and party checks.
//!
//! [`RequireAdmin`] gates the `/admin` routes. [`require_party`] covers the
//! per-resource rule used elsewhere: only the users named on a record (or an
//! admin) may see it.

use altme_core::error::CoreError;
use altme_core::types::DbId;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Extracts an [`AuthUser`] holding the `admin` role, or rejects with 403.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = AuthUser::from_request_parts(parts, state).await?;
        if caller.is_admin() {
            Ok(RequireAdmin(caller))
        } else {
            Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )))
        }
    }
}

/// Allow the caller if they are one of `parties`, or an admin.
///
/// `what` names the record in the 403 message.
pub fn require_party(
    caller: &AuthUser,
    parties: impl IntoIterator<Item = Option<DbId>>,
    what: &str,
) -> AppResult<()> {
    if caller.is_admin() || parties.into_iter().flatten().any(|id| id == caller.user_id) {
        return Ok(());
    }
    Err(AppError::Core(CoreError::Forbidden(format!(
        "Only the parties to this {what} can access it"
    ))))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn caller(user_id: DbId, role: &str) -> AuthUser {
        AuthUser {
            user_id,
            role: role.to_string(),
        }
    }

    #[test]
    fn named_party_is_allowed() {
        let client = caller(3, "user");
        assert!(require_party(&client, [Some(3), None], "escrow payment").is_ok());
        assert!(require_party(&client, [Some(9), Some(3)], "escrow payment").is_ok());
    }

    #[test]
    fn stranger_is_forbidden_and_admin_is_not() {
        let stranger = caller(4, "user");
        assert_matches!(
            require_party(&stranger, [Some(3), None], "escrow payment"),
            Err(AppError::Core(CoreError::Forbidden(msg))) if msg.contains("escrow payment")
        );
        assert!(require_party(&caller(1, "admin"), [Some(3)], "escrow payment").is_ok());
    }
}
