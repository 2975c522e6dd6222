//! Well-known role and account status constants.
//!
//! These must match the CHECK constraints on the `users` table.

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// All valid role names.
pub const VALID_ROLES: &[&str] = &[ROLE_USER, ROLE_ADMIN];

pub const USER_STATUS_ACTIVE: &str = "active";
pub const USER_STATUS_DISABLED: &str = "disabled";

/// All valid account statuses.
pub const VALID_USER_STATUSES: &[&str] = &[USER_STATUS_ACTIVE, USER_STATUS_DISABLED];

/// Validate that a role name is known.
pub fn validate_role(role: &str) -> Result<(), crate::error::CoreError> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(crate::error::CoreError::Validation(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        )))
    }
}

/// Validate that an account status is known.
pub fn validate_user_status(status: &str) -> Result<(), crate::error::CoreError> {
    if VALID_USER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(crate::error::CoreError::Validation(format!(
            "Invalid user status '{status}'. Must be one of: {}",
            VALID_USER_STATUSES.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_roles_validate() {
        assert!(validate_role(ROLE_USER).is_ok());
        assert!(validate_role(ROLE_ADMIN).is_ok());
        assert!(validate_role("photographer").is_err());
    }

    #[test]
    fn known_statuses_validate() {
        assert!(validate_user_status(USER_STATUS_ACTIVE).is_ok());
        assert!(validate_user_status(USER_STATUS_DISABLED).is_ok());
        assert!(validate_user_status("banned").is_err());
    }
}
