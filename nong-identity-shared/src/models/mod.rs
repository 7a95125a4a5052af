/// Database models for the identity store
///
/// Each model maps one table of the identity schema and carries its CRUD
/// operations as associated functions taking a `&PgPool`.
///
/// # Models
///
/// - `user`: Identity users, including the profile columns added in v2
/// - `role`: Roles and their claims
/// - `user_claim`: Claims attached to a user
/// - `user_login`: External login provider links
/// - `user_role`: User/role membership
/// - `user_token`: Per-provider named tokens
/// - `nong_user`: Standalone Nong application user profiles
/// - `audit_log`: Audit trail entries
///
/// # Example
///
/// ```no_run
/// use nong_identity_shared::models::user::{User, CreateUser};
/// use nong_identity_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::with_url("postgresql://localhost/identity_admin")).await?;
///
/// let new_user = CreateUser {
///     user_name: "alice".to_string(),
///     email: Some("alice@example.com".to_string()),
///     ..Default::default()
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod audit_log;
pub mod nong_user;
pub mod role;
pub mod user;
pub mod user_claim;
pub mod user_login;
pub mod user_role;
pub mod user_token;

use thiserror::Error;
use validator::ValidationErrors;

use crate::auth::password::PasswordError;

/// Errors from model operations that validate their input before writing
#[derive(Debug, Error)]
pub enum ModelError {
    /// Input failed field validation; nothing was written
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The database rejected the statement
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A new password breaks the password policy; nothing was written
    #[error("Password rejected: {}", .0.join("; "))]
    PasswordPolicy(Vec<String>),

    /// Hashing failed or a stored hash is malformed
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Upper-cased invariant form used for the `Normalized*` lookup columns
pub fn normalize(value: &str) -> String {
    value.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_upper_cases() {
        assert_eq!(normalize("alice@example.com"), "ALICE@EXAMPLE.COM");
        assert_eq!(normalize("Admin"), "ADMIN");
    }

    #[test]
    fn test_password_policy_error_lists_rules() {
        let err = ModelError::PasswordPolicy(vec![
            "Password must contain at least one digit".to_string(),
            "Password must contain at least one special character".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Password rejected: Password must contain at least one digit; \
             Password must contain at least one special character"
        );
    }

    #[test]
    fn test_normalize_non_ascii() {
        assert_eq!(normalize("straße"), "STRASSE");
    }
}
