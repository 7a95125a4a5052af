/// User/role membership
///
/// Membership rows go away when either the user or the role is deleted.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::role::Role;
use super::user::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRole {
    #[sqlx(rename = "UserId")]
    pub user_id: String,

    #[sqlx(rename = "RoleId")]
    pub role_id: String,
}

impl UserRole {
    /// Adds a user to a role
    ///
    /// Adding an existing membership is a no-op.
    ///
    /// # Returns
    ///
    /// True if a new membership was created
    pub async fn add(pool: &PgPool, user_id: &str, role_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO "UserRoles" ("UserId", "RoleId")
            VALUES ($1, $2)
            ON CONFLICT ("UserId", "RoleId") DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove(pool: &PgPool, user_id: &str, role_id: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query(r#"DELETE FROM "UserRoles" WHERE "UserId" = $1 AND "RoleId" = $2"#)
                .bind(user_id)
                .bind(role_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Roles the user belongs to, ordered by name
    pub async fn roles_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT r."Id", r."Name", r."NormalizedName", r."ConcurrencyStamp"
            FROM "Roles" r
            INNER JOIN "UserRoles" ur ON ur."RoleId" = r."Id"
            WHERE ur."UserId" = $1
            ORDER BY r."NormalizedName"
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Ids of the users in a role
    pub async fn users_in_role(pool: &PgPool, role_id: &str) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT "UserId" FROM "UserRoles" WHERE "RoleId" = $1 ORDER BY "UserId""#,
        )
        .bind(role_id)
        .fetch_all(pool)
        .await
    }

    /// Full user rows for the members of a role
    pub async fn members(pool: &PgPool, role_id: &str) -> Result<Vec<User>, sqlx::Error> {
        let mut users = Vec::new();
        for user_id in Self::users_in_role(pool, role_id).await? {
            if let Some(user) = User::find_by_id(pool, &user_id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }
}
