/// Claims attached directly to a user
///
/// Rows are removed with their user (`FK_UserClaims_Users_UserId` cascades).

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::claims::Claim;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserClaim {
    #[sqlx(rename = "Id")]
    pub id: i32,

    #[sqlx(rename = "UserId")]
    pub user_id: String,

    #[sqlx(rename = "ClaimType")]
    pub claim_type: Option<String>,

    #[sqlx(rename = "ClaimValue")]
    pub claim_value: Option<String>,
}

impl UserClaim {
    /// Attaches a claim to a user
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation if the user does not exist.
    pub async fn add(
        pool: &PgPool,
        user_id: &str,
        claim_type: &str,
        claim_value: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, UserClaim>(
            r#"
            INSERT INTO "UserClaims" ("UserId", "ClaimType", "ClaimValue")
            VALUES ($1, $2, $3)
            RETURNING "Id", "UserId", "ClaimType", "ClaimValue"
            "#,
        )
        .bind(user_id)
        .bind(claim_type)
        .bind(claim_value)
        .fetch_one(pool)
        .await
    }

    /// Claims of a user in insertion order
    pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserClaim>(
            r#"
            SELECT "Id", "UserId", "ClaimType", "ClaimValue"
            FROM "UserClaims"
            WHERE "UserId" = $1
            ORDER BY "Id"
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn remove(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM "UserClaims" WHERE "Id" = $1"#)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl From<UserClaim> for Claim {
    fn from(row: UserClaim) -> Self {
        Claim::new(
            row.claim_type.unwrap_or_default(),
            row.claim_value.unwrap_or_default(),
        )
    }
}
