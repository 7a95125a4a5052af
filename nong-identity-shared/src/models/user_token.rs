/// Named tokens stored per user and login provider
///
/// Used for things like authenticator keys and recovery codes; there is at
/// most one value per (`UserId`, `LoginProvider`, `Name`).

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserToken {
    #[sqlx(rename = "UserId")]
    pub user_id: String,

    #[sqlx(rename = "LoginProvider")]
    pub login_provider: String,

    #[sqlx(rename = "Name")]
    pub name: String,

    #[sqlx(rename = "Value")]
    #[serde(skip_serializing)]
    pub value: Option<String>,
}

impl UserToken {
    /// Stores a token, replacing any previous value
    pub async fn set(
        pool: &PgPool,
        user_id: &str,
        login_provider: &str,
        name: &str,
        value: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, UserToken>(
            r#"
            INSERT INTO "UserTokens" ("UserId", "LoginProvider", "Name", "Value")
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ("UserId", "LoginProvider", "Name")
            DO UPDATE SET "Value" = EXCLUDED."Value"
            RETURNING "UserId", "LoginProvider", "Name", "Value"
            "#,
        )
        .bind(user_id)
        .bind(login_provider)
        .bind(name)
        .bind(value)
        .fetch_one(pool)
        .await
    }

    /// Token value, None if no token is stored under that name
    pub async fn get(
        pool: &PgPool,
        user_id: &str,
        login_provider: &str,
        name: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            r#"
            SELECT "Value" FROM "UserTokens"
            WHERE "UserId" = $1 AND "LoginProvider" = $2 AND "Name" = $3
            "#,
        )
        .bind(user_id)
        .bind(login_provider)
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(row.and_then(|(value,)| value))
    }

    pub async fn remove(
        pool: &PgPool,
        user_id: &str,
        login_provider: &str,
        name: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM "UserTokens"
            WHERE "UserId" = $1 AND "LoginProvider" = $2 AND "Name" = $3
            "#,
        )
        .bind(user_id)
        .bind(login_provider)
        .bind(name)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
