/// External login provider links
///
/// A (`LoginProvider`, `ProviderKey`) pair identifies at most one user.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserLogin {
    #[sqlx(rename = "LoginProvider")]
    pub login_provider: String,

    /// Key of the user at the provider
    #[sqlx(rename = "ProviderKey")]
    pub provider_key: String,

    #[sqlx(rename = "ProviderDisplayName")]
    pub provider_display_name: Option<String>,

    #[sqlx(rename = "UserId")]
    pub user_id: String,
}

impl UserLogin {
    /// Links a provider account to a user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the provider key is already linked.
    pub async fn add(pool: &PgPool, login: UserLogin) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, UserLogin>(
            r#"
            INSERT INTO "UserLogins" ("LoginProvider", "ProviderKey", "ProviderDisplayName", "UserId")
            VALUES ($1, $2, $3, $4)
            RETURNING "LoginProvider", "ProviderKey", "ProviderDisplayName", "UserId"
            "#,
        )
        .bind(login.login_provider)
        .bind(login.provider_key)
        .bind(login.provider_display_name)
        .bind(login.user_id)
        .fetch_one(pool)
        .await
    }

    /// Resolves a provider key to its link
    pub async fn find(
        pool: &PgPool,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserLogin>(
            r#"
            SELECT "LoginProvider", "ProviderKey", "ProviderDisplayName", "UserId"
            FROM "UserLogins"
            WHERE "LoginProvider" = $1 AND "ProviderKey" = $2
            "#,
        )
        .bind(login_provider)
        .bind(provider_key)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserLogin>(
            r#"
            SELECT "LoginProvider", "ProviderKey", "ProviderDisplayName", "UserId"
            FROM "UserLogins"
            WHERE "UserId" = $1
            ORDER BY "LoginProvider", "ProviderKey"
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn remove(
        pool: &PgPool,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"DELETE FROM "UserLogins" WHERE "LoginProvider" = $1 AND "ProviderKey" = $2"#,
        )
        .bind(login_provider)
        .bind(provider_key)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
