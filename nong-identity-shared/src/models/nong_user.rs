/// Standalone Nong application user profiles
///
/// `NongApplicationUsers` duplicates the profile fields that also live on
/// `Users` but has its own bigint identity and no link to the identity
/// tables. The two are kept separate; nothing here reads or writes `Users`.
///
/// # Example
///
/// ```no_run
/// use nong_identity_shared::models::nong_user::{CreateNongUser, NongUser};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let profile = NongUser::create(&pool, CreateNongUser {
///     user_code: "N0001".to_string(),
///     province: "Henan".to_string(),
///     longitude: 113.62,
///     latitude: 34.75,
///     ..Default::default()
/// })
/// .await?;
///
/// let found = NongUser::find_by_user_code(&pool, "N0001").await?;
/// assert_eq!(found.map(|p| p.id), Some(profile.id));
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use super::ModelError;
use crate::time::UtcDateTime;

const NONG_USER_COLUMNS: &str = r#""Id", "UserCode", "Province", "City", "Town", "County",
    "Longitude", "Latitude", "Mobile", "Password", "Salt", "Tag", "CreateTime""#;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NongUser {
    #[sqlx(rename = "Id")]
    pub id: i64,

    #[sqlx(rename = "UserCode")]
    pub user_code: String,

    #[sqlx(rename = "Province")]
    pub province: String,

    #[sqlx(rename = "City")]
    pub city: String,

    #[sqlx(rename = "Town")]
    pub town: String,

    #[sqlx(rename = "County")]
    pub county: String,

    #[sqlx(rename = "Longitude")]
    pub longitude: f64,

    #[sqlx(rename = "Latitude")]
    pub latitude: f64,

    #[sqlx(rename = "Mobile")]
    pub mobile: String,

    #[sqlx(rename = "Password")]
    #[serde(skip_serializing, default)]
    pub password: String,

    #[sqlx(rename = "Salt")]
    #[serde(skip_serializing, default)]
    pub salt: String,

    #[sqlx(rename = "Tag")]
    pub tag: i32,

    #[sqlx(rename = "CreateTime")]
    pub create_time: UtcDateTime,
}

/// Input for creating a profile; `CreateTime` is set to now
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateNongUser {
    #[validate(length(max = 20))]
    pub user_code: String,

    #[validate(length(max = 20))]
    pub province: String,

    #[validate(length(max = 20))]
    pub city: String,

    #[validate(length(max = 20))]
    pub town: String,

    #[validate(length(max = 20))]
    pub county: String,

    pub longitude: f64,

    pub latitude: f64,

    #[validate(length(max = 20))]
    pub mobile: String,

    #[validate(length(max = 200))]
    pub password: String,

    #[validate(length(max = 20))]
    pub salt: String,

    pub tag: i32,
}

impl NongUser {
    pub async fn create(pool: &PgPool, data: CreateNongUser) -> Result<Self, ModelError> {
        data.validate()?;

        let query = format!(
            r#"
            INSERT INTO "NongApplicationUsers" (
                "UserCode", "Province", "City", "Town", "County", "Longitude", "Latitude",
                "Mobile", "Password", "Salt", "Tag", "CreateTime"
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {NONG_USER_COLUMNS}
            "#
        );

        let profile = sqlx::query_as::<_, NongUser>(&query)
            .bind(data.user_code)
            .bind(data.province)
            .bind(data.city)
            .bind(data.town)
            .bind(data.county)
            .bind(data.longitude)
            .bind(data.latitude)
            .bind(data.mobile)
            .bind(data.password)
            .bind(data.salt)
            .bind(data.tag)
            .bind(UtcDateTime::now())
            .fetch_one(pool)
            .await?;

        Ok(profile)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query =
            format!(r#"SELECT {NONG_USER_COLUMNS} FROM "NongApplicationUsers" WHERE "Id" = $1"#);

        sqlx::query_as::<_, NongUser>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// First profile with the given code; codes are not unique
    pub async fn find_by_user_code(
        pool: &PgPool,
        user_code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"SELECT {NONG_USER_COLUMNS} FROM "NongApplicationUsers"
               WHERE "UserCode" = $1 ORDER BY "Id" LIMIT 1"#
        );

        sqlx::query_as::<_, NongUser>(&query)
            .bind(user_code)
            .fetch_optional(pool)
            .await
    }

    /// Lists profiles by ascending id
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"SELECT {NONG_USER_COLUMNS} FROM "NongApplicationUsers"
               ORDER BY "Id" LIMIT $1 OFFSET $2"#
        );

        sqlx::query_as::<_, NongUser>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM "NongApplicationUsers" WHERE "Id" = $1"#)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_nong_user_bounds() {
        let ok = CreateNongUser {
            user_code: "N".repeat(20),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let too_long = CreateNongUser {
            user_code: "N".repeat(21),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());
    }
}
