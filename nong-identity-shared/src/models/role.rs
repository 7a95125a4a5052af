/// Roles and role claims
///
/// Role names are unique through the upper-cased `NormalizedName` column
/// (index `RoleNameIndex`). Role claims are removed together with their role.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE "Roles" (
///     "Id" text NOT NULL,
///     "Name" character varying(256),
///     "NormalizedName" character varying(256),
///     "ConcurrencyStamp" text,
///     CONSTRAINT "PK_Roles" PRIMARY KEY ("Id")
/// );
///
/// CREATE TABLE "RoleClaims" (
///     "Id" integer NOT NULL GENERATED BY DEFAULT AS IDENTITY,
///     "RoleId" text NOT NULL REFERENCES "Roles" ("Id") ON DELETE CASCADE,
///     "ClaimType" text,
///     "ClaimValue" text
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::{normalize, ModelError};
use crate::auth::claims::Claim;

/// Role row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    /// Textual UUID v4
    #[sqlx(rename = "Id")]
    pub id: String,

    #[sqlx(rename = "Name")]
    pub name: Option<String>,

    /// Upper-cased `name`, unique
    #[sqlx(rename = "NormalizedName")]
    pub normalized_name: Option<String>,

    #[sqlx(rename = "ConcurrencyStamp")]
    pub concurrency_stamp: Option<String>,
}

/// Input for creating a role
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRole {
    #[validate(length(min = 1, max = 256, message = "role name must be 1-256 characters"))]
    pub name: String,
}

/// Claim granted to every member of a role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleClaim {
    #[sqlx(rename = "Id")]
    pub id: i32,

    #[sqlx(rename = "RoleId")]
    pub role_id: String,

    #[sqlx(rename = "ClaimType")]
    pub claim_type: Option<String>,

    #[sqlx(rename = "ClaimValue")]
    pub claim_value: Option<String>,
}

impl Role {
    /// Creates a role
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if a role with the same normalized name
    /// already exists.
    pub async fn create(pool: &PgPool, data: CreateRole) -> Result<Self, ModelError> {
        data.validate()?;

        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO "Roles" ("Id", "Name", "NormalizedName", "ConcurrencyStamp")
            VALUES ($1, $2, $3, $4)
            RETURNING "Id", "Name", "NormalizedName", "ConcurrencyStamp"
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&data.name)
        .bind(normalize(&data.name))
        .bind(Uuid::new_v4().to_string())
        .fetch_one(pool)
        .await?;

        Ok(role)
    }

    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            r#"SELECT "Id", "Name", "NormalizedName", "ConcurrencyStamp" FROM "Roles" WHERE "Id" = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a role by name, ignoring case
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT "Id", "Name", "NormalizedName", "ConcurrencyStamp"
            FROM "Roles"
            WHERE "NormalizedName" = $1
            "#,
        )
        .bind(normalize(name))
        .fetch_optional(pool)
        .await
    }

    /// Lists all roles ordered by name
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT "Id", "Name", "NormalizedName", "ConcurrencyStamp"
            FROM "Roles"
            ORDER BY "NormalizedName"
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Deletes a role together with its claims and memberships
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM "Roles" WHERE "Id" = $1"#)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl RoleClaim {
    /// Attaches a claim to a role
    pub async fn add(
        pool: &PgPool,
        role_id: &str,
        claim_type: &str,
        claim_value: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, RoleClaim>(
            r#"
            INSERT INTO "RoleClaims" ("RoleId", "ClaimType", "ClaimValue")
            VALUES ($1, $2, $3)
            RETURNING "Id", "RoleId", "ClaimType", "ClaimValue"
            "#,
        )
        .bind(role_id)
        .bind(claim_type)
        .bind(claim_value)
        .fetch_one(pool)
        .await
    }

    /// Claims of a role in insertion order
    pub async fn list_for_role(pool: &PgPool, role_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RoleClaim>(
            r#"
            SELECT "Id", "RoleId", "ClaimType", "ClaimValue"
            FROM "RoleClaims"
            WHERE "RoleId" = $1
            ORDER BY "Id"
            "#,
        )
        .bind(role_id)
        .fetch_all(pool)
        .await
    }

    pub async fn remove(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM "RoleClaims" WHERE "Id" = $1"#)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Converts to a claim; missing type or value become empty strings
    pub fn to_claim(&self) -> Claim {
        Claim::new(
            self.claim_type.clone().unwrap_or_default(),
            self.claim_value.clone().unwrap_or_default(),
        )
    }
}
