/// Audit trail entries
///
/// `Created` is always written as UTC through [`UtcDateTime`]. The column
/// starts out as `timestamp without time zone` and becomes
/// `timestamp with time zone` in a later migration; reads work against
/// either shape.
///
/// # Example
///
/// ```no_run
/// use nong_identity_shared::models::audit_log::{AuditLog, NewAuditLog};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// AuditLog::create(&pool, NewAuditLog {
///     event: Some("UserUpdated".to_string()),
///     source: Some("IdentityAdmin".to_string()),
///     subject_identifier: Some("2f0c...".to_string()),
///     action: Some("update".to_string()),
///     ..Default::default()
/// })
/// .await?;
///
/// for entry in AuditLog::list(&pool, 20, 0).await? {
///     println!("{} {:?}", entry.created, entry.event);
/// }
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use crate::time::{Timestamp, UtcDateTime};

const AUDIT_LOG_COLUMNS: &str = r#""Id", "Event", "Source", "Category", "SubjectIdentifier",
    "SubjectName", "SubjectType", "SubjectAdditionalData", "Action", "Data", "Created""#;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    #[sqlx(rename = "Id")]
    pub id: i64,

    #[sqlx(rename = "Event")]
    pub event: Option<String>,

    #[sqlx(rename = "Source")]
    pub source: Option<String>,

    #[sqlx(rename = "Category")]
    pub category: Option<String>,

    #[sqlx(rename = "SubjectIdentifier")]
    pub subject_identifier: Option<String>,

    #[sqlx(rename = "SubjectName")]
    pub subject_name: Option<String>,

    #[sqlx(rename = "SubjectType")]
    pub subject_type: Option<String>,

    #[sqlx(rename = "SubjectAdditionalData")]
    pub subject_additional_data: Option<String>,

    #[sqlx(rename = "Action")]
    pub action: Option<String>,

    /// Serialized event payload
    #[sqlx(rename = "Data")]
    pub data: Option<String>,

    #[sqlx(rename = "Created")]
    pub created: UtcDateTime,
}

/// Input for a new audit entry
///
/// `created` defaults to now; any supplied value is normalized to UTC.
#[derive(Debug, Clone, Default)]
pub struct NewAuditLog {
    pub event: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub subject_identifier: Option<String>,
    pub subject_name: Option<String>,
    pub subject_type: Option<String>,
    pub subject_additional_data: Option<String>,
    pub action: Option<String>,
    pub data: Option<String>,
    pub created: Option<Timestamp>,
}

impl AuditLog {
    /// Appends an entry
    pub async fn create(pool: &PgPool, entry: NewAuditLog) -> Result<Self, sqlx::Error> {
        let created = entry
            .created
            .map(UtcDateTime::from)
            .unwrap_or_else(UtcDateTime::now);

        let query = format!(
            r#"
            INSERT INTO "AuditLog" (
                "Event", "Source", "Category", "SubjectIdentifier", "SubjectName",
                "SubjectType", "SubjectAdditionalData", "Action", "Data", "Created"
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {AUDIT_LOG_COLUMNS}
            "#
        );

        let log = sqlx::query_as::<_, AuditLog>(&query)
            .bind(entry.event)
            .bind(entry.source)
            .bind(entry.category)
            .bind(entry.subject_identifier)
            .bind(entry.subject_name)
            .bind(entry.subject_type)
            .bind(entry.subject_additional_data)
            .bind(entry.action)
            .bind(entry.data)
            .bind(created)
            .fetch_one(pool)
            .await?;

        Ok(log)
    }

    /// Lists entries, newest first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"SELECT {AUDIT_LOG_COLUMNS} FROM "AuditLog"
               ORDER BY "Created" DESC, "Id" DESC
               LIMIT $1 OFFSET $2"#
        );

        sqlx::query_as::<_, AuditLog>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Entries about one subject, newest first
    pub async fn list_for_subject(
        pool: &PgPool,
        subject_identifier: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"SELECT {AUDIT_LOG_COLUMNS} FROM "AuditLog"
               WHERE "SubjectIdentifier" = $1
               ORDER BY "Created" DESC, "Id" DESC
               LIMIT $2"#
        );

        sqlx::query_as::<_, AuditLog>(&query)
            .bind(subject_identifier)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Deletes entries created before `cutoff`
    ///
    /// # Returns
    ///
    /// Number of entries deleted
    pub async fn delete_older_than(
        pool: &PgPool,
        cutoff: impl Into<UtcDateTime>,
    ) -> Result<u64, sqlx::Error> {
        let cutoff = cutoff.into();

        let result = sqlx::query(r#"DELETE FROM "AuditLog" WHERE "Created" < $1"#)
            .bind(cutoff)
            .execute(pool)
            .await?;

        info!(
            deleted = result.rows_affected(),
            cutoff = %cutoff,
            "Pruned audit log"
        );

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_audit_log_default() {
        let entry = NewAuditLog::default();
        assert!(entry.event.is_none());
        assert!(entry.created.is_none());
    }
}
