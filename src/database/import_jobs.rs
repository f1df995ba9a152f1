use crate::reclaimer::{ProcessingStatus, ReclaimError, ResourceRef, StaleResourceRepository};
use crate::state_machine::PersistenceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

/// Resource kind reported for rows of `import_jobs`
pub const IMPORT_JOB_KIND: &str = "import_job";

/// Stale-resource view over the `import_jobs` table
#[derive(Debug, Clone)]
pub struct PgImportJobRepository {
    pool: PgPool,
}

impl PgImportJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StaleResourceRepository for PgImportJobRepository {
    async fn find_stale(
        &self,
        older_than: DateTime<Utc>,
        statuses: &[ProcessingStatus],
        limit: u32,
    ) -> Result<Vec<ResourceRef>, ReclaimError> {
        let statuses: Vec<&str> = statuses.iter().map(|status| status.as_str()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id::text AS id, tenant_id, status, COALESCE(started_at, created_at) AS stale_since
            FROM import_jobs
            WHERE status = ANY($1) AND COALESCE(started_at, created_at) < $2
            ORDER BY stale_since
            LIMIT $3
            "#,
        )
        .bind(&statuses)
        .bind(older_than)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(PersistenceError::from)?;

        rows.iter()
            .map(|row| {
                let status: String = row.try_get("status").map_err(PersistenceError::from)?;
                Ok(ResourceRef {
                    resource_kind: IMPORT_JOB_KIND.to_string(),
                    resource_id: row.try_get("id").map_err(PersistenceError::from)?,
                    tenant_id: row.try_get("tenant_id").map_err(PersistenceError::from)?,
                    status: status.parse().map_err(|_| PersistenceError::InvalidStoredValue {
                        field: "import_jobs.status".to_string(),
                        value: status.clone(),
                    })?,
                    stale_since: row.try_get("stale_since").map_err(PersistenceError::from)?,
                })
            })
            .collect()
    }

    async fn mark_failed(&self, resource: &ResourceRef, message: &str) -> Result<bool, ReclaimError> {
        if resource.resource_kind != IMPORT_JOB_KIND {
            return Err(ReclaimError::Query {
                reason: format!("unsupported resource kind '{}'", resource.resource_kind),
            });
        }

        // Conditional on the scanned status and start time so a job that
        // progressed or restarted since the scan is left alone
        let result = sqlx::query(
            r#"
            UPDATE import_jobs
            SET status = 'failed', error_message = $2, completed_at = NOW(), updated_at = NOW()
            WHERE id = $1::uuid
              AND status = $3
              AND COALESCE(started_at, created_at) = $4
            "#,
        )
        .bind(&resource.resource_id)
        .bind(message)
        .bind(resource.status.as_str())
        .bind(resource.stale_since)
        .execute(&self.pool)
        .await
        .map_err(PersistenceError::from)?;

        Ok(result.rows_affected() == 1)
    }
}
