//! Postgres-backed [`WorkItemRepository`].
//!
//! One repository instance serves one workflow variant; rows of the other
//! variant in the shared `work_items` table are invisible to it.

use crate::state_machine::{
    PersistenceError, PersistenceResult, StateMachineResult, StatusHistoryEntry,
    TransitionDecider, TransitionMetadata, WorkItem, WorkItemRepository, WorkflowStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Row};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

const WORK_ITEM_COLUMNS: &str =
    "id, tenant_id, status, sla_deadline, sla_breached, sla_warned, created_at, updated_at";

pub struct PgWorkItemRepository<S: WorkflowStatus> {
    pool: PgPool,
    _status: PhantomData<fn() -> S>,
}

impl<S: WorkflowStatus> PgWorkItemRepository<S> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _status: PhantomData,
        }
    }

    fn kind() -> &'static str {
        S::KIND.as_str()
    }

    fn tracked_statuses() -> Vec<String> {
        S::sla_tracked_statuses()
            .into_iter()
            .map(|status| status.as_str().to_string())
            .collect()
    }

    async fn hydrate(
        conn: &mut PgConnection,
        rows: Vec<PgRow>,
    ) -> PersistenceResult<Vec<WorkItem<S>>> {
        let mut items = rows
            .iter()
            .map(work_item_from_row::<S>)
            .collect::<PersistenceResult<Vec<_>>>()?;
        if items.is_empty() {
            return Ok(items);
        }

        let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
        let history_rows = sqlx::query(
            r#"
            SELECT work_item_id, from_status, to_status, actor, reason, metadata, created_at
            FROM work_item_status_history
            WHERE work_item_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut history: HashMap<Uuid, Vec<StatusHistoryEntry<S>>> = HashMap::new();
        for row in &history_rows {
            let item_id: Uuid = row.try_get("work_item_id")?;
            history
                .entry(item_id)
                .or_default()
                .push(history_from_row::<S>(row)?);
        }
        for item in &mut items {
            item.status_history = history.remove(&item.id).unwrap_or_default();
        }
        Ok(items)
    }

    async fn fetch_items(&self, query: PgQuery<'_>) -> PersistenceResult<Vec<WorkItem<S>>> {
        let mut conn = self.pool.acquire().await?;
        let rows = query.fetch_all(&mut *conn).await?;
        Self::hydrate(&mut conn, rows).await
    }

    async fn flag(&self, query: PgQuery<'_>) -> PersistenceResult<Vec<Uuid>> {
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<Uuid, _>("id").map_err(PersistenceError::from))
            .collect()
    }
}

impl<S: WorkflowStatus> Clone for PgWorkItemRepository<S> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<S: WorkflowStatus> fmt::Debug for PgWorkItemRepository<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgWorkItemRepository")
            .field("kind", &S::KIND)
            .finish()
    }
}

#[async_trait]
impl<S: WorkflowStatus> WorkItemRepository<S> for PgWorkItemRepository<S> {
    async fn insert_work_item(&self, item: &WorkItem<S>) -> PersistenceResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO work_items
                (id, kind, tenant_id, status, sla_deadline, sla_breached, sla_warned, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(item.id)
        .bind(Self::kind())
        .bind(&item.tenant_id)
        .bind(item.status.as_str())
        .bind(item.sla_deadline)
        .bind(item.sla_breached)
        .bind(item.sla_warned)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await?;

        for entry in &item.status_history {
            insert_history(&mut tx, item.id, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_work_item(&self, id: Uuid) -> PersistenceResult<WorkItem<S>> {
        let sql = format!("SELECT {WORK_ITEM_COLUMNS} FROM work_items WHERE id = $1 AND kind = $2");
        let mut items = self
            .fetch_items(sqlx::query(&sql).bind(id).bind(Self::kind()))
            .await?;
        items.pop().ok_or(PersistenceError::NotFound { id })
    }

    async fn save_transition(
        &self,
        id: Uuid,
        decide: &TransitionDecider<'_, S>,
    ) -> StateMachineResult<WorkItem<S>> {
        let mut tx = self.pool.begin().await.map_err(PersistenceError::from)?;

        // Row lock serializes concurrent transitions of the same item
        let sql = format!(
            "SELECT {WORK_ITEM_COLUMNS} FROM work_items WHERE id = $1 AND kind = $2 FOR UPDATE"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(Self::kind())
            .fetch_optional(&mut *tx)
            .await
            .map_err(PersistenceError::from)?
            .ok_or(PersistenceError::NotFound { id })?;

        let mut item = Self::hydrate(&mut tx, vec![row])
            .await?
            .pop()
            .ok_or(PersistenceError::NotFound { id })?;

        // A rejected transition drops `tx`, rolling back the row lock only
        let plan = decide(&item)?;
        item.apply(plan);

        sqlx::query(
            r#"
            UPDATE work_items
            SET status = $2, sla_deadline = $3, sla_breached = $4, sla_warned = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(item.status.as_str())
        .bind(item.sla_deadline)
        .bind(item.sla_breached)
        .bind(item.sla_warned)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(PersistenceError::from)?;

        if let Some(entry) = item.status_history.last() {
            insert_history(&mut tx, item.id, entry).await?;
        }

        tx.commit().await.map_err(PersistenceError::from)?;
        Ok(item)
    }

    async fn find_sla_tracked(
        &self,
        overdue: bool,
        now: DateTime<Utc>,
    ) -> PersistenceResult<Vec<WorkItem<S>>> {
        let sql = format!(
            "SELECT {WORK_ITEM_COLUMNS} FROM work_items \
             WHERE kind = $1 AND status = ANY($2) \
               AND sla_deadline IS NOT NULL AND sla_breached = FALSE \
               AND ($3 = FALSE OR sla_deadline < $4) \
             ORDER BY sla_deadline"
        );
        self.fetch_items(
            sqlx::query(&sql)
                .bind(Self::kind())
                .bind(Self::tracked_statuses())
                .bind(overdue)
                .bind(now),
        )
        .await
    }

    async fn find_sla_at_risk(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> PersistenceResult<Vec<WorkItem<S>>> {
        let sql = format!(
            "SELECT {WORK_ITEM_COLUMNS} FROM work_items \
             WHERE kind = $1 AND status = ANY($2) \
               AND sla_breached = FALSE AND sla_warned = FALSE \
               AND sla_deadline >= $3 AND sla_deadline <= $4 \
             ORDER BY sla_deadline"
        );
        self.fetch_items(
            sqlx::query(&sql)
                .bind(Self::kind())
                .bind(Self::tracked_statuses())
                .bind(now)
                .bind(now + window),
        )
        .await
    }

    async fn mark_sla_breached(
        &self,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> PersistenceResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        // Same predicate as the overdue query, evaluated against the row as it
        // is now: an item resubmitted since the scan keeps its fresh deadline
        self.flag(
            sqlx::query(
                r#"
                UPDATE work_items SET sla_breached = TRUE
                WHERE id = ANY($1) AND kind = $2 AND status = ANY($3)
                  AND sla_breached = FALSE
                  AND sla_deadline IS NOT NULL AND sla_deadline < $4
                RETURNING id
                "#,
            )
            .bind(ids)
            .bind(Self::kind())
            .bind(Self::tracked_statuses())
            .bind(now),
        )
        .await
    }

    async fn mark_sla_warned(
        &self,
        ids: &[Uuid],
        now: DateTime<Utc>,
        window: Duration,
    ) -> PersistenceResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.flag(
            sqlx::query(
                r#"
                UPDATE work_items SET sla_warned = TRUE
                WHERE id = ANY($1) AND kind = $2 AND status = ANY($3)
                  AND sla_breached = FALSE AND sla_warned = FALSE
                  AND sla_deadline >= $4 AND sla_deadline <= $5
                RETURNING id
                "#,
            )
            .bind(ids)
            .bind(Self::kind())
            .bind(Self::tracked_statuses())
            .bind(now)
            .bind(now + window),
        )
        .await
    }
}

async fn insert_history<S: WorkflowStatus>(
    conn: &mut PgConnection,
    item_id: Uuid,
    entry: &StatusHistoryEntry<S>,
) -> PersistenceResult<()> {
    sqlx::query(
        r#"
        INSERT INTO work_item_status_history
            (work_item_id, from_status, to_status, actor, reason, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(item_id)
    .bind(entry.from_status.map(|status| status.as_str()))
    .bind(entry.to_status.as_str())
    .bind(&entry.actor)
    .bind(&entry.reason)
    .bind(Json(&entry.metadata))
    .bind(entry.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

fn parse_status<S: WorkflowStatus>(field: &str, value: String) -> PersistenceResult<S> {
    value
        .parse::<S>()
        .map_err(|_| PersistenceError::InvalidStoredValue {
            field: field.to_string(),
            value,
        })
}

fn work_item_from_row<S: WorkflowStatus>(row: &PgRow) -> PersistenceResult<WorkItem<S>> {
    Ok(WorkItem {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        status: parse_status("status", row.try_get("status")?)?,
        sla_deadline: row.try_get("sla_deadline")?,
        sla_breached: row.try_get("sla_breached")?,
        sla_warned: row.try_get("sla_warned")?,
        status_history: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn history_from_row<S: WorkflowStatus>(row: &PgRow) -> PersistenceResult<StatusHistoryEntry<S>> {
    let from_status: Option<String> = row.try_get("from_status")?;
    let Json(metadata): Json<TransitionMetadata> = row.try_get("metadata")?;
    Ok(StatusHistoryEntry {
        from_status: from_status
            .map(|value| parse_status("from_status", value))
            .transpose()?,
        to_status: parse_status("to_status", row.try_get("to_status")?)?,
        actor: row.try_get("actor")?,
        reason: row.try_get("reason")?,
        metadata,
        created_at: row.try_get("created_at")?,
    })
}
