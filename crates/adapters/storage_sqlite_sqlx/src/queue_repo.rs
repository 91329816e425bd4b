//! `SQLite` implementation of [`QueueRepository`].
//!
//! One-time enrollments are guarded twice: the first row of an enrollment is
//! inserted only when the recipient holds no enrolled item of the automation,
//! and every row carries a `dedupe_key` covered by a partial unique index.
//!
//! Every row is also inserted only while its automation exists and accepts
//! enrollments, so a delete or pause that commits first wins.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteConnection, SqlitePool};

use mailflow_app::ports::{QueueFilter, QueueRepository};
use mailflow_domain::error::{ConflictError, MailflowError};
use mailflow_domain::id::{AutomationId, QueueItemId};
use mailflow_domain::queue::{EmailContent, INTERRUPTED, QueueItem, QueueStats, QueueStatus};
use mailflow_domain::time::Timestamp;

use crate::codec::{decode_json, decode_parsed, decode_timestamp, encode_timestamp};
use crate::error::{StorageError, is_unique_violation};

struct Wrapper(QueueItem);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<QueueItem> {
        value.map(|w| w.0)
    }

    fn all(values: Vec<Self>) -> Vec<QueueItem> {
        values.into_iter().map(|w| w.0).collect()
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let automation_id: String = row.try_get("automation_id")?;
        let variables: String = row.try_get("variables")?;
        let scheduled_for: String = row.try_get("scheduled_for")?;
        let status: String = row.try_get("status")?;
        let last_attempt: Option<String> = row.try_get("last_attempt")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Self(QueueItem {
            id: decode_parsed::<QueueItemId>(&id)?,
            automation_id: decode_parsed::<AutomationId>(&automation_id)?,
            step_order: row.try_get("step_order")?,
            recipient_email: row.try_get("recipient_email")?,
            recipient_name: row.try_get("recipient_name")?,
            content: EmailContent {
                subject: row.try_get("subject")?,
                body_text: row.try_get("body_text")?,
                body_html: row.try_get("body_html")?,
            },
            variables: decode_json(&variables)?,
            scheduled_for: decode_timestamp(&scheduled_for)?,
            status: decode_parsed::<QueueStatus>(&status)?,
            error: row.try_get("error")?,
            retry_count: row.try_get("retry_count")?,
            last_attempt: last_attempt.as_deref().map(decode_timestamp).transpose()?,
            created_at: decode_timestamp(&created_at)?,
        }))
    }
}

// ?17 guards the first row of a one-time enrollment
const INSERT: &str = r"
    INSERT INTO queue_items (
        id, automation_id, step_order, recipient_email, recipient_name,
        subject, body_text, body_html, variables, scheduled_for, status,
        error, retry_count, last_attempt, created_at, dedupe_key
    )
    SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16
    WHERE EXISTS (
        SELECT 1 FROM automations
        WHERE id = ?2 AND enabled = 1 AND status = 'active'
    )
    AND (?17 = 0 OR NOT EXISTS (
        SELECT 1 FROM queue_items
        WHERE automation_id = ?2 AND recipient_email = ?4
          AND status IN ('scheduled', 'processing', 'sent')
    ))
";

const SELECT_BY_ID: &str = "SELECT * FROM queue_items WHERE id = ?";

const SELECT_FILTERED: &str = r"
    SELECT * FROM queue_items
    WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR automation_id = ?2)
    ORDER BY scheduled_for DESC, step_order DESC
    LIMIT ?3
";

const CLAIM_DUE: &str = r"
    UPDATE queue_items SET status = 'processing', claimed_at = ?1
    WHERE status = 'scheduled' AND id IN (
        SELECT id FROM queue_items
        WHERE status = 'scheduled' AND scheduled_for <= ?1
        ORDER BY scheduled_for, step_order
        LIMIT ?2
    )
    RETURNING *
";

const UPDATE_IF: &str = r"
    UPDATE queue_items
    SET status = ?, scheduled_for = ?, error = ?, retry_count = ?, last_attempt = ?
    WHERE id = ? AND status = ?
";

// rows claimed before migrations added claimed_at count as stale
const FAIL_INTERRUPTED: &str = r"
    UPDATE queue_items
    SET status = 'failed', error = ?2, last_attempt = COALESCE(claimed_at, ?1)
    WHERE status = 'processing' AND (claimed_at IS NULL OR claimed_at <= ?1)
";

const COUNT_BY_STATUS: &str = "SELECT status, COUNT(*) FROM queue_items GROUP BY status";

const CANCEL_SCHEDULED: &str = r"
    UPDATE queue_items SET status = 'cancelled'
    WHERE automation_id = ? AND status = 'scheduled'
";

/// Cancel every scheduled item of an automation on `conn`.
///
/// Used inside the automation repository's transactions.
pub(crate) async fn cancel_scheduled(
    conn: &mut SqliteConnection,
    automation_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(CANCEL_SCHEDULED)
        .bind(automation_id)
        .execute(conn)
        .await?;
    if result.rows_affected() > 0 {
        tracing::info!(
            automation_id,
            cancelled = result.rows_affected(),
            "cancelled scheduled items"
        );
    }
    Ok(result.rows_affected())
}

fn dedupe_key(item: &QueueItem) -> String {
    format!(
        "{}:{}:{}",
        item.automation_id, item.recipient_email, item.step_order
    )
}

/// `SQLite`-backed queue repository.
#[derive(Clone)]
pub struct SqliteQueueRepository {
    pool: SqlitePool,
}

impl SqliteQueueRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the rows of one enrollment, returning `false` when deduplicated
    /// or when the automation no longer accepts enrollments.
    async fn insert_all(
        conn: &mut SqliteConnection,
        items: &[QueueItem],
        one_time: bool,
    ) -> Result<bool, StorageError> {
        for (index, item) in items.iter().enumerate() {
            let variables = serde_json::to_string(&item.variables)?;
            let result = sqlx::query(INSERT)
                .bind(item.id.to_string())
                .bind(item.automation_id.to_string())
                .bind(item.step_order)
                .bind(&item.recipient_email)
                .bind(&item.recipient_name)
                .bind(&item.content.subject)
                .bind(&item.content.body_text)
                .bind(&item.content.body_html)
                .bind(&variables)
                .bind(encode_timestamp(item.scheduled_for))
                .bind(item.status.as_str())
                .bind(&item.error)
                .bind(item.retry_count)
                .bind(item.last_attempt.map(encode_timestamp))
                .bind(encode_timestamp(item.created_at))
                .bind(one_time.then(|| dedupe_key(item)))
                .bind(one_time && index == 0)
                .execute(&mut *conn)
                .await?;
            if result.rows_affected() == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl QueueRepository for SqliteQueueRepository {
    async fn enqueue(
        &self,
        items: Vec<QueueItem>,
        one_time: bool,
    ) -> Result<Vec<QueueItem>, MailflowError> {
        if items.is_empty() {
            return Ok(items);
        }
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        match Self::insert_all(&mut tx, &items, one_time).await {
            Ok(true) => {
                tx.commit().await.map_err(StorageError::from)?;
                Ok(items)
            }
            Ok(false) => {
                tx.rollback().await.map_err(StorageError::from)?;
                Ok(Vec::new())
            }
            Err(StorageError::Database(err)) if one_time && is_unique_violation(&err) => {
                tracing::debug!(
                    recipient = %items[0].recipient_email,
                    "concurrent one-time enrollment lost the race"
                );
                tx.rollback().await.map_err(StorageError::from)?;
                Ok(Vec::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_by_id(&self, id: QueueItemId) -> Result<Option<QueueItem>, MailflowError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn list(&self, filter: QueueFilter) -> Result<Vec<QueueItem>, MailflowError> {
        // LIMIT -1 means no limit in SQLite
        let limit = filter
            .limit
            .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_FILTERED)
            .bind(filter.status.map(QueueStatus::as_str))
            .bind(filter.automation_id.map(|id| id.to_string()))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::all(rows))
    }

    async fn claim_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<QueueItem>, MailflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(CLAIM_DUE)
            .bind(encode_timestamp(now))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        // RETURNING yields rows in no particular order
        let mut items = Wrapper::all(rows);
        items.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then(a.step_order.cmp(&b.step_order))
        });
        Ok(items)
    }

    async fn update_if(
        &self,
        item: &QueueItem,
        expected: QueueStatus,
    ) -> Result<bool, MailflowError> {
        let result = sqlx::query(UPDATE_IF)
            .bind(item.status.as_str())
            .bind(encode_timestamp(item.scheduled_for))
            .bind(&item.error)
            .bind(item.retry_count)
            .bind(item.last_attempt.map(encode_timestamp))
            .bind(item.id.to_string())
            .bind(expected.as_str())
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(done.rows_affected() == 1),
            // a retried item collides with a newer one-time enrollment
            Err(err) if is_unique_violation(&err) => Err(ConflictError::AlreadyEnrolled {
                automation_id: item.automation_id.to_string(),
                email: item.recipient_email.clone(),
            }
            .into()),
            Err(err) => Err(StorageError::from(err).into()),
        }
    }

    async fn fail_interrupted(&self, claimed_before: Timestamp) -> Result<u64, MailflowError> {
        let result = sqlx::query(FAIL_INTERRUPTED)
            .bind(encode_timestamp(claimed_before))
            .bind(INTERRUPTED)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<QueueStats, MailflowError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(COUNT_BY_STATUS)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            let status = decode_parsed::<QueueStatus>(&status).map_err(StorageError::from)?;
            stats.add(status, count.unsigned_abs());
        }
        Ok(stats)
    }
}
