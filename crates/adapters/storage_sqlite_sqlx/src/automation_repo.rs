//! `SQLite` implementation of [`AutomationRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use mailflow_app::ports::AutomationRepository;
use mailflow_domain::automation::{Automation, AutomationContent, AutomationStatus, Trigger};
use mailflow_domain::error::{MailflowError, NotFoundError};
use mailflow_domain::id::AutomationId;

use crate::codec::{decode_json, decode_parsed, decode_timestamp, encode_timestamp};
use crate::error::StorageError;
use crate::queue_repo::cancel_scheduled;

struct Wrapper(Automation);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Automation> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let trigger: String = row.try_get("trigger")?;
        let status: String = row.try_get("status")?;
        let content: String = row.try_get("content")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Self(Automation {
            id: decode_parsed::<AutomationId>(&id)?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            trigger: decode_parsed::<Trigger>(&trigger)?,
            status: decode_parsed::<AutomationStatus>(&status)?,
            enabled: row.try_get("enabled")?,
            is_system: row.try_get("is_system")?,
            one_time_per_recipient: row.try_get("one_time_per_recipient")?,
            content: decode_json::<AutomationContent>(&content)?,
            created_at: decode_timestamp(&created_at)?,
            updated_at: decode_timestamp(&updated_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO automations (
        id, name, description, trigger, status, enabled, is_system,
        one_time_per_recipient, content, created_at, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

const UPDATE: &str = r"
    UPDATE automations SET
        name = ?, description = ?, trigger = ?, status = ?, enabled = ?, is_system = ?,
        one_time_per_recipient = ?, content = ?, created_at = ?, updated_at = ?
    WHERE id = ?
";

const SELECT_BY_ID: &str = "SELECT * FROM automations WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM automations ORDER BY created_at, name";
const SELECT_ACCEPTING: &str = r"
    SELECT * FROM automations
    WHERE trigger = ? AND enabled = 1 AND status = 'active'
    ORDER BY created_at
";
const DELETE: &str = "DELETE FROM automations WHERE id = ?";

/// `SQLite`-backed automation repository.
#[derive(Clone)]
pub struct SqliteAutomationRepository {
    pool: SqlitePool,
}

impl SqliteAutomationRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AutomationRepository for SqliteAutomationRepository {
    async fn create(&self, automation: Automation) -> Result<Automation, MailflowError> {
        let content = serde_json::to_string(&automation.content).map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(automation.id.to_string())
            .bind(&automation.name)
            .bind(&automation.description)
            .bind(automation.trigger.as_str())
            .bind(automation.status.as_str())
            .bind(automation.enabled)
            .bind(automation.is_system)
            .bind(automation.one_time_per_recipient)
            .bind(&content)
            .bind(encode_timestamp(automation.created_at))
            .bind(encode_timestamp(automation.updated_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(automation)
    }

    async fn get_by_id(&self, id: AutomationId) -> Result<Option<Automation>, MailflowError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn get_all(&self) -> Result<Vec<Automation>, MailflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn get_accepting(&self, trigger: Trigger) -> Result<Vec<Automation>, MailflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ACCEPTING)
            .bind(trigger.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(
        &self,
        automation: Automation,
        cancel: bool,
    ) -> Result<u64, MailflowError> {
        let id = automation.id.to_string();
        let content = serde_json::to_string(&automation.content).map_err(StorageError::from)?;
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let result = sqlx::query(UPDATE)
            .bind(&automation.name)
            .bind(&automation.description)
            .bind(automation.trigger.as_str())
            .bind(automation.status.as_str())
            .bind(automation.enabled)
            .bind(automation.is_system)
            .bind(automation.one_time_per_recipient)
            .bind(&content)
            .bind(encode_timestamp(automation.created_at))
            .bind(encode_timestamp(automation.updated_at))
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "Automation",
                id,
            }
            .into());
        }

        let cancelled = if cancel {
            cancel_scheduled(&mut tx, &id)
                .await
                .map_err(StorageError::from)?
        } else {
            0
        };
        tx.commit().await.map_err(StorageError::from)?;
        Ok(cancelled)
    }

    async fn delete(&self, id: AutomationId) -> Result<u64, MailflowError> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        sqlx::query(DELETE)
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        let cancelled = cancel_scheduled(&mut tx, &id)
            .await
            .map_err(StorageError::from)?;
        tx.commit().await.map_err(StorageError::from)?;
        Ok(cancelled)
    }
}
