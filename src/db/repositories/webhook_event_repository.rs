use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// One row of the dedupe ledger.
#[derive(Debug, Clone)]
pub struct NewProcessedEvent<'a> {
    pub provider: &'a str,
    pub resource_kind: &'a str,
    pub resource_id: &'a str,
    pub state: &'a str,
    pub user_id: &'a Uuid,
    pub effect: &'a str,
}

#[derive(Debug, Clone)]
pub struct WebhookEventRepository {
    pool: PgPool,
}

impl WebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn try_record(&self, event: &NewProcessedEvent<'_>) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let inserted = self.try_record_with_executor(event, &mut tx).await?;
        tx.commit().await
            .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;
        Ok(inserted)
    }

    /// Returns `false` when the (provider, kind, resource, state) key was
    /// already recorded.
    pub async fn try_record_with_executor(
        &self,
        event: &NewProcessedEvent<'_>,
        executor: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<bool, AppError> {
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO processed_webhook_events
                (provider, resource_kind, resource_id, state, user_id, effect, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (provider, resource_kind, resource_id, state) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(event.provider)
        .bind(event.resource_kind)
        .bind(event.resource_id)
        .bind(event.state)
        .bind(event.user_id)
        .bind(event.effect)
        .fetch_optional(&mut **executor)
        .await
        .map_err(|e| AppError::Database(format!("Failed to record webhook event: {}", e)))?;

        Ok(inserted.is_some())
    }
}
