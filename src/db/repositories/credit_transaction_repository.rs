use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::CreditTransactionType;

/// Append-only audit log of balance changes.
#[derive(Debug, Clone)]
pub struct CreditTransactionRepository {
    pool: PgPool,
}

impl CreditTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_transaction(
        &self,
        user_id: &Uuid,
        transaction_type: CreditTransactionType,
        amount: i64,
        description: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        self.create_transaction_with_executor(user_id, transaction_type, amount, description, &mut tx)
            .await?;
        tx.commit().await
            .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;
        Ok(())
    }

    pub async fn create_transaction_with_executor(
        &self,
        user_id: &Uuid,
        transaction_type: CreditTransactionType,
        amount: i64,
        description: &str,
        executor: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO credit_transactions (user_id, type, amount, description, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(user_id)
        .bind(transaction_type.as_str())
        .bind(amount)
        .bind(description)
        .execute(&mut **executor)
        .await
        .map_err(|e| AppError::Database(format!("Failed to record credit transaction: {}", e)))?;

        Ok(())
    }
}
