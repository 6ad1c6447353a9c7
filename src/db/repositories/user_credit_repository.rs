use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct UserCreditRepository {
    pool: PgPool,
}

impl UserCreditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_balance(&self, user_id: &Uuid) -> Result<i64, AppError> {
        let balance = sqlx::query_scalar::<_, i64>("SELECT balance FROM user_credits WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get user credit balance: {}", e)))?;

        Ok(balance.unwrap_or(0))
    }

    /// Atomically adds to the balance, creating the row on first grant.
    pub async fn increment_balance_with_executor(
        &self,
        user_id: &Uuid,
        amount: i64,
        executor: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<i64, AppError> {
        let balance = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO user_credits (user_id, balance, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET balance = user_credits.balance + EXCLUDED.balance, updated_at = NOW()
            RETURNING balance
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut **executor)
        .await
        .map_err(|e| map_increment_error(user_id, e))?;

        Ok(balance)
    }
}

/// A grant for a user with no profile row trips the `user_credits` foreign key.
fn map_increment_error(user_id: &Uuid, error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_foreign_key_violation() || db.code().as_deref() == Some("23503") {
            return AppError::NotFound(format!("No profile for user {}", user_id));
        }
    }
    AppError::Database(format!("Failed to increment user credit balance: {}", error))
}
