use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Role, UserProfile};

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    role: String,
    permissions: Vec<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            id: row.id.to_string(),
            role: row
                .role
                .parse::<Role>()
                .map_err(|_| AppError::Database(format!("Profile {} has unknown role '{}'", row.id, row.role)))?,
            permissions: row.permissions,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_profile(&self, user_id: &Uuid) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, role, permissions, updated_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to fetch profile: {}", e)))?;

        row.map(UserProfile::try_from).transpose()
    }

    /// Locks the profile row for the rest of the transaction.
    pub async fn get_profile_for_update_with_executor(
        &self,
        user_id: &Uuid,
        executor: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, role, permissions, updated_at
            FROM profiles
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut **executor)
        .await
        .map_err(|e| AppError::Database(format!("Failed to lock profile: {}", e)))?;

        row.map(UserProfile::try_from).transpose()
    }

    pub async fn update_role_with_executor(
        &self,
        user_id: &Uuid,
        role: Role,
        permissions: &[String],
        executor: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET role = $2, permissions = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .bind(permissions)
        .execute(&mut **executor)
        .await
        .map_err(|e| AppError::Database(format!("Failed to update profile role: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Profile {} not found", user_id)));
        }
        Ok(())
    }
}
