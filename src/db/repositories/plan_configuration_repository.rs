use sqlx::{FromRow, PgPool};

use crate::error::AppError;
use crate::models::{PlanConfiguration, Role};

#[derive(Debug, FromRow)]
struct PlanConfigurationRow {
    role: String,
    name: String,
    price: String,
    permissions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PlanConfigurationRepository {
    pool: PgPool,
}

impl PlanConfigurationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_role(&self, role: Role) -> Result<Option<PlanConfiguration>, AppError> {
        let row = sqlx::query_as::<_, PlanConfigurationRow>(
            r#"
            SELECT role, name, price, permissions
            FROM plan_configurations
            WHERE role = $1
            "#,
        )
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to fetch plan configuration: {}", e)))?;

        // Rows with a role this build does not know are treated as absent
        Ok(row.and_then(|row| {
            let role = row.role.parse::<Role>().ok()?;
            Some(PlanConfiguration {
                role,
                name: row.name,
                price: row.price,
                permissions: row.permissions,
            })
        }))
    }
}
