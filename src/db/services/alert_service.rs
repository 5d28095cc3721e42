use sqlx::{PgPool, Result};
use uuid::Uuid;

use crate::db::models::AlertIntegration;

/// Alert integrations the user has verified. Unverified ones never receive messages.
pub async fn get_verified_integrations_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<AlertIntegration>> {
    sqlx::query_as::<_, AlertIntegration>(
        r#"
        SELECT id, user_id, alert_type, target, is_verified, created_at
        FROM alert_integrations
        WHERE user_id = $1 AND is_verified = TRUE
        ORDER BY created_at
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
