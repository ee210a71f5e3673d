use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{SystemLog, SystemLogsQuery};
use crate::utils::page_window;

const MAX_DETAIL_LEN: usize = 1000;

fn clip(detail: &str) -> &str {
    match detail.char_indices().nth(MAX_DETAIL_LEN) {
        Some((idx, _)) => &detail[..idx],
        None => detail,
    }
}

pub struct LogService;

impl LogService {
    pub async fn record(
        pool: &PgPool,
        actor_id: Option<Uuid>,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        detail: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO system_logs (actor_id, action, entity_type, entity_id, detail)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(actor_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(detail.map(clip))
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Newest entries first, with the actor's name joined in.
    pub async fn list(pool: &PgPool, query: &SystemLogsQuery) -> AppResult<Vec<SystemLog>> {
        let (limit, offset) = page_window(query.page, query.limit, 100, 500);

        let logs = sqlx::query_as::<_, SystemLog>(
            r#"
            SELECT
                l.id, l.actor_id,
                COALESCE(u.full_name, u.username) AS actor_name,
                l.action, l.entity_type, l.entity_id, l.detail, l.created_at
            FROM system_logs l
            LEFT JOIN users u ON u.id = l.actor_id
            WHERE ($1::text IS NULL OR l.entity_type = $1)
            ORDER BY l.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&query.entity_type)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_details_are_clipped_to_column_width() {
        let long = "x".repeat(MAX_DETAIL_LEN + 50);
        assert_eq!(clip(&long).len(), MAX_DETAIL_LEN);
        assert_eq!(clip("Request to /api/v1/payments (201)"), "Request to /api/v1/payments (201)");
    }

    #[test]
    fn clipping_respects_char_boundaries() {
        let text = "é".repeat(MAX_DETAIL_LEN + 1);
        assert_eq!(clip(&text).chars().count(), MAX_DETAIL_LEN);
    }
}
