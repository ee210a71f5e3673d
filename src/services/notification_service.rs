use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Notification;

/// An unpaid invoice whose tenant has a login account.
#[derive(Debug, Clone, FromRow)]
pub struct DueInvoice {
    pub user_id: Uuid,
    pub room_code: String,
    pub month: i32,
    pub year: i32,
}

pub fn payment_due_message(invoice: &DueInvoice, today: NaiveDate) -> String {
    format!(
        "Payment reminder: invoice {}/{} for room {} ({})",
        invoice.month, invoice.year, invoice.room_code, today
    )
}

pub struct NotificationService;

impl NotificationService {
    /// Stores `message` for one user, or for every user when `user_id` is `None`.
    /// Returns the created notifications.
    pub async fn create(
        pool: &PgPool,
        message: &str,
        user_id: Option<Uuid>,
    ) -> AppResult<Vec<Notification>> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation("message is required".to_string()));
        }

        let created = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, message)
            SELECT id, $1 FROM users
            WHERE $2::uuid IS NULL OR id = $2
            RETURNING *
            "#,
        )
        .bind(message)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        if user_id.is_some() && created.is_empty() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        tracing::debug!(recipients = created.len(), "Notifications created");
        Ok(created)
    }

    /// Drops a payment reminder into the inbox of every tenant with an UNPAID invoice.
    pub async fn remind_payment_due(pool: &PgPool, today: NaiveDate) -> AppResult<usize> {
        let due = sqlx::query_as::<_, DueInvoice>(
            r#"
            SELECT t.user_id, r.code AS room_code, i.month, i.year
            FROM invoices i
            JOIN rooms r ON r.id = i.room_id
            JOIN tenants t ON t.id = i.tenant_id
            WHERE i.status = 'unpaid' AND t.user_id IS NOT NULL
            ORDER BY i.year, i.month
            "#,
        )
        .fetch_all(pool)
        .await?;

        let mut tx = pool.begin().await?;
        for invoice in &due {
            sqlx::query("INSERT INTO notifications (user_id, message) VALUES ($1, $2)")
                .bind(invoice.user_id)
                .bind(payment_due_message(invoice, today))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(due.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_message_names_period_room_and_date() {
        let invoice = DueInvoice {
            user_id: Uuid::new_v4(),
            room_code: "C303".to_string(),
            month: 5,
            year: 2024,
        };
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

        assert_eq!(
            payment_due_message(&invoice, today),
            "Payment reminder: invoice 5/2024 for room C303 (2024-06-03)"
        );
    }
}
