use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{InvoiceDetail, InvoiceStatus, INVOICE_DETAIL_SELECT};
use crate::services::{MailDelivery, MailService, SmsDelivery, SmsService};
use crate::utils::validators::non_empty;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
}

impl Channel {
    pub fn parse(channel: &str) -> Option<Self> {
        match channel.trim().to_ascii_lowercase().as_str() {
            "email" => Some(Channel::Email),
            "sms" => Some(Channel::Sms),
            _ => None,
        }
    }
}

/// Why a reminder was not sent. Everything except `Storage` is a client-facing rejection.
#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Invalid channel. Choose email or sms.")]
    InvalidChannel,

    #[error("Invoice not found.")]
    InvoiceNotFound,

    #[error("Invoice has no tenant attached.")]
    NoTenant,

    #[error("Invoice is already paid; no reminder needed.")]
    AlreadyPaid,

    #[error("Tenant has no email address.")]
    MissingEmail,

    #[error("Tenant has no phone number.")]
    MissingPhone,

    #[error("Sending failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

impl IntoResponse for ReminderError {
    fn into_response(self) -> Response {
        match self {
            ReminderError::Storage(e) => AppError::Database(e).into_response(),
            rejection => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": rejection.to_string() })),
            )
                .into_response(),
        }
    }
}

/// Validates a reminder request against the invoice; returns the channel and contact to use.
///
/// Checks run in a fixed order and the first failure wins.
pub fn check_preconditions(
    channel: &str,
    invoice: Option<&InvoiceDetail>,
) -> Result<(Channel, String), ReminderError> {
    let channel = Channel::parse(channel).ok_or(ReminderError::InvalidChannel)?;
    let invoice = invoice.ok_or(ReminderError::InvoiceNotFound)?;

    if invoice.tenant_id.is_none() {
        return Err(ReminderError::NoTenant);
    }
    if invoice.status == InvoiceStatus::Paid {
        return Err(ReminderError::AlreadyPaid);
    }

    let contact = match channel {
        Channel::Email => {
            non_empty(invoice.tenant_email.as_deref()).ok_or(ReminderError::MissingEmail)?
        }
        Channel::Sms => {
            non_empty(invoice.tenant_phone.as_deref()).ok_or(ReminderError::MissingPhone)?
        }
    };

    Ok((channel, contact.to_string()))
}

/// Whole-unit amount with thousands separators, e.g. `1,500,000 VND`.
pub fn format_money(amount: Decimal) -> String {
    let whole = amount
        .round_dp_with_strategy(0, RoundingStrategy::ToZero)
        .to_i128()
        .unwrap_or(0);
    let digits = whole.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if whole < 0 { "-" } else { "" };
    format!("{}{} VND", sign, grouped)
}

pub fn email_subject(invoice: &InvoiceDetail) -> String {
    format!(
        "Reminder — invoice for room {}, period {}/{}",
        invoice.room_code, invoice.month, invoice.year
    )
}

pub fn render_email_body(invoice: &InvoiceDetail) -> String {
    let name = invoice.tenant_name.as_deref().unwrap_or("Tenant");
    format!(
        "Dear {},\n\n\
         This is a reminder about your outstanding rent invoice:\n\
         - Room: {}\n\
         - Period: {}/{}\n\
         - Total: {}\n\n\
         Please arrange payment at your earliest convenience.\n\
         Kind regards.",
        name,
        invoice.room_code,
        invoice.month,
        invoice.year,
        format_money(invoice.total)
    )
}

pub fn render_sms_text(invoice: &InvoiceDetail) -> String {
    let name = invoice.tenant_name.as_deref().unwrap_or("Tenant");
    format!(
        "{}: reminder for room {}, period {}/{}, total {}. Please pay.",
        name,
        invoice.room_code,
        invoice.month,
        invoice.year,
        format_money(invoice.total)
    )
}

#[derive(Debug)]
pub struct ReminderReceipt {
    pub channel: Channel,
    pub recipient: String,
    pub message: String,
    /// False when the transport is not configured and the send was skipped.
    pub delivered: bool,
}

pub struct ReminderService<'a> {
    pool: &'a PgPool,
    mail: &'a MailService,
    sms: &'a SmsService,
}

impl<'a> ReminderService<'a> {
    pub fn new(pool: &'a PgPool, mail: &'a MailService, sms: &'a SmsService) -> Self {
        Self { pool, mail, sms }
    }

    pub async fn send_reminder(
        &self,
        invoice_id: Uuid,
        channel: &str,
    ) -> Result<ReminderReceipt, ReminderError> {
        // Channel is checked before touching the store
        Channel::parse(channel).ok_or(ReminderError::InvalidChannel)?;

        let invoice =
            sqlx::query_as::<_, InvoiceDetail>(&format!("{} WHERE i.id = $1", INVOICE_DETAIL_SELECT))
        .bind(invoice_id)
        .fetch_optional(self.pool)
        .await?;

        let (channel, recipient) = check_preconditions(channel, invoice.as_ref())?;
        let Some(invoice) = invoice else {
            return Err(ReminderError::InvoiceNotFound);
        };

        tracing::info!(
            invoice_id = %invoice.id,
            to = %recipient,
            room = %invoice.room_code,
            period = %format!("{}/{}", invoice.month, invoice.year),
            ?channel,
            "Sending reminder"
        );

        let (message, delivered) = match channel {
            Channel::Email => {
                let body = render_email_body(&invoice);
                let outcome = self
                    .mail
                    .send(&recipient, &email_subject(&invoice), &body)
                    .await
                    .map_err(transport_error)?;
                (body, outcome == MailDelivery::Sent)
            }
            Channel::Sms => {
                let text = render_sms_text(&invoice);
                let outcome = self
                    .sms
                    .send(&recipient, &text)
                    .await
                    .map_err(transport_error)?;
                (text, outcome == SmsDelivery::Sent)
            }
        };

        let query = match channel {
            Channel::Email => {
                r#"
                UPDATE invoices
                SET last_reminder_email_at = NOW(),
                    reminder_email_count = reminder_email_count + 1,
                    last_reminder_email_message = $2
                WHERE id = $1
                "#
            }
            Channel::Sms => {
                r#"
                UPDATE invoices
                SET last_reminder_sms_at = NOW(),
                    reminder_sms_count = reminder_sms_count + 1,
                    last_reminder_sms_message = $2
                WHERE id = $1
                "#
            }
        };

        sqlx::query(query)
            .bind(invoice.id)
            .bind(&message)
            .execute(self.pool)
            .await?;

        Ok(ReminderReceipt {
            channel,
            recipient,
            message,
            delivered,
        })
    }
}

fn transport_error(error: AppError) -> ReminderError {
    let text = match error {
        AppError::Mail(msg) | AppError::Sms(msg) => msg,
        other => other.to_string(),
    };
    tracing::warn!("Reminder transport failed: {}", text);
    ReminderError::Transport(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn invoice() -> InvoiceDetail {
        InvoiceDetail {
            id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            room_code: "A101".to_string(),
            tenant_id: Some(Uuid::new_v4()),
            tenant_name: Some("Tran Thi B".to_string()),
            tenant_email: Some("b@example.com".to_string()),
            tenant_phone: Some("0901234567".to_string()),
            month: 6,
            year: 2024,
            room_cost: dec!(1500000),
            electricity_cost: dec!(0),
            water_cost: dec!(0),
            total: dec!(1500000),
            status: InvoiceStatus::Unpaid,
            last_reminder_email_at: None,
            last_reminder_sms_at: None,
            reminder_email_count: 0,
            reminder_sms_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn channel_is_case_insensitive() {
        assert_eq!(Channel::parse("EMAIL"), Some(Channel::Email));
        assert_eq!(Channel::parse("Sms"), Some(Channel::Sms));
        assert_eq!(Channel::parse("push"), None);
    }

    #[test]
    fn invalid_channel_wins_over_missing_invoice() {
        assert!(matches!(
            check_preconditions("fax", None),
            Err(ReminderError::InvalidChannel)
        ));
        assert!(matches!(
            check_preconditions("email", None),
            Err(ReminderError::InvoiceNotFound)
        ));
    }

    #[test]
    fn rejections_follow_priority_order() {
        // No tenant outranks paid and missing contact
        let mut inv = invoice();
        inv.tenant_id = None;
        inv.status = InvoiceStatus::Paid;
        inv.tenant_email = None;
        assert!(matches!(
            check_preconditions("email", Some(&inv)),
            Err(ReminderError::NoTenant)
        ));

        // Paid outranks missing contact
        let mut inv = invoice();
        inv.status = InvoiceStatus::Paid;
        inv.tenant_phone = None;
        assert!(matches!(
            check_preconditions("sms", Some(&inv)),
            Err(ReminderError::AlreadyPaid)
        ));

        let mut inv = invoice();
        inv.tenant_email = Some("   ".to_string());
        assert!(matches!(
            check_preconditions("email", Some(&inv)),
            Err(ReminderError::MissingEmail)
        ));

        let mut inv = invoice();
        inv.tenant_phone = None;
        assert!(matches!(
            check_preconditions("sms", Some(&inv)),
            Err(ReminderError::MissingPhone)
        ));
    }

    #[test]
    fn partial_invoice_can_be_reminded() {
        let mut inv = invoice();
        inv.status = InvoiceStatus::Partial;
        let (channel, contact) = check_preconditions("sms", Some(&inv)).unwrap();
        assert_eq!(channel, Channel::Sms);
        assert_eq!(contact, "0901234567");
    }

    #[test]
    fn money_is_grouped_by_thousands() {
        assert_eq!(format_money(dec!(1500000)), "1,500,000 VND");
        assert_eq!(format_money(dec!(999)), "999 VND");
        assert_eq!(format_money(dec!(1000)), "1,000 VND");
        assert_eq!(format_money(dec!(1234567.89)), "1,234,567 VND");
        assert_eq!(format_money(Decimal::ZERO), "0 VND");
        assert_eq!(format_money(dec!(-25000)), "-25,000 VND");
    }

    #[test]
    fn messages_carry_invoice_details() {
        let inv = invoice();

        assert_eq!(email_subject(&inv), "Reminder — invoice for room A101, period 6/2024");

        let body = render_email_body(&inv);
        assert!(body.contains("Tran Thi B"));
        assert!(body.contains("A101"));
        assert!(body.contains("6/2024"));
        assert!(body.contains("1,500,000 VND"));

        let sms = render_sms_text(&inv);
        assert!(sms.contains("A101"));
        assert!(sms.contains("6/2024"));
        assert!(sms.contains("1,500,000 VND"));
    }

    #[test]
    fn rejections_render_as_bad_request() {
        let response = ReminderError::AlreadyPaid.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ReminderError::Transport("smtp down".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    async fn seeded_invoice(pool: &PgPool) -> Uuid {
        let (room_id,): (Uuid,) =
            sqlx::query_as("INSERT INTO rooms (code, status) VALUES ('A101', 'occupied') RETURNING id")
                .fetch_one(pool)
                .await
                .unwrap();
        let (tenant_id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO tenants (full_name, phone) VALUES ('Tran Thi B', '0901234567') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        let (invoice_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO invoices (room_id, tenant_id, month, year, room_cost, total)
            VALUES ($1, $2, 6, 2024, 1500000, 1500000)
            RETURNING id
            "#,
        )
        .bind(room_id)
        .bind(tenant_id)
        .fetch_one(pool)
        .await
        .unwrap();
        invoice_id
    }

    async fn sms_bookkeeping(pool: &PgPool, invoice_id: Uuid) -> (i32, Option<String>) {
        sqlx::query_as(
            "SELECT reminder_sms_count, last_reminder_sms_message FROM invoices WHERE id = $1",
        )
        .bind(invoice_id)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn failed_sms_leaves_reminder_bookkeeping_untouched(pool: PgPool) {
        let invoice_id = seeded_invoice(&pool).await;

        let mut config = crate::config::Config::for_tests();
        config.sms_enabled = true;
        config.sms_api_url = Some("http://127.0.0.1:1/send".to_string());
        config.reminder_timeout_secs = 2;
        let sms = SmsService::new(config.clone()).unwrap();
        let mail = MailService::new(&config).unwrap();

        let err = ReminderService::new(&pool, &mail, &sms)
            .send_reminder(invoice_id, "sms")
            .await
            .unwrap_err();
        assert!(matches!(err, ReminderError::Transport(_)));

        assert_eq!(sms_bookkeeping(&pool, invoice_id).await, (0, None));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn skipped_sms_still_records_the_reminder(pool: PgPool) {
        let invoice_id = seeded_invoice(&pool).await;

        let config = crate::config::Config::for_tests();
        let sms = SmsService::new(config.clone()).unwrap();
        let mail = MailService::new(&config).unwrap();

        let receipt = ReminderService::new(&pool, &mail, &sms)
            .send_reminder(invoice_id, "SMS")
            .await
            .unwrap();
        assert!(!receipt.delivered);
        assert_eq!(receipt.recipient, "0901234567");

        let (count, message) = sms_bookkeeping(&pool, invoice_id).await;
        assert_eq!(count, 1);
        assert_eq!(message.as_deref(), Some(receipt.message.as_str()));
    }
}
