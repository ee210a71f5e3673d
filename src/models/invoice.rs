use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Unpaid,
    Partial,
    Paid,
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        Self::Unpaid
    }
}

impl InvoiceStatus {
    /// Settlement progress; higher means closer to paid.
    pub fn rank(&self) -> u8 {
        match self {
            InvoiceStatus::Unpaid => 0,
            InvoiceStatus::Partial => 1,
            InvoiceStatus::Paid => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Invoice {
    pub id: Uuid,
    pub room_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub month: i32,
    pub year: i32,
    pub room_cost: Decimal,
    pub electricity_cost: Decimal,
    pub water_cost: Decimal,
    pub total: Decimal,
    pub status: InvoiceStatus,
    pub last_reminder_email_at: Option<DateTime<Utc>>,
    pub last_reminder_sms_at: Option<DateTime<Utc>>,
    pub reminder_email_count: i32,
    pub reminder_sms_count: i32,
    pub last_reminder_email_message: Option<String>,
    pub last_reminder_sms_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invoice row eagerly joined with its room and (optional) tenant.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct InvoiceDetail {
    pub id: Uuid,
    pub room_id: Uuid,
    pub room_code: String,
    pub tenant_id: Option<Uuid>,
    pub tenant_name: Option<String>,
    #[serde(skip_serializing)]
    pub tenant_email: Option<String>,
    #[serde(skip_serializing)]
    pub tenant_phone: Option<String>,
    pub month: i32,
    pub year: i32,
    pub room_cost: Decimal,
    pub electricity_cost: Decimal,
    pub water_cost: Decimal,
    pub total: Decimal,
    pub status: InvoiceStatus,
    pub last_reminder_email_at: Option<DateTime<Utc>>,
    pub last_reminder_sms_at: Option<DateTime<Utc>>,
    pub reminder_email_count: i32,
    pub reminder_sms_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Base query for [`InvoiceDetail`]; callers append their own `WHERE`/`ORDER BY`.
pub const INVOICE_DETAIL_SELECT: &str = r#"
    SELECT
        i.id, i.room_id, r.code AS room_code,
        i.tenant_id, t.full_name AS tenant_name,
        t.email AS tenant_email, t.phone AS tenant_phone,
        i.month, i.year,
        i.room_cost, i.electricity_cost, i.water_cost, i.total, i.status,
        i.last_reminder_email_at, i.last_reminder_sms_at,
        i.reminder_email_count, i.reminder_sms_count,
        i.created_at
    FROM invoices i
    JOIN rooms r ON r.id = i.room_id
    LEFT JOIN tenants t ON t.id = i.tenant_id
"#;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInvoiceStatusRequest {
    pub status: InvoiceStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemindRequest {
    pub channel: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PeriodGenerationResult {
    pub month: u32,
    pub year: i32,
    pub created: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateInvoicesResponse {
    pub previous: PeriodGenerationResult,
    pub current: PeriodGenerationResult,
    pub total: u64,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct InvoicesQuery {
    pub status: Option<InvoiceStatus>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub room_id: Option<Uuid>,
}
