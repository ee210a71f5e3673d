use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::InvoiceStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    EWallet,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        Self::Cash
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
    pub method: PaymentMethod,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub invoice_id: Option<Uuid>,
    pub amount: Decimal,
    #[serde(default)]
    pub method: PaymentMethod,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub payment: Payment,
    pub invoice_status: InvoiceStatus,
    pub total_paid: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_defaults_to_cash_when_omitted() {
        let request: CreatePaymentRequest = serde_json::from_str(
            r#"{"invoice_id": "6f1c8f0e-4b7a-4a53-9a51-2f5d3c1b9e10", "amount": "500000"}"#,
        )
        .unwrap();
        assert_eq!(request.method, PaymentMethod::Cash);
    }

    #[test]
    fn method_accepts_wire_names() {
        let method: PaymentMethod = serde_json::from_str("\"BANK_TRANSFER\"").unwrap();
        assert_eq!(method, PaymentMethod::BankTransfer);
    }
}
