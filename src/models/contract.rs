use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "contract_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Active,
    Ended,
}

impl Default for ContractStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Contract {
    pub id: Uuid,
    pub room_id: Uuid,
    pub tenant_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ContractStatus,
    pub deposit: Option<Decimal>,
    pub rent: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Contract joined with its room code and tenant name.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ContractDetail {
    pub id: Uuid,
    pub room_id: Uuid,
    pub room_code: String,
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ContractStatus,
    pub deposit: Option<Decimal>,
    pub rent: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateContractRequest {
    pub room_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub deposit: Option<Decimal>,
    pub rent: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtendContractRequest {
    pub end_date: Option<NaiveDate>,
}
