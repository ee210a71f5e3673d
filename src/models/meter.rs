use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MeterReading {
    pub id: Uuid,
    pub room_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub old_electric: i32,
    pub new_electric: i32,
    pub old_water: i32,
    pub new_water: i32,
    pub electricity_cost: Decimal,
    pub water_cost: Decimal,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitReadingRequest {
    pub room_id: Option<Uuid>,
    #[validate(range(min = 1, max = 12))]
    pub month: i32,
    #[validate(range(min = 2000, max = 2100))]
    pub year: i32,
    #[validate(range(min = 0))]
    pub old_electric: i32,
    #[validate(range(min = 0))]
    pub new_electric: i32,
    #[validate(range(min = 0))]
    pub old_water: i32,
    #[validate(range(min = 0))]
    pub new_water: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitReadingResponse {
    pub reading: MeterReading,
    pub invoice_id: Uuid,
    pub invoice_total: Decimal,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ReadingsQuery {
    pub room_id: Option<Uuid>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ServicePrice {
    pub id: Uuid,
    pub room_price: Option<Decimal>,
    pub electricity_price: Option<Decimal>,
    pub water_price: Option<Decimal>,
    pub effective_from: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ServicePriceRequest {
    pub room_price: Option<Decimal>,
    pub electricity_price: Option<Decimal>,
    pub water_price: Option<Decimal>,
    pub effective_from: NaiveDate,
}

impl ServicePriceRequest {
    pub fn check(&self) -> Result<(), String> {
        let prices = [
            ("room_price", self.room_price),
            ("electricity_price", self.electricity_price),
            ("water_price", self.water_price),
        ];
        for (field, price) in prices {
            if matches!(price, Some(p) if p.is_sign_negative()) {
                return Err(format!("{} must not be negative", field));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn reading(month: i32, old_electric: i32) -> SubmitReadingRequest {
        SubmitReadingRequest {
            room_id: Some(Uuid::new_v4()),
            month,
            year: 2024,
            old_electric,
            new_electric: 150,
            old_water: 80,
            new_water: 60,
        }
    }

    #[test]
    fn month_must_be_in_calendar_range() {
        assert!(reading(1, 100).validate().is_ok());
        assert!(reading(12, 100).validate().is_ok());
        assert!(reading(0, 100).validate().is_err());
        assert!(reading(13, 100).validate().is_err());
    }

    #[test]
    fn counters_must_not_be_negative() {
        assert!(reading(6, -1).validate().is_err());
    }

    #[test]
    fn negative_service_price_is_rejected() {
        let request = ServicePriceRequest {
            room_price: None,
            electricity_price: Some(dec!(-1)),
            water_price: Some(dec!(15000)),
            effective_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert!(request.check().is_err());
    }
}
