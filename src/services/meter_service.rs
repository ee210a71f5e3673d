use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{Invoice, MeterReading, Room, ServicePrice, SubmitReadingRequest};
use crate::services::BillingService;
use crate::utils::Period;

/// Unit prices for metered utilities in one billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtilityRates {
    pub electricity: Decimal,
    pub water: Decimal,
}

impl UtilityRates {
    pub fn from_price(price: Option<&ServicePrice>) -> Self {
        Self {
            electricity: price
                .and_then(|p| p.electricity_price)
                .unwrap_or(Decimal::ZERO),
            water: price.and_then(|p| p.water_price).unwrap_or(Decimal::ZERO),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingCosts {
    pub electric_usage: i64,
    pub water_usage: i64,
    pub electricity_cost: Decimal,
    pub water_cost: Decimal,
    pub total_cost: Decimal,
}

/// Consumption between two counter values; a lower new value counts as zero.
pub fn usage(old: i32, new: i32) -> i64 {
    (i64::from(new) - i64::from(old)).max(0)
}

pub fn compute_costs(request: &SubmitReadingRequest, rates: UtilityRates) -> ReadingCosts {
    let electric_usage = usage(request.old_electric, request.new_electric);
    let water_usage = usage(request.old_water, request.new_water);

    let electricity_cost = rates.electricity * Decimal::from(electric_usage);
    let water_cost = rates.water * Decimal::from(water_usage);

    ReadingCosts {
        electric_usage,
        water_usage,
        electricity_cost,
        water_cost,
        total_cost: electricity_cost + water_cost,
    }
}

pub struct MeterService;

impl MeterService {
    /// Latest price row effective on or before the first day of the period.
    pub async fn applicable_price(
        conn: &mut PgConnection,
        period: Period,
    ) -> AppResult<Option<ServicePrice>> {
        let price = sqlx::query_as::<_, ServicePrice>(
            r#"
            SELECT * FROM service_prices
            WHERE effective_from <= $1
            ORDER BY effective_from DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(period.first_day())
        .fetch_optional(conn)
        .await?;

        Ok(price)
    }

    /// Stores a reading with its computed costs and upserts the room's invoice for the period.
    pub async fn record_reading(
        pool: &PgPool,
        request: &SubmitReadingRequest,
    ) -> AppResult<(MeterReading, Invoice)> {
        request.validate()?;

        let room_id = request
            .room_id
            .ok_or_else(|| AppError::BadRequest("room_id is required".to_string()))?;
        let period = Period::new(request.year, request.month)?;

        let mut tx = pool.begin().await?;

        let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::BadRequest("Room not found".to_string()))?;

        let price = Self::applicable_price(&mut tx, period).await?;
        let costs = compute_costs(request, UtilityRates::from_price(price.as_ref()));

        let reading = sqlx::query_as::<_, MeterReading>(
            r#"
            INSERT INTO meter_readings
                (room_id, month, year, old_electric, new_electric, old_water, new_water,
                 electricity_cost, water_cost, total_cost)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(room.id)
        .bind(request.month)
        .bind(request.year)
        .bind(request.old_electric)
        .bind(request.new_electric)
        .bind(request.old_water)
        .bind(request.new_water)
        .bind(costs.electricity_cost)
        .bind(costs.water_cost)
        .bind(costs.total_cost)
        .fetch_one(&mut *tx)
        .await?;

        let invoice = BillingService::upsert_from_reading(&mut tx, &room, &reading).await?;

        tx.commit().await?;

        tracing::info!(
            room = %room.code,
            period = %period,
            electric_usage = costs.electric_usage,
            water_usage = costs.water_usage,
            total = %invoice.total,
            "Meter reading recorded"
        );

        Ok((reading, invoice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn request(old_e: i32, new_e: i32, old_w: i32, new_w: i32) -> SubmitReadingRequest {
        SubmitReadingRequest {
            room_id: Some(Uuid::new_v4()),
            month: 6,
            year: 2024,
            old_electric: old_e,
            new_electric: new_e,
            old_water: old_w,
            new_water: new_w,
        }
    }

    fn rates(electricity: Decimal, water: Decimal) -> UtilityRates {
        UtilityRates { electricity, water }
    }

    #[test]
    fn usage_is_never_negative() {
        assert_eq!(usage(100, 150), 50);
        assert_eq!(usage(80, 60), 0);
        assert_eq!(usage(0, 0), 0);
        assert_eq!(usage(i32::MAX, 0), 0);
    }

    #[test]
    fn electricity_cost_example() {
        let costs = compute_costs(&request(100, 150, 80, 60), rates(dec!(3000), dec!(15000)));

        assert_eq!(costs.electric_usage, 50);
        assert_eq!(costs.electricity_cost, dec!(150000));
        assert_eq!(costs.water_usage, 0);
        assert_eq!(costs.water_cost, Decimal::ZERO);
        assert_eq!(costs.total_cost, dec!(150000));
    }

    #[test]
    fn total_is_sum_of_utilities() {
        let costs = compute_costs(&request(10, 30, 5, 9), rates(dec!(3500), dec!(12000)));

        assert_eq!(costs.electricity_cost, dec!(70000));
        assert_eq!(costs.water_cost, dec!(48000));
        assert_eq!(costs.total_cost, dec!(118000));
    }

    #[test]
    fn missing_price_row_bills_utilities_at_zero() {
        let rates = UtilityRates::from_price(None);
        let costs = compute_costs(&request(0, 500, 0, 40), rates);

        assert_eq!(costs.electric_usage, 500);
        assert_eq!(costs.total_cost, Decimal::ZERO);
    }

    #[test]
    fn partial_price_row_defaults_missing_rate() {
        let price = ServicePrice {
            id: Uuid::new_v4(),
            room_price: Some(dec!(2000000)),
            electricity_price: Some(dec!(3000)),
            water_price: None,
            effective_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            created_at: Utc::now(),
        };

        let rates = UtilityRates::from_price(Some(&price));
        assert_eq!(rates.electricity, dec!(3000));
        assert_eq!(rates.water, Decimal::ZERO);
    }
}
