use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    GenerateInvoicesResponse, Invoice, InvoiceStatus, MeterReading, PeriodGenerationResult, Room,
};
use crate::utils::Period;

/// Cost breakdown written onto an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceCharges {
    pub room_cost: Decimal,
    pub electricity_cost: Decimal,
    pub water_cost: Decimal,
    pub total: Decimal,
}

impl InvoiceCharges {
    pub fn new(room_cost: Decimal, electricity_cost: Decimal, water_cost: Decimal) -> Self {
        Self {
            room_cost,
            electricity_cost,
            water_cost,
            total: room_cost + electricity_cost + water_cost,
        }
    }

    /// Rent comes from the room itself; utilities from the reading.
    pub fn from_reading(room: &Room, reading: &MeterReading) -> Self {
        Self::new(room.rent(), reading.electricity_cost, reading.water_cost)
    }
}

/// An active contract considered by month-wide generation.
#[derive(Debug, Clone, FromRow)]
pub struct GenerationCandidate {
    pub contract_id: Uuid,
    pub room_id: Uuid,
    pub tenant_id: Uuid,
    pub room_price: Option<Decimal>,
    pub has_invoice: bool,
    pub electricity_cost: Option<Decimal>,
    pub water_cost: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedInvoice {
    pub contract_id: Uuid,
    pub room_id: Uuid,
    pub tenant_id: Uuid,
    pub charges: InvoiceCharges,
}

/// Baseline invoices to create: one per room with an active contract and no invoice yet.
pub fn plan_generation(candidates: &[GenerationCandidate]) -> Vec<PlannedInvoice> {
    let mut seen_rooms = HashSet::new();

    candidates
        .iter()
        .filter(|c| !c.has_invoice)
        .filter(|c| seen_rooms.insert(c.room_id))
        .map(|c| PlannedInvoice {
            contract_id: c.contract_id,
            room_id: c.room_id,
            tenant_id: c.tenant_id,
            charges: InvoiceCharges::new(
                c.room_price.unwrap_or(Decimal::ZERO),
                c.electricity_cost.unwrap_or(Decimal::ZERO),
                c.water_cost.unwrap_or(Decimal::ZERO),
            ),
        })
        .collect()
}

pub struct BillingService;

impl BillingService {
    /// Creates or refreshes the invoice for the reading's room and period.
    ///
    /// The `(room_id, month, year)` unique constraint makes this a single atomic upsert:
    /// a second reading for the same period overwrites the cost fields instead of adding a row.
    /// Status and reminder bookkeeping survive the update.
    pub async fn upsert_from_reading(
        conn: &mut PgConnection,
        room: &Room,
        reading: &MeterReading,
    ) -> AppResult<Invoice> {
        let charges = InvoiceCharges::from_reading(room, reading);
        let tenant_id = Self::active_tenant_for_room(conn, room.id).await?;

        if tenant_id.is_none() {
            tracing::debug!(room = %room.code, "No active contract; invoice has no tenant");
        }

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices
                (room_id, tenant_id, month, year, room_cost, electricity_cost, water_cost, total, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (room_id, month, year) DO UPDATE SET
                tenant_id = COALESCE(EXCLUDED.tenant_id, invoices.tenant_id),
                room_cost = EXCLUDED.room_cost,
                electricity_cost = EXCLUDED.electricity_cost,
                water_cost = EXCLUDED.water_cost,
                total = EXCLUDED.total,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(room.id)
        .bind(tenant_id)
        .bind(reading.month)
        .bind(reading.year)
        .bind(charges.room_cost)
        .bind(charges.electricity_cost)
        .bind(charges.water_cost)
        .bind(charges.total)
        .bind(InvoiceStatus::Unpaid)
        .fetch_one(conn)
        .await?;

        Ok(invoice)
    }

    pub async fn active_tenant_for_room(
        conn: &mut PgConnection,
        room_id: Uuid,
    ) -> AppResult<Option<Uuid>> {
        let tenant: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT tenant_id FROM contracts
            WHERE room_id = $1 AND status = 'active'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(room_id)
        .fetch_optional(conn)
        .await?;

        Ok(tenant.map(|(id,)| id))
    }

    /// Creates a baseline invoice for every active contract lacking one in the period.
    /// Returns how many invoices were actually inserted.
    pub async fn generate_invoices_for_month(pool: &PgPool, period: Period) -> AppResult<u64> {
        let candidates = sqlx::query_as::<_, GenerationCandidate>(
            r#"
            SELECT
                c.id AS contract_id,
                c.room_id,
                c.tenant_id,
                r.current_price AS room_price,
                EXISTS (
                    SELECT 1 FROM invoices i
                    WHERE i.room_id = c.room_id AND i.month = $1 AND i.year = $2
                ) AS has_invoice,
                mr.electricity_cost,
                mr.water_cost
            FROM contracts c
            JOIN rooms r ON r.id = c.room_id
            LEFT JOIN LATERAL (
                SELECT m.electricity_cost, m.water_cost
                FROM meter_readings m
                WHERE m.room_id = c.room_id AND m.month = $1 AND m.year = $2
                ORDER BY m.created_at DESC
                LIMIT 1
            ) mr ON true
            WHERE c.status = 'active'
            ORDER BY c.created_at
            "#,
        )
        .bind(period.month_i32())
        .bind(period.year)
        .fetch_all(pool)
        .await?;

        let planned = plan_generation(&candidates);
        let mut created = 0;

        for invoice in &planned {
            // A concurrent run may have inserted the row since the candidate query.
            let result = sqlx::query(
                r#"
                INSERT INTO invoices
                    (room_id, tenant_id, month, year, room_cost, electricity_cost, water_cost, total, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (room_id, month, year) DO NOTHING
                "#,
            )
            .bind(invoice.room_id)
            .bind(invoice.tenant_id)
            .bind(period.month_i32())
            .bind(period.year)
            .bind(invoice.charges.room_cost)
            .bind(invoice.charges.electricity_cost)
            .bind(invoice.charges.water_cost)
            .bind(invoice.charges.total)
            .bind(InvoiceStatus::Unpaid)
            .execute(pool)
            .await?;

            if result.rows_affected() == 0 {
                continue;
            }
            created += 1;
            tracing::debug!(
                contract_id = %invoice.contract_id,
                room_id = %invoice.room_id,
                total = %invoice.charges.total,
                "Baseline invoice created"
            );
        }

        tracing::info!(
            period = %period,
            active_contracts = candidates.len(),
            created,
            "Invoice generation finished"
        );

        Ok(created)
    }

    /// Runs generation for the month before `today` and then the month of `today`.
    pub async fn generate_recent(
        pool: &PgPool,
        today: NaiveDate,
    ) -> AppResult<GenerateInvoicesResponse> {
        let current = Period::containing(today);
        let previous = current.previous();

        let previous_created = Self::generate_invoices_for_month(pool, previous).await?;
        let current_created = Self::generate_invoices_for_month(pool, current).await?;

        Ok(GenerateInvoicesResponse {
            previous: PeriodGenerationResult {
                month: previous.month,
                year: previous.year,
                created: previous_created,
            },
            current: PeriodGenerationResult {
                month: current.month,
                year: current.year,
                created: current_created,
            },
            total: previous_created + current_created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoomStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn candidate(room_id: Uuid, has_invoice: bool) -> GenerationCandidate {
        GenerationCandidate {
            contract_id: Uuid::new_v4(),
            room_id,
            tenant_id: Uuid::new_v4(),
            room_price: Some(dec!(1500000)),
            has_invoice,
            electricity_cost: None,
            water_cost: None,
        }
    }

    fn room(price: Option<Decimal>) -> Room {
        Room {
            id: Uuid::new_v4(),
            code: "B202".to_string(),
            floor: Some("2".to_string()),
            status: RoomStatus::Occupied,
            current_price: price,
            area_size: None,
            area_id: None,
            created_at: Utc::now(),
        }
    }

    fn reading(room_id: Uuid, electricity: Decimal, water: Decimal) -> MeterReading {
        MeterReading {
            id: Uuid::new_v4(),
            room_id,
            month: 6,
            year: 2024,
            old_electric: 100,
            new_electric: 150,
            old_water: 10,
            new_water: 12,
            electricity_cost: electricity,
            water_cost: water,
            total_cost: electricity + water,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn charges_total_room_and_utilities() {
        let room = room(Some(dec!(1500000)));
        let charges = InvoiceCharges::from_reading(&room, &reading(room.id, dec!(150000), dec!(30000)));

        assert_eq!(charges.room_cost, dec!(1500000));
        assert_eq!(charges.total, dec!(1680000));
    }

    #[test]
    fn room_without_price_bills_utilities_only() {
        let room = room(None);
        let charges = InvoiceCharges::from_reading(&room, &reading(room.id, dec!(90000), dec!(0)));

        assert_eq!(charges.room_cost, Decimal::ZERO);
        assert_eq!(charges.total, dec!(90000));
    }

    #[test]
    fn generation_skips_already_invoiced_rooms() {
        // 3 active contracts in 6/2024, one room already invoiced
        let candidates = vec![
            candidate(Uuid::new_v4(), false),
            candidate(Uuid::new_v4(), true),
            candidate(Uuid::new_v4(), false),
        ];

        let planned = plan_generation(&candidates);
        assert_eq!(planned.len(), 2);
        assert!(planned.iter().all(|p| p.room_id != candidates[1].room_id));
    }

    #[test]
    fn generation_is_idempotent_once_invoiced() {
        let first: Vec<_> = (0..3).map(|_| candidate(Uuid::new_v4(), false)).collect();
        assert_eq!(plan_generation(&first).len(), 3);

        let rerun: Vec<_> = first
            .iter()
            .map(|c| GenerationCandidate {
                has_invoice: true,
                ..c.clone()
            })
            .collect();
        assert!(plan_generation(&rerun).is_empty());
    }

    #[test]
    fn generation_creates_one_invoice_per_room() {
        let room_id = Uuid::new_v4();
        let candidates = vec![candidate(room_id, false), candidate(room_id, false)];

        let planned = plan_generation(&candidates);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].tenant_id, candidates[0].tenant_id);
        assert_eq!(planned[0].contract_id, candidates[0].contract_id);
    }

    #[test]
    fn generation_picks_up_recorded_utilities() {
        let mut with_reading = candidate(Uuid::new_v4(), false);
        with_reading.electricity_cost = Some(dec!(150000));
        with_reading.water_cost = Some(dec!(45000));
        let mut no_price = candidate(Uuid::new_v4(), false);
        no_price.room_price = None;

        let planned = plan_generation(&[with_reading, no_price]);

        assert_eq!(planned[0].charges.total, dec!(1695000));
        assert_eq!(planned[1].charges, InvoiceCharges::new(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO));
    }

    async fn occupied_room(pool: &PgPool) -> Room {
        let room = sqlx::query_as::<_, Room>(
            "INSERT INTO rooms (code, status, current_price) VALUES ('B202', 'occupied', 1500000) RETURNING *",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        let (tenant_id,): (Uuid,) =
            sqlx::query_as("INSERT INTO tenants (full_name) VALUES ('Le Van C') RETURNING id")
                .fetch_one(pool)
                .await
                .unwrap();
        sqlx::query("INSERT INTO contracts (room_id, tenant_id, start_date) VALUES ($1, $2, '2024-01-01')")
            .bind(room.id)
            .bind(tenant_id)
            .execute(pool)
            .await
            .unwrap();
        room
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn second_reading_overwrites_the_same_invoice(pool: PgPool) {
        let room = occupied_room(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let first = BillingService::upsert_from_reading(
            &mut *conn,
            &room,
            &reading(room.id, dec!(150000), dec!(30000)),
        )
        .await
        .unwrap();
        let second = BillingService::upsert_from_reading(
            &mut *conn,
            &room,
            &reading(room.id, dec!(210000), dec!(45000)),
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.tenant_id.is_some());

        let rows = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE room_id = $1 AND month = 6 AND year = 2024",
        )
        .bind(room.id)
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].electricity_cost, dec!(210000));
        assert_eq!(rows[0].water_cost, dec!(45000));
        assert_eq!(rows[0].total, dec!(1755000));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn repeated_generation_creates_nothing_new(pool: PgPool) {
        let room = occupied_room(&pool).await;
        let period = Period::new(2024, 7).unwrap();

        assert_eq!(BillingService::generate_invoices_for_month(&pool, period).await.unwrap(), 1);
        assert_eq!(BillingService::generate_invoices_for_month(&pool, period).await.unwrap(), 0);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM invoices WHERE room_id = $1")
            .bind(room.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
