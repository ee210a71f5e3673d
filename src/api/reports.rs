use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{AppState, AuthUser, Capability};
use crate::models::{InvoiceStatus, RoomStatus};
use crate::utils::Period;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/revenue", get(revenue))
        .route("/revenue-year", get(revenue_year))
        .route("/debt", get(debt))
        .route("/debt-detail", get(debt_detail))
        .route("/occupancy", get(occupancy))
        .route("/invoice-summary", get(invoice_summary))
        .route("/vacant", get(vacant))
        .route("/summary", get(summary))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PeriodQuery {
    pub month: i32,
    pub year: i32,
}

/// Month and year both default to the current month.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct OptionalPeriodQuery {
    pub month: Option<i32>,
    pub year: Option<i32>,
}

impl OptionalPeriodQuery {
    pub fn resolve(&self, today: NaiveDate) -> AppResult<Period> {
        let current = Period::containing(today);
        Period::new(
            self.year.unwrap_or(current.year),
            self.month.unwrap_or(current.month_i32()),
        )
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct YearQuery {
    pub year: i32,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RevenueReport {
    pub month: u32,
    pub year: i32,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct MonthRevenue {
    pub month: u32,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct YearRevenueReport {
    pub year: i32,
    pub months: Vec<MonthRevenue>,
    pub total: Decimal,
}

#[derive(Debug, Serialize, FromRow, utoipa::ToSchema)]
pub struct DebtRow {
    pub id: Uuid,
    pub room_code: String,
    pub tenant_name: Option<String>,
    pub month: i32,
    pub year: i32,
    pub total: Decimal,
    pub status: InvoiceStatus,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DebtReport {
    pub total_debt: Decimal,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoices: Option<Vec<DebtRow>>,
}

#[derive(Debug, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct OccupancyReport {
    pub total_rooms: i64,
    pub available: i64,
    pub occupied: i64,
    pub maintenance: i64,
    pub occupancy_rate_percent: f64,
}

#[derive(Debug, Serialize, FromRow, utoipa::ToSchema)]
pub struct VacantRoom {
    pub id: Uuid,
    pub code: String,
    pub area_name: Option<String>,
    pub current_price: Option<Decimal>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VacantReport {
    pub vacant_rooms: usize,
    pub rooms: Vec<VacantRoom>,
}

/// Dashboard figures for one month.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DashboardSummary {
    pub month: u32,
    pub year: i32,
    pub revenue_month: Decimal,
    pub total_rooms: i64,
    pub vacant_rooms: i64,
    pub occupied_rooms: i64,
    pub total_debt: Decimal,
    pub unpaid_count: i64,
}

#[derive(Debug, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct InvoiceSummary {
    pub month: u32,
    pub year: i32,
    pub count_paid: i64,
    pub count_partial: i64,
    pub count_unpaid: i64,
    pub count_total: i64,
    pub sum_paid: Decimal,
    pub sum_partial: Decimal,
    pub sum_unpaid: Decimal,
    pub sum_total: Decimal,
}

/// Occupied share of all rooms, in percent with one decimal.
pub fn occupancy_rate(occupied: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let rate = occupied as f64 * 100.0 / total as f64;
    (rate * 10.0).round() / 10.0
}

/// One entry per calendar month; months without revenue report zero.
pub fn fill_months(rows: &[(i32, Decimal)]) -> Vec<MonthRevenue> {
    (1..=12u32)
        .map(|month| MonthRevenue {
            month,
            revenue: rows
                .iter()
                .filter(|(m, _)| *m == month as i32)
                .map(|(_, sum)| *sum)
                .sum(),
        })
        .collect()
}

pub fn occupancy_from_counts(counts: &[(RoomStatus, i64)]) -> OccupancyReport {
    let mut report = OccupancyReport::default();
    for &(status, count) in counts {
        match status {
            RoomStatus::Available => report.available += count,
            RoomStatus::Occupied => report.occupied += count,
            RoomStatus::Maintenance => report.maintenance += count,
        }
    }
    report.total_rooms = report.available + report.occupied + report.maintenance;
    report.occupancy_rate_percent = occupancy_rate(report.occupied, report.total_rooms);
    report
}

pub fn summarize(period: Period, rows: &[(InvoiceStatus, i64, Decimal)]) -> InvoiceSummary {
    let mut summary = InvoiceSummary {
        month: period.month,
        year: period.year,
        ..Default::default()
    };
    for &(status, count, sum) in rows {
        match status {
            InvoiceStatus::Paid => {
                summary.count_paid += count;
                summary.sum_paid += sum;
            }
            InvoiceStatus::Partial => {
                summary.count_partial += count;
                summary.sum_partial += sum;
            }
            InvoiceStatus::Unpaid => {
                summary.count_unpaid += count;
                summary.sum_unpaid += sum;
            }
        }
        summary.count_total += count;
        summary.sum_total += sum;
    }
    summary
}

/// Revenue (sum of PAID invoice totals) for one month
#[utoipa::path(
    get,
    path = "/api/v1/reports/revenue",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(PeriodQuery),
    responses(
        (status = 200, description = "Revenue for the month", body = RevenueReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Invalid month")
    )
)]
pub async fn revenue(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<PeriodQuery>,
) -> AppResult<Json<RevenueReport>> {
    auth_user.require(Capability::ViewReports)?;
    let period = Period::new(query.year, query.month)?;

    let (revenue,): (Decimal,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total), 0) FROM invoices
        WHERE status = 'paid' AND month = $1 AND year = $2
        "#,
    )
    .bind(period.month_i32())
    .bind(period.year)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(RevenueReport {
        month: period.month,
        year: period.year,
        revenue,
    }))
}

/// Revenue per month over a year
#[utoipa::path(
    get,
    path = "/api/v1/reports/revenue-year",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(YearQuery),
    responses(
        (status = 200, description = "Revenue per month", body = YearRevenueReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn revenue_year(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<YearQuery>,
) -> AppResult<Json<YearRevenueReport>> {
    auth_user.require(Capability::ViewReports)?;

    let rows: Vec<(i32, Decimal)> = sqlx::query_as(
        r#"
        SELECT month, COALESCE(SUM(total), 0) FROM invoices
        WHERE status = 'paid' AND year = $1
        GROUP BY month
        "#,
    )
    .bind(query.year)
    .fetch_all(&state.pool)
    .await?;

    let months = fill_months(&rows);
    let total = months.iter().map(|m| m.revenue).sum();

    Ok(Json(YearRevenueReport {
        year: query.year,
        months,
        total,
    }))
}

async fn unpaid_invoices(state: &AppState) -> AppResult<Vec<DebtRow>> {
    let rows = sqlx::query_as::<_, DebtRow>(
        r#"
        SELECT i.id, r.code AS room_code, t.full_name AS tenant_name,
               i.month, i.year, i.total, i.status
        FROM invoices i
        JOIN rooms r ON r.id = i.room_id
        LEFT JOIN tenants t ON t.id = i.tenant_id
        WHERE i.status = 'unpaid'
        ORDER BY i.year, i.month, r.code
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(rows)
}

/// Outstanding debt across UNPAID invoices
#[utoipa::path(
    get,
    path = "/api/v1/reports/debt",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Debt totals", body = DebtReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn debt(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DebtReport>> {
    auth_user.require(Capability::ViewReports)?;

    let rows = unpaid_invoices(&state).await?;
    Ok(Json(DebtReport {
        total_debt: rows.iter().map(|r| r.total).sum(),
        count: rows.len(),
        invoices: None,
    }))
}

/// Outstanding debt with one row per UNPAID invoice
#[utoipa::path(
    get,
    path = "/api/v1/reports/debt-detail",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Debt with invoice rows", body = DebtReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn debt_detail(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DebtReport>> {
    auth_user.require(Capability::ViewReports)?;

    let rows = unpaid_invoices(&state).await?;
    Ok(Json(DebtReport {
        total_debt: rows.iter().map(|r| r.total).sum(),
        count: rows.len(),
        invoices: Some(rows),
    }))
}

/// Room counts per status and the occupancy rate
#[utoipa::path(
    get,
    path = "/api/v1/reports/occupancy",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Occupancy", body = OccupancyReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn occupancy(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<OccupancyReport>> {
    auth_user.require(Capability::ViewReports)?;

    let counts: Vec<(RoomStatus, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM rooms GROUP BY status")
            .fetch_all(&state.pool)
            .await?;

    Ok(Json(occupancy_from_counts(&counts)))
}

/// Invoice counts and sums per status for one month
#[utoipa::path(
    get,
    path = "/api/v1/reports/invoice-summary",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(PeriodQuery),
    responses(
        (status = 200, description = "Invoice summary", body = InvoiceSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Invalid month")
    )
)]
pub async fn invoice_summary(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<PeriodQuery>,
) -> AppResult<Json<InvoiceSummary>> {
    auth_user.require(Capability::ViewReports)?;
    let period = Period::new(query.year, query.month)?;

    let rows: Vec<(InvoiceStatus, i64, Decimal)> = sqlx::query_as(
        r#"
        SELECT status, COUNT(*), COALESCE(SUM(total), 0) FROM invoices
        WHERE month = $1 AND year = $2
        GROUP BY status
        "#,
    )
    .bind(period.month_i32())
    .bind(period.year)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(summarize(period, &rows)))
}

/// Rooms open for a new contract, with their area and asking price
#[utoipa::path(
    get,
    path = "/api/v1/reports/vacant",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Vacant rooms", body = VacantReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn vacant(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<VacantReport>> {
    auth_user.require(Capability::ViewReports)?;

    let rooms = sqlx::query_as::<_, VacantRoom>(
        r#"
        SELECT r.id, r.code, a.name AS area_name, r.current_price
        FROM rooms r
        LEFT JOIN areas a ON a.id = r.area_id
        WHERE r.status = $1
        ORDER BY r.code
        "#,
    )
    .bind(RoomStatus::Available)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(VacantReport {
        vacant_rooms: rooms.len(),
        rooms,
    }))
}

/// Dashboard: month revenue, room counts and outstanding debt
#[utoipa::path(
    get,
    path = "/api/v1/reports/summary",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(OptionalPeriodQuery),
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Invalid month")
    )
)]
pub async fn summary(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<OptionalPeriodQuery>,
) -> AppResult<Json<DashboardSummary>> {
    auth_user.require(Capability::ViewReports)?;
    let period = query.resolve(chrono::Utc::now().date_naive())?;

    let (revenue_month,): (Decimal,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total), 0) FROM invoices
        WHERE status = 'paid' AND month = $1 AND year = $2
        "#,
    )
    .bind(period.month_i32())
    .bind(period.year)
    .fetch_one(&state.pool)
    .await?;

    let counts: Vec<(RoomStatus, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM rooms GROUP BY status")
            .fetch_all(&state.pool)
            .await?;
    let rooms = occupancy_from_counts(&counts);

    let (total_debt, unpaid_count): (Decimal, i64) = sqlx::query_as(
        "SELECT COALESCE(SUM(total), 0), COUNT(*) FROM invoices WHERE status = 'unpaid'",
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(DashboardSummary {
        month: period.month,
        year: period.year,
        revenue_month,
        total_rooms: rooms.total_rooms,
        vacant_rooms: rooms.available,
        occupied_rooms: rooms.occupied,
        total_debt,
        unpaid_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn occupancy_rate_rounds_to_one_decimal() {
        assert_eq!(occupancy_rate(2, 3), 66.7);
        assert_eq!(occupancy_rate(5, 5), 100.0);
        assert_eq!(occupancy_rate(0, 0), 0.0);
    }

    #[test]
    fn occupancy_counts_every_status() {
        let report = occupancy_from_counts(&[
            (RoomStatus::Available, 3),
            (RoomStatus::Occupied, 6),
            (RoomStatus::Maintenance, 1),
        ]);

        assert_eq!(report.total_rooms, 10);
        assert_eq!(report.occupied, 6);
        assert_eq!(report.occupancy_rate_percent, 60.0);
    }

    #[test]
    fn year_report_has_twelve_months() {
        let months = fill_months(&[(2, dec!(3000000)), (11, dec!(1500000))]);

        assert_eq!(months.len(), 12);
        assert_eq!(months[0].revenue, Decimal::ZERO);
        assert_eq!(months[1].revenue, dec!(3000000));
        assert_eq!(months[10].month, 11);
        assert_eq!(months[10].revenue, dec!(1500000));
    }

    #[test]
    fn summary_period_defaults_to_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();

        let period = OptionalPeriodQuery::default().resolve(today).unwrap();
        assert_eq!((period.month, period.year), (3, 2024));

        let query = OptionalPeriodQuery {
            month: Some(12),
            year: None,
        };
        let period = query.resolve(today).unwrap();
        assert_eq!((period.month, period.year), (12, 2024));

        let query = OptionalPeriodQuery {
            month: Some(13),
            year: Some(2024),
        };
        assert!(query.resolve(today).is_err());
    }

    #[test]
    fn summary_splits_by_status() {
        let period = Period::new(2024, 6).unwrap();
        let summary = summarize(
            period,
            &[
                (InvoiceStatus::Paid, 2, dec!(3000000)),
                (InvoiceStatus::Unpaid, 1, dec!(1500000)),
            ],
        );

        assert_eq!(summary.month, 6);
        assert_eq!(summary.count_paid, 2);
        assert_eq!(summary.count_partial, 0);
        assert_eq!(summary.count_total, 3);
        assert_eq!(summary.sum_unpaid, dec!(1500000));
        assert_eq!(summary.sum_total, dec!(4500000));
    }
}
