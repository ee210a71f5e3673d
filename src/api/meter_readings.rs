use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::error::AppResult;
use crate::middleware::{AppState, AuthUser, Capability};
use crate::models::{MeterReading, ReadingsQuery, SubmitReadingRequest, SubmitReadingResponse};
use crate::services::MeterService;
use crate::utils::page_window;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_readings).post(submit_reading))
}

/// Record a meter reading and refresh the room's invoice for that period
#[utoipa::path(
    post,
    path = "/api/v1/meter-readings",
    tag = "meter-readings",
    security(("bearer_auth" = [])),
    request_body = SubmitReadingRequest,
    responses(
        (status = 200, description = "Reading stored, invoice upserted", body = SubmitReadingResponse),
        (status = 400, description = "Missing or unknown room"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Invalid month or counters")
    )
)]
pub async fn submit_reading(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<SubmitReadingRequest>,
) -> AppResult<Json<SubmitReadingResponse>> {
    auth_user.require(Capability::RecordReadings)?;

    let (reading, invoice) = MeterService::record_reading(&state.pool, &payload).await?;

    Ok(Json(SubmitReadingResponse {
        reading,
        invoice_id: invoice.id,
        invoice_total: invoice.total,
    }))
}

/// List meter readings, newest first
#[utoipa::path(
    get,
    path = "/api/v1/meter-readings",
    tag = "meter-readings",
    security(("bearer_auth" = [])),
    params(ReadingsQuery),
    responses(
        (status = 200, description = "Meter readings", body = Vec<MeterReading>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_readings(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ReadingsQuery>,
) -> AppResult<Json<Vec<MeterReading>>> {
    auth_user.require(Capability::ViewBilling)?;

    let (limit, offset) = page_window(query.page, query.limit, 50, 200);

    let readings = sqlx::query_as::<_, MeterReading>(
        r#"
        SELECT * FROM meter_readings
        WHERE ($1::uuid IS NULL OR room_id = $1)
          AND ($2::int IS NULL OR month = $2)
          AND ($3::int IS NULL OR year = $3)
        ORDER BY year DESC, month DESC, created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(query.room_id)
    .bind(query.month)
    .bind(query.year)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(readings))
}
