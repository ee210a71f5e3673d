use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, Capability};
use crate::models::{ServicePrice, ServicePriceRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_prices).post(create_price))
        .route("/:id", put(update_price).delete(delete_price))
}

/// Price history, newest effective date first
#[utoipa::path(
    get,
    path = "/api/v1/service-prices",
    tag = "service-prices",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Service prices", body = Vec<ServicePrice>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_prices(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<ServicePrice>>> {
    auth_user.require(Capability::ViewBilling)?;

    let prices = sqlx::query_as::<_, ServicePrice>(
        "SELECT * FROM service_prices ORDER BY effective_from DESC, created_at DESC",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(prices))
}

/// Add a price row
#[utoipa::path(
    post,
    path = "/api/v1/service-prices",
    tag = "service-prices",
    security(("bearer_auth" = [])),
    request_body = ServicePriceRequest,
    responses(
        (status = 200, description = "Price created", body = ServicePrice),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Negative price")
    )
)]
pub async fn create_price(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<ServicePriceRequest>,
) -> AppResult<Json<ServicePrice>> {
    auth_user.require(Capability::ManageProperty)?;
    payload.check().map_err(AppError::Validation)?;

    let price = sqlx::query_as::<_, ServicePrice>(
        r#"
        INSERT INTO service_prices (room_price, electricity_price, water_price, effective_from)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(payload.room_price)
    .bind(payload.electricity_price)
    .bind(payload.water_price)
    .bind(payload.effective_from)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(price))
}

/// Update a price row
#[utoipa::path(
    put,
    path = "/api/v1/service-prices/{id}",
    tag = "service-prices",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Service price ID")),
    request_body = ServicePriceRequest,
    responses(
        (status = 200, description = "Price updated", body = ServicePrice),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Price not found"),
        (status = 422, description = "Negative price")
    )
)]
pub async fn update_price(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ServicePriceRequest>,
) -> AppResult<Json<ServicePrice>> {
    auth_user.require(Capability::ManageProperty)?;
    payload.check().map_err(AppError::Validation)?;

    let price = sqlx::query_as::<_, ServicePrice>(
        r#"
        UPDATE service_prices
        SET room_price = $2, electricity_price = $3, water_price = $4, effective_from = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.room_price)
    .bind(payload.electricity_price)
    .bind(payload.water_price)
    .bind(payload.effective_from)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Service price not found".to_string()))?;

    Ok(Json(price))
}

/// Delete a price row
#[utoipa::path(
    delete,
    path = "/api/v1/service-prices/{id}",
    tag = "service-prices",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Service price ID")),
    responses(
        (status = 200, description = "Price deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Price not found")
    )
)]
pub async fn delete_price(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    auth_user.require(Capability::ManageProperty)?;

    let result = sqlx::query("DELETE FROM service_prices WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Service price not found".to_string()));
    }

    Ok(Json(json!({"success": true})))
}
