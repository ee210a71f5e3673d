use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, Capability};
use crate::models::{Room, RoomRequest, RoomStatus};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rooms).post(create_room))
        .route("/available", get(list_available_rooms))
        .route("/:id", put(update_room).delete(delete_room))
}

fn room_write_error(e: sqlx::Error) -> AppError {
    match AppError::from(e) {
        err if err.is_unique_violation() => {
            AppError::Conflict("Room code already exists".to_string())
        }
        err if err.is_foreign_key_violation() => AppError::BadRequest("Area not found".to_string()),
        err => err,
    }
}

/// List all rooms
#[utoipa::path(
    get,
    path = "/api/v1/rooms",
    tag = "rooms",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Rooms", body = Vec<Room>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_rooms(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<Room>>> {
    auth_user.require(Capability::ViewBilling)?;

    let rooms = sqlx::query_as::<_, Room>("SELECT * FROM rooms ORDER BY code")
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(rooms))
}

/// Rooms that can take a new contract
#[utoipa::path(
    get,
    path = "/api/v1/rooms/available",
    tag = "rooms",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Available rooms", body = Vec<Room>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_available_rooms(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<Room>>> {
    auth_user.require(Capability::ViewBilling)?;

    let rooms = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE status = $1 ORDER BY code")
        .bind(RoomStatus::Available)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(rooms))
}

/// Create a room
#[utoipa::path(
    post,
    path = "/api/v1/rooms",
    tag = "rooms",
    security(("bearer_auth" = [])),
    request_body = RoomRequest,
    responses(
        (status = 200, description = "Room created", body = Room),
        (status = 400, description = "Area not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Room code already exists"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_room(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<RoomRequest>,
) -> AppResult<Json<Room>> {
    auth_user.require(Capability::ManageProperty)?;
    payload.validate()?;

    let room = sqlx::query_as::<_, Room>(
        r#"
        INSERT INTO rooms (code, floor, status, current_price, area_size, area_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.code.trim())
    .bind(&payload.floor)
    .bind(payload.status.unwrap_or_default())
    .bind(payload.current_price)
    .bind(payload.area_size)
    .bind(payload.area_id)
    .fetch_one(&state.pool)
    .await
    .map_err(room_write_error)?;

    Ok(Json(room))
}

/// Update a room
#[utoipa::path(
    put,
    path = "/api/v1/rooms/{id}",
    tag = "rooms",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Room ID")),
    request_body = RoomRequest,
    responses(
        (status = 200, description = "Room updated", body = Room),
        (status = 400, description = "Area not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Room code already exists")
    )
)]
pub async fn update_room(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoomRequest>,
) -> AppResult<Json<Room>> {
    auth_user.require(Capability::ManageProperty)?;
    payload.validate()?;

    let room = sqlx::query_as::<_, Room>(
        r#"
        UPDATE rooms
        SET code = $2,
            floor = $3,
            status = COALESCE($4, status),
            current_price = $5,
            area_size = $6,
            area_id = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.code.trim())
    .bind(&payload.floor)
    .bind(payload.status)
    .bind(payload.current_price)
    .bind(payload.area_size)
    .bind(payload.area_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(room_write_error)?
    .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;

    Ok(Json(room))
}

/// Delete a room that has no history
#[utoipa::path(
    delete,
    path = "/api/v1/rooms/{id}",
    tag = "rooms",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Room deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Room is referenced by contracts or invoices")
    )
)]
pub async fn delete_room(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    auth_user.require(Capability::ManageProperty)?;

    let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            err if err.is_foreign_key_violation() => {
                AppError::Conflict("Room has contracts, readings or invoices".to_string())
            }
            err => err,
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Room not found".to_string()));
    }

    Ok(Json(json!({"success": true})))
}
