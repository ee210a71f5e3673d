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
use crate::models::{Area, AreaRequest};
use crate::utils::validators::non_empty;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_areas).post(create_area))
        .route("/:id", put(update_area).delete(delete_area))
}

/// List areas
#[utoipa::path(
    get,
    path = "/api/v1/areas",
    tag = "areas",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Areas", body = Vec<Area>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_areas(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<Area>>> {
    auth_user.require(Capability::ViewBilling)?;

    let areas = sqlx::query_as::<_, Area>("SELECT * FROM areas ORDER BY name")
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(areas))
}

/// Create an area
#[utoipa::path(
    post,
    path = "/api/v1/areas",
    tag = "areas",
    security(("bearer_auth" = [])),
    request_body = AreaRequest,
    responses(
        (status = 200, description = "Area created", body = Area),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_area(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<AreaRequest>,
) -> AppResult<Json<Area>> {
    auth_user.require(Capability::ManageProperty)?;
    payload.validate()?;

    let area = sqlx::query_as::<_, Area>(
        "INSERT INTO areas (name, address, description) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(payload.name.trim())
    .bind(non_empty(payload.address.as_deref()))
    .bind(non_empty(payload.description.as_deref()))
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(area))
}

/// Update an area
#[utoipa::path(
    put,
    path = "/api/v1/areas/{id}",
    tag = "areas",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Area ID")),
    request_body = AreaRequest,
    responses(
        (status = 200, description = "Area updated", body = Area),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Area not found"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update_area(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AreaRequest>,
) -> AppResult<Json<Area>> {
    auth_user.require(Capability::ManageProperty)?;
    payload.validate()?;

    let area = sqlx::query_as::<_, Area>(
        "UPDATE areas SET name = $2, address = $3, description = $4 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(payload.name.trim())
    .bind(non_empty(payload.address.as_deref()))
    .bind(non_empty(payload.description.as_deref()))
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Area not found".to_string()))?;

    Ok(Json(area))
}

/// Delete an area; its rooms stay and lose the area
#[utoipa::path(
    delete,
    path = "/api/v1/areas/{id}",
    tag = "areas",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Area ID")),
    responses(
        (status = 200, description = "Area deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Area not found")
    )
)]
pub async fn delete_area(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    auth_user.require(Capability::ManageProperty)?;

    let result = sqlx::query("DELETE FROM areas WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Area not found".to_string()));
    }

    Ok(Json(json!({"success": true})))
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test(migrations = "./migrations")]
    async fn deleting_an_area_detaches_its_rooms(pool: PgPool) {
        let (area_id,): (Uuid,) =
            sqlx::query_as("INSERT INTO areas (name) VALUES ('Block A') RETURNING id")
                .fetch_one(&pool)
                .await
                .unwrap();
        let (room_id,): (Uuid,) =
            sqlx::query_as("INSERT INTO rooms (code, area_id) VALUES ('A101', $1) RETURNING id")
                .bind(area_id)
                .fetch_one(&pool)
                .await
                .unwrap();

        sqlx::query("DELETE FROM areas WHERE id = $1")
            .bind(area_id)
            .execute(&pool)
            .await
            .unwrap();

        let (area,): (Option<Uuid>,) = sqlx::query_as("SELECT area_id FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(area, None);
    }
}
