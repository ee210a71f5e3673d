use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, Capability};
use crate::models::{
    Contract, ContractDetail, ContractStatus, CreateContractRequest, ExtendContractRequest,
    RoomStatus,
};

const CONTRACT_DETAIL_SELECT: &str = r#"
    SELECT
        c.id, c.room_id, r.code AS room_code,
        c.tenant_id, t.full_name AS tenant_name,
        c.start_date, c.end_date, c.status, c.deposit, c.rent, c.created_at
    FROM contracts c
    JOIN rooms r ON r.id = c.room_id
    JOIN tenants t ON t.id = c.tenant_id
"#;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contracts).post(create_contract))
        .route("/me", get(my_contracts))
        .route("/:id/extend", put(extend_contract))
        .route("/:id/end", put(end_contract))
}

/// All contracts with room code and tenant name
#[utoipa::path(
    get,
    path = "/api/v1/contracts",
    tag = "contracts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Contracts", body = Vec<ContractDetail>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_contracts(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<ContractDetail>>> {
    auth_user.require(Capability::ViewBilling)?;

    let sql = format!("{} ORDER BY c.created_at DESC", CONTRACT_DETAIL_SELECT);
    let contracts = sqlx::query_as::<_, ContractDetail>(&sql)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(contracts))
}

/// Contracts of the calling tenant
#[utoipa::path(
    get,
    path = "/api/v1/contracts/me",
    tag = "contracts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own contracts", body = Vec<ContractDetail>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a tenant account")
    )
)]
pub async fn my_contracts(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<ContractDetail>>> {
    auth_user.require(Capability::ViewOwnAccount)?;

    let sql = format!(
        "{} WHERE t.user_id = $1 ORDER BY c.created_at DESC",
        CONTRACT_DETAIL_SELECT
    );
    let contracts = sqlx::query_as::<_, ContractDetail>(&sql)
        .bind(auth_user.user_id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(contracts))
}

/// Sign a new contract; the room becomes occupied
#[utoipa::path(
    post,
    path = "/api/v1/contracts",
    tag = "contracts",
    security(("bearer_auth" = [])),
    request_body = CreateContractRequest,
    responses(
        (status = 200, description = "Contract created", body = Contract),
        (status = 400, description = "Room or tenant missing"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Room already has an active contract")
    )
)]
pub async fn create_contract(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateContractRequest>,
) -> AppResult<Json<Contract>> {
    auth_user.require(Capability::ManageContracts)?;

    let room_id = payload
        .room_id
        .ok_or_else(|| AppError::BadRequest("room_id is required".to_string()))?;
    let tenant_id = payload
        .tenant_id
        .ok_or_else(|| AppError::BadRequest("tenant_id is required".to_string()))?;

    if matches!(payload.end_date, Some(end) if end < payload.start_date) {
        return Err(AppError::Validation(
            "end_date must not be before start_date".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;

    let room: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM rooms WHERE id = $1 FOR UPDATE")
        .bind(room_id)
        .fetch_optional(&mut *tx)
        .await?;
    if room.is_none() {
        return Err(AppError::BadRequest("Room not found".to_string()));
    }

    let tenant: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tenants WHERE id = $1")
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?;
    if tenant.is_none() {
        return Err(AppError::BadRequest("Tenant not found".to_string()));
    }

    let contract = sqlx::query_as::<_, Contract>(
        r#"
        INSERT INTO contracts (room_id, tenant_id, start_date, end_date, status, deposit, rent)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(room_id)
    .bind(tenant_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(ContractStatus::Active)
    .bind(payload.deposit)
    .bind(payload.rent)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match AppError::from(e) {
        err if err.is_unique_violation() => {
            AppError::Conflict("Room already has an active contract".to_string())
        }
        err => err,
    })?;

    sqlx::query("UPDATE rooms SET status = $2 WHERE id = $1")
        .bind(room_id)
        .bind(RoomStatus::Occupied)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(contract_id = %contract.id, room_id = %room_id, "Contract created");

    Ok(Json(contract))
}

/// Move a contract's end date
#[utoipa::path(
    put,
    path = "/api/v1/contracts/{id}/extend",
    tag = "contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract ID")),
    request_body = ExtendContractRequest,
    responses(
        (status = 200, description = "Contract extended", body = Contract),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Contract not found")
    )
)]
pub async fn extend_contract(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExtendContractRequest>,
) -> AppResult<Json<Contract>> {
    auth_user.require(Capability::ManageContracts)?;

    let contract = sqlx::query_as::<_, Contract>(
        "UPDATE contracts SET end_date = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(payload.end_date)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Contract not found".to_string()))?;

    Ok(Json(contract))
}

/// End a contract and free its room
#[utoipa::path(
    put,
    path = "/api/v1/contracts/{id}/end",
    tag = "contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Contract ended", body = Contract),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Contract not found"),
        (status = 409, description = "Contract has already ended")
    )
)]
pub async fn end_contract(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Contract>> {
    auth_user.require(Capability::ManageContracts)?;

    let contract = end_active_contract(&state.pool, id).await?;

    tracing::info!(contract_id = %id, room_id = %contract.room_id, "Contract ended");

    Ok(Json(contract))
}

/// Why an end request matched no ACTIVE contract.
fn not_endable(current: Option<ContractStatus>) -> AppError {
    match current {
        None => AppError::NotFound("Contract not found".to_string()),
        Some(_) => AppError::Conflict("Contract has already ended".to_string()),
    }
}

/// Ends an ACTIVE contract and frees its room in one transaction.
/// An already ENDED contract is left alone so its room keeps the status
/// set by whatever contract holds it now.
pub async fn end_active_contract(pool: &PgPool, id: Uuid) -> AppResult<Contract> {
    let mut tx = pool.begin().await?;

    let ended = sqlx::query_as::<_, Contract>(
        "UPDATE contracts SET status = $2 WHERE id = $1 AND status = $3 RETURNING *",
    )
    .bind(id)
    .bind(ContractStatus::Ended)
    .bind(ContractStatus::Active)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(contract) = ended else {
        let current: Option<(ContractStatus,)> =
            sqlx::query_as("SELECT status FROM contracts WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        return Err(not_endable(current.map(|(status,)| status)));
    };

    sqlx::query("UPDATE rooms SET status = $2 WHERE id = $1")
        .bind(contract.room_id)
        .bind(RoomStatus::Available)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(contract)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn ending_twice_conflicts_and_unknown_is_not_found() {
        assert!(matches!(
            not_endable(Some(ContractStatus::Ended)),
            AppError::Conflict(_)
        ));
        assert!(matches!(not_endable(None), AppError::NotFound(_)));
    }

    async fn room_and_tenant(pool: &PgPool) -> (Uuid, Uuid) {
        let (room_id,): (Uuid,) =
            sqlx::query_as("INSERT INTO rooms (code, status) VALUES ('A101', 'occupied') RETURNING id")
                .fetch_one(pool)
                .await
                .unwrap();
        let (tenant_id,): (Uuid,) =
            sqlx::query_as("INSERT INTO tenants (full_name) VALUES ('Nguyen Van A') RETURNING id")
                .fetch_one(pool)
                .await
                .unwrap();
        (room_id, tenant_id)
    }

    async fn contract(pool: &PgPool, room_id: Uuid, tenant_id: Uuid) -> Uuid {
        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO contracts (room_id, tenant_id, start_date) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(room_id)
        .bind(tenant_id)
        .bind(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        .fetch_one(pool)
        .await
        .unwrap();
        id
    }

    async fn room_status(pool: &PgPool, room_id: Uuid) -> RoomStatus {
        let (status,): (RoomStatus,) = sqlx::query_as("SELECT status FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_one(pool)
            .await
            .unwrap();
        status
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn re_ending_old_contract_keeps_new_tenant_room(pool: PgPool) {
        let (room_id, tenant_id) = room_and_tenant(&pool).await;
        let first = contract(&pool, room_id, tenant_id).await;

        let ended = end_active_contract(&pool, first).await.unwrap();
        assert_eq!(ended.status, ContractStatus::Ended);
        assert_eq!(room_status(&pool, room_id).await, RoomStatus::Available);

        contract(&pool, room_id, tenant_id).await;
        sqlx::query("UPDATE rooms SET status = 'occupied' WHERE id = $1")
            .bind(room_id)
            .execute(&pool)
            .await
            .unwrap();

        let err = end_active_contract(&pool, first).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(room_status(&pool, room_id).await, RoomStatus::Occupied);

        let (active,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM contracts WHERE room_id = $1 AND status = 'active'",
        )
        .bind(room_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(active, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn ending_unknown_contract_is_not_found(pool: PgPool) {
        let err = end_active_contract(&pool, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
