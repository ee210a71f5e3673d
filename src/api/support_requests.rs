use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, Capability};
use crate::models::{
    CreateSupportRequest, SupportRequest, SupportRequestDetail, SupportRequestsQuery,
    SupportStatus, UpdateSupportRequest, User,
};
use crate::utils::validators::non_empty;

const SUPPORT_DETAIL_SELECT: &str = r#"
    SELECT
        s.id, s.tenant_id, t.full_name AS tenant_name, cr.code AS room_code,
        s.title, s.description, s.status, s.created_at, s.updated_at
    FROM support_requests s
    JOIN tenants t ON t.id = s.tenant_id
    LEFT JOIN LATERAL (
        SELECT r.code FROM contracts c
        JOIN rooms r ON r.id = c.room_id
        WHERE c.tenant_id = s.tenant_id AND c.status = 'active'
        ORDER BY c.created_at DESC
        LIMIT 1
    ) cr ON true
"#;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_support_requests).post(create_support_request))
        .route("/me", get(my_support_requests))
        .route("/:id", put(update_support_request))
}

/// Name for a profile created on the fly; falls back to the username.
fn profile_name(user: &User) -> &str {
    non_empty(user.full_name.as_deref()).unwrap_or(user.username.as_str())
}

/// The caller's tenant profile, created from the account when none is linked yet.
async fn tenant_for_account(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tenants WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some((tenant_id,)) = existing {
        return Ok(tenant_id);
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let (tenant_id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO tenants (full_name, phone, user_id) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(profile_name(&user))
    .bind(non_empty(user.phone.as_deref()))
    .bind(user.id)
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!(user_id = %user.id, tenant_id = %tenant_id, "Tenant profile created for account");
    Ok(tenant_id)
}

/// List support requests, newest first
#[utoipa::path(
    get,
    path = "/api/v1/support-requests",
    tag = "support-requests",
    security(("bearer_auth" = [])),
    params(SupportRequestsQuery),
    responses(
        (status = 200, description = "Support requests", body = Vec<SupportRequestDetail>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_support_requests(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<SupportRequestsQuery>,
) -> AppResult<Json<Vec<SupportRequestDetail>>> {
    auth_user.require(Capability::HandleSupportRequests)?;

    let requests = sqlx::query_as::<_, SupportRequestDetail>(&format!(
        "{} WHERE ($1::support_status IS NULL OR s.status = $1) ORDER BY s.created_at DESC",
        SUPPORT_DETAIL_SELECT
    ))
    .bind(query.status)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(requests))
}

/// Support requests opened by the calling tenant
#[utoipa::path(
    get,
    path = "/api/v1/support-requests/me",
    tag = "support-requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own support requests", body = Vec<SupportRequestDetail>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn my_support_requests(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<SupportRequestDetail>>> {
    auth_user.require(Capability::OpenSupportRequests)?;

    let requests = sqlx::query_as::<_, SupportRequestDetail>(&format!(
        "{} WHERE t.user_id = $1 ORDER BY s.created_at DESC",
        SUPPORT_DETAIL_SELECT
    ))
    .bind(auth_user.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(requests))
}

/// Open a support request
#[utoipa::path(
    post,
    path = "/api/v1/support-requests",
    tag = "support-requests",
    security(("bearer_auth" = [])),
    request_body = CreateSupportRequest,
    responses(
        (status = 200, description = "Support request opened", body = SupportRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_support_request(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateSupportRequest>,
) -> AppResult<Json<SupportRequest>> {
    auth_user.require(Capability::OpenSupportRequests)?;
    payload.validate()?;

    let mut tx = state.pool.begin().await?;
    let request = open_request(&mut *tx, auth_user.user_id, &payload).await?;
    tx.commit().await?;

    tracing::info!(request_id = %request.id, tenant_id = %request.tenant_id, "Support request opened");

    Ok(Json(request))
}

async fn open_request(
    conn: &mut PgConnection,
    user_id: Uuid,
    payload: &CreateSupportRequest,
) -> AppResult<SupportRequest> {
    let tenant_id = tenant_for_account(conn, user_id).await?;

    let request = sqlx::query_as::<_, SupportRequest>(
        r#"
        INSERT INTO support_requests (tenant_id, title, description, status)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(payload.title.trim())
    .bind(non_empty(payload.description.as_deref()))
    .bind(SupportStatus::Open)
    .fetch_one(&mut *conn)
    .await?;

    Ok(request)
}

/// Update the status, title and description of a support request
#[utoipa::path(
    put,
    path = "/api/v1/support-requests/{id}",
    tag = "support-requests",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Support request ID")),
    request_body = UpdateSupportRequest,
    responses(
        (status = 200, description = "Support request updated", body = SupportRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Support request not found"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update_support_request(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSupportRequest>,
) -> AppResult<Json<SupportRequest>> {
    auth_user.require(Capability::HandleSupportRequests)?;
    payload.validate()?;

    let request = sqlx::query_as::<_, SupportRequest>(
        r#"
        UPDATE support_requests
        SET status = $2,
            title = $3,
            description = $4,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.status)
    .bind(payload.title.trim())
    .bind(non_empty(payload.description.as_deref()))
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Support request not found".to_string()))?;

    Ok(Json(request))
}
