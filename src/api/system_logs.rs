use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::error::AppResult;
use crate::middleware::{AppState, AuthUser, Capability};
use crate::models::{SystemLog, SystemLogsQuery};
use crate::services::LogService;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_logs))
}

/// Audit trail, newest first
#[utoipa::path(
    get,
    path = "/api/v1/system-logs",
    tag = "system-logs",
    security(("bearer_auth" = [])),
    params(SystemLogsQuery),
    responses(
        (status = 200, description = "System log entries", body = Vec<SystemLog>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_logs(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<SystemLogsQuery>,
) -> AppResult<Json<Vec<SystemLog>>> {
    auth_user.require(Capability::ViewSystemLogs)?;

    let logs = LogService::list(&state.pool, &query).await?;
    Ok(Json(logs))
}
