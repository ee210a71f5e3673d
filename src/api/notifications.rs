use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, Capability};
use crate::models::{
    CreateNotificationRequest, Notification, NotificationResponse, NotificationsQuery,
};
use crate::services::NotificationService;
use crate::utils::page_window;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications).post(create_notification))
        .route("/:id/read", put(mark_as_read))
}

/// Notifications of the calling user, newest first
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(NotificationsQuery),
    responses(
        (status = 200, description = "Notifications", body = Vec<NotificationResponse>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<NotificationsQuery>,
) -> AppResult<Json<Vec<NotificationResponse>>> {
    auth_user.require(Capability::ReadNotifications)?;

    let (limit, offset) = page_window(query.page, query.limit, 50, 100);

    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1
          AND ($2::boolean IS NOT TRUE OR read_flag = false)
        ORDER BY sent_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(auth_user.user_id)
    .bind(query.unread_only)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let response: Vec<NotificationResponse> = notifications
        .into_iter()
        .map(NotificationResponse::from)
        .collect();

    Ok(Json(response))
}

/// Mark one of the caller's notifications as read
#[utoipa::path(
    put,
    path = "/api/v1/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_as_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    auth_user.require(Capability::ReadNotifications)?;

    let result = sqlx::query(
        "UPDATE notifications SET read_flag = true WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(auth_user.user_id)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    Ok(Json(json!({"success": true})))
}

/// Send a notification to one user, or to everyone when `user_id` is omitted
#[utoipa::path(
    post,
    path = "/api/v1/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    request_body = CreateNotificationRequest,
    responses(
        (status = 200, description = "Notifications created"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Message is empty")
    )
)]
pub async fn create_notification(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateNotificationRequest>,
) -> AppResult<Json<Value>> {
    auth_user.require(Capability::BroadcastNotifications)?;

    let created = NotificationService::create(&state.pool, &payload.message, payload.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "count": created.len()
    })))
}
