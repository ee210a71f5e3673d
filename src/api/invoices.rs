use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, Capability};
use crate::models::{
    GenerateInvoicesResponse, Invoice, InvoiceDetail, InvoicesQuery, RemindRequest,
    UpdateInvoiceStatusRequest, INVOICE_DETAIL_SELECT,
};
use crate::services::reminder_service::{Channel, ReminderReceipt};
use crate::services::{BillingService, ReminderService};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices))
        .route("/me", get(my_invoices))
        .route("/generate", post(generate_invoices))
        .route("/:id/status", put(update_status))
        .route("/:id/remind", post(send_reminder))
}

/// Generate baseline invoices for the previous and the current month
#[utoipa::path(
    post,
    path = "/api/v1/invoices/generate",
    tag = "invoices",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Invoices created per period", body = GenerateInvoicesResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn generate_invoices(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<GenerateInvoicesResponse>> {
    auth_user.require(Capability::GenerateInvoices)?;

    let result = BillingService::generate_recent(&state.pool, Utc::now().date_naive()).await?;
    Ok(Json(result))
}

/// List invoices with room code and tenant name
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    tag = "invoices",
    security(("bearer_auth" = [])),
    params(InvoicesQuery),
    responses(
        (status = 200, description = "Invoices", body = Vec<InvoiceDetail>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<InvoicesQuery>,
) -> AppResult<Json<Vec<InvoiceDetail>>> {
    auth_user.require(Capability::ViewBilling)?;

    let sql = format!(
        r#"{}
        WHERE ($1::invoice_status IS NULL OR i.status = $1)
          AND ($2::int IS NULL OR i.month = $2)
          AND ($3::int IS NULL OR i.year = $3)
          AND ($4::uuid IS NULL OR i.room_id = $4)
        ORDER BY i.year DESC, i.month DESC, r.code
        "#,
        INVOICE_DETAIL_SELECT
    );

    let invoices = sqlx::query_as::<_, InvoiceDetail>(&sql)
        .bind(query.status)
        .bind(query.month)
        .bind(query.year)
        .bind(query.room_id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(invoices))
}

/// Invoices of the calling tenant
#[utoipa::path(
    get,
    path = "/api/v1/invoices/me",
    tag = "invoices",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own invoices", body = Vec<InvoiceDetail>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a tenant account")
    )
)]
pub async fn my_invoices(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<InvoiceDetail>>> {
    auth_user.require(Capability::ViewOwnAccount)?;

    let sql = format!(
        "{} WHERE t.user_id = $1 ORDER BY i.year DESC, i.month DESC",
        INVOICE_DETAIL_SELECT
    );

    let invoices = sqlx::query_as::<_, InvoiceDetail>(&sql)
        .bind(auth_user.user_id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(invoices))
}

/// Manually override an invoice status
#[utoipa::path(
    put,
    path = "/api/v1/invoices/{id}/status",
    tag = "invoices",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Invoice ID")),
    request_body = UpdateInvoiceStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Invoice),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Invoice not found")
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceStatusRequest>,
) -> AppResult<Json<Invoice>> {
    auth_user.require(Capability::ManageInvoices)?;

    let invoice = sqlx::query_as::<_, Invoice>(
        "UPDATE invoices SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(payload.status)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))?;

    tracing::info!(invoice_id = %id, status = ?invoice.status, "Invoice status overridden");

    Ok(Json(invoice))
}

fn receipt_message(receipt: &ReminderReceipt) -> String {
    let via = match receipt.channel {
        Channel::Email => "email",
        Channel::Sms => "SMS",
    };
    if receipt.delivered {
        format!("Reminder sent via {} to {}", via, receipt.recipient)
    } else {
        format!("Reminder recorded; {} is not configured so nothing was sent", via)
    }
}

/// Send a payment reminder for an invoice by email or SMS
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/remind",
    tag = "invoices",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Invoice ID")),
    request_body = RemindRequest,
    responses(
        (status = 200, description = "Reminder sent"),
        (status = 400, description = "Reminder rejected, body carries the reason"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn send_reminder(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RemindRequest>,
) -> AppResult<Response> {
    auth_user.require(Capability::SendReminders)?;

    let service = ReminderService::new(&state.pool, &state.mail, &state.sms);
    let response = match service.send_reminder(id, &payload.channel).await {
        Ok(receipt) => Json(json!({
            "success": true,
            "message": receipt_message(&receipt)
        }))
        .into_response(),
        Err(rejection) => {
            tracing::info!(invoice_id = %id, reason = %rejection, "Reminder rejected");
            rejection.into_response()
        }
    };

    Ok(response)
}
