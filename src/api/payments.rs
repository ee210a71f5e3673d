use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, Capability};
use crate::models::{CreatePaymentRequest, Payment, PaymentResponse, UserRole};
use crate::services::PaymentService;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment))
        .route("/invoice/:invoice_id", get(list_invoice_payments))
}

/// Record a payment against an invoice and reconcile its status
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = PaymentResponse),
        (status = 400, description = "Missing or unknown invoice"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Amount must be positive")
    )
)]
pub async fn create_payment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<Json<PaymentResponse>> {
    auth_user.require(Capability::RecordPayments)?;

    let response = PaymentService::record_payment(&state.pool, &payload).await?;
    Ok(Json(response))
}

/// Payments made against an invoice
#[utoipa::path(
    get,
    path = "/api/v1/payments/invoice/{invoice_id}",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Payments", body = Vec<Payment>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Invoice belongs to another tenant"),
        (status = 404, description = "Invoice not found")
    )
)]
pub async fn list_invoice_payments(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<Vec<Payment>>> {
    auth_user.require(Capability::ViewPayments)?;

    let owner: Option<(Option<Uuid>,)> = sqlx::query_as(
        r#"
        SELECT t.user_id
        FROM invoices i
        LEFT JOIN tenants t ON t.id = i.tenant_id
        WHERE i.id = $1
        "#,
    )
    .bind(invoice_id)
    .fetch_optional(&state.pool)
    .await?;

    let (owner_user_id,) = owner.ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))?;

    if auth_user.role == UserRole::Tenant && owner_user_id != Some(auth_user.user_id) {
        return Err(AppError::Forbidden);
    }

    let payments = PaymentService::list_for_invoice(&state.pool, invoice_id).await?;
    Ok(Json(payments))
}
