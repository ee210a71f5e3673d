use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, Capability};
use crate::models::{Tenant, TenantRequest};
use crate::utils::validators::{non_empty, normalize_phone, validate_phone};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tenants).post(create_tenant))
        .route("/me", get(my_profile))
        .route("/:id", get(get_tenant).put(update_tenant).delete(delete_tenant))
}

/// Normalized phone, or a validation error when it does not look like a phone number.
fn checked_phone(phone: Option<&str>) -> AppResult<Option<String>> {
    match non_empty(phone) {
        None => Ok(None),
        Some(p) if validate_phone(p) => Ok(Some(normalize_phone(p))),
        Some(_) => Err(AppError::Validation("Invalid phone number".to_string())),
    }
}

fn linked_user_conflict(e: sqlx::Error) -> AppError {
    match AppError::from(e) {
        err if err.is_unique_violation() => {
            AppError::Conflict("User is already linked to another tenant".to_string())
        }
        err if err.is_foreign_key_violation() => {
            AppError::BadRequest("Linked user does not exist".to_string())
        }
        err => err,
    }
}

/// List tenants
#[utoipa::path(
    get,
    path = "/api/v1/tenants",
    tag = "tenants",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tenants", body = Vec<Tenant>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_tenants(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<Tenant>>> {
    auth_user.require(Capability::ViewBilling)?;

    let tenants = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY full_name")
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(tenants))
}

/// Get one tenant
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{id}",
    tag = "tenants",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant", body = Tenant),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Tenant not found")
    )
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Tenant>> {
    auth_user.require(Capability::ViewBilling)?;

    let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    Ok(Json(tenant))
}

/// Tenant profile linked to the calling account
#[utoipa::path(
    get,
    path = "/api/v1/tenants/me",
    tag = "tenants",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own tenant profile", body = Tenant),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a tenant account"),
        (status = 404, description = "No tenant profile linked")
    )
)]
pub async fn my_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Tenant>> {
    auth_user.require(Capability::ViewOwnAccount)?;

    let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE user_id = $1")
        .bind(auth_user.user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No tenant profile linked to this account".to_string()))?;

    Ok(Json(tenant))
}

/// Create a tenant
#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    tag = "tenants",
    security(("bearer_auth" = [])),
    request_body = TenantRequest,
    responses(
        (status = 200, description = "Tenant created", body = Tenant),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "User already linked"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<TenantRequest>,
) -> AppResult<Json<Tenant>> {
    auth_user.require(Capability::ManageProperty)?;
    payload.validate()?;
    let phone = checked_phone(payload.phone.as_deref())?;

    let tenant = sqlx::query_as::<_, Tenant>(
        r#"
        INSERT INTO tenants
            (full_name, phone, email, id_number, address, portrait_image_path, id_card_image_path, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(payload.full_name.trim())
    .bind(phone)
    .bind(non_empty(payload.email.as_deref()))
    .bind(&payload.id_number)
    .bind(&payload.address)
    .bind(&payload.portrait_image_path)
    .bind(&payload.id_card_image_path)
    .bind(payload.user_id)
    .fetch_one(&state.pool)
    .await
    .map_err(linked_user_conflict)?;

    Ok(Json(tenant))
}

/// Update a tenant
#[utoipa::path(
    put,
    path = "/api/v1/tenants/{id}",
    tag = "tenants",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tenant ID")),
    request_body = TenantRequest,
    responses(
        (status = 200, description = "Tenant updated", body = Tenant),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Tenant not found"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update_tenant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TenantRequest>,
) -> AppResult<Json<Tenant>> {
    auth_user.require(Capability::ManageProperty)?;
    payload.validate()?;
    let phone = checked_phone(payload.phone.as_deref())?;

    let tenant = sqlx::query_as::<_, Tenant>(
        r#"
        UPDATE tenants
        SET full_name = $2,
            phone = $3,
            email = $4,
            id_number = $5,
            address = $6,
            portrait_image_path = COALESCE($7, portrait_image_path),
            id_card_image_path = COALESCE($8, id_card_image_path),
            user_id = COALESCE($9, user_id)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.full_name.trim())
    .bind(phone)
    .bind(non_empty(payload.email.as_deref()))
    .bind(&payload.id_number)
    .bind(&payload.address)
    .bind(&payload.portrait_image_path)
    .bind(&payload.id_card_image_path)
    .bind(payload.user_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(linked_user_conflict)?
    .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    Ok(Json(tenant))
}

/// Delete a tenant without contracts
#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{id}",
    tag = "tenants",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Tenant not found"),
        (status = 409, description = "Tenant still has contracts")
    )
)]
pub async fn delete_tenant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    auth_user.require(Capability::ManageProperty)?;

    let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            err if err.is_foreign_key_violation() => {
                AppError::Conflict("Tenant still has contracts".to_string())
            }
            err => err,
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Tenant not found".to_string()));
    }

    Ok(Json(json!({"success": true})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_is_normalized_or_rejected() {
        assert_eq!(
            checked_phone(Some("090 123 4567")).unwrap(),
            Some("0901234567".to_string())
        );
        assert_eq!(checked_phone(Some("  ")).unwrap(), None);
        assert_eq!(checked_phone(None).unwrap(), None);
        assert!(checked_phone(Some("call me")).is_err());
    }
}
