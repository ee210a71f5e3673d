use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, Capability};
use crate::models::{
    CreateUserRequest, LinkTenantRequest, UpdateUserRequest, User, UserPublic, UserRole,
};
use crate::services::{AuthService, NewUser};
use crate::utils::validators::non_empty;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", put(update_user))
        .route("/:id/tenant", put(link_tenant))
        .route("/:id/lock", put(lock_user))
        .route("/:id/unlock", put(unlock_user))
}

/// List accounts
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Accounts", body = Vec<UserPublic>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<UserPublic>>> {
    auth_user.require(Capability::ManageUsers)?;

    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(users.into_iter().map(UserPublic::from).collect()))
}

/// Create an account, optionally linked to a tenant profile
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Account created", body = UserPublic),
        (status = 400, description = "Tenant profile not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Username taken or tenant already linked"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<Json<UserPublic>> {
    auth_user.require(Capability::ManageUsers)?;
    payload.validate()?;

    let role = payload.role.unwrap_or(UserRole::Tenant);

    let mut tx = state.pool.begin().await?;

    let user = AuthService::insert_user(
        &mut *tx,
        NewUser {
            username: &payload.username,
            password: &payload.password,
            full_name: non_empty(payload.full_name.as_deref()),
            phone: non_empty(payload.phone.as_deref()),
            role,
        },
    )
    .await?;

    if let Some(tenant_id) = payload.tenant_id {
        attach_tenant(&mut *tx, tenant_id, user.id).await?;
    }

    tx.commit().await?;

    tracing::info!(username = %user.username, role = user.role.as_str(), "User created");

    Ok(Json(UserPublic::from(user)))
}

fn link_failure(tenant_exists: bool) -> AppError {
    if tenant_exists {
        AppError::Conflict("Tenant already has an account".to_string())
    } else {
        AppError::BadRequest("Tenant not found".to_string())
    }
}

/// Links a tenant profile that has no account yet to `user_id`.
async fn attach_tenant(conn: &mut PgConnection, tenant_id: Uuid, user_id: Uuid) -> AppResult<()> {
    let linked = sqlx::query("UPDATE tenants SET user_id = $2 WHERE id = $1 AND user_id IS NULL")
        .bind(tenant_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    if linked.rows_affected() == 0 {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(&mut *conn)
            .await?;
        return Err(link_failure(exists.is_some()));
    }
    Ok(())
}

/// An admin may not lock themselves out through an edit.
fn edits_own_access(actor: &AuthUser, id: Uuid, payload: &UpdateUserRequest) -> bool {
    actor.user_id == id && (!payload.is_active || payload.role != UserRole::Admin)
}

/// Update an account's profile, role, status and optionally its password
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = UserPublic),
        (status = 400, description = "Cannot demote or lock own account"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserPublic>> {
    auth_user.require(Capability::ManageUsers)?;
    payload.validate()?;

    if edits_own_access(&auth_user, id, &payload) {
        return Err(AppError::BadRequest(
            "You cannot demote or lock your own account".to_string(),
        ));
    }

    let password_hash = match non_empty(payload.password.as_deref()) {
        Some(password) if password.len() < 6 => {
            return Err(AppError::Validation(
                "password must be at least 6 characters".to_string(),
            ))
        }
        Some(password) => Some(AuthService::hash_password(password)?),
        None => None,
    };

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET full_name = $2,
            phone = $3,
            role = $4,
            is_active = $5,
            password_hash = COALESCE($6, password_hash)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(non_empty(payload.full_name.as_deref()))
    .bind(non_empty(payload.phone.as_deref()))
    .bind(payload.role)
    .bind(payload.is_active)
    .bind(password_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserPublic::from(user)))
}

/// Link an account to a tenant profile, or unlink it with `tenant_id: null`
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/tenant",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = LinkTenantRequest,
    responses(
        (status = 200, description = "Link updated"),
        (status = 400, description = "Tenant profile not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Tenant already linked to another account")
    )
)]
pub async fn link_tenant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<LinkTenantRequest>,
) -> AppResult<Json<Value>> {
    auth_user.require(Capability::ManageUsers)?;

    let mut tx = state.pool.begin().await?;
    relink_tenant(&mut *tx, id, payload.tenant_id).await?;
    tx.commit().await?;

    tracing::info!(user_id = %id, tenant_id = ?payload.tenant_id, "Account tenant link updated");

    Ok(Json(json!({"success": true, "tenant_id": payload.tenant_id})))
}

/// Drops whatever profile the account had and attaches `tenant_id` if given.
async fn relink_tenant(
    conn: &mut PgConnection,
    user_id: Uuid,
    tenant_id: Option<Uuid>,
) -> AppResult<()> {
    let user: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    if user.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    sqlx::query("UPDATE tenants SET user_id = NULL WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    if let Some(tenant_id) = tenant_id {
        attach_tenant(conn, tenant_id, user_id).await?;
    }
    Ok(())
}

async fn set_active(state: &AppState, id: Uuid, active: bool) -> AppResult<User> {
    sqlx::query_as::<_, User>("UPDATE users SET is_active = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(active)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Lock an account; it can no longer log in
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/lock",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account locked", body = UserPublic),
        (status = 400, description = "Cannot lock own account"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    )
)]
pub async fn lock_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserPublic>> {
    auth_user.require(Capability::ManageUsers)?;

    if id == auth_user.user_id {
        return Err(AppError::BadRequest("You cannot lock your own account".to_string()));
    }

    let user = set_active(&state, id, false).await?;
    Ok(Json(UserPublic::from(user)))
}

/// Unlock an account
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/unlock",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account unlocked", body = UserPublic),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    )
)]
pub async fn unlock_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserPublic>> {
    auth_user.require(Capability::ManageUsers)?;

    let user = set_active(&state, id, true).await?;
    Ok(Json(UserPublic::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    fn edit(role: UserRole, is_active: bool) -> UpdateUserRequest {
        UpdateUserRequest {
            full_name: None,
            phone: None,
            role,
            is_active,
            password: None,
        }
    }

    #[test]
    fn admin_cannot_demote_or_lock_self() {
        let me = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Admin,
        };

        assert!(edits_own_access(&me, me.user_id, &edit(UserRole::Staff, true)));
        assert!(edits_own_access(&me, me.user_id, &edit(UserRole::Admin, false)));
        assert!(!edits_own_access(&me, me.user_id, &edit(UserRole::Admin, true)));
        assert!(!edits_own_access(&me, Uuid::new_v4(), &edit(UserRole::Tenant, false)));
    }

    #[test]
    fn link_failure_tells_taken_from_missing() {
        assert!(matches!(link_failure(true), AppError::Conflict(_)));
        assert!(matches!(link_failure(false), AppError::BadRequest(_)));
    }

    async fn tenant_account(pool: &PgPool, username: &str) -> Uuid {
        let mut conn = pool.acquire().await.unwrap();
        AuthService::insert_user(
            &mut *conn,
            NewUser {
                username,
                password: "secret123",
                full_name: None,
                phone: None,
                role: UserRole::Tenant,
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn tenant_profile(pool: &PgPool, name: &str) -> Uuid {
        let (id,): (Uuid,) = sqlx::query_as("INSERT INTO tenants (full_name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap();
        id
    }

    async fn linked_profile(pool: &PgPool, user_id: Uuid) -> Option<Uuid> {
        sqlx::query_as::<_, (Uuid,)>("SELECT id FROM tenants WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .unwrap()
            .map(|(id,)| id)
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn relinking_moves_the_account_to_the_new_profile(pool: PgPool) {
        let user_id = tenant_account(&pool, "tenant01").await;
        let first = tenant_profile(&pool, "Nguyen Van A").await;
        let second = tenant_profile(&pool, "Nguyen Van B").await;

        let mut conn = pool.acquire().await.unwrap();
        relink_tenant(&mut *conn, user_id, Some(first)).await.unwrap();
        assert_eq!(linked_profile(&pool, user_id).await, Some(first));

        relink_tenant(&mut *conn, user_id, Some(second)).await.unwrap();
        assert_eq!(linked_profile(&pool, user_id).await, Some(second));

        relink_tenant(&mut *conn, user_id, None).await.unwrap();
        assert_eq!(linked_profile(&pool, user_id).await, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn profile_owned_by_another_account_conflicts(pool: PgPool) {
        let owner = tenant_account(&pool, "tenant01").await;
        let other = tenant_account(&pool, "tenant02").await;
        let profile = tenant_profile(&pool, "Nguyen Van A").await;

        let mut conn = pool.acquire().await.unwrap();
        relink_tenant(&mut *conn, owner, Some(profile)).await.unwrap();

        let err = relink_tenant(&mut *conn, other, Some(profile)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = relink_tenant(&mut *conn, Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
