use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UserPublic, UserRole};
use crate::services::{AuthService, LogService, NewUser};
use crate::utils::validators::non_empty;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/me", get(me))
}

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Wrong username or password"),
        (status = 403, description = "Account locked"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.validate()?;

    let user = AuthService::get_user_by_username(&state.pool, payload.username.trim())
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !AuthService::verify_password(&payload.password, &user.password_hash) {
        tracing::debug!(username = %user.username, "Login rejected: wrong password");
        return Err(AppError::Unauthorized);
    }

    if !user.is_active {
        return Err(AppError::Forbidden);
    }

    let access_token = AuthService::new(state.config.clone()).generate_access_token(&user)?;

    let entity_id = user.id.to_string();
    if let Err(e) = LogService::record(
        &state.pool,
        Some(user.id),
        "LOGIN",
        "User",
        Some(entity_id.as_str()),
        None,
    )
    .await
    {
        tracing::warn!("Failed to log login for {}: {}", user.username, e);
    }

    Ok(Json(AuthResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.jwt_access_expiry,
        user: UserPublic::from(user),
    }))
}

/// Sign up for a tenant account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = UserPublic),
        (status = 409, description = "Username already exists"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<UserPublic>> {
    payload.validate()?;

    let mut conn = state.pool.acquire().await?;
    let user = AuthService::insert_user(
        &mut *conn,
        NewUser {
            username: &payload.username,
            password: &payload.password,
            full_name: Some(payload.full_name.trim()),
            phone: non_empty(payload.phone.as_deref()),
            role: UserRole::Tenant,
        },
    )
    .await?;

    tracing::info!(username = %user.username, "Tenant account registered");

    Ok(Json(UserPublic::from(user)))
}

/// Profile of the calling account
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserPublic),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<UserPublic>> {
    let user = AuthService::get_user_by_id(&state.pool, auth_user.user_id).await?;
    Ok(Json(UserPublic::from(user)))
}
