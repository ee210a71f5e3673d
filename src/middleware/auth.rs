use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::UserRole;
use crate::services::{AuthService, MailService, SmsService};

/// The authenticated caller, resolved once per request from the bearer token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub sms: SmsService,
    pub mail: MailService,
}

/// Operations gated by role. Each handler names the capability it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    RecordReadings,
    GenerateInvoices,
    ManageInvoices,
    SendReminders,
    RecordPayments,
    ViewPayments,
    ViewBilling,
    ViewReports,
    ManageProperty,
    ManageContracts,
    ManageUsers,
    ViewOwnAccount,
    ReadNotifications,
    BroadcastNotifications,
    ViewSystemLogs,
    HandleSupportRequests,
    OpenSupportRequests,
}

const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];
const OFFICE: &[UserRole] = &[UserRole::Admin, UserRole::Staff];
const EVERYONE: &[UserRole] = &[UserRole::Admin, UserRole::Staff, UserRole::Tenant];

impl Capability {
    pub fn roles(&self) -> &'static [UserRole] {
        match self {
            Capability::RecordReadings
            | Capability::GenerateInvoices
            | Capability::ManageInvoices
            | Capability::SendReminders
            | Capability::RecordPayments
            | Capability::ViewBilling
            | Capability::ViewReports
            | Capability::HandleSupportRequests => OFFICE,
            Capability::ManageProperty
            | Capability::ManageContracts
            | Capability::ManageUsers
            | Capability::BroadcastNotifications
            | Capability::ViewSystemLogs => ADMIN_ONLY,
            Capability::ViewPayments | Capability::ReadNotifications => EVERYONE,
            Capability::ViewOwnAccount | Capability::OpenSupportRequests => &[UserRole::Tenant],
        }
    }
}

impl AuthUser {
    pub fn can(&self, capability: Capability) -> bool {
        capability.roles().contains(&self.role)
    }

    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if !self.can(capability) {
            tracing::debug!(user_id = %self.user_id, ?capability, "capability denied");
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    /// Resolves the caller from an `Authorization: Bearer` header.
    pub fn from_headers(headers: &HeaderMap, config: &Config) -> Result<Self, &'static str> {
        let auth_header = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or("Missing authorization header")?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or("Invalid authorization header format")?;

        let claims = AuthService::new(config.clone())
            .verify_token(token)
            .map_err(|_| "Invalid or expired token")?;

        if claims.token_type != "access" {
            return Err("Invalid token type");
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token")?;
        let role = UserRole::parse(&claims.role).ok_or("Invalid role in token")?;

        Ok(AuthUser { user_id, role })
    }
}

// Puts AppState into request extensions for the extractor
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(state);
    next.run(request).await
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let app_state = parts.extensions.get::<AppState>().cloned().ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response()
        })?;

        AuthUser::from_headers(&parts.headers, &app_state.config).map_err(|reason| {
            (StatusCode::UNAUTHORIZED, Json(json!({"error": reason}))).into_response()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn office_capabilities_exclude_tenants() {
        assert!(user(UserRole::Admin).can(Capability::SendReminders));
        assert!(user(UserRole::Staff).can(Capability::RecordPayments));
        assert!(!user(UserRole::Tenant).can(Capability::GenerateInvoices));
    }

    #[test]
    fn ending_contracts_is_admin_only() {
        assert!(user(UserRole::Admin).require(Capability::ManageContracts).is_ok());
        assert!(matches!(
            user(UserRole::Staff).require(Capability::ManageContracts),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn own_account_is_tenant_only() {
        assert!(user(UserRole::Tenant).can(Capability::ViewOwnAccount));
        assert!(!user(UserRole::Admin).can(Capability::ViewOwnAccount));
        assert!(user(UserRole::Tenant).can(Capability::ReadNotifications));
    }

    #[test]
    fn support_requests_are_opened_by_tenants_and_handled_by_office() {
        assert!(user(UserRole::Tenant).can(Capability::OpenSupportRequests));
        assert!(!user(UserRole::Staff).can(Capability::OpenSupportRequests));
        assert!(user(UserRole::Staff).can(Capability::HandleSupportRequests));
        assert!(!user(UserRole::Tenant).can(Capability::HandleSupportRequests));
    }

    #[test]
    fn headers_resolve_to_actor() {
        let config = Config::for_tests();
        let account = User {
            id: Uuid::new_v4(),
            username: "staff1".to_string(),
            password_hash: String::new(),
            full_name: None,
            phone: None,
            role: UserRole::Staff,
            is_active: true,
            created_at: Utc::now(),
        };
        let token = AuthService::new(config.clone())
            .generate_access_token(&account)
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let actor = AuthUser::from_headers(&headers, &config).unwrap();
        assert_eq!(actor.user_id, account.id);
        assert_eq!(actor.role, UserRole::Staff);
    }

    #[test]
    fn missing_or_malformed_header_is_rejected() {
        let config = Config::for_tests();
        assert!(AuthUser::from_headers(&HeaderMap::new(), &config).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(AuthUser::from_headers(&headers, &config).is_err());
    }
}
