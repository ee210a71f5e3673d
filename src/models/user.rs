use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Staff,
    Tenant,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Tenant
    }
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Staff => "staff",
            UserRole::Tenant => "tenant",
        }
    }

    pub fn parse(role: &str) -> Option<Self> {
        match role.to_ascii_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "staff" => Some(UserRole::Staff),
            "tenant" => Some(UserRole::Tenant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            phone: user.phone,
            role: user.role,
            is_active: user.is_active,
        }
    }
}

// DTOs
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    /// Tenant profile to link when the account is a tenant account.
    pub tenant_id: Option<Uuid>,
}

/// Self-service sign-up. Always creates a TENANT account.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    /// New password; blank or absent keeps the current one.
    #[validate(length(max = 128))]
    pub password: Option<String>,
}

/// `tenant_id: null` unlinks the account from any tenant profile.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkTenantRequest {
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserPublic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_requires_name_and_long_password() {
        let request = RegisterRequest {
            username: "tenant01".to_string(),
            password: "123".to_string(),
            full_name: "Pham Thi D".to_string(),
            phone: None,
        };
        assert!(request.validate().is_err());

        let request = RegisterRequest {
            password: "secret123".to_string(),
            ..request
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(UserRole::parse("ADMIN"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse("staff"), Some(UserRole::Staff));
        assert_eq!(UserRole::parse("Tenant"), Some(UserRole::Tenant));
        assert_eq!(UserRole::parse("superadmin"), None);
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [UserRole::Admin, UserRole::Staff, UserRole::Tenant] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
    }
}
