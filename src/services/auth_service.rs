use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{User, UserRole};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: String,
}

/// Fields for a new account; the password is hashed on insert.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub full_name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub role: UserRole,
}

pub struct AuthService {
    config: Config,
}

impl AuthService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn generate_access_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.jwt_access_expiry);

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.as_str().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: "access".to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(AppError::from)
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    pub fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
    }

    pub fn verify_password(password: &str, password_hash: &str) -> bool {
        match PasswordHash::new(password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Stored password hash is malformed: {}", e);
                false
            }
        }
    }

    pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Inserts an active account. A taken username is a 409.
    pub async fn insert_user(conn: &mut PgConnection, new_user: NewUser<'_>) -> AppResult<User> {
        let password_hash = Self::hash_password(new_user.password)?;

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, full_name, phone, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new_user.username.trim())
        .bind(&password_hash)
        .bind(new_user.full_name)
        .bind(new_user.phone)
        .bind(new_user.role)
        .fetch_one(conn)
        .await
        .map_err(|e| match AppError::from(e) {
            err if err.is_unique_violation() => {
                AppError::Conflict("Username already exists".to_string())
            }
            err => err,
        })
    }

    pub async fn get_user_by_username(pool: &PgPool, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            password_hash: String::new(),
            full_name: Some("Owner".to_string()),
            phone: None,
            role,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn access_token_round_trip() {
        let service = AuthService::new(Config::for_tests());
        let user = account(UserRole::Admin);

        let token = service.generate_access_token(&user).unwrap();
        let claims = service.verify_token(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let mut other = Config::for_tests();
        other.jwt_secret = "another-secret".to_string();
        let token = AuthService::new(other)
            .generate_access_token(&account(UserRole::Staff))
            .unwrap();

        assert!(AuthService::new(Config::for_tests()).verify_token(&token).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = AuthService::hash_password("s3cret").unwrap();
        assert!(AuthService::verify_password("s3cret", &hash));
        assert!(!AuthService::verify_password("wrong", &hash));
        assert!(!AuthService::verify_password("s3cret", "not-a-phc-string"));
    }
}
