use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Tenant {
    pub id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub id_number: Option<String>,
    pub address: Option<String>,
    pub portrait_image_path: Option<String>,
    pub id_card_image_path: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TenantRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(email, length(max = 100))]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub id_number: Option<String>,
    #[validate(length(max = 200))]
    pub address: Option<String>,
    #[validate(length(max = 255))]
    pub portrait_image_path: Option<String>,
    #[validate(length(max = 255))]
    pub id_card_image_path: Option<String>,
    pub user_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: Option<&str>) -> TenantRequest {
        TenantRequest {
            full_name: "Nguyen Van A".to_string(),
            phone: Some("0901234567".to_string()),
            email: email.map(str::to_string),
            id_number: None,
            address: None,
            portrait_image_path: None,
            id_card_image_path: None,
            user_id: None,
        }
    }

    #[test]
    fn email_is_validated_when_present() {
        assert!(request(Some("tenant@example.com")).validate().is_ok());
        assert!(request(None).validate().is_ok());
        assert!(request(Some("not-an-email")).validate().is_err());
    }

    #[test]
    fn full_name_is_required() {
        let mut req = request(None);
        req.full_name = String::new();
        assert!(req.validate().is_err());
    }
}
