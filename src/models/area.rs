use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A building or block that groups rooms.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Area {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AreaRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 200))]
    pub address: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_is_rejected() {
        let request = AreaRequest {
            name: String::new(),
            address: None,
            description: None,
        };
        assert!(request.validate().is_err());
    }
}
