use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "room_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
}

impl Default for RoomStatus {
    fn default() -> Self {
        Self::Available
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Room {
    pub id: Uuid,
    pub code: String,
    pub floor: Option<String>,
    pub status: RoomStatus,
    pub current_price: Option<Decimal>,
    pub area_size: Option<Decimal>,
    pub area_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Monthly rent billed for the room; unset price bills as zero.
    pub fn rent(&self) -> Decimal {
        self.current_price.unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RoomRequest {
    #[validate(length(min = 1, max = 30))]
    pub code: String,
    #[validate(length(max = 30))]
    pub floor: Option<String>,
    pub status: Option<RoomStatus>,
    pub current_price: Option<Decimal>,
    pub area_size: Option<Decimal>,
    pub area_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn room(price: Option<Decimal>) -> Room {
        Room {
            id: Uuid::new_v4(),
            code: "A101".to_string(),
            floor: Some("1".to_string()),
            status: RoomStatus::Available,
            current_price: price,
            area_size: None,
            area_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn rent_defaults_to_zero() {
        assert_eq!(room(None).rent(), Decimal::ZERO);
        assert_eq!(room(Some(dec!(1200000))).rent(), dec!(1200000));
    }

    #[test]
    fn status_serializes_upper_case() {
        let json = serde_json::to_string(&RoomStatus::Maintenance).unwrap();
        assert_eq!(json, "\"MAINTENANCE\"");
    }
}
