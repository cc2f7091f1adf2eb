use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{DonationDetails, Food, PersonSummary};

/// Reservation lifecycle. `Collected` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum CollectionStatus {
    Uncollected,
    Collected,
    Cancelled,
}

impl CollectionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CollectionStatus::Uncollected)
    }

    /// A reservation in this state keeps its donation `Reserved`.
    pub fn holds_donation(self) -> bool {
        !matches!(self, CollectionStatus::Cancelled)
    }
}

impl std::fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionStatus::Uncollected => write!(f, "Uncollected"),
            CollectionStatus::Collected => write!(f, "Collected"),
            CollectionStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub donation_id: i64,
    pub collection_date: String,
    pub collection_time_start: String,
    pub collection_time_end: String,
    pub collection_status: CollectionStatus,
    pub remarks: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReservationItem {
    pub id: i64,
    pub reservation_id: i64,
    pub food_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationItemDetails {
    #[serde(flatten)]
    pub item: ReservationItem,
    pub food: Food,
}

/// A reservation with its items, donation and reserving user loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub items: Vec<ReservationItemDetails>,
    pub donation: DonationDetails,
    pub user: PersonSummary,
}
