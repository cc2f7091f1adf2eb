use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Whether a donation can still be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum Availability {
    Available,
    Reserved,
    Unavailable,
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::Available => write!(f, "Available"),
            Availability::Reserved => write!(f, "Reserved"),
            Availability::Unavailable => write!(f, "Unavailable"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: i64,
    pub donator_id: i64,
    pub category: String,
    pub location: String,
    pub remarks: Option<String>,
    pub delivery_date: String,
    pub availability: Availability,
    pub created_at: String,
    pub updated_at: String,
}

/// A quantity (grams) of one item inside a donation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    pub id: i64,
    pub donation_id: i64,
    pub name: String,
    pub quantity: i64,
    #[serde(rename = "type")]
    pub food_type: String,
    pub expiry_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationDetails {
    #[serde(flatten)]
    pub donation: Donation,
    pub donator_name: String,
    pub foods: Vec<Food>,
}
