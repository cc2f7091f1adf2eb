use std::time::Duration;

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use super::{availability, begin_write, bounded, cascade};
use crate::error::AppError;
use crate::models::{Availability, Donation, DonationDetails, Food};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct NewDonation {
    pub category: String,
    pub location: String,
    pub remarks: Option<String>,
    pub delivery_date: NaiveDate,
    pub foods: Vec<NewFood>,
}

#[derive(Debug, Clone)]
pub struct NewFood {
    pub name: String,
    pub quantity: i64,
    pub food_type: String,
    pub expiry_date: NaiveDate,
}

/// Donation intake, lookups, availability overrides and deletion.
#[derive(Clone)]
pub struct DonationManager {
    pool: SqlitePool,
    timeout: Duration,
}

impl DonationManager {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub async fn create(&self, donator_id: i64, donation: NewDonation) -> Result<DonationDetails, AppError> {
        if donation.foods.is_empty() {
            return Err(AppError::invalid("foods", "At least one food item is required"));
        }

        bounded(self.timeout, async move {
            let mut tx = begin_write(&self.pool).await?;
            let now = Utc::now().to_rfc3339();

            let donation_id = sqlx::query(
                r#"
                INSERT INTO donations (donator_id, category, location, remarks, delivery_date, availability, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(donator_id)
            .bind(&donation.category)
            .bind(&donation.location)
            .bind(&donation.remarks)
            .bind(donation.delivery_date.format(DATE_FORMAT).to_string())
            .bind(Availability::Available)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            for food in &donation.foods {
                sqlx::query(
                    "INSERT INTO foods (donation_id, name, quantity, food_type, expiry_date) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(donation_id)
                .bind(&food.name)
                .bind(food.quantity)
                .bind(&food.food_type)
                .bind(food.expiry_date.format(DATE_FORMAT).to_string())
                .execute(&mut *tx)
                .await?;
            }

            let details = fetch_details(&mut tx, donation_id).await?;
            tx.commit().await?;

            tracing::info!(donation_id, donator_id, foods = details.foods.len(), "donation created");
            Ok(details)
        })
        .await
    }

    pub async fn list(&self, availability: Option<Availability>) -> Result<Vec<DonationDetails>, AppError> {
        bounded(self.timeout, async move {
            let mut conn = self.pool.acquire().await?;
            let donations: Vec<Donation> = sqlx::query_as(
                r#"
                SELECT * FROM donations
                WHERE ? IS NULL OR availability = ?
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .bind(availability)
            .bind(availability)
            .fetch_all(&mut *conn)
            .await?;

            let mut details = Vec::with_capacity(donations.len());
            for donation in donations {
                details.push(load_details(&mut conn, donation).await?);
            }
            Ok(details)
        })
        .await
    }

    pub async fn get(&self, donation_id: i64) -> Result<DonationDetails, AppError> {
        bounded(self.timeout, async move {
            let mut conn = self.pool.acquire().await?;
            fetch_details(&mut conn, donation_id).await
        })
        .await
    }

    pub async fn set_availability(&self, donation_id: i64, value: Availability) -> Result<Donation, AppError> {
        bounded(self.timeout, async move {
            let mut tx = begin_write(&self.pool).await?;
            let donation = availability::set_availability(&mut tx, donation_id, value).await?;
            tx.commit().await?;
            Ok(donation)
        })
        .await
    }

    /// Deletes the donation and everything hanging off it.
    pub async fn delete(&self, donation_id: i64) -> Result<Donation, AppError> {
        bounded(self.timeout, async move {
            let mut tx = begin_write(&self.pool).await?;
            let donation = cascade::delete_donation(&mut tx, donation_id).await?;
            tx.commit().await?;
            Ok(donation)
        })
        .await
    }
}

pub(crate) async fn fetch_details(conn: &mut SqliteConnection, donation_id: i64) -> Result<DonationDetails, AppError> {
    let donation: Donation = sqlx::query_as("SELECT * FROM donations WHERE id = ?")
        .bind(donation_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(AppError::or_not_found("donation"))?;
    load_details(conn, donation).await
}

pub(crate) async fn load_details(conn: &mut SqliteConnection, donation: Donation) -> Result<DonationDetails, AppError> {
    let (donator_name,): (String,) = sqlx::query_as(
        "SELECT p.name FROM donators d JOIN persons p ON p.id = d.person_id WHERE d.id = ?",
    )
    .bind(donation.donator_id)
    .fetch_one(&mut *conn)
    .await?;

    let foods: Vec<Food> = sqlx::query_as("SELECT * FROM foods WHERE donation_id = ? ORDER BY id")
        .bind(donation.id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(DonationDetails {
        donation,
        donator_name,
        foods,
    })
}
