//! Sole writer of `donations.availability`.
//!
//! Every function takes the caller's open connection (normally a transaction)
//! so availability changes commit or roll back together with the reservation
//! rows that motivate them.

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::error::AppError;
use crate::models::{Availability, CollectionStatus, Donation};

pub async fn current(conn: &mut SqliteConnection, donation_id: i64) -> Result<Availability, AppError> {
    let (availability,): (Availability,) =
        sqlx::query_as("SELECT availability FROM donations WHERE id = ?")
            .bind(donation_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(AppError::or_not_found("donation"))?;
    Ok(availability)
}

/// Claims an `Available` donation.
///
/// The write is conditional on the prior value, so of two racing claims
/// exactly one sees an affected row.
pub async fn mark_reserved(conn: &mut SqliteConnection, donation_id: i64) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        "UPDATE donations SET availability = ?, updated_at = ? WHERE id = ? AND availability = ?",
    )
    .bind(Availability::Reserved)
    .bind(&now)
    .bind(donation_id)
    .bind(Availability::Available)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let availability = current(conn, donation_id).await?;
    tracing::warn!(donation_id, %availability, "refused to reserve donation");
    Err(AppError::Conflict(format!(
        "donation {donation_id} is {availability} and cannot be reserved"
    )))
}

/// Releases a donation after the reservation holding it went away.
pub async fn mark_available(conn: &mut SqliteConnection, donation_id: i64) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query("UPDATE donations SET availability = ?, updated_at = ? WHERE id = ?")
        .bind(Availability::Available)
        .bind(&now)
        .bind(donation_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("donation"));
    }
    Ok(())
}

/// Administrative override of a donation's availability.
///
/// Conflicting reservations are resolved in the same unit of work:
/// leaving `Reserved` cancels every `Uncollected` reservation on the donation,
/// a donation whose food was collected can't become `Available` again, and
/// `Reserved` is only accepted while a reservation actually holds it.
pub async fn set_availability(
    conn: &mut SqliteConnection,
    donation_id: i64,
    value: Availability,
) -> Result<Donation, AppError> {
    let donation: Donation = sqlx::query_as("SELECT * FROM donations WHERE id = ?")
        .bind(donation_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(AppError::or_not_found("donation"))?;

    let statuses: Vec<(CollectionStatus,)> =
        sqlx::query_as("SELECT collection_status FROM reservations WHERE donation_id = ?")
            .bind(donation_id)
            .fetch_all(&mut *conn)
            .await?;
    let collected = statuses
        .iter()
        .any(|(s,)| *s == CollectionStatus::Collected);
    let holding = statuses.iter().any(|(s,)| s.holds_donation());

    let now = Utc::now().to_rfc3339();
    let mut cancelled = 0;
    match value {
        Availability::Reserved if !holding => {
            return Err(AppError::InvalidState(format!(
                "donation {donation_id} has no reservation to be Reserved by"
            )));
        }
        Availability::Reserved => {}
        Availability::Available if collected => {
            return Err(AppError::InvalidState(format!(
                "donation {donation_id} has already been collected"
            )));
        }
        Availability::Available | Availability::Unavailable => {
            cancelled = sqlx::query(
                r#"
                UPDATE reservations SET collection_status = ?, updated_at = ?
                WHERE donation_id = ? AND collection_status = ?
                "#,
            )
            .bind(CollectionStatus::Cancelled)
            .bind(&now)
            .bind(donation_id)
            .bind(CollectionStatus::Uncollected)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        }
    }

    let updated: Donation = sqlx::query_as(
        "UPDATE donations SET availability = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(value)
    .bind(&now)
    .bind(donation_id)
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!(
        donation_id,
        from = %donation.availability,
        to = %value,
        cancelled_reservations = cancelled,
        "availability overridden"
    );
    Ok(updated)
}
