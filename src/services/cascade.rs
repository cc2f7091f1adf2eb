//! Donation removal without relying on `ON DELETE CASCADE`.
//!
//! Rows go in dependency order: reservation items, reservations, foods,
//! then the donation itself. The schema enforces foreign keys, so any
//! other order fails with a storage error rather than orphaning rows.

use sqlx::SqliteConnection;

use crate::error::AppError;
use crate::models::{Donation, Reservation};

pub async fn delete_donation(conn: &mut SqliteConnection, donation_id: i64) -> Result<Donation, AppError> {
    let reservations: Vec<Reservation> =
        sqlx::query_as("SELECT * FROM reservations WHERE donation_id = ?")
            .bind(donation_id)
            .fetch_all(&mut *conn)
            .await?;

    // Also catches items of reservations that were repointed at another
    // donation but still reference this donation's food.
    let items = sqlx::query(
        r#"
        DELETE FROM reservation_items
        WHERE reservation_id IN (SELECT id FROM reservations WHERE donation_id = ?)
           OR food_id IN (SELECT id FROM foods WHERE donation_id = ?)
        "#,
    )
    .bind(donation_id)
    .bind(donation_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    sqlx::query("DELETE FROM reservations WHERE donation_id = ?")
        .bind(donation_id)
        .execute(&mut *conn)
        .await?;

    let foods = sqlx::query("DELETE FROM foods WHERE donation_id = ?")
        .bind(donation_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let donation: Donation = sqlx::query_as("DELETE FROM donations WHERE id = ? RETURNING *")
        .bind(donation_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(AppError::or_not_found("donation"))?;

    tracing::info!(
        donation_id,
        reservations = reservations.len(),
        reservation_items = items,
        foods,
        "donation deleted"
    );
    Ok(donation)
}
