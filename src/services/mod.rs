//! Reservation and availability consistency core.
//!
//! Each public manager method is one unit of work: a single SQLite
//! transaction bounded by the configured timeout. Dropping the transaction
//! on any error or on timeout rolls it back.

pub mod availability;
pub mod cascade;
pub mod donations;
pub mod reservations;

use std::future::Future;
use std::time::Duration;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::AppError;

pub use donations::{DonationManager, NewDonation, NewFood};
pub use reservations::{CartEntry, FoodLine, NewReservation, Reschedule, ReservationManager};

/// Runs `work` to completion or fails with `Timeout` once `limit` elapses.
pub(crate) async fn bounded<T, F>(limit: Duration, work: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(limit, work)
        .await
        .map_err(|_| AppError::Timeout)?
}

/// Opens a transaction that holds SQLite's write lock from the start.
///
/// A deferred `BEGIN` that reads first cannot upgrade to a write lock while
/// another writer is active and fails with `SQLITE_BUSY`. Taking the lock up
/// front makes concurrent writers wait on `busy_timeout` instead, so they
/// reach the availability guard in turn.
pub(crate) async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, AppError> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}
