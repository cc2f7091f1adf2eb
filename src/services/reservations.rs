use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use super::donations::{self, DATE_FORMAT};
use super::{availability, begin_write, bounded};
use crate::error::AppError;
use crate::models::{
    Availability, CollectionStatus, Food, PersonSummary, Reservation, ReservationDetails,
    ReservationItem, ReservationItemDetails,
};

pub const TIME_FORMAT: &str = "%H:%M";

/// A checked-out cart: one reservation is created per entry.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub collection_date: NaiveDate,
    pub time_start: NaiveTime,
    pub time_end: NaiveTime,
    pub remarks: Option<String>,
    pub cart: Vec<CartEntry>,
}

#[derive(Debug, Clone)]
pub struct CartEntry {
    pub donation_id: i64,
    pub foods: Vec<FoodLine>,
}

#[derive(Debug, Clone, Copy)]
pub struct FoodLine {
    pub food_id: i64,
    pub quantity: i64,
}

/// New collection window and, possibly, a different donation.
#[derive(Debug, Clone)]
pub struct Reschedule {
    pub collection_date: NaiveDate,
    pub time_start: NaiveTime,
    pub time_end: NaiveTime,
    pub donation_id: i64,
}

fn check_window(start: NaiveTime, end: NaiveTime, errors: &mut HashMap<String, String>) {
    if end <= start {
        errors.insert(
            "collectionTimeEnd".to_string(),
            "Collection must end after it starts".to_string(),
        );
    }
}

impl NewReservation {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = HashMap::new();
        check_window(self.time_start, self.time_end, &mut errors);

        if self.cart.is_empty() {
            errors.insert("cartItems".to_string(), "Cart must not be empty".to_string());
        }

        let mut seen = HashSet::new();
        for (i, entry) in self.cart.iter().enumerate() {
            if !seen.insert(entry.donation_id) {
                errors.insert(
                    format!("cartItems[{i}].id"),
                    format!("Donation {} appears more than once", entry.donation_id),
                );
            }
            if entry.foods.is_empty() {
                errors.insert(
                    format!("cartItems[{i}].foods"),
                    "At least one food is required".to_string(),
                );
            }
            for (j, line) in entry.foods.iter().enumerate() {
                if line.quantity <= 0 {
                    errors.insert(
                        format!("cartItems[{i}].foods[{j}].quantity"),
                        "Quantity must be positive".to_string(),
                    );
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

impl Reschedule {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = HashMap::new();
        check_window(self.time_start, self.time_end, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Reservation item joined with the food it draws from
#[derive(FromRow)]
struct ItemWithFood {
    // Item fields
    id: i64,
    reservation_id: i64,
    food_id: i64,
    quantity: i64,
    // Food fields
    donation_id: i64,
    name: String,
    food_quantity: i64,
    food_type: String,
    expiry_date: String,
}

impl ItemWithFood {
    fn into_details(self) -> ReservationItemDetails {
        ReservationItemDetails {
            item: ReservationItem {
                id: self.id,
                reservation_id: self.reservation_id,
                food_id: self.food_id,
                quantity: self.quantity,
            },
            food: Food {
                id: self.food_id,
                donation_id: self.donation_id,
                name: self.name,
                quantity: self.food_quantity,
                food_type: self.food_type,
                expiry_date: self.expiry_date,
            },
        }
    }
}

/// Reservation lifecycle: create, reschedule, cancel, collect, delete.
#[derive(Clone)]
pub struct ReservationManager {
    pool: SqlitePool,
    timeout: Duration,
}

impl ReservationManager {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Creates one reservation per cart entry and claims each donation.
    ///
    /// All-or-nothing across the whole cart.
    pub async fn create(&self, user_id: i64, request: NewReservation) -> Result<Vec<ReservationDetails>, AppError> {
        request.validate()?;

        bounded(self.timeout, async move {
            let mut tx = begin_write(&self.pool).await?;

            let user: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
            if user.is_none() {
                return Err(AppError::invalid("userId", format!("User {user_id} not found")));
            }

            let now = Utc::now().to_rfc3339();
            let mut created = Vec::with_capacity(request.cart.len());

            for entry in &request.cart {
                let reservation_id = sqlx::query(
                    r#"
                    INSERT INTO reservations (user_id, donation_id, collection_date, collection_time_start, collection_time_end, collection_status, remarks, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(user_id)
                .bind(entry.donation_id)
                .bind(request.collection_date.format(DATE_FORMAT).to_string())
                .bind(request.time_start.format(TIME_FORMAT).to_string())
                .bind(request.time_end.format(TIME_FORMAT).to_string())
                .bind(CollectionStatus::Uncollected)
                .bind(&request.remarks)
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

                for line in &entry.foods {
                    check_food_line(&mut tx, entry.donation_id, line).await?;
                    sqlx::query(
                        "INSERT INTO reservation_items (reservation_id, food_id, quantity) VALUES (?, ?, ?)",
                    )
                    .bind(reservation_id)
                    .bind(line.food_id)
                    .bind(line.quantity)
                    .execute(&mut *tx)
                    .await?;
                }

                availability::mark_reserved(&mut tx, entry.donation_id).await?;
                created.push(reservation_id);
            }

            let mut details = Vec::with_capacity(created.len());
            for reservation_id in created {
                details.push(fetch_details(&mut tx, reservation_id).await?);
            }
            tx.commit().await?;

            tracing::info!(user_id, reservations = details.len(), "reservations created");
            Ok(details)
        })
        .await
    }

    pub async fn get(&self, reservation_id: i64) -> Result<ReservationDetails, AppError> {
        bounded(self.timeout, async move {
            let mut conn = self.pool.acquire().await?;
            fetch_details(&mut conn, reservation_id).await
        })
        .await
    }

    /// Moves the collection window and, if asked, the donation.
    pub async fn reschedule(&self, reservation_id: i64, changes: Reschedule) -> Result<ReservationDetails, AppError> {
        changes.validate()?;

        bounded(self.timeout, async move {
            let mut tx = begin_write(&self.pool).await?;
            let reservation = fetch(&mut tx, reservation_id).await?;
            apply_reschedule(&mut tx, &reservation, &changes).await?;
            let details = fetch_details(&mut tx, reservation_id).await?;
            tx.commit().await?;
            Ok(details)
        })
        .await
    }

    /// Administrative override of `collection_status`, outside the
    /// cancel/collect transitions. Availability is realigned with the new status.
    pub async fn override_status(
        &self,
        reservation_id: i64,
        status: CollectionStatus,
    ) -> Result<ReservationDetails, AppError> {
        bounded(self.timeout, async move {
            let mut tx = begin_write(&self.pool).await?;
            let reservation = fetch(&mut tx, reservation_id).await?;
            apply_override(&mut tx, &reservation, status).await?;
            let details = fetch_details(&mut tx, reservation_id).await?;
            tx.commit().await?;
            Ok(details)
        })
        .await
    }

    /// Reschedule and status override in a single unit of work.
    pub async fn reschedule_with_override(
        &self,
        reservation_id: i64,
        changes: Reschedule,
        status: CollectionStatus,
    ) -> Result<ReservationDetails, AppError> {
        changes.validate()?;

        bounded(self.timeout, async move {
            let mut tx = begin_write(&self.pool).await?;
            let reservation = fetch(&mut tx, reservation_id).await?;
            apply_reschedule(&mut tx, &reservation, &changes).await?;
            let reservation = fetch(&mut tx, reservation_id).await?;
            apply_override(&mut tx, &reservation, status).await?;
            let details = fetch_details(&mut tx, reservation_id).await?;
            tx.commit().await?;
            Ok(details)
        })
        .await
    }

    /// Soft delete: the reservation stays on record as `Cancelled` and its
    /// donation becomes available again.
    pub async fn cancel(&self, reservation_id: i64) -> Result<ReservationDetails, AppError> {
        bounded(self.timeout, async move {
            let mut tx = begin_write(&self.pool).await?;
            let reservation =
                transition(&mut tx, reservation_id, CollectionStatus::Cancelled, "cancel").await?;
            availability::mark_available(&mut tx, reservation.donation_id).await?;
            let details = fetch_details(&mut tx, reservation_id).await?;
            tx.commit().await?;

            tracing::info!(reservation_id, donation_id = reservation.donation_id, "reservation cancelled");
            Ok(details)
        })
        .await
    }

    /// The food is gone, so the donation stays `Reserved`.
    pub async fn collect(&self, reservation_id: i64) -> Result<ReservationDetails, AppError> {
        bounded(self.timeout, async move {
            let mut tx = begin_write(&self.pool).await?;
            let reservation =
                transition(&mut tx, reservation_id, CollectionStatus::Collected, "collect").await?;
            let details = fetch_details(&mut tx, reservation_id).await?;
            tx.commit().await?;

            tracing::info!(reservation_id, donation_id = reservation.donation_id, "reservation collected");
            Ok(details)
        })
        .await
    }

    /// Hard delete: removes the reservation and its items. Use `cancel` for
    /// a recipient backing out; this is for administrative cleanup.
    pub async fn delete(&self, reservation_id: i64) -> Result<ReservationDetails, AppError> {
        bounded(self.timeout, async move {
            let mut tx = begin_write(&self.pool).await?;
            let mut details = fetch_details(&mut tx, reservation_id).await?;
            let donation_id = details.reservation.donation_id;

            sqlx::query("DELETE FROM reservation_items WHERE reservation_id = ?")
                .bind(reservation_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM reservations WHERE id = ?")
                .bind(reservation_id)
                .execute(&mut *tx)
                .await?;

            if details.reservation.collection_status.holds_donation()
                && availability::current(&mut tx, donation_id).await? == Availability::Reserved
            {
                availability::mark_available(&mut tx, donation_id).await?;
                details.donation = donations::fetch_details(&mut tx, donation_id).await?;
            }
            tx.commit().await?;

            tracing::info!(reservation_id, donation_id, "reservation deleted");
            Ok(details)
        })
        .await
    }

    /// Reservations still awaiting collection, soonest first.
    pub async fn list_current(&self, user_id: i64) -> Result<Vec<ReservationDetails>, AppError> {
        bounded(self.timeout, async move {
            let mut conn = self.pool.acquire().await?;
            let reservations: Vec<Reservation> = sqlx::query_as(
                r#"
                SELECT * FROM reservations
                WHERE user_id = ? AND collection_status = ?
                ORDER BY collection_date, collection_time_start, id
                "#,
            )
            .bind(user_id)
            .bind(CollectionStatus::Uncollected)
            .fetch_all(&mut *conn)
            .await?;

            load_all(&mut conn, reservations).await
        })
        .await
    }

    /// Collected and cancelled reservations, most recently updated first.
    pub async fn list_past(&self, user_id: i64) -> Result<Vec<ReservationDetails>, AppError> {
        bounded(self.timeout, async move {
            let mut conn = self.pool.acquire().await?;
            let reservations: Vec<Reservation> = sqlx::query_as(
                r#"
                SELECT * FROM reservations
                WHERE user_id = ? AND collection_status IN (?, ?)
                ORDER BY updated_at DESC, id DESC
                "#,
            )
            .bind(user_id)
            .bind(CollectionStatus::Collected)
            .bind(CollectionStatus::Cancelled)
            .fetch_all(&mut *conn)
            .await?;

            load_all(&mut conn, reservations).await
        })
        .await
    }
}

async fn check_food_line(conn: &mut SqliteConnection, donation_id: i64, line: &FoodLine) -> Result<(), AppError> {
    let food: Option<(i64, i64)> = sqlx::query_as("SELECT donation_id, quantity FROM foods WHERE id = ?")
        .bind(line.food_id)
        .fetch_optional(&mut *conn)
        .await?;

    // A missing food is left to the foreign key on insert.
    let Some((owner, available)) = food else {
        return Ok(());
    };

    if owner != donation_id {
        return Err(AppError::invalid(
            "foodId",
            format!("Food {} does not belong to donation {donation_id}", line.food_id),
        ));
    }
    if line.quantity > available {
        return Err(AppError::invalid(
            "quantity",
            format!("Only {available} of food {} is available", line.food_id),
        ));
    }
    Ok(())
}

/// Moves an `Uncollected` reservation to `to`, failing if it already left that state.
async fn transition(
    conn: &mut SqliteConnection,
    reservation_id: i64,
    to: CollectionStatus,
    verb: &str,
) -> Result<Reservation, AppError> {
    let reservation = fetch(conn, reservation_id).await?;
    let refused = || {
        AppError::InvalidState(format!(
            "cannot {verb} a reservation that is not Uncollected (currently {})",
            reservation.collection_status
        ))
    };
    if reservation.collection_status.is_terminal() {
        return Err(refused());
    }

    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE reservations SET collection_status = ?, updated_at = ?
        WHERE id = ? AND collection_status = ?
        "#,
    )
    .bind(to)
    .bind(&now)
    .bind(reservation_id)
    .bind(CollectionStatus::Uncollected)
    .execute(&mut *conn)
    .await?;

    // Lost a race with another transition.
    if result.rows_affected() == 0 {
        return Err(refused());
    }
    Ok(reservation)
}

async fn apply_reschedule(
    conn: &mut SqliteConnection,
    reservation: &Reservation,
    changes: &Reschedule,
) -> Result<(), AppError> {
    let moving = changes.donation_id != reservation.donation_id;
    if moving {
        availability::current(conn, changes.donation_id).await?;
        match reservation.collection_status {
            CollectionStatus::Uncollected => {
                availability::mark_reserved(conn, changes.donation_id).await?;
                availability::mark_available(conn, reservation.donation_id).await?;
            }
            CollectionStatus::Collected => {
                return Err(AppError::InvalidState(
                    "cannot move a Collected reservation to another donation".to_string(),
                ));
            }
            CollectionStatus::Cancelled => {}
        }
    }

    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        UPDATE reservations
        SET collection_date = ?, collection_time_start = ?, collection_time_end = ?, donation_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(changes.collection_date.format(DATE_FORMAT).to_string())
    .bind(changes.time_start.format(TIME_FORMAT).to_string())
    .bind(changes.time_end.format(TIME_FORMAT).to_string())
    .bind(changes.donation_id)
    .bind(&now)
    .bind(reservation.id)
    .execute(&mut *conn)
    .await?;

    tracing::info!(
        reservation_id = reservation.id,
        from_donation = reservation.donation_id,
        to_donation = changes.donation_id,
        "reservation rescheduled"
    );
    Ok(())
}

async fn apply_override(
    conn: &mut SqliteConnection,
    reservation: &Reservation,
    status: CollectionStatus,
) -> Result<(), AppError> {
    let from = reservation.collection_status;
    if from == status {
        return Ok(());
    }

    match (from.holds_donation(), status.holds_donation()) {
        (true, false) => availability::mark_available(conn, reservation.donation_id).await?,
        (false, true) => availability::mark_reserved(conn, reservation.donation_id).await?,
        _ => {}
    }

    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE reservations SET collection_status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(&now)
        .bind(reservation.id)
        .execute(&mut *conn)
        .await?;

    tracing::info!(
        reservation_id = reservation.id,
        from = %from,
        to = %status,
        "collection status overridden"
    );
    Ok(())
}

async fn fetch(conn: &mut SqliteConnection, reservation_id: i64) -> Result<Reservation, AppError> {
    sqlx::query_as("SELECT * FROM reservations WHERE id = ?")
        .bind(reservation_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(AppError::or_not_found("reservation"))
}

async fn fetch_details(conn: &mut SqliteConnection, reservation_id: i64) -> Result<ReservationDetails, AppError> {
    let reservation = fetch(conn, reservation_id).await?;
    load_details(conn, reservation).await
}

async fn load_all(
    conn: &mut SqliteConnection,
    reservations: Vec<Reservation>,
) -> Result<Vec<ReservationDetails>, AppError> {
    let mut details = Vec::with_capacity(reservations.len());
    for reservation in reservations {
        details.push(load_details(conn, reservation).await?);
    }
    Ok(details)
}

async fn load_details(conn: &mut SqliteConnection, reservation: Reservation) -> Result<ReservationDetails, AppError> {
    let rows: Vec<ItemWithFood> = sqlx::query_as(
        r#"
        SELECT ri.id, ri.reservation_id, ri.food_id, ri.quantity,
               f.donation_id, f.name, f.quantity AS food_quantity, f.food_type, f.expiry_date
        FROM reservation_items ri
        JOIN foods f ON f.id = ri.food_id
        WHERE ri.reservation_id = ?
        ORDER BY ri.id
        "#,
    )
    .bind(reservation.id)
    .fetch_all(&mut *conn)
    .await?;

    let donation = donations::fetch_details(conn, reservation.donation_id).await?;

    let user: PersonSummary = sqlx::query_as(
        "SELECT u.id, p.name FROM users u JOIN persons p ON p.id = u.person_id WHERE u.id = ?",
    )
    .bind(reservation.user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(ReservationDetails {
        reservation,
        items: rows.into_iter().map(ItemWithFood::into_details).collect(),
        donation,
        user,
    })
}
