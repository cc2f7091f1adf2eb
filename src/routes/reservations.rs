use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::{parse_date, parse_time};
use crate::auth::AuthCaller;
use crate::error::{parse_id, AppError};
use crate::models::CollectionStatus;
use crate::services::{CartEntry, FoodLine, NewReservation, Reschedule};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationForm {
    collection_date: Option<String>,
    collection_time_start: Option<String>,
    collection_time_end: Option<String>,
    remarks: Option<String>,
    cart_items: Option<Vec<CartItemForm>>,
}

#[derive(Deserialize)]
pub struct CartItemForm {
    id: i64,
    foods: Vec<CartFoodForm>,
}

#[derive(Deserialize)]
pub struct CartFoodForm {
    id: i64,
    quantity: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleForm {
    collection_date: Option<String>,
    collection_time_start: Option<String>,
    collection_time_end: Option<String>,
    donation_id: Option<i64>,
    collection_status: Option<CollectionStatus>,
}

fn validate_reservation_form(form: ReservationForm) -> Result<NewReservation, AppError> {
    let mut errors = HashMap::new();

    let collection_date = parse_date("collectionDate", form.collection_date.as_deref(), &mut errors);
    let time_start = parse_time(
        "collectionTimeStart",
        form.collection_time_start.as_deref(),
        &mut errors,
    );
    let time_end = parse_time("collectionTimeEnd", form.collection_time_end.as_deref(), &mut errors);

    let cart_items = form.cart_items.unwrap_or_default();
    if cart_items.is_empty() {
        errors.insert("cartItems".to_string(), "Cart must not be empty".to_string());
    }

    let (Some(collection_date), Some(time_start), Some(time_end)) = (collection_date, time_start, time_end)
    else {
        return Err(AppError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let cart = cart_items
        .into_iter()
        .map(|item| CartEntry {
            donation_id: item.id,
            foods: item
                .foods
                .into_iter()
                .map(|food| FoodLine {
                    food_id: food.id,
                    quantity: food.quantity,
                })
                .collect(),
        })
        .collect();

    Ok(NewReservation {
        collection_date,
        time_start,
        time_end,
        remarks: form.remarks.filter(|s| !s.trim().is_empty()),
        cart,
    })
}

fn validate_reschedule_form(form: &RescheduleForm) -> Result<Reschedule, AppError> {
    let mut errors = HashMap::new();

    let collection_date = parse_date("collectionDate", form.collection_date.as_deref(), &mut errors);
    let time_start = parse_time(
        "collectionTimeStart",
        form.collection_time_start.as_deref(),
        &mut errors,
    );
    let time_end = parse_time("collectionTimeEnd", form.collection_time_end.as_deref(), &mut errors);
    if form.donation_id.is_none() {
        errors.insert("donationId".to_string(), "donationId is required".to_string());
    }

    match (collection_date, time_start, time_end, form.donation_id) {
        (Some(collection_date), Some(time_start), Some(time_end), Some(donation_id))
            if errors.is_empty() =>
        {
            Ok(Reschedule {
                collection_date,
                time_start,
                time_end,
                donation_id,
            })
        }
        _ => Err(AppError::Validation(errors)),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reservation/current/{user_id}", get(list_current))
        .route("/reservation/past/{user_id}", get(list_past))
        .route("/reservation/{id}", post(create_reservation))
        .route("/reservation/{id}", get(show_reservation))
        .route("/reservation/{id}", put(update_reservation))
        .route("/reservation/{id}", delete(delete_reservation))
        .route("/reservation/{id}/cancel", patch(cancel_reservation))
        .route("/reservation/{id}/collect", patch(collect_reservation))
}

/// `{id}` is the reserving user's id on this route.
async fn create_reservation(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(user_id): Path<String>,
    body: Result<Json<ReservationForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_id("userId", &user_id)?;
    caller.require_user_or_admin(user_id)?;

    let Json(form) = body?;
    let request = validate_reservation_form(form)?;

    let created = state.reservations.create(user_id, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_current(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_id("userId", &user_id)?;
    caller.require_user_or_admin(user_id)?;

    Ok(Json(state.reservations.list_current(user_id).await?))
}

async fn list_past(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_id("userId", &user_id)?;
    caller.require_user_or_admin(user_id)?;

    Ok(Json(state.reservations.list_past(user_id).await?))
}

async fn show_reservation(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id("id", &id)?;
    let reservation = state.reservations.get(id).await?;
    caller.require_user_or_admin(reservation.reservation.user_id)?;

    Ok(Json(reservation))
}

async fn update_reservation(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<String>,
    body: Result<Json<RescheduleForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id("id", &id)?;
    let Json(form) = body?;
    let changes = validate_reschedule_form(&form)?;

    let existing = state.reservations.get(id).await?;
    caller.require_user_or_admin(existing.reservation.user_id)?;

    let updated = match form.collection_status {
        Some(status) => {
            caller.require_admin()?;
            state
                .reservations
                .reschedule_with_override(id, changes, status)
                .await?
        }
        None => state.reservations.reschedule(id, changes).await?,
    };
    Ok(Json(updated))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id("id", &id)?;
    let existing = state.reservations.get(id).await?;
    caller.require_user_or_admin(existing.reservation.user_id)?;

    Ok(Json(state.reservations.cancel(id).await?))
}

async fn collect_reservation(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id("id", &id)?;
    let existing = state.reservations.get(id).await?;
    caller.require_user_or_admin(existing.reservation.user_id)?;

    Ok(Json(state.reservations.collect(id).await?))
}

async fn delete_reservation(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id("id", &id)?;
    caller.require_admin()?;

    Ok(Json(state.reservations.delete(id).await?))
}
