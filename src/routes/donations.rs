use std::collections::HashMap;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use super::parse_date;
use crate::auth::AuthCaller;
use crate::error::{parse_id, AppError};
use crate::models::Availability;
use crate::services::{NewDonation, NewFood};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationForm {
    category: Option<String>,
    location: Option<String>,
    remarks: Option<String>,
    delivery_date: Option<String>,
    #[serde(default)]
    foods: Vec<FoodForm>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodForm {
    name: Option<String>,
    quantity: Option<i64>,
    #[serde(rename = "type")]
    food_type: Option<String>,
    expiry_date: Option<String>,
}

#[derive(Deserialize)]
pub struct AvailabilityForm {
    availability: Option<Availability>,
}

#[derive(Deserialize)]
pub struct DonationFilter {
    availability: Option<Availability>,
}

fn required(field: String, value: Option<String>, errors: &mut HashMap<String, String>) -> String {
    let value = value.map(|s| s.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        errors.insert(field.clone(), format!("{field} is required"));
    }
    value
}

fn validate_donation_form(form: DonationForm) -> Result<NewDonation, AppError> {
    let mut errors = HashMap::new();

    let category = required("category".to_string(), form.category, &mut errors);
    let location = required("location".to_string(), form.location, &mut errors);
    let delivery_date = parse_date("deliveryDate", form.delivery_date.as_deref(), &mut errors);

    if form.foods.is_empty() {
        errors.insert("foods".to_string(), "At least one food item is required".to_string());
    }

    let mut foods = Vec::with_capacity(form.foods.len());
    for (i, food) in form.foods.into_iter().enumerate() {
        let name = required(format!("foods[{i}].name"), food.name, &mut errors);
        let food_type = required(format!("foods[{i}].type"), food.food_type, &mut errors);
        let expiry_date = parse_date(
            &format!("foods[{i}].expiryDate"),
            food.expiry_date.as_deref(),
            &mut errors,
        );
        let quantity = food.quantity.unwrap_or(0);
        if quantity <= 0 {
            errors.insert(
                format!("foods[{i}].quantity"),
                "Quantity must be a positive number of grams".to_string(),
            );
        }
        if let Some(expiry_date) = expiry_date {
            foods.push(NewFood {
                name,
                quantity,
                food_type,
                expiry_date,
            });
        }
    }

    match delivery_date {
        Some(delivery_date) if errors.is_empty() => Ok(NewDonation {
            category,
            location,
            remarks: form.remarks.filter(|s| !s.trim().is_empty()),
            delivery_date,
            foods,
        }),
        _ => Err(AppError::Validation(errors)),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/donations", get(list_donations))
        .route("/donations", post(create_donation))
        .route("/donations/{id}", get(show_donation))
        .route("/donations/{id}", delete(delete_donation))
        .route("/donations/{id}/availability", patch(update_availability))
}

async fn list_donations(
    State(state): State<AppState>,
    AuthCaller(_caller): AuthCaller,
    filter: Result<Query<DonationFilter>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(filter) = filter?;
    Ok(Json(state.donations.list(filter.availability).await?))
}

async fn create_donation(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    body: Result<Json<DonationForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let donator_id = caller.role.donator_id().ok_or(AppError::Forbidden)?;

    let Json(form) = body?;
    let donation = validate_donation_form(form)?;

    let created = state.donations.create(donator_id, donation).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn show_donation(
    State(state): State<AppState>,
    AuthCaller(_caller): AuthCaller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id("id", &id)?;
    Ok(Json(state.donations.get(id).await?))
}

async fn update_availability(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<String>,
    body: Result<Json<AvailabilityForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id("id", &id)?;
    let Json(form) = body?;
    let Some(availability) = form.availability else {
        return Err(AppError::invalid("availability", "availability is required"));
    };

    let existing = state.donations.get(id).await?;
    caller.require_donator_or_admin(existing.donation.donator_id)?;

    Ok(Json(state.donations.set_availability(id, availability).await?))
}

async fn delete_donation(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id("id", &id)?;
    let existing = state.donations.get(id).await?;
    caller.require_donator_or_admin(existing.donation.donator_id)?;

    Ok(Json(state.donations.delete(id).await?))
}
