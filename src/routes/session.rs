use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::auth::{login_caller, logout_caller, resolve_caller, AuthCaller};
use crate::error::AppError;
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    access_code: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<LoginForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(form) = body?;

    let Some(caller) = resolve_caller(&state.db, form.access_code.trim()).await? else {
        return Err(AppError::Unauthorized);
    };

    login_caller(&session, caller.clone()).await?;
    tracing::info!(person_id = caller.person_id, role = %caller.role, "logged in");
    Ok(Json(caller))
}

async fn logout(session: Session) -> Result<impl IntoResponse, AppError> {
    logout_caller(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(AuthCaller(caller): AuthCaller) -> impl IntoResponse {
    Json(caller)
}
