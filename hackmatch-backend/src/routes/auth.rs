use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use hackmatch_workflow::identity::{Registration, SignedIn};
use serde::Deserialize;
use serde_json::{json, Value};

use super::users::ProfilePayload;
use crate::auth::{BearerToken, CurrentUser};
use crate::error::AppError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[derive(Deserialize)]
struct RegisterPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(flatten)]
    profile: ProfilePayload,
}

#[derive(Deserialize)]
struct LoginPayload {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

fn signed_in(message: &str, signed_in: SignedIn) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": message,
        "token": signed_in.token,
        "user": signed_in.user,
    }))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;
    let registered = state
        .services
        .identity
        .register(Registration {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            profile: payload.profile.into(),
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        signed_in("User registered successfully", registered),
    ))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(payload) = payload?;
    let session = state
        .services
        .identity
        .login(&payload.email, &payload.password)
        .await?;
    Ok(signed_in("Logged in successfully", session))
}

async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<Value>, AppError> {
    state.services.identity.logout(&token).await?;
    Ok(Json(json!({ "success": true, "message": "Logged out" })))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "success": true, "user": user }))
}
