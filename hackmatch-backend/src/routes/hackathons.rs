use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use hackmatch_workflow::hackathon::{HackathonUpdate, NewHackathon};
use hackmatch_workflow::ids::HackathonId;
use hackmatch_workflow::model::HackathonStatus;
use hackmatch_workflow::store::HackathonFilter;
use serde::Deserialize;
use serde_json::{json, Value};

use super::parse_id;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/:id", get(show).put(update).delete(remove))
        .route("/:id/join", post(join))
        .route("/:id/leave", post(leave))
}

fn hackathon_id(raw: &str) -> Result<HackathonId, AppError> {
    parse_id(raw, "Hackathon not found")
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    organizer: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    registration_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    location: String,
    #[serde(default)]
    is_online: bool,
    #[serde(default)]
    website: String,
    max_team_size: Option<u32>,
    min_team_size: Option<u32>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    prize: String,
    #[serde(default)]
    image: String,
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<CreatePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;
    let hackathon = state
        .services
        .hackathons
        .create_hackathon(user.id, NewHackathon {
            name: payload.name,
            description: payload.description,
            organizer: payload.organizer,
            start_date: payload.start_date,
            end_date: payload.end_date,
            registration_deadline: payload.registration_deadline,
            location: payload.location,
            is_online: payload.is_online,
            website: payload.website,
            max_team_size: payload.max_team_size,
            min_team_size: payload.min_team_size,
            categories: payload.categories,
            tags: payload.tags,
            prize: payload.prize,
            image: payload.image,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Hackathon created successfully",
            "hackathon": hackathon,
        })),
    ))
}

#[derive(Deserialize)]
struct ListQuery {
    status: Option<HackathonStatus>,
    search: Option<String>,
    category: Option<String>,
    tag: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let filter = HackathonFilter {
        status: query.status,
        search: non_empty(query.search),
        category: non_empty(query.category),
        tag: non_empty(query.tag),
    };
    let hackathons = state.services.hackathons.list_hackathons(&filter).await?;
    Ok(Json(json!({
        "success": true,
        "count": hackathons.len(),
        "hackathons": hackathons,
    })))
}

async fn show(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let hackathon = state
        .services
        .hackathons
        .get_hackathon(hackathon_id(&id)?)
        .await?;
    Ok(Json(json!({ "success": true, "hackathon": hackathon })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePayload {
    name: Option<String>,
    description: Option<String>,
    organizer: Option<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    registration_deadline: Option<DateTime<Utc>>,
    location: Option<String>,
    is_online: Option<bool>,
    website: Option<String>,
    max_team_size: Option<u32>,
    min_team_size: Option<u32>,
    categories: Option<Vec<String>>,
    tags: Option<Vec<String>>,
    prize: Option<String>,
    image: Option<String>,
    status: Option<HackathonStatus>,
}

async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePayload>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let id = hackathon_id(&id)?;
    let Json(payload) = payload?;
    let hackathon = state
        .services
        .hackathons
        .update_hackathon(user.id, id, HackathonUpdate {
            name: payload.name,
            description: payload.description,
            organizer: payload.organizer,
            start_date: payload.start_date,
            end_date: payload.end_date,
            registration_deadline: payload.registration_deadline,
            location: payload.location,
            is_online: payload.is_online,
            website: payload.website,
            max_team_size: payload.max_team_size,
            min_team_size: payload.min_team_size,
            categories: payload.categories,
            tags: payload.tags,
            prize: payload.prize,
            image: payload.image,
            status: payload.status,
        })
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Hackathon updated successfully",
        "hackathon": hackathon,
    })))
}

async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .services
        .hackathons
        .delete_hackathon(user.id, hackathon_id(&id)?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Hackathon deleted successfully",
    })))
}

async fn join(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let hackathon = state
        .services
        .hackathons
        .join_hackathon(user.id, hackathon_id(&id)?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Successfully joined the hackathon",
        "hackathon": hackathon,
    })))
}

async fn leave(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .services
        .hackathons
        .leave_hackathon(user.id, hackathon_id(&id)?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Successfully left the hackathon",
    })))
}
