use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use hackmatch_workflow::ids::{HackathonId, RequestId, TeamId, UserId};
use hackmatch_workflow::model::{Admission, TeamStatus};
use hackmatch_workflow::store::TeamFilter;
use hackmatch_workflow::team::{NewTeam, TeamUpdate};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_id, split_list};
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::AppState;

const TEAM_NOT_FOUND: &str = "Team not found";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/:id", get(show).put(update).delete(remove))
        .route("/:id/join", post(join))
        .route("/:id/leave", post(leave))
        .route("/:id/members/:member_id", delete(remove_member))
        .route("/:id/leader", post(transfer_leadership))
        .route("/:id/request", post(request_to_join))
        .route("/:id/requests", get(join_requests))
        .route("/:id/requests/:request_id/approve", post(approve))
        .route("/:id/requests/:request_id/reject", post(reject))
}

fn team_id(raw: &str) -> Result<TeamId, AppError> {
    parse_id(raw, TEAM_NOT_FOUND)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    hackathon: Option<String>,
    max_members: Option<u32>,
    #[serde(default)]
    skills_needed: Vec<String>,
    #[serde(default)]
    requirements: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    project_idea: String,
    #[serde(default)]
    admission: Admission,
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<CreatePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;
    let hackathon: Option<HackathonId> = payload
        .hackathon
        .filter(|hackathon| !hackathon.trim().is_empty())
        .map(|hackathon| parse_id(&hackathon, "Hackathon not found"))
        .transpose()?;
    let team = state
        .services
        .teams
        .create_team(user.id, NewTeam {
            name: payload.name,
            description: payload.description,
            hackathon,
            max_members: payload.max_members,
            skills_needed: payload.skills_needed,
            requirements: payload.requirements,
            tags: payload.tags,
            project_idea: payload.project_idea,
            admission: payload.admission,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Team created successfully",
            "team": team,
        })),
    ))
}

#[derive(Deserialize)]
struct ListQuery {
    hackathon: Option<String>,
    status: Option<TeamStatus>,
    skills: Option<String>,
    search: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let hackathon = match query.hackathon.as_deref().map(str::trim) {
        None | Some("") => None,
        // a hackathon that cannot exist has no teams
        Some(raw) => match raw.parse::<HackathonId>() {
            Ok(id) => Some(id),
            Err(_) => return Ok(Json(json!({ "success": true, "count": 0, "teams": [] }))),
        },
    };
    let filter = TeamFilter {
        hackathon,
        status: query.status,
        skills: split_list(query.skills.as_deref()),
        search: query.search.filter(|search| !search.trim().is_empty()),
    };
    let teams = state.services.teams.list_teams(&filter).await?;
    Ok(Json(json!({
        "success": true,
        "count": teams.len(),
        "teams": teams,
    })))
}

async fn show(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let team = state.services.teams.get_team(team_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "team": team })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePayload {
    name: Option<String>,
    description: Option<String>,
    max_members: Option<u32>,
    skills_needed: Option<Vec<String>>,
    requirements: Option<String>,
    tags: Option<Vec<String>>,
    project_idea: Option<String>,
    admission: Option<Admission>,
    status: Option<TeamStatus>,
}

async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePayload>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let id = team_id(&id)?;
    let Json(payload) = payload?;
    let team = state
        .services
        .teams
        .update_team(user.id, id, TeamUpdate {
            name: payload.name,
            description: payload.description,
            max_members: payload.max_members,
            skills_needed: payload.skills_needed,
            requirements: payload.requirements,
            tags: payload.tags,
            project_idea: payload.project_idea,
            admission: payload.admission,
            status: payload.status,
        })
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Team updated successfully",
        "team": team,
    })))
}

async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .services
        .teams
        .delete_team(user.id, team_id(&id)?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Team deleted successfully",
    })))
}

async fn join(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let team = state
        .services
        .teams
        .join_team(user.id, team_id(&id)?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Successfully joined the team",
        "team": team,
    })))
}

async fn leave(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .services
        .teams
        .leave_team(user.id, team_id(&id)?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Successfully left the team",
    })))
}

async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, member_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let id = team_id(&id)?;
    let member: UserId = parse_id(&member_id, "Member not found in team")?;
    let team = state
        .services
        .teams
        .remove_member(user.id, id, member)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Member removed successfully",
        "team": team,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaderPayload {
    #[serde(default)]
    member_id: String,
}

async fn transfer_leadership(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<LeaderPayload>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let id = team_id(&id)?;
    let Json(payload) = payload?;
    let member: UserId = parse_id(&payload.member_id, "Member not found in team")?;
    let team = state
        .services
        .teams
        .transfer_leadership(user.id, id, member)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Leadership transferred successfully",
        "team": team,
    })))
}

#[derive(Deserialize)]
struct RequestPayload {
    message: Option<String>,
}

async fn request_to_join(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let id = team_id(&id)?;
    // the body is optional, but if there is one it has to be valid
    let message = if body.is_empty() {
        None
    } else {
        let Json(payload) = Json::<RequestPayload>::from_bytes(&body)?;
        payload.message
    };
    let request = state
        .services
        .teams
        .request_to_join(user.id, id, message)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Join request sent",
            "request": request,
        })),
    ))
}

async fn join_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let requests = state
        .services
        .teams
        .join_requests(user.id, team_id(&id)?)
        .await?;
    Ok(Json(json!({
        "success": true,
        "count": requests.len(),
        "requests": requests,
    })))
}

async fn approve(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, request_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let id = team_id(&id)?;
    let request: RequestId = parse_id(&request_id, "Request not found")?;
    let team = state
        .services
        .teams
        .approve_request(user.id, id, request)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Request approved",
        "team": team,
    })))
}

async fn reject(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, request_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let id = team_id(&id)?;
    let request: RequestId = parse_id(&request_id, "Request not found")?;
    state
        .services
        .teams
        .reject_request(user.id, id, request)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Request rejected",
    })))
}
