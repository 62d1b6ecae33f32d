use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use hackmatch_workflow::identity::ProfileUpdate;
use hackmatch_workflow::ids::{NotificationId, UserId};
use hackmatch_workflow::model::{Availability, Experience, Role};
use hackmatch_workflow::store::UserSearch;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_id, split_list};
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/search", get(search))
        .route("/profile", put(update_profile))
        .route("/notifications", get(notifications))
        .route(
            "/notifications/:notification_id/read",
            post(mark_notification_read),
        )
        .route("/:id", get(get_user))
}

/// Profile fields shared by registration and profile updates. Absent fields
/// are left alone.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub availability: Option<Availability>,
    pub role: Option<Role>,
    pub experience: Option<Experience>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub portfolio: Option<String>,
    pub avatar: Option<String>,
}

impl From<ProfilePayload> for ProfileUpdate {
    fn from(payload: ProfilePayload) -> Self {
        Self {
            name: payload.name,
            bio: payload.bio,
            skills: payload.skills,
            interests: payload.interests,
            availability: payload.availability,
            role: payload.role,
            experience: payload.experience,
            github: payload.github,
            linkedin: payload.linkedin,
            portfolio: payload.portfolio,
            avatar: payload.avatar,
        }
    }
}

/// Unparsable numbers fall back to the defaults.
#[derive(Deserialize)]
struct Pagination {
    page: Option<String>,
    limit: Option<String>,
}

fn number(raw: Option<&str>) -> u64 {
    raw.and_then(|raw| raw.trim().parse().ok()).unwrap_or(0)
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    query: Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(pagination) = query?;
    let listing = state
        .services
        .identity
        .list_users(
            number(pagination.page.as_deref()),
            number(pagination.limit.as_deref()),
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "count": listing.count,
        "total": listing.total,
        "page": listing.page,
        "pages": listing.pages,
        "users": listing.users,
    })))
}

#[derive(Deserialize)]
struct SearchQuery {
    skills: Option<String>,
    interests: Option<String>,
    role: Option<Role>,
    experience: Option<Experience>,
    availability: Option<Availability>,
    search: Option<String>,
}

async fn search(
    State(state): State<AppState>,
    _user: CurrentUser,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let filter = UserSearch {
        skills: split_list(query.skills.as_deref()),
        interests: split_list(query.interests.as_deref()),
        role: query.role,
        experience: query.experience,
        availability: query.availability,
        search: query.search.filter(|search| !search.trim().is_empty()),
    };
    let users = state.services.identity.search_users(&filter).await?;
    Ok(Json(json!({
        "success": true,
        "count": users.len(),
        "users": users,
    })))
}

async fn get_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id: UserId = parse_id(&id, "User not found")?;
    let user = state.services.identity.get_user(id).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<ProfilePayload>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(payload) = payload?;
    let user = state
        .services
        .identity
        .update_profile(user.id, payload.into())
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": user,
    })))
}

async fn notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, AppError> {
    let notifications = state.services.identity.notifications(user.id).await?;
    Ok(Json(json!({
        "success": true,
        "count": notifications.len(),
        "notifications": notifications,
    })))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let notification: NotificationId = parse_id(&notification_id, "Notification not found")?;
    state
        .services
        .identity
        .mark_notification_read(user.id, notification)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Notification marked read",
    })))
}
