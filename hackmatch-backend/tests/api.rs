use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use hackmatch_backend::app;
use hackmatch_workflow::{Context, Services};
use http_body_util::BodyExt as _;
use serde_json::{json, Value};
use tower::ServiceExt as _;

fn router() -> Router {
    app(Services::new(&Context::in_memory()), &[])
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Registers `name` and returns its token and id.
async fn register(app: &Router, name: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "password": "secret-password",
            "skills": ["rust"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["token"].as_str().unwrap().to_owned(),
        body["user"]["id"].as_str().unwrap().to_owned(),
    )
}

async fn create_team(app: &Router, token: &str, body: Value) -> String {
    let (status, body) = send(app, Method::POST, "/api/teams", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["team"]["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = router();
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn unknown_routes_use_the_error_envelope() {
    let app = router();
    let (status, body) = send(&app, Method::GET, "/api/nothing-here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "message": "Route not found" }));
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = router();
    let (status, body) = send(&app, Method::GET, "/api/teams", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, Method::GET, "/api/teams", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_logout_and_me() {
    let app = router();
    let (first_token, id) = register(&app, "Alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "Alice@Example.com", "password": "secret-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["token"].as_str().unwrap().to_owned();
    assert_ne!(token, first_token);

    let (status, body) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id.as_str());
    assert!(body["user"].get("passwordHash").is_none());

    let (status, _) = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(&first_token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_is_a_bad_request() {
    let app = router();
    register(&app, "Bob").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Bob", "email": "bob@example.com", "password": "secret-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn full_team_rejects_another_member() {
    let app = router();
    let (leader, _) = register(&app, "Leader").await;
    let (second, _) = register(&app, "Second").await;
    let (third, _) = register(&app, "Third").await;
    let team = create_team(&app, &leader, json!({ "name": "Crabs", "maxMembers": 2 })).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/teams/{team}/join"),
        Some(&second),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["team"]["status"], "full");
    assert_eq!(body["team"]["members"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/teams/{team}/join"),
        Some(&third),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Team is full");
}

#[tokio::test]
async fn join_request_round_trip() {
    let app = router();
    let (leader, _) = register(&app, "Erin").await;
    let (requester, requester_id) = register(&app, "Dana").await;
    let team = create_team(
        &app,
        &leader,
        json!({ "name": "Approvers", "maxMembers": 3, "admission": "approval" }),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/teams/{team}/join"),
        Some(&requester),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This team only accepts join requests");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/teams/{team}/request"),
        Some(&requester),
        Some(json!({ "message": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/teams/{team}/request"),
        Some(&requester),
        Some(json!({ "message": "I write parsers" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["request"]["message"], "I write parsers");
    let request = body["request"]["id"].as_str().unwrap().to_owned();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/teams/{team}/request"),
        Some(&requester),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/users/notifications",
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["notifications"][0]["type"], "team_request");

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/teams/{team}/requests"),
        Some(&requester),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/teams/{team}/requests"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requests"][0]["user"]["id"], requester_id.as_str());
    assert_eq!(body["requests"][0]["message"], "I write parsers");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/teams/{team}/requests/{request}/approve"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["team"]["members"].as_array().unwrap().len(), 2);
    assert_eq!(body["team"]["pendingRequests"], 0);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/users/notifications",
        Some(&requester),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    let notification = body["notifications"][0]["id"].as_str().unwrap().to_owned();
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/users/notifications/{notification}/read"),
        Some(&requester),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/users/notifications/{notification}/read"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (quiet, _) = register(&app, "Finn").await;
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/teams/{team}/request"),
        Some(&quiet),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["request"]["message"], "");
}

#[tokio::test]
async fn leader_only_operations_are_forbidden_for_members() {
    let app = router();
    let (leader, _) = register(&app, "Lead").await;
    let (member, member_id) = register(&app, "Member").await;
    let team = create_team(&app, &leader, json!({ "name": "Guarded" })).await;
    send(
        &app,
        Method::POST,
        &format!("/api/teams/{team}/join"),
        Some(&member),
        None,
    )
    .await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/teams/{team}"),
        Some(&member),
        Some(json!({ "name": "Mine now" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Only team leader can update the team");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/teams/{team}/leader"),
        Some(&leader),
        Some(json!({ "memberId": &member_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["team"]["leader"]["id"], member_id.as_str());

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/teams/{team}"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/teams/{team}"),
        Some(&member),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/teams/{team}"),
        Some(&member),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_ids_are_not_found() {
    let app = router();
    let (token, _) = register(&app, "Curious").await;
    for uri in [
        "/api/teams/not-an-id",
        "/api/hackathons/not-an-id",
        "/api/users/not-an-id",
    ] {
        let (status, body) = send(&app, Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn hackathon_lifecycle() {
    let app = router();
    let (organizer, _) = register(&app, "Organizer").await;
    let (hacker, hacker_id) = register(&app, "Hacker").await;
    let hackathon = json!({
        "name": "Rust Jam",
        "description": "Build things in Rust",
        "organizer": "Ferris Club",
        "startDate": "2030-06-01T09:00:00Z",
        "endDate": "2030-06-03T18:00:00Z",
        "registrationDeadline": "2030-05-30T00:00:00Z",
        "location": "Berlin",
        "categories": ["systems"],
        "maxTeamSize": 4,
    });

    let mut backwards = hackathon.clone();
    backwards["endDate"] = json!("2030-05-31T00:00:00Z");
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/hackathons",
        Some(&organizer),
        Some(backwards),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "End date must be after start date");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/hackathons",
        Some(&organizer),
        Some(hackathon),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["hackathon"]["status"], "upcoming");
    let id = body["hackathon"]["id"].as_str().unwrap().to_owned();

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/hackathons?category=systems",
        Some(&hacker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/hackathons/{id}/join"),
        Some(&hacker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["hackathon"]["participants"][0]["id"], hacker_id.as_str());

    let team = create_team(
        &app,
        &hacker,
        json!({ "name": "Jammers", "hackathon": &id }),
    )
    .await;
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/teams?hackathon={id}"),
        Some(&hacker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["teams"][0]["id"], team.as_str());
    assert_eq!(body["teams"][0]["maxMembers"], 4);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/hackathons/{id}"),
        Some(&hacker),
        Some(json!({ "name": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/hackathons/{id}/leave"),
        Some(&hacker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/teams/{team}"),
        Some(&hacker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn users_are_paginated_and_searchable() {
    let app = router();
    let (token, _) = register(&app, "Alpha").await;
    register(&app, "Beta").await;
    register(&app, "Gamma").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/users?page=2&limit=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["pages"], 2);
    assert_eq!(body["count"], 1);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users/profile",
        Some(&token),
        Some(json!({ "bio": "Compiler nerd", "role": "designer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["bio"], "Compiler nerd");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/users/search?role=designer",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["users"][0]["name"], "Alpha");

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/users/search?role=wizard",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
