mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::Harness;
use hackmatch_workflow::error::StoreResult;
use hackmatch_workflow::ids::RequestId;
use hackmatch_workflow::model::{Admission, NotificationKind, TeamStatus};
use hackmatch_workflow::team::TeamUpdate;
use hackmatch_workflow::{Notice, NotificationDispatcher, Services, StoreError, WorkflowError};

#[tokio::test]
async fn request_reaches_the_leader_once() {
    let harness = Harness::new();
    let d = harness.user("Dana").await;
    let e = harness.user("Eve").await;
    let team = harness.team_with(e, None, 4, Admission::Approval).await;

    let request = harness
        .services
        .teams
        .request_to_join(d, team, Some("I know Rust".to_owned()))
        .await
        .unwrap();
    assert_eq!(request.user.unwrap().id, d);
    assert_eq!(request.message, "I know Rust");

    let inbox = harness.inbox(e).await;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::TeamRequest);
    assert_eq!(inbox[0].from, Some(d));
    assert_eq!(inbox[0].team, Some(team));

    let error = harness
        .services
        .teams
        .request_to_join(d, team, None)
        .await
        .unwrap_err();
    assert!(matches!(&error, WorkflowError::Conflict(message) if message.contains("already requested")));
    assert_eq!(harness.inbox(e).await.len(), 1);
    assert_eq!(harness.stored_team(team).await.unwrap().pending_requests.len(), 1);
}

#[tokio::test]
async fn members_cannot_request() {
    let harness = Harness::new();
    let e = harness.user("Eve").await;
    let team = harness.team(e, None, 4).await;

    assert!(matches!(
        harness.services.teams.request_to_join(e, team, None).await,
        Err(WorkflowError::Conflict(_))
    ));
}

#[tokio::test]
async fn only_the_leader_sees_requests() {
    let harness = Harness::new();
    let d = harness.user("Dana").await;
    let e = harness.user("Eve").await;
    let team = harness.team(e, None, 4).await;
    harness
        .services
        .teams
        .request_to_join(d, team, None)
        .await
        .unwrap();

    assert!(matches!(
        harness.services.teams.join_requests(d, team).await,
        Err(WorkflowError::Authorization(_))
    ));
    let requests = harness.services.teams.join_requests(e, team).await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user.as_ref().unwrap().name, "Dana");
}

#[tokio::test]
async fn approval_adds_the_member_and_tells_them() {
    let harness = Harness::new();
    let d = harness.user("Dana").await;
    let e = harness.user("Eve").await;
    let team = harness.team_with(e, None, 4, Admission::Approval).await;
    let request = harness
        .services
        .teams
        .request_to_join(d, team, None)
        .await
        .unwrap();

    assert!(matches!(
        harness
            .services
            .teams
            .approve_request(d, team, request.id)
            .await,
        Err(WorkflowError::Authorization(_))
    ));
    assert!(matches!(
        harness
            .services
            .teams
            .approve_request(e, team, RequestId::random())
            .await,
        Err(WorkflowError::NotFound(_))
    ));

    let approved = harness
        .services
        .teams
        .approve_request(e, team, request.id)
        .await
        .unwrap();
    assert!(approved.team.members.contains(&d));
    assert_eq!(approved.team.members.len(), 2);
    assert_eq!(approved.pending_requests, 0);

    let inbox = harness.inbox(d).await;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::System);
    assert!(inbox[0].message.contains("approved"));

    // the request is gone once consumed
    assert!(matches!(
        harness
            .services
            .teams
            .approve_request(e, team, request.id)
            .await,
        Err(WorkflowError::NotFound(_))
    ));
}

#[tokio::test]
async fn approval_respects_capacity() {
    let harness = Harness::new();
    let a = harness.user("Alice").await;
    let b = harness.user("Bob").await;
    let c = harness.user("Carol").await;
    let team = harness.team(a, None, 2).await;
    let teams = &harness.services.teams;
    let from_b = teams.request_to_join(b, team, None).await.unwrap();
    let from_c = teams.request_to_join(c, team, None).await.unwrap();

    let approved = teams.approve_request(a, team, from_b.id).await.unwrap();
    assert_eq!(approved.team.status, TeamStatus::Full);

    let error = teams.approve_request(a, team, from_c.id).await.unwrap_err();
    assert!(matches!(&error, WorkflowError::Conflict(message) if message == "Team is full"));
    let stored = harness.stored_team(team).await.unwrap();
    assert_eq!(stored.members.len(), 2);
    assert_eq!(stored.pending_requests.len(), 1);
}

#[tokio::test]
async fn approval_respects_closed_teams() {
    let harness = Harness::new();
    let a = harness.user("Alice").await;
    let b = harness.user("Bob").await;
    let team = harness.team(a, None, 4).await;
    let teams = &harness.services.teams;
    let request = teams.request_to_join(b, team, None).await.unwrap();
    teams
        .update_team(a, team, TeamUpdate {
            status: Some(TeamStatus::Closed),
            ..TeamUpdate::default()
        })
        .await
        .unwrap();

    assert!(matches!(
        teams.approve_request(a, team, request.id).await,
        Err(WorkflowError::Conflict(_))
    ));
}

#[tokio::test]
async fn approval_respects_one_team_per_hackathon() {
    let harness = Harness::new();
    let a = harness.user("Alice").await;
    let b = harness.user("Bob").await;
    let c = harness.user("Carol").await;
    let hackathon = harness.hackathon(a).await;
    let first = harness.team_with(a, Some(hackathon), 4, Admission::Approval).await;
    let second = harness.team(c, Some(hackathon), 4).await;
    let teams = &harness.services.teams;

    let request = teams.request_to_join(b, first, None).await.unwrap();
    teams.join_team(b, second).await.unwrap();

    assert!(matches!(
        teams.approve_request(a, first, request.id).await,
        Err(WorkflowError::Conflict(_))
    ));
    assert!(!harness.stored_team(first).await.unwrap().members.contains(&b));
}

#[tokio::test]
async fn concurrent_approvals_admit_into_one_team_per_hackathon() {
    let harness = Harness::yielding();
    let a = harness.user("Alice").await;
    let b = harness.user("Bob").await;
    let c = harness.user("Carol").await;
    let hackathon = harness.hackathon(a).await;
    let first = harness.team_with(a, Some(hackathon), 4, Admission::Approval).await;
    let second = harness.team_with(b, Some(hackathon), 4, Admission::Approval).await;
    let teams = &harness.services.teams;
    let to_first = teams.request_to_join(c, first, None).await.unwrap();
    let to_second = teams.request_to_join(c, second, None).await.unwrap();

    let (one, two) = tokio::join!(
        teams.approve_request(a, first, to_first.id),
        teams.approve_request(b, second, to_second.id),
    );

    assert_ne!(one.is_ok(), two.is_ok());
    let joined = [
        harness.stored_team(first).await.unwrap(),
        harness.stored_team(second).await.unwrap(),
    ]
    .iter()
    .filter(|team| team.members.contains(&c))
    .count();
    assert_eq!(joined, 1);
}

#[tokio::test]
async fn rejection_only_drops_the_request() {
    let harness = Harness::new();
    let d = harness.user("Dana").await;
    let e = harness.user("Eve").await;
    let team = harness.team(e, None, 4).await;
    let request = harness
        .services
        .teams
        .request_to_join(d, team, None)
        .await
        .unwrap();

    assert!(matches!(
        harness.services.teams.reject_request(d, team, request.id).await,
        Err(WorkflowError::Authorization(_))
    ));
    harness
        .services
        .teams
        .reject_request(e, team, request.id)
        .await
        .unwrap();

    let stored = harness.stored_team(team).await.unwrap();
    assert_eq!(stored.members, vec![e]);
    assert!(stored.pending_requests.is_empty());
    let inbox = harness.inbox(d).await;
    assert_eq!(inbox.len(), 1);
    assert!(inbox[0].message.contains("declined"));

    // a rejected user may ask again
    harness
        .services
        .teams
        .request_to_join(d, team, None)
        .await
        .unwrap();
}

struct Unreachable;

#[async_trait]
impl NotificationDispatcher for Unreachable {
    async fn dispatch(&self, _notice: Notice) -> StoreResult<()> {
        Err(StoreError::Backend("inbox unavailable".into()))
    }
}

#[tokio::test]
async fn failed_notifications_do_not_undo_the_change() {
    let harness = Harness::new();
    let services = Services::new(&harness.context.clone().with_notifier(Arc::new(Unreachable)));
    let d = harness.user("Dana").await;
    let e = harness.user("Eve").await;
    let team = harness.team(e, None, 4).await;

    let request = services.teams.request_to_join(d, team, None).await.unwrap();
    services
        .teams
        .approve_request(e, team, request.id)
        .await
        .unwrap();

    assert!(harness.stored_team(team).await.unwrap().members.contains(&d));
    assert!(harness.inbox(e).await.is_empty());
}
