//! Documents with their references resolved, as handed out to callers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::Context;
use crate::error::{WorkflowError, WorkflowResult};
use crate::ids::{HackathonId, RequestId, UserId};
use crate::model::{Hackathon, HackathonStatus, PendingRequest, Team, UserSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HackathonBrief {
    pub id: HackathonId,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: String,
}

impl From<&Hackathon> for HackathonBrief {
    fn from(hackathon: &Hackathon) -> Self {
        Self {
            id: hackathon.id,
            name: hackathon.name.clone(),
            start_date: hackathon.start_date,
            end_date: hackathon.end_date,
            location: hackathon.location.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDetails {
    #[serde(flatten)]
    pub team: Team,
    pub hackathon: Option<HackathonBrief>,
    pub leader: Option<UserSummary>,
    pub members: Vec<UserSummary>,
    pub pending_requests: usize,
}

/// A hackathon with its derived status and resolved participants. `T` is
/// either a plain team id for listings or [`TeamDetails`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HackathonView<T> {
    #[serde(flatten)]
    pub hackathon: Hackathon,
    pub status: HackathonStatus,
    pub participants: Vec<UserSummary>,
    pub teams: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub id: RequestId,
    pub user: Option<UserSummary>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Context {
    pub(crate) async fn summaries(
        &self,
        ids: impl IntoIterator<Item = UserId>,
    ) -> WorkflowResult<HashMap<UserId, UserSummary>> {
        let mut ids: Vec<UserId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(self
            .store
            .users(&ids)
            .await?
            .iter()
            .map(|user| (user.id, user.summary()))
            .collect())
    }

    pub(crate) async fn team_details(&self, teams: Vec<Team>) -> WorkflowResult<Vec<TeamDetails>> {
        let users = self
            .summaries(teams.iter().flat_map(|team| team.members.iter().copied()))
            .await?;
        let mut hackathons: HashMap<HackathonId, Option<HackathonBrief>> = HashMap::new();
        for id in teams.iter().filter_map(|team| team.hackathon) {
            if !hackathons.contains_key(&id) {
                let brief = self.store.hackathon(id).await?.as_ref().map(HackathonBrief::from);
                hackathons.insert(id, brief);
            }
        }

        Ok(teams
            .into_iter()
            .map(|team| TeamDetails {
                hackathon: team
                    .hackathon
                    .and_then(|id| hackathons.get(&id).cloned().flatten()),
                leader: users.get(&team.leader).cloned(),
                members: team
                    .members
                    .iter()
                    .filter_map(|id| users.get(id).cloned())
                    .collect(),
                pending_requests: team.pending_requests.len(),
                team,
            })
            .collect())
    }

    pub(crate) async fn team_detail(&self, team: Team) -> WorkflowResult<TeamDetails> {
        self.team_details(vec![team])
            .await?
            .pop()
            .ok_or_else(|| WorkflowError::not_found("Team not found"))
    }

    pub(crate) async fn join_requests(
        &self,
        requests: &[PendingRequest],
    ) -> WorkflowResult<Vec<JoinRequest>> {
        let users = self
            .summaries(requests.iter().map(|request| request.user))
            .await?;
        Ok(requests
            .iter()
            .map(|request| JoinRequest {
                id: request.id,
                user: users.get(&request.user).cloned(),
                message: request.message.clone(),
                created_at: request.created_at,
            })
            .collect())
    }
}
