//! Team membership and the join request lifecycle.
//!
//! Every operation reads the documents it needs, computes the new state,
//! commits all touched documents as one [`ChangeSet`] and only then hands
//! notifications to the dispatcher. Membership changes always go through
//! [`Team::add_member`] and [`Team::remove_member`] so the status follows the
//! member count.

use tracing::{info, instrument};

use crate::context::Context;
use crate::error::{WorkflowError, WorkflowResult};
use crate::ids::{HackathonId, RequestId, TeamId, UserId};
use crate::model::{Admission, Document as _, Hackathon, PendingRequest, Team, TeamStatus};
use crate::notify::Notice;
use crate::store::{ChangeSet, TeamFilter};
use crate::validate;
use crate::view::{JoinRequest, TeamDetails};

#[derive(Debug, Clone, Default)]
pub struct NewTeam {
    pub name: String,
    pub description: String,
    pub hackathon: Option<HackathonId>,
    pub max_members: Option<u32>,
    pub skills_needed: Vec<String>,
    pub requirements: String,
    pub tags: Vec<String>,
    pub project_idea: String,
    pub admission: Admission,
}

/// Fields left at `None` keep their current value.
#[derive(Debug, Clone, Default)]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub max_members: Option<u32>,
    pub skills_needed: Option<Vec<String>>,
    pub requirements: Option<String>,
    pub tags: Option<Vec<String>>,
    pub project_idea: Option<String>,
    pub admission: Option<Admission>,
    /// Only `open` and `closed` can be set, `full` follows the member count.
    pub status: Option<TeamStatus>,
}

fn team_name(name: &str) -> WorkflowResult<String> {
    let name = validate::required(name, "Please provide a team name")?;
    validate::max_chars(&name, 50, "Team name cannot exceed 50 characters")?;
    Ok(name)
}

fn check_text(team: &Team) -> WorkflowResult<()> {
    validate::max_chars(
        &team.description,
        500,
        "Description cannot exceed 500 characters",
    )?;
    validate::max_chars(
        &team.requirements,
        500,
        "Requirements cannot exceed 500 characters",
    )?;
    validate::max_chars(
        &team.project_idea,
        1000,
        "Project idea cannot exceed 1000 characters",
    )
}

fn check_max_members(max_members: u32, hackathon: Option<&Hackathon>) -> WorkflowResult<()> {
    validate::team_size(max_members)?;
    match hackathon {
        Some(hackathon) if max_members > hackathon.max_team_size => {
            Err(WorkflowError::validation(format!(
                "Teams in this hackathon cannot have more than {} members",
                hackathon.max_team_size
            )))
        }
        _ => Ok(()),
    }
}

fn leader_only(team: &Team, caller: UserId, message: &'static str) -> WorkflowResult<()> {
    if team.is_leader(caller) {
        Ok(())
    } else {
        Err(WorkflowError::forbidden(message))
    }
}

/// Whether a new member can be let in right now.
fn check_admissible(team: &Team) -> WorkflowResult<()> {
    match team.status {
        TeamStatus::Closed => Err(WorkflowError::conflict(
            "Team is not accepting new members",
        )),
        TeamStatus::Full => Err(WorkflowError::conflict("Team is full")),
        TeamStatus::Open if team.is_full() => Err(WorkflowError::conflict("Team is full")),
        TeamStatus::Open => Ok(()),
    }
}

#[derive(Clone)]
pub struct TeamWorkflow {
    context: Context,
}

impl TeamWorkflow {
    #[must_use]
    pub const fn new(context: Context) -> Self {
        Self { context }
    }

    /// Whether `user` leads or belongs to a team of `hackathon` other than
    /// `except`. Teams outside of any hackathon never collide.
    async fn in_other_team(
        &self,
        hackathon: Option<HackathonId>,
        user: UserId,
        except: Option<TeamId>,
    ) -> WorkflowResult<bool> {
        let Some(hackathon) = hackathon else {
            return Ok(false);
        };
        Ok(self
            .context
            .store
            .teams_in_hackathon(hackathon)
            .await?
            .iter()
            .any(|team| Some(team.id) != except && team.is_member(user)))
    }

    /// Checks that `user` may be admitted to `team` without colliding with
    /// another team of the same hackathon. The hackathon is read before its
    /// teams, so committing the returned claim alongside the admission fails
    /// when a concurrent admission into that hackathon got in first.
    async fn admission_claim(
        &self,
        team: &Team,
        user: UserId,
        message: &'static str,
    ) -> WorkflowResult<Option<Hackathon>> {
        let hackathon = match team.hackathon {
            Some(id) => self.context.store.hackathon(id).await?,
            None => None,
        };
        if self.in_other_team(team.hackathon, user, Some(team.id)).await? {
            return Err(WorkflowError::conflict(message));
        }
        Ok(hackathon)
    }

    async fn user_name(&self, id: UserId) -> WorkflowResult<String> {
        Ok(self.context.load_user(id).await?.name)
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_team(&self, caller: UserId, new: NewTeam) -> WorkflowResult<TeamDetails> {
        let name = team_name(&new.name)?;
        let mut hackathon = match new.hackathon {
            Some(id) => Some(self.context.load_hackathon(id).await?),
            None => None,
        };
        let max_members = new.max_members.unwrap_or_else(|| {
            hackathon.as_ref().map_or(
                self.context.settings.default_max_members,
                |hackathon| hackathon.max_team_size,
            )
        });
        check_max_members(max_members, hackathon.as_ref())?;
        if self.in_other_team(new.hackathon, caller, None).await? {
            return Err(WorkflowError::conflict(
                "You are already part of a team for this hackathon",
            ));
        }

        let now = self.context.clock.now();
        let mut team = Team {
            id: TeamId::random(),
            name,
            description: new.description.trim().to_owned(),
            hackathon: new.hackathon,
            leader: caller,
            members: vec![caller],
            max_members,
            skills_needed: validate::list(new.skills_needed),
            requirements: new.requirements.trim().to_owned(),
            tags: validate::list(new.tags),
            project_idea: new.project_idea.trim().to_owned(),
            admission: new.admission,
            status: TeamStatus::Open,
            pending_requests: Vec::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        };
        check_text(&team)?;
        team.refresh_status();
        team.touch(now);

        let mut changes = ChangeSet::new();
        if let Some(mut hackathon) = hackathon.take() {
            hackathon.attach_team(team.id);
            hackathon.touch(now);
            changes.put_hackathon(hackathon);
        }
        changes.put_team(team.clone());
        self.context.finish(changes, Vec::new()).await?;
        info!(team = %team.id, "team created");
        self.context.team_detail(team).await
    }

    pub async fn list_teams(&self, filter: &TeamFilter) -> WorkflowResult<Vec<TeamDetails>> {
        let teams = self.context.store.teams(filter).await?;
        self.context.team_details(teams).await
    }

    pub async fn get_team(&self, id: TeamId) -> WorkflowResult<TeamDetails> {
        let team = self.context.load_team(id).await?;
        self.context.team_detail(team).await
    }

    /// Direct join, only for teams with open admission.
    #[instrument(skip(self))]
    pub async fn join_team(&self, caller: UserId, id: TeamId) -> WorkflowResult<TeamDetails> {
        let mut team = self.context.load_team(id).await?;
        if team.admission == Admission::Approval {
            return Err(WorkflowError::conflict(
                "This team only accepts join requests",
            ));
        }
        if team.is_member(caller) {
            return Err(WorkflowError::conflict(
                "You are already a member of this team",
            ));
        }
        check_admissible(&team)?;
        let claim = self
            .admission_claim(
                &team,
                caller,
                "You are already part of another team for this hackathon",
            )
            .await?;
        let name = self.user_name(caller).await?;

        team.add_member(caller);
        team.touch(self.context.clock.now());
        let notice = Notice::system(team.leader, format!("{name} joined your team {}", team.name))
            .from_user(caller)
            .about_team(team.id);

        let mut changes = ChangeSet::new();
        if let Some(hackathon) = &claim {
            changes.claim_hackathon(hackathon);
        }
        changes.put_team(team.clone());
        self.context.finish(changes, vec![notice]).await?;
        self.context.team_detail(team).await
    }

    #[instrument(skip(self, message))]
    pub async fn request_to_join(
        &self,
        caller: UserId,
        id: TeamId,
        message: Option<String>,
    ) -> WorkflowResult<JoinRequest> {
        let message = message.map(|message| message.trim().to_owned()).unwrap_or_default();
        validate::max_chars(&message, 500, "Message cannot exceed 500 characters")?;
        let mut team = self.context.load_team(id).await?;
        if team.is_member(caller) {
            return Err(WorkflowError::conflict(
                "You are already a member of this team",
            ));
        }
        if team.pending_from(caller).is_some() {
            return Err(WorkflowError::conflict(
                "You have already requested to join this team",
            ));
        }
        if team.status == TeamStatus::Closed {
            return Err(WorkflowError::conflict(
                "Team is not accepting new members",
            ));
        }
        if self.in_other_team(team.hackathon, caller, Some(team.id)).await? {
            return Err(WorkflowError::conflict(
                "You are already part of another team for this hackathon",
            ));
        }
        let name = self.user_name(caller).await?;

        let now = self.context.clock.now();
        let request = PendingRequest {
            id: RequestId::random(),
            user: caller,
            message,
            created_at: now,
        };
        team.pending_requests.push(request.clone());
        team.touch(now);
        let notice = Notice::team_request(
            team.leader,
            format!("{name} requested to join your team {}", team.name),
        )
        .from_user(caller)
        .about_team(team.id);

        let mut changes = ChangeSet::new();
        changes.put_team(team);
        self.context.finish(changes, vec![notice]).await?;
        info!(request = %request.id, "join requested");
        let mut resolved = self.context.join_requests(&[request]).await?;
        resolved
            .pop()
            .ok_or_else(|| WorkflowError::not_found("Request not found"))
    }

    pub async fn join_requests(
        &self,
        caller: UserId,
        id: TeamId,
    ) -> WorkflowResult<Vec<JoinRequest>> {
        let team = self.context.load_team(id).await?;
        leader_only(&team, caller, "Only team leader can view join requests")?;
        self.context.join_requests(&team.pending_requests).await
    }

    /// Consumes the request and lets the requester in, provided the team
    /// still has room for them.
    #[instrument(skip(self))]
    pub async fn approve_request(
        &self,
        caller: UserId,
        id: TeamId,
        request: RequestId,
    ) -> WorkflowResult<TeamDetails> {
        let mut team = self.context.load_team(id).await?;
        leader_only(&team, caller, "Only team leader can approve requests")?;
        let request = team
            .take_request(request)
            .ok_or_else(|| WorkflowError::not_found("Request not found"))?;
        let mut claim = None;
        if !team.is_member(request.user) {
            check_admissible(&team)?;
            claim = self
                .admission_claim(
                    &team,
                    request.user,
                    "User is already part of another team for this hackathon",
                )
                .await?;
            team.add_member(request.user);
        }
        team.touch(self.context.clock.now());
        let notice = Notice::system(
            request.user,
            format!("Your request to join {} was approved", team.name),
        )
        .from_user(caller)
        .about_team(team.id);

        let mut changes = ChangeSet::new();
        if let Some(hackathon) = &claim {
            changes.claim_hackathon(hackathon);
        }
        changes.put_team(team.clone());
        self.context.finish(changes, vec![notice]).await?;
        self.context.team_detail(team).await
    }

    #[instrument(skip(self))]
    pub async fn reject_request(
        &self,
        caller: UserId,
        id: TeamId,
        request: RequestId,
    ) -> WorkflowResult<()> {
        let mut team = self.context.load_team(id).await?;
        leader_only(&team, caller, "Only team leader can reject requests")?;
        let request = team
            .take_request(request)
            .ok_or_else(|| WorkflowError::not_found("Request not found"))?;
        team.touch(self.context.clock.now());
        let notice = Notice::system(
            request.user,
            format!("Your request to join {} was declined", team.name),
        )
        .from_user(caller)
        .about_team(team.id);

        let mut changes = ChangeSet::new();
        changes.put_team(team);
        self.context.finish(changes, vec![notice]).await
    }

    #[instrument(skip(self))]
    pub async fn leave_team(&self, caller: UserId, id: TeamId) -> WorkflowResult<()> {
        let mut team = self.context.load_team(id).await?;
        if !team.is_member(caller) {
            return Err(WorkflowError::conflict("You are not a member of this team"));
        }
        if team.is_leader(caller) {
            return Err(WorkflowError::conflict(
                "Team leader cannot leave. Transfer leadership or delete the team.",
            ));
        }
        let name = self.user_name(caller).await?;
        team.remove_member(caller);
        team.touch(self.context.clock.now());
        let notice = Notice::system(team.leader, format!("{name} left your team {}", team.name))
            .from_user(caller)
            .about_team(team.id);

        let mut changes = ChangeSet::new();
        changes.put_team(team);
        self.context.finish(changes, vec![notice]).await
    }

    #[instrument(skip(self))]
    pub async fn remove_member(
        &self,
        caller: UserId,
        id: TeamId,
        member: UserId,
    ) -> WorkflowResult<TeamDetails> {
        let mut team = self.context.load_team(id).await?;
        leader_only(&team, caller, "Only team leader can remove members")?;
        if !team.is_member(member) {
            return Err(WorkflowError::conflict("Member not found in team"));
        }
        if team.is_leader(member) {
            return Err(WorkflowError::conflict("Team leader cannot be removed"));
        }
        team.remove_member(member);
        team.touch(self.context.clock.now());
        let notice = Notice::system(member, format!("You were removed from {}", team.name))
            .from_user(caller)
            .about_team(team.id);

        let mut changes = ChangeSet::new();
        changes.put_team(team.clone());
        self.context.finish(changes, vec![notice]).await?;
        self.context.team_detail(team).await
    }

    #[instrument(skip(self))]
    pub async fn transfer_leadership(
        &self,
        caller: UserId,
        id: TeamId,
        new_leader: UserId,
    ) -> WorkflowResult<TeamDetails> {
        let mut team = self.context.load_team(id).await?;
        leader_only(&team, caller, "Only team leader can transfer leadership")?;
        if team.is_leader(new_leader) {
            return Err(WorkflowError::conflict("Member already leads this team"));
        }
        if !team.is_member(new_leader) {
            return Err(WorkflowError::conflict("Member not found in team"));
        }
        team.leader = new_leader;
        team.touch(self.context.clock.now());
        let notice = Notice::system(new_leader, format!("You are now the leader of {}", team.name))
            .from_user(caller)
            .about_team(team.id);

        let mut changes = ChangeSet::new();
        changes.put_team(team.clone());
        self.context.finish(changes, vec![notice]).await?;
        self.context.team_detail(team).await
    }

    #[instrument(skip(self, update))]
    pub async fn update_team(
        &self,
        caller: UserId,
        id: TeamId,
        update: TeamUpdate,
    ) -> WorkflowResult<TeamDetails> {
        let mut team = self.context.load_team(id).await?;
        leader_only(&team, caller, "Only team leader can update the team")?;

        if let Some(name) = &update.name {
            team.name = team_name(name)?;
        }
        if let Some(max_members) = update.max_members {
            let hackathon = match team.hackathon {
                Some(id) => self.context.store.hackathon(id).await?,
                None => None,
            };
            check_max_members(max_members, hackathon.as_ref())?;
            if usize::try_from(max_members).unwrap_or(usize::MAX) < team.members.len() {
                return Err(WorkflowError::conflict(
                    "Max members cannot be lower than the current member count",
                ));
            }
            team.max_members = max_members;
        }
        match update.status {
            Some(TeamStatus::Full) => {
                return Err(WorkflowError::validation(
                    "Team status can only be set to open or closed",
                ));
            }
            Some(status) => team.status = status,
            None => {}
        }
        if let Some(description) = update.description {
            team.description = description.trim().to_owned();
        }
        if let Some(requirements) = update.requirements {
            team.requirements = requirements.trim().to_owned();
        }
        if let Some(project_idea) = update.project_idea {
            team.project_idea = project_idea.trim().to_owned();
        }
        if let Some(skills_needed) = update.skills_needed {
            team.skills_needed = validate::list(skills_needed);
        }
        if let Some(tags) = update.tags {
            team.tags = validate::list(tags);
        }
        if let Some(admission) = update.admission {
            team.admission = admission;
        }
        check_text(&team)?;
        team.refresh_status();
        team.touch(self.context.clock.now());

        let mut changes = ChangeSet::new();
        changes.put_team(team.clone());
        self.context.finish(changes, Vec::new()).await?;
        self.context.team_detail(team).await
    }

    #[instrument(skip(self))]
    pub async fn delete_team(&self, caller: UserId, id: TeamId) -> WorkflowResult<()> {
        let team = self.context.load_team(id).await?;
        leader_only(&team, caller, "Only team leader can delete the team")?;

        let mut changes = ChangeSet::new();
        if let Some(hackathon) = team.hackathon {
            if let Some(mut hackathon) = self.context.store.hackathon(hackathon).await? {
                if hackathon.detach_team(team.id) {
                    hackathon.touch(self.context.clock.now());
                    changes.put_hackathon(hackathon);
                }
            }
        }
        changes.delete_team(&team);
        let notices = team
            .members
            .iter()
            .filter(|member| !team.is_leader(**member))
            .map(|member| {
                Notice::system(*member, format!("Team {} was deleted by its leader", team.name))
                    .from_user(caller)
            })
            .collect();
        self.context.finish(changes, notices).await?;
        info!(team = %team.id, "team deleted");
        Ok(())
    }
}
