use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::context::Context;
use crate::error::{WorkflowError, WorkflowResult};
use crate::ids::{HackathonId, TeamId, UserId};
use crate::model::{Document as _, Hackathon, HackathonStatus};
use crate::store::{ChangeSet, HackathonFilter};
use crate::validate::{self, MAX_TEAM_SIZE, MIN_TEAM_SIZE};
use crate::view::{HackathonView, TeamDetails};

/// Everything a hackathon is created from. Required text fields are checked
/// for emptiness after trimming.
#[derive(Debug, Clone)]
pub struct NewHackathon {
    pub name: String,
    pub description: String,
    pub organizer: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub location: String,
    pub is_online: bool,
    pub website: String,
    pub max_team_size: Option<u32>,
    pub min_team_size: Option<u32>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub prize: String,
    pub image: String,
}

/// Fields left at `None` keep their current value.
#[derive(Debug, Clone, Default)]
pub struct HackathonUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub organizer: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub is_online: Option<bool>,
    pub website: Option<String>,
    pub max_team_size: Option<u32>,
    pub min_team_size: Option<u32>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub prize: Option<String>,
    pub image: Option<String>,
    /// `Cancelled` sets the cancelled flag, any other status clears it.
    pub status: Option<HackathonStatus>,
}

fn check_text(hackathon: &Hackathon) -> WorkflowResult<()> {
    validate::max_chars(
        &hackathon.name,
        100,
        "Hackathon name cannot exceed 100 characters",
    )?;
    validate::max_chars(
        &hackathon.description,
        2000,
        "Description cannot exceed 2000 characters",
    )
}

fn check_schedule(hackathon: &Hackathon) -> WorkflowResult<()> {
    if hackathon.end_date <= hackathon.start_date {
        return Err(WorkflowError::validation(
            "End date must be after start date",
        ));
    }
    if hackathon.registration_deadline > hackathon.start_date {
        return Err(WorkflowError::validation(
            "Registration deadline must be before start date",
        ));
    }
    Ok(())
}

fn check_team_sizes(hackathon: &Hackathon) -> WorkflowResult<()> {
    if hackathon.max_team_size < MIN_TEAM_SIZE {
        return Err(WorkflowError::validation(
            "Max team size must be at least 2",
        ));
    }
    if hackathon.max_team_size > MAX_TEAM_SIZE {
        return Err(WorkflowError::validation("Max team size cannot exceed 10"));
    }
    if hackathon.min_team_size < MIN_TEAM_SIZE {
        return Err(WorkflowError::validation(
            "Min team size must be at least 2",
        ));
    }
    if hackathon.min_team_size > hackathon.max_team_size {
        return Err(WorkflowError::validation(
            "Min team size cannot exceed max team size",
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct HackathonRegistry {
    context: Context,
}

impl HackathonRegistry {
    #[must_use]
    pub const fn new(context: Context) -> Self {
        Self { context }
    }

    async fn view(&self, hackathon: Hackathon) -> WorkflowResult<HackathonView<TeamId>> {
        let participants = self
            .context
            .summaries(hackathon.participants.iter().copied())
            .await?;
        Ok(HackathonView {
            status: hackathon.status_at(self.context.clock.now()),
            participants: hackathon
                .participants
                .iter()
                .filter_map(|id| participants.get(id).cloned())
                .collect(),
            teams: hackathon.teams.clone(),
            hackathon,
        })
    }

    fn creator_only(hackathon: &Hackathon, caller: UserId, action: &str) -> WorkflowResult<()> {
        if hackathon.created_by == caller {
            Ok(())
        } else {
            Err(WorkflowError::forbidden(format!(
                "Only the creator can {action} the hackathon"
            )))
        }
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_hackathon(
        &self,
        caller: UserId,
        new: NewHackathon,
    ) -> WorkflowResult<HackathonView<TeamId>> {
        const MISSING: &str = "Please provide all required fields";
        let (Some(start_date), Some(end_date), Some(registration_deadline)) =
            (new.start_date, new.end_date, new.registration_deadline)
        else {
            return Err(WorkflowError::validation(MISSING));
        };
        let now = self.context.clock.now();
        let mut hackathon = Hackathon {
            id: HackathonId::random(),
            name: validate::required(&new.name, MISSING)?,
            description: validate::required(&new.description, MISSING)?,
            organizer: validate::required(&new.organizer, MISSING)?,
            start_date,
            end_date,
            registration_deadline,
            location: validate::required(&new.location, MISSING)?,
            is_online: new.is_online,
            website: new.website,
            max_team_size: new.max_team_size.unwrap_or(5),
            min_team_size: new.min_team_size.unwrap_or(MIN_TEAM_SIZE),
            categories: validate::list(new.categories),
            tags: validate::list(new.tags),
            prize: new.prize,
            image: new.image,
            cancelled: false,
            created_by: caller,
            participants: Vec::new(),
            teams: Vec::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        };
        check_text(&hackathon)?;
        check_schedule(&hackathon)?;
        check_team_sizes(&hackathon)?;
        hackathon.touch(now);

        let mut changes = ChangeSet::new();
        changes.put_hackathon(hackathon.clone());
        self.context.finish(changes, Vec::new()).await?;
        info!(hackathon = %hackathon.id, "hackathon created");
        self.view(hackathon).await
    }

    pub async fn list_hackathons(
        &self,
        filter: &HackathonFilter,
    ) -> WorkflowResult<Vec<HackathonView<TeamId>>> {
        let now = self.context.clock.now();
        let mut views = Vec::new();
        for hackathon in self.context.store.hackathons().await? {
            if filter.matches(&hackathon, now) {
                views.push(self.view(hackathon).await?);
            }
        }
        Ok(views)
    }

    pub async fn get_hackathon(
        &self,
        id: HackathonId,
    ) -> WorkflowResult<HackathonView<TeamDetails>> {
        let hackathon = self.context.load_hackathon(id).await?;
        let teams = self.context.store.teams_in_hackathon(id).await?;
        let teams = self.context.team_details(teams).await?;
        let HackathonView {
            hackathon,
            status,
            participants,
            ..
        } = self.view(hackathon).await?;
        Ok(HackathonView {
            hackathon,
            status,
            participants,
            teams,
        })
    }

    #[instrument(skip(self, update))]
    pub async fn update_hackathon(
        &self,
        caller: UserId,
        id: HackathonId,
        update: HackathonUpdate,
    ) -> WorkflowResult<HackathonView<TeamId>> {
        let mut hackathon = self.context.load_hackathon(id).await?;
        Self::creator_only(&hackathon, caller, "update")?;

        macro_rules! assign {
            ($($field:ident),*) => {
                $(if let Some(value) = update.$field {
                    hackathon.$field = value;
                })*
            };
        }
        if let Some(name) = &update.name {
            hackathon.name = validate::required(name, "Please provide a hackathon name")?;
        }
        if let Some(description) = &update.description {
            hackathon.description = validate::required(description, "Please provide a description")?;
        }
        if let Some(organizer) = &update.organizer {
            hackathon.organizer = validate::required(organizer, "Please provide an organizer name")?;
        }
        if let Some(location) = &update.location {
            hackathon.location = validate::required(location, "Please provide a location")?;
        }
        if let Some(categories) = update.categories {
            hackathon.categories = validate::list(categories);
        }
        if let Some(tags) = update.tags {
            hackathon.tags = validate::list(tags);
        }
        if let Some(status) = update.status {
            hackathon.cancelled = status == HackathonStatus::Cancelled;
        }
        assign!(
            start_date,
            end_date,
            registration_deadline,
            is_online,
            website,
            max_team_size,
            min_team_size,
            prize,
            image
        );
        check_text(&hackathon)?;
        check_schedule(&hackathon)?;
        check_team_sizes(&hackathon)?;
        hackathon.touch(self.context.clock.now());

        let mut changes = ChangeSet::new();
        changes.put_hackathon(hackathon.clone());
        self.context.finish(changes, Vec::new()).await?;
        self.view(hackathon).await
    }

    /// Removes the hackathon together with every team linked to it.
    #[instrument(skip(self))]
    pub async fn delete_hackathon(&self, caller: UserId, id: HackathonId) -> WorkflowResult<()> {
        let hackathon = self.context.load_hackathon(id).await?;
        Self::creator_only(&hackathon, caller, "delete")?;

        let mut changes = ChangeSet::new();
        for team in self.context.store.teams_in_hackathon(id).await? {
            changes.delete_team(&team);
        }
        changes.delete_hackathon(&hackathon);
        let teams = changes.len() - 1;
        self.context.finish(changes, Vec::new()).await?;
        info!(hackathon = %id, teams, "hackathon deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn join_hackathon(
        &self,
        caller: UserId,
        id: HackathonId,
    ) -> WorkflowResult<HackathonView<TeamId>> {
        let mut hackathon = self.context.load_hackathon(id).await?;
        if hackathon.cancelled {
            return Err(WorkflowError::conflict("Hackathon has been cancelled"));
        }
        if self.context.clock.now() > hackathon.registration_deadline {
            return Err(WorkflowError::conflict("Registration deadline has passed"));
        }
        if hackathon.is_participant(caller) {
            return Err(WorkflowError::conflict(
                "You are already registered for this hackathon",
            ));
        }
        hackathon.participants.push(caller);
        hackathon.touch(self.context.clock.now());

        let mut changes = ChangeSet::new();
        changes.put_hackathon(hackathon.clone());
        self.context.finish(changes, Vec::new()).await?;
        self.view(hackathon).await
    }

    /// Teams the caller leads are deleted, other memberships and pending
    /// requests in the hackathon's teams are dropped.
    #[instrument(skip(self))]
    pub async fn leave_hackathon(&self, caller: UserId, id: HackathonId) -> WorkflowResult<()> {
        let mut hackathon = self.context.load_hackathon(id).await?;
        if !hackathon.is_participant(caller) {
            return Err(WorkflowError::conflict(
                "You are not registered for this hackathon",
            ));
        }
        let now = self.context.clock.now();
        hackathon.participants.retain(|participant| *participant != caller);

        let mut changes = ChangeSet::new();
        for mut team in self.context.store.teams_in_hackathon(id).await? {
            if team.is_leader(caller) {
                hackathon.detach_team(team.id);
                changes.delete_team(&team);
            } else {
                let left = team.remove_member(caller);
                let withdrew = team.drop_requests_from(caller);
                if left || withdrew {
                    team.touch(now);
                    changes.put_team(team);
                }
            }
        }
        hackathon.touch(now);
        changes.put_hackathon(hackathon);
        self.context.finish(changes, Vec::new()).await
    }
}
