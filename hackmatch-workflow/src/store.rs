//! The storage seam between the workflows and a concrete document store.
//!
//! Reads are plain lookups. Every write of a user, hackathon or team goes
//! through [`Store::commit`], which applies a whole [`ChangeSet`] or nothing.
//! Notifications and sessions live outside the revisioned documents and have
//! their own single-row writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::ids::{HackathonId, NotificationId, TeamId, UserId};
use crate::model::{
    Availability, Document as _, Experience, Hackathon, HackathonStatus, Notification, Role, Team,
    TeamStatus, User,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Inserts the user when its revision is `1`, updates it otherwise.
    PutUser(User),
    PutHackathon(Hackathon),
    PutTeam(Team),
    DeleteHackathon { id: HackathonId, revision: i64 },
    DeleteTeam { id: TeamId, revision: i64 },
    /// Bumps the hackathon revision and nothing else. Two membership changes
    /// within one hackathon that read the same revision cannot both commit.
    ClaimHackathon { id: HackathonId, revision: i64 },
}

impl Change {
    /// The revision the store has to hold for this change to apply.
    #[must_use]
    pub fn expected_revision(&self) -> i64 {
        match self {
            Self::PutUser(user) => user.revision() - 1,
            Self::PutHackathon(hackathon) => hackathon.revision() - 1,
            Self::PutTeam(team) => team.revision() - 1,
            Self::DeleteHackathon { revision, .. }
            | Self::DeleteTeam { revision, .. }
            | Self::ClaimHackathon { revision, .. } => *revision,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            changes: Vec::new(),
        }
    }

    pub fn put_user(&mut self, user: User) -> &mut Self {
        self.changes.push(Change::PutUser(user));
        self
    }

    pub fn put_hackathon(&mut self, hackathon: Hackathon) -> &mut Self {
        self.changes.push(Change::PutHackathon(hackathon));
        self
    }

    pub fn put_team(&mut self, team: Team) -> &mut Self {
        self.changes.push(Change::PutTeam(team));
        self
    }

    pub fn delete_hackathon(&mut self, hackathon: &Hackathon) -> &mut Self {
        self.changes.push(Change::DeleteHackathon {
            id: hackathon.id,
            revision: hackathon.revision,
        });
        self
    }

    pub fn claim_hackathon(&mut self, hackathon: &Hackathon) -> &mut Self {
        self.changes.push(Change::ClaimHackathon {
            id: hackathon.id,
            revision: hackathon.revision,
        });
        self
    }

    pub fn delete_team(&mut self, team: &Team) -> &mut Self {
        self.changes.push(Change::DeleteTeam {
            id: team.id,
            revision: team.revision,
        });
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }
}

impl IntoIterator for ChangeSet {
    type IntoIter = std::vec::IntoIter<Change>;
    type Item = Change;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamFilter {
    pub hackathon: Option<HackathonId>,
    pub status: Option<TeamStatus>,
    /// Matches teams that need any of these skills.
    pub skills: Vec<String>,
    pub search: Option<String>,
}

impl TeamFilter {
    #[must_use]
    pub fn matches(&self, team: &Team) -> bool {
        if self.hackathon.is_some() && self.hackathon != team.hackathon {
            return false;
        }
        if self.status.is_some_and(|status| status != team.status) {
            return false;
        }
        if !self.skills.is_empty() && !any_of(&self.skills, &team.skills_needed) {
            return false;
        }
        self.search.as_deref().map_or(true, |search| {
            let needle = search.to_lowercase();
            contains(&team.name, &needle)
                || contains(&team.description, &needle)
                || team.tags.iter().any(|tag| contains(tag, &needle))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HackathonFilter {
    pub status: Option<HackathonStatus>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
}

impl HackathonFilter {
    /// Status is derived, so matching needs the current time.
    #[must_use]
    pub fn matches(&self, hackathon: &Hackathon, now: DateTime<Utc>) -> bool {
        if self
            .status
            .is_some_and(|status| status != hackathon.status_at(now))
        {
            return false;
        }
        if let Some(category) = &self.category {
            if !hackathon
                .categories
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(category))
            {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !hackathon
                .tags
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(tag))
            {
                return false;
            }
        }
        self.search.as_deref().map_or(true, |search| {
            let needle = search.to_lowercase();
            contains(&hackathon.name, &needle)
                || contains(&hackathon.description, &needle)
                || hackathon.tags.iter().any(|tag| contains(tag, &needle))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSearch {
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub role: Option<Role>,
    pub experience: Option<Experience>,
    pub availability: Option<Availability>,
    pub search: Option<String>,
}

impl UserSearch {
    /// Inactive users never match.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        let profile = &user.profile;
        if !user.is_active {
            return false;
        }
        if self.role.is_some_and(|role| role != profile.role)
            || self
                .experience
                .is_some_and(|experience| experience != profile.experience)
            || self
                .availability
                .is_some_and(|availability| availability != profile.availability)
        {
            return false;
        }
        if !self.skills.is_empty() && !any_of(&self.skills, &profile.skills) {
            return false;
        }
        if !self.interests.is_empty() && !any_of(&self.interests, &profile.interests) {
            return false;
        }
        self.search.as_deref().map_or(true, |search| {
            let needle = search.to_lowercase();
            contains(&user.name, &needle) || contains(&profile.bio, &needle)
        })
    }
}

fn any_of(wanted: &[String], present: &[String]) -> bool {
    wanted.iter().any(|wanted| {
        present
            .iter()
            .any(|present| present.eq_ignore_ascii_case(wanted))
    })
}

fn contains(haystack: &str, lowercase_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowercase_needle)
}

/// One page of a listing together with the number of matching documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// `email` is expected in its lower-cased form.
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Missing ids are skipped. The order of the answer is unspecified.
    async fn users(&self, ids: &[UserId]) -> StoreResult<Vec<User>>;

    /// Active users, newest first.
    async fn active_users(&self, offset: u64, limit: u64) -> StoreResult<Page<User>>;

    async fn search_users(&self, search: &UserSearch, limit: usize) -> StoreResult<Vec<User>>;

    async fn hackathon(&self, id: HackathonId) -> StoreResult<Option<Hackathon>>;

    /// All hackathons ordered by start date.
    async fn hackathons(&self) -> StoreResult<Vec<Hackathon>>;

    async fn team(&self, id: TeamId) -> StoreResult<Option<Team>>;

    /// Matching teams, newest first.
    async fn teams(&self, filter: &TeamFilter) -> StoreResult<Vec<Team>>;

    async fn teams_in_hackathon(&self, hackathon: HackathonId) -> StoreResult<Vec<Team>>;

    /// Applies every change or none. A change whose expected revision does
    /// not match the stored one fails the whole set with
    /// [`crate::error::StoreError::Stale`].
    async fn commit(&self, changes: ChangeSet) -> StoreResult<()>;

    /// The inbox of `user`, oldest first.
    async fn notifications(&self, user: UserId) -> StoreResult<Vec<Notification>>;

    async fn push_notification(&self, user: UserId, notification: Notification)
        -> StoreResult<()>;

    /// Returns `false` when the notification is not in the inbox of `user`.
    async fn mark_notification_read(
        &self,
        user: UserId,
        notification: NotificationId,
    ) -> StoreResult<bool>;

    async fn create_session(
        &self,
        token_digest: &str,
        user: UserId,
        created_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn session_user(&self, token_digest: &str) -> StoreResult<Option<UserId>>;

    async fn delete_session(&self, token_digest: &str) -> StoreResult<bool>;
}
