//! Documents kept by the store and the enums they are built from.
//!
//! Every document carries a `revision`. A freshly built document has revision
//! `0`; [`Document::touch`] is called right before a document is handed to a
//! [`crate::store::ChangeSet`], so the store sees revision `1` for an insert and
//! `n + 1` for an update of a document it holds at revision `n`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{HackathonId, NotificationId, RequestId, TeamId, UserId};
use crate::status;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant,)+
        }

        impl $name {
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: value.to_owned(),
                    }),
                }
            }
        }
    };
}

string_enum! {
    Role {
        Developer => "developer",
        Designer => "designer",
        Business => "business",
        Other => "other",
    }
}

string_enum! {
    Experience {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
        Expert => "expert",
    }
}

string_enum! {
    Availability {
        FullTime => "full-time",
        PartTime => "part-time",
        WeekendOnly => "weekend-only",
        Flexible => "flexible",
    }
}

string_enum! {
    HackathonStatus {
        Upcoming => "upcoming",
        Active => "active",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

string_enum! {
    TeamStatus {
        Open => "open",
        Full => "full",
        Closed => "closed",
    }
}

string_enum! {
    /// How a team takes in new members.
    ///
    /// `Open` teams accept direct joins as well as join requests, `Approval`
    /// teams only accept join requests that the leader approves.
    Admission {
        Open => "open",
        Approval => "approval",
    }
}

string_enum! {
    NotificationKind {
        TeamRequest => "team_request",
        Message => "message",
        System => "system",
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Developer
    }
}

impl Default for Experience {
    fn default() -> Self {
        Self::Intermediate
    }
}

impl Default for Availability {
    fn default() -> Self {
        Self::Flexible
    }
}

impl Default for Admission {
    fn default() -> Self {
        Self::Open
    }
}

pub trait Document {
    fn revision(&self) -> i64;

    /// Bumps the revision and the update timestamp. Call once per commit.
    fn touch(&mut self, now: DateTime<Utc>);
}

macro_rules! impl_document {
    ($($name:ty),*) => {
        $(
            impl Document for $name {
                fn revision(&self) -> i64 {
                    self.revision
                }

                fn touch(&mut self, now: DateTime<Utc>) {
                    self.revision += 1;
                    self.updated_at = now;
                }
            }
        )*
    };
}

impl_document!(User, Hackathon, Team);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub bio: String,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub availability: Availability,
    pub github: String,
    pub linkedin: String,
    pub portfolio: String,
    pub role: Role,
    pub experience: Experience,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(flatten)]
    pub profile: Profile,
    pub is_active: bool,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            avatar: self.profile.avatar.clone(),
            role: self.profile.role,
            skills: self.profile.skills.clone(),
        }
    }
}

/// The public part of a user that is embedded into team and hackathon answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub role: Role,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hackathon {
    pub id: HackathonId,
    pub name: String,
    pub description: String,
    pub organizer: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    pub location: String,
    pub is_online: bool,
    pub website: String,
    pub max_team_size: u32,
    pub min_team_size: u32,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub prize: String,
    pub image: String,
    pub cancelled: bool,
    pub created_by: UserId,
    #[serde(skip_serializing)]
    pub participants: Vec<UserId>,
    #[serde(skip_serializing)]
    pub teams: Vec<TeamId>,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hackathon {
    /// Derived on every read, never stored.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> HackathonStatus {
        if self.cancelled {
            HackathonStatus::Cancelled
        } else {
            status::hackathon_status(now, self.start_date, self.end_date)
        }
    }

    #[must_use]
    pub fn is_participant(&self, user: UserId) -> bool {
        self.participants.contains(&user)
    }

    pub fn attach_team(&mut self, team: TeamId) {
        if !self.teams.contains(&team) {
            self.teams.push(team);
        }
    }

    pub fn detach_team(&mut self, team: TeamId) -> bool {
        let before = self.teams.len();
        self.teams.retain(|id| *id != team);
        self.teams.len() != before
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub id: RequestId,
    pub user: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing)]
    pub hackathon: Option<HackathonId>,
    #[serde(skip_serializing)]
    pub leader: UserId,
    /// The leader is always one of them.
    #[serde(skip_serializing)]
    pub members: Vec<UserId>,
    pub max_members: u32,
    pub skills_needed: Vec<String>,
    pub requirements: String,
    pub tags: Vec<String>,
    pub project_idea: String,
    pub admission: Admission,
    /// Recomputed by [`Team::refresh_status`] on every write.
    pub status: TeamStatus,
    #[serde(skip_serializing)]
    pub pending_requests: Vec<PendingRequest>,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    #[must_use]
    pub fn is_member(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }

    #[must_use]
    pub fn is_leader(&self, user: UserId) -> bool {
        self.leader == user
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        usize::try_from(self.max_members).unwrap_or(usize::MAX)
    }

    pub fn refresh_status(&mut self) {
        self.status = status::team_status(self.status, self.members.len(), self.capacity());
    }

    pub fn add_member(&mut self, user: UserId) {
        if !self.members.contains(&user) {
            self.members.push(user);
        }
        self.pending_requests.retain(|request| request.user != user);
        self.refresh_status();
    }

    pub fn remove_member(&mut self, user: UserId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| *member != user);
        self.refresh_status();
        self.members.len() != before
    }

    #[must_use]
    pub fn pending_from(&self, user: UserId) -> Option<&PendingRequest> {
        self.pending_requests
            .iter()
            .find(|request| request.user == user)
    }

    pub fn take_request(&mut self, id: RequestId) -> Option<PendingRequest> {
        let position = self
            .pending_requests
            .iter()
            .position(|request| request.id == id)?;
        Some(self.pending_requests.remove(position))
    }

    pub fn drop_requests_from(&mut self, user: UserId) -> bool {
        let before = self.pending_requests.len();
        self.pending_requests.retain(|request| request.user != user);
        self.pending_requests.len() != before
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub from: Option<UserId>,
    pub team: Option<TeamId>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
