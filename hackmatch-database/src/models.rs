//! Table rows and their conversion from and to the workflow documents.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use hackmatch_workflow::ids::{HackathonId, NotificationId, TeamId, UserId};
use hackmatch_workflow::model::{Hackathon, Notification, PendingRequest, Profile, Team, User};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::schema::{hackathons, notifications, sessions, teams, users};

fn to_i32(value: u32, column: &'static str) -> Result<i32, DatabaseError> {
    i32::try_from(value).map_err(|_| DatabaseError::OutOfRange(column))
}

fn to_u32(value: i32, column: &'static str) -> Result<u32, DatabaseError> {
    u32::try_from(value).map_err(|_| DatabaseError::OutOfRange(column))
}

fn ids<T: From<Uuid>>(values: Vec<Uuid>) -> Vec<T> {
    values.into_iter().map(T::from).collect()
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = users, check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub availability: String,
    pub github: String,
    pub linkedin: String,
    pub portfolio: String,
    pub role: String,
    pub experience: String,
    pub avatar: String,
    pub is_active: bool,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        let profile = &user.profile;
        Self {
            id: user.id.0,
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            bio: profile.bio.clone(),
            skills: profile.skills.clone(),
            interests: profile.interests.clone(),
            availability: profile.availability.as_str().to_owned(),
            github: profile.github.clone(),
            linkedin: profile.linkedin.clone(),
            portfolio: profile.portfolio.clone(),
            role: profile.role.as_str().to_owned(),
            experience: profile.experience.as_str().to_owned(),
            avatar: profile.avatar.clone(),
            is_active: user.is_active,
            revision: user.revision,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId(row.id),
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            profile: Profile {
                bio: row.bio,
                skills: row.skills,
                interests: row.interests,
                availability: row.availability.parse()?,
                github: row.github,
                linkedin: row.linkedin,
                portfolio: row.portfolio,
                role: row.role.parse()?,
                experience: row.experience.parse()?,
                avatar: row.avatar,
            },
            is_active: row.is_active,
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = hackathons, check_for_backend(diesel::pg::Pg))]
pub struct HackathonRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub organizer: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    pub location: String,
    pub is_online: bool,
    pub website: String,
    pub max_team_size: i32,
    pub min_team_size: i32,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub prize: String,
    pub image: String,
    pub cancelled: bool,
    pub created_by: Uuid,
    pub participants: Vec<Uuid>,
    pub teams: Vec<Uuid>,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&Hackathon> for HackathonRow {
    type Error = DatabaseError;

    fn try_from(hackathon: &Hackathon) -> Result<Self, Self::Error> {
        Ok(Self {
            id: hackathon.id.0,
            name: hackathon.name.clone(),
            description: hackathon.description.clone(),
            organizer: hackathon.organizer.clone(),
            start_date: hackathon.start_date,
            end_date: hackathon.end_date,
            registration_deadline: hackathon.registration_deadline,
            location: hackathon.location.clone(),
            is_online: hackathon.is_online,
            website: hackathon.website.clone(),
            max_team_size: to_i32(hackathon.max_team_size, "max_team_size")?,
            min_team_size: to_i32(hackathon.min_team_size, "min_team_size")?,
            categories: hackathon.categories.clone(),
            tags: hackathon.tags.clone(),
            prize: hackathon.prize.clone(),
            image: hackathon.image.clone(),
            cancelled: hackathon.cancelled,
            created_by: hackathon.created_by.0,
            participants: hackathon.participants.iter().map(|id| id.0).collect(),
            teams: hackathon.teams.iter().map(|id| id.0).collect(),
            revision: hackathon.revision,
            created_at: hackathon.created_at,
            updated_at: hackathon.updated_at,
        })
    }
}

impl TryFrom<HackathonRow> for Hackathon {
    type Error = DatabaseError;

    fn try_from(row: HackathonRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: HackathonId(row.id),
            name: row.name,
            description: row.description,
            organizer: row.organizer,
            start_date: row.start_date,
            end_date: row.end_date,
            registration_deadline: row.registration_deadline,
            location: row.location,
            is_online: row.is_online,
            website: row.website,
            max_team_size: to_u32(row.max_team_size, "max_team_size")?,
            min_team_size: to_u32(row.min_team_size, "min_team_size")?,
            categories: row.categories,
            tags: row.tags,
            prize: row.prize,
            image: row.image,
            cancelled: row.cancelled,
            created_by: UserId(row.created_by),
            participants: ids(row.participants),
            teams: ids(row.teams),
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(
    table_name = teams,
    check_for_backend(diesel::pg::Pg),
    treat_none_as_null = true
)]
pub struct TeamRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub hackathon_id: Option<Uuid>,
    pub leader: Uuid,
    pub members: Vec<Uuid>,
    pub max_members: i32,
    pub skills_needed: Vec<String>,
    pub requirements: String,
    pub tags: Vec<String>,
    pub project_idea: String,
    pub admission: String,
    pub status: String,
    pub pending_requests: serde_json::Value,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&Team> for TeamRow {
    type Error = DatabaseError;

    fn try_from(team: &Team) -> Result<Self, Self::Error> {
        Ok(Self {
            id: team.id.0,
            name: team.name.clone(),
            description: team.description.clone(),
            hackathon_id: team.hackathon.map(|id| id.0),
            leader: team.leader.0,
            members: team.members.iter().map(|id| id.0).collect(),
            max_members: to_i32(team.max_members, "max_members")?,
            skills_needed: team.skills_needed.clone(),
            requirements: team.requirements.clone(),
            tags: team.tags.clone(),
            project_idea: team.project_idea.clone(),
            admission: team.admission.as_str().to_owned(),
            status: team.status.as_str().to_owned(),
            pending_requests: serde_json::to_value(&team.pending_requests)?,
            revision: team.revision,
            created_at: team.created_at,
            updated_at: team.updated_at,
        })
    }
}

impl TryFrom<TeamRow> for Team {
    type Error = DatabaseError;

    fn try_from(row: TeamRow) -> Result<Self, Self::Error> {
        let pending_requests: Vec<PendingRequest> = serde_json::from_value(row.pending_requests)?;
        Ok(Self {
            id: TeamId(row.id),
            name: row.name,
            description: row.description,
            hackathon: row.hackathon_id.map(HackathonId),
            leader: UserId(row.leader),
            members: ids(row.members),
            max_members: to_u32(row.max_members, "max_members")?,
            skills_needed: row.skills_needed,
            requirements: row.requirements,
            tags: row.tags,
            project_idea: row.project_idea,
            admission: row.admission.parse()?,
            status: row.status.parse()?,
            pending_requests,
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = notifications, check_for_backend(diesel::pg::Pg))]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub message: String,
    pub from_user: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRow {
    #[must_use]
    pub fn new(user: UserId, notification: &Notification) -> Self {
        Self {
            id: notification.id.0,
            user_id: user.0,
            kind: notification.kind.as_str().to_owned(),
            message: notification.message.clone(),
            from_user: notification.from.map(|id| id.0),
            team_id: notification.team.map(|id| id.0),
            read: notification.read,
            created_at: notification.created_at,
        }
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DatabaseError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: NotificationId(row.id),
            kind: row.kind.parse()?,
            message: row.message,
            from: row.from_user.map(UserId),
            team: row.team_id.map(TeamId),
            read: row.read,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sessions)]
pub struct SessionRow<'a> {
    pub token_digest: &'a str,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use hackmatch_workflow::ids::RequestId;
    use hackmatch_workflow::model::{Admission, TeamStatus};

    use super::*;

    fn team() -> Team {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let leader = UserId::random();
        Team {
            id: TeamId::random(),
            name: "Rustaceans".to_owned(),
            description: String::new(),
            hackathon: Some(HackathonId::random()),
            leader,
            members: vec![leader],
            max_members: 4,
            skills_needed: vec!["rust".to_owned()],
            requirements: String::new(),
            tags: Vec::new(),
            project_idea: String::new(),
            admission: Admission::Approval,
            status: TeamStatus::Open,
            pending_requests: vec![PendingRequest {
                id: RequestId::random(),
                user: UserId::random(),
                message: "let me in".to_owned(),
                created_at: now,
            }],
            revision: 3,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn team_survives_the_row() {
        let team = team();
        let row = TeamRow::try_from(&team).unwrap();
        assert_eq!(row.admission, "approval");
        assert!(row.pending_requests.is_array());
        assert_eq!(Team::try_from(row).unwrap(), team);
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let mut row = TeamRow::try_from(&team()).unwrap();
        row.status = "sleeping".to_owned();
        assert!(matches!(
            Team::try_from(row),
            Err(DatabaseError::Corrupt(_))
        ));
    }

    #[test]
    fn negative_sizes_are_rejected() {
        let mut row = TeamRow::try_from(&team()).unwrap();
        row.max_members = -1;
        assert!(matches!(
            Team::try_from(row),
            Err(DatabaseError::OutOfRange("max_members"))
        ));
    }
}
