//! PostgreSQL implementation of [`hackmatch_workflow::Store`].

pub mod error;
pub mod models;
pub mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness as _};
use error::DatabaseError;
use hackmatch_workflow::error::StoreResult;
use hackmatch_workflow::ids::{HackathonId, NotificationId, TeamId, UserId};
use hackmatch_workflow::model::{Hackathon, Notification, Team, User};
use hackmatch_workflow::store::{Change, ChangeSet, Page, Store, TeamFilter, UserSearch};
use schema::{hackathons, notifications, sessions, teams, users};
use tracing::{debug, info};

use crate::models::{HackathonRow, NotificationRow, SessionRow, TeamRow, UserRow};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

// https://github.com/tokio-rs/axum/tree/main/examples/diesel-async-postgres

pub fn get_database_connection(
    database_url: &str,
) -> Result<Pool<AsyncPgConnection>, DatabaseError> {
    let config = AsyncDieselConnectionManager::<diesel_async::AsyncPgConnection>::new(database_url);
    Ok(Pool::builder(config).build()?)
}

pub fn get_database_connection_from_env() -> Result<Pool<AsyncPgConnection>, DatabaseError> {
    let database_url = std::env::var("DATABASE_URL")?;
    get_database_connection(&database_url)
}

/// Applies the migrations `database_url` has not seen yet. The harness is
/// synchronous, so it runs on a blocking thread over its own connection.
pub async fn run_migrations(database_url: &str) -> Result<(), DatabaseError> {
    let database_url = database_url.to_owned();
    let applied = tokio::task::spawn_blocking(move || -> Result<Vec<String>, DatabaseError> {
        let mut connection =
            AsyncConnectionWrapper::<AsyncPgConnection>::establish(&database_url)?;
        let applied = connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(DatabaseError::Migration)?;
        Ok(applied.iter().map(ToString::to_string).collect())
    })
    .await??;
    if applied.is_empty() {
        info!("database schema is up to date");
    } else {
        info!(?applied, "applied migrations");
    }
    Ok(())
}

fn on_insert(kind: &'static str) -> impl FnOnce(diesel::result::Error) -> DatabaseError {
    move |error| match error {
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            DatabaseError::Duplicate(kind.to_owned())
        }
        error => DatabaseError::Database(error),
    }
}

fn expect_one(affected: usize, kind: &'static str) -> Result<(), DatabaseError> {
    if affected == 0 {
        Err(DatabaseError::Stale(kind))
    } else {
        Ok(())
    }
}

async fn apply(connection: &mut AsyncPgConnection, change: Change) -> Result<(), DatabaseError> {
    let expected = change.expected_revision();
    match change {
        Change::PutUser(user) => {
            let row = UserRow::from(&user);
            if expected == 0 {
                diesel::insert_into(users::table)
                    .values(&row)
                    .execute(connection)
                    .await
                    .map_err(on_insert("user"))?;
            } else {
                let affected = diesel::update(
                    users::table
                        .filter(users::id.eq(row.id))
                        .filter(users::revision.eq(expected)),
                )
                .set(&row)
                .execute(connection)
                .await?;
                expect_one(affected, "user")?;
            }
        }
        Change::PutHackathon(hackathon) => {
            let row = HackathonRow::try_from(&hackathon)?;
            if expected == 0 {
                diesel::insert_into(hackathons::table)
                    .values(&row)
                    .execute(connection)
                    .await
                    .map_err(on_insert("hackathon"))?;
            } else {
                let affected = diesel::update(
                    hackathons::table
                        .filter(hackathons::id.eq(row.id))
                        .filter(hackathons::revision.eq(expected)),
                )
                .set(&row)
                .execute(connection)
                .await?;
                expect_one(affected, "hackathon")?;
            }
        }
        Change::PutTeam(team) => {
            let row = TeamRow::try_from(&team)?;
            if expected == 0 {
                diesel::insert_into(teams::table)
                    .values(&row)
                    .execute(connection)
                    .await
                    .map_err(on_insert("team"))?;
            } else {
                let affected = diesel::update(
                    teams::table
                        .filter(teams::id.eq(row.id))
                        .filter(teams::revision.eq(expected)),
                )
                .set(&row)
                .execute(connection)
                .await?;
                expect_one(affected, "team")?;
            }
        }
        Change::DeleteHackathon { id, revision } => {
            let affected = diesel::delete(
                hackathons::table
                    .filter(hackathons::id.eq(id.0))
                    .filter(hackathons::revision.eq(revision)),
            )
            .execute(connection)
            .await?;
            expect_one(affected, "hackathon")?;
        }
        Change::DeleteTeam { id, revision } => {
            let affected = diesel::delete(
                teams::table
                    .filter(teams::id.eq(id.0))
                    .filter(teams::revision.eq(revision)),
            )
            .execute(connection)
            .await?;
            expect_one(affected, "team")?;
        }
        Change::ClaimHackathon { id, revision } => {
            let affected = diesel::update(
                hackathons::table
                    .filter(hackathons::id.eq(id.0))
                    .filter(hackathons::revision.eq(revision)),
            )
            .set(hackathons::revision.eq(hackathons::revision + 1))
            .execute(connection)
            .await?;
            expect_one(affected, "hackathon")?;
        }
    }
    Ok(())
}

fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>, DatabaseError>
where
    T: TryFrom<R, Error = DatabaseError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: Pool<AsyncPgConnection>) -> Self {
        Self { pool }
    }

    pub fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        Ok(Self::new(get_database_connection(database_url)?))
    }

    async fn load_user(&self, id: UserId) -> Result<Option<User>, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        users::table
            .find(id.0)
            .select(UserRow::as_select())
            .first(connection)
            .await
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    async fn load_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(connection)
            .await
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    async fn load_users(&self, ids: &[UserId]) -> Result<Vec<User>, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        let ids: Vec<uuid::Uuid> = ids.iter().map(|id| id.0).collect();
        let rows = users::table
            .filter(users::id.eq_any(ids))
            .select(UserRow::as_select())
            .load(connection)
            .await?;
        convert(rows)
    }

    async fn load_active_users(&self, offset: u64, limit: u64) -> Result<Page<User>, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        let total: i64 = users::table
            .filter(users::is_active.eq(true))
            .count()
            .get_result(connection)
            .await?;
        let rows = users::table
            .filter(users::is_active.eq(true))
            .order(users::created_at.desc())
            .offset(i64::try_from(offset).unwrap_or(i64::MAX))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select(UserRow::as_select())
            .load(connection)
            .await?;
        Ok(Page {
            items: convert(rows)?,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn load_matching_users(
        &self,
        search: &UserSearch,
        limit: usize,
    ) -> Result<Vec<User>, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        let mut query = users::table
            .filter(users::is_active.eq(true))
            .order(users::created_at.desc())
            .select(UserRow::as_select())
            .into_boxed();
        if let Some(role) = search.role {
            query = query.filter(users::role.eq(role.as_str()));
        }
        if let Some(experience) = search.experience {
            query = query.filter(users::experience.eq(experience.as_str()));
        }
        if let Some(availability) = search.availability {
            query = query.filter(users::availability.eq(availability.as_str()));
        }
        let mut found: Vec<User> = convert(query.load(connection).await?)?;
        found.retain(|user| search.matches(user));
        found.truncate(limit);
        Ok(found)
    }

    async fn load_hackathon(&self, id: HackathonId) -> Result<Option<Hackathon>, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        hackathons::table
            .find(id.0)
            .select(HackathonRow::as_select())
            .first(connection)
            .await
            .optional()?
            .map(Hackathon::try_from)
            .transpose()
    }

    async fn load_hackathons(&self) -> Result<Vec<Hackathon>, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        let rows = hackathons::table
            .order(hackathons::start_date.asc())
            .select(HackathonRow::as_select())
            .load(connection)
            .await?;
        convert(rows)
    }

    async fn load_team(&self, id: TeamId) -> Result<Option<Team>, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        teams::table
            .find(id.0)
            .select(TeamRow::as_select())
            .first(connection)
            .await
            .optional()?
            .map(Team::try_from)
            .transpose()
    }

    async fn load_teams(&self, filter: &TeamFilter) -> Result<Vec<Team>, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        let mut query = teams::table
            .order(teams::created_at.desc())
            .select(TeamRow::as_select())
            .into_boxed();
        if let Some(hackathon) = filter.hackathon {
            query = query.filter(teams::hackathon_id.eq(hackathon.0));
        }
        if let Some(status) = filter.status {
            query = query.filter(teams::status.eq(status.as_str()));
        }
        let mut found: Vec<Team> = convert(query.load(connection).await?)?;
        found.retain(|team| filter.matches(team));
        Ok(found)
    }

    async fn apply_changes(&self, changes: ChangeSet) -> Result<(), DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        let count = changes.len();
        connection
            .transaction::<_, DatabaseError, _>(|connection| {
                async move {
                    for change in changes {
                        apply(connection, change).await?;
                    }
                    Ok(())
                }
                .scope_boxed()
            })
            .await?;
        debug!(changes = count, "committed");
        Ok(())
    }

    async fn load_notifications(&self, user: UserId) -> Result<Vec<Notification>, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        let rows = notifications::table
            .filter(notifications::user_id.eq(user.0))
            .order(notifications::created_at.asc())
            .select(NotificationRow::as_select())
            .load(connection)
            .await?;
        convert(rows)
    }

    async fn insert_notification(
        &self,
        user: UserId,
        notification: &Notification,
    ) -> Result<(), DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        diesel::insert_into(notifications::table)
            .values(NotificationRow::new(user, notification))
            .execute(connection)
            .await?;
        Ok(())
    }

    async fn set_notification_read(
        &self,
        user: UserId,
        notification: NotificationId,
    ) -> Result<bool, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        let affected = diesel::update(
            notifications::table
                .filter(notifications::id.eq(notification.0))
                .filter(notifications::user_id.eq(user.0)),
        )
        .set(notifications::read.eq(true))
        .execute(connection)
        .await?;
        Ok(affected > 0)
    }

    async fn insert_session(
        &self,
        token_digest: &str,
        user: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        diesel::insert_into(sessions::table)
            .values(SessionRow {
                token_digest,
                user_id: user.0,
                created_at,
            })
            .execute(connection)
            .await
            .map_err(on_insert("session"))?;
        Ok(())
    }

    async fn load_session_user(&self, token_digest: &str) -> Result<Option<UserId>, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        let user: Option<uuid::Uuid> = sessions::table
            .find(token_digest)
            .select(sessions::user_id)
            .first(connection)
            .await
            .optional()?;
        Ok(user.map(UserId))
    }

    async fn remove_session(&self, token_digest: &str) -> Result<bool, DatabaseError> {
        let mut pooled = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        let affected = diesel::delete(sessions::table.find(token_digest))
            .execute(connection)
            .await?;
        Ok(affected > 0)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.load_user(id).await?)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.load_user_by_email(email).await?)
    }

    async fn users(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        Ok(self.load_users(ids).await?)
    }

    async fn active_users(&self, offset: u64, limit: u64) -> StoreResult<Page<User>> {
        Ok(self.load_active_users(offset, limit).await?)
    }

    async fn search_users(&self, search: &UserSearch, limit: usize) -> StoreResult<Vec<User>> {
        Ok(self.load_matching_users(search, limit).await?)
    }

    async fn hackathon(&self, id: HackathonId) -> StoreResult<Option<Hackathon>> {
        Ok(self.load_hackathon(id).await?)
    }

    async fn hackathons(&self) -> StoreResult<Vec<Hackathon>> {
        Ok(self.load_hackathons().await?)
    }

    async fn team(&self, id: TeamId) -> StoreResult<Option<Team>> {
        Ok(self.load_team(id).await?)
    }

    async fn teams(&self, filter: &TeamFilter) -> StoreResult<Vec<Team>> {
        Ok(self.load_teams(filter).await?)
    }

    async fn teams_in_hackathon(&self, hackathon: HackathonId) -> StoreResult<Vec<Team>> {
        Ok(self
            .load_teams(&TeamFilter {
                hackathon: Some(hackathon),
                ..TeamFilter::default()
            })
            .await?)
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        Ok(self.apply_changes(changes).await?)
    }

    async fn notifications(&self, user: UserId) -> StoreResult<Vec<Notification>> {
        Ok(self.load_notifications(user).await?)
    }

    async fn push_notification(
        &self,
        user: UserId,
        notification: Notification,
    ) -> StoreResult<()> {
        Ok(self.insert_notification(user, &notification).await?)
    }

    async fn mark_notification_read(
        &self,
        user: UserId,
        notification: NotificationId,
    ) -> StoreResult<bool> {
        Ok(self.set_notification_read(user, notification).await?)
    }

    async fn create_session(
        &self,
        token_digest: &str,
        user: UserId,
        created_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        Ok(self.insert_session(token_digest, user, created_at).await?)
    }

    async fn session_user(&self, token_digest: &str) -> StoreResult<Option<UserId>> {
        Ok(self.load_session_user(token_digest).await?)
    }

    async fn delete_session(&self, token_digest: &str) -> StoreResult<bool> {
        Ok(self.remove_session(token_digest).await?)
    }
}
