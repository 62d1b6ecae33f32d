#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone as _, Utc};
use hackmatch_workflow::hackathon::NewHackathon;
use hackmatch_workflow::identity::{ProfileUpdate, Registration};
use hackmatch_workflow::error::StoreResult;
use hackmatch_workflow::ids::{HackathonId, NotificationId, TeamId, UserId};
use hackmatch_workflow::model::{Admission, Hackathon, Notification, Team, User};
use hackmatch_workflow::store::{ChangeSet, Page, TeamFilter, UserSearch};
use hackmatch_workflow::team::NewTeam;
use hackmatch_workflow::{Context, ManualClock, MemoryStore, Services, Settings, Store};

pub fn at(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, month, day, 12, 0, 0).unwrap()
}

pub struct Harness {
    pub services: Services,
    pub context: Context,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::build(store.clone(), store)
    }

    /// Every commit yields to the runtime once before it is applied, so
    /// operations awaited together read the same state.
    pub fn yielding() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::build(Arc::new(YieldingStore(store.clone())), store)
    }

    fn build(backend: Arc<dyn Store>, store: Arc<MemoryStore>) -> Self {
        let clock = Arc::new(ManualClock::new(at(5, 1)));
        let context = Context::new(backend, clock.clone(), Settings::default());
        Self {
            services: Services::new(&context),
            context,
            store,
            clock,
        }
    }

    pub async fn user(&self, name: &str) -> UserId {
        self.services
            .identity
            .register(Registration {
                name: name.to_owned(),
                email: format!("{}@example.com", name.to_lowercase()),
                password: "secret-password".to_owned(),
                profile: ProfileUpdate::default(),
            })
            .await
            .unwrap()
            .user
            .id
    }

    /// Runs 2025-06-01 to 2025-06-03, registration closes 2025-05-30.
    pub async fn hackathon(&self, creator: UserId) -> HackathonId {
        self.services
            .hackathons
            .create_hackathon(creator, new_hackathon())
            .await
            .unwrap()
            .hackathon
            .id
    }

    pub async fn team(
        &self,
        leader: UserId,
        hackathon: Option<HackathonId>,
        max_members: u32,
    ) -> TeamId {
        self.team_with(leader, hackathon, max_members, Admission::Open)
            .await
    }

    pub async fn team_with(
        &self,
        leader: UserId,
        hackathon: Option<HackathonId>,
        max_members: u32,
        admission: Admission,
    ) -> TeamId {
        self.services
            .teams
            .create_team(leader, NewTeam {
                name: "Rustaceans".to_owned(),
                hackathon,
                max_members: Some(max_members),
                admission,
                ..NewTeam::default()
            })
            .await
            .unwrap()
            .team
            .id
    }

    pub async fn stored_team(&self, id: TeamId) -> Option<Team> {
        self.store.team(id).await.unwrap()
    }

    pub async fn inbox(&self, user: UserId) -> Vec<Notification> {
        self.store.notifications(user).await.unwrap()
    }
}

pub fn new_hackathon() -> NewHackathon {
    NewHackathon {
        name: "Summer Hack".to_owned(),
        description: "Three days of building".to_owned(),
        organizer: "Hack Club".to_owned(),
        start_date: Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()),
        end_date: Some(Utc.with_ymd_and_hms(2025, 6, 3, 0, 0, 0).unwrap()),
        registration_deadline: Some(Utc.with_ymd_and_hms(2025, 5, 30, 0, 0, 0).unwrap()),
        location: "Berlin".to_owned(),
        is_online: false,
        website: String::new(),
        max_team_size: None,
        min_team_size: None,
        categories: vec!["ai".to_owned()],
        tags: vec!["rust".to_owned()],
        prize: String::new(),
        image: String::new(),
    }
}

struct YieldingStore(Arc<MemoryStore>);

#[async_trait]
impl Store for YieldingStore {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        self.0.user(id).await
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.0.user_by_email(email).await
    }

    async fn users(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        self.0.users(ids).await
    }

    async fn active_users(&self, offset: u64, limit: u64) -> StoreResult<Page<User>> {
        self.0.active_users(offset, limit).await
    }

    async fn search_users(&self, search: &UserSearch, limit: usize) -> StoreResult<Vec<User>> {
        self.0.search_users(search, limit).await
    }

    async fn hackathon(&self, id: HackathonId) -> StoreResult<Option<Hackathon>> {
        self.0.hackathon(id).await
    }

    async fn hackathons(&self) -> StoreResult<Vec<Hackathon>> {
        self.0.hackathons().await
    }

    async fn team(&self, id: TeamId) -> StoreResult<Option<Team>> {
        self.0.team(id).await
    }

    async fn teams(&self, filter: &TeamFilter) -> StoreResult<Vec<Team>> {
        self.0.teams(filter).await
    }

    async fn teams_in_hackathon(&self, hackathon: HackathonId) -> StoreResult<Vec<Team>> {
        self.0.teams_in_hackathon(hackathon).await
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.0.commit(changes).await
    }

    async fn notifications(&self, user: UserId) -> StoreResult<Vec<Notification>> {
        self.0.notifications(user).await
    }

    async fn push_notification(
        &self,
        user: UserId,
        notification: Notification,
    ) -> StoreResult<()> {
        self.0.push_notification(user, notification).await
    }

    async fn mark_notification_read(
        &self,
        user: UserId,
        notification: NotificationId,
    ) -> StoreResult<bool> {
        self.0.mark_notification_read(user, notification).await
    }

    async fn create_session(
        &self,
        token_digest: &str,
        user: UserId,
        created_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.0.create_session(token_digest, user, created_at).await
    }

    async fn session_user(&self, token_digest: &str) -> StoreResult<Option<UserId>> {
        self.0.session_user(token_digest).await
    }

    async fn delete_session(&self, token_digest: &str) -> StoreResult<bool> {
        self.0.delete_session(token_digest).await
    }
}
