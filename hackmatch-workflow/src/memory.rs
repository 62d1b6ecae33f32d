use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::ids::{HackathonId, NotificationId, TeamId, UserId};
use crate::model::{Document, Hackathon, Notification, Team, User};
use crate::store::{Change, ChangeSet, Page, Store, TeamFilter, UserSearch};

#[derive(Debug, Default)]
struct Documents {
    users: HashMap<UserId, User>,
    hackathons: HashMap<HackathonId, Hackathon>,
    teams: HashMap<TeamId, Team>,
    notifications: HashMap<UserId, Vec<Notification>>,
    sessions: HashMap<String, UserId>,
}

impl Documents {
    fn check(&self, change: &Change) -> StoreResult<()> {
        match change {
            Change::PutUser(user) => {
                check_put(self.users.get(&user.id), user, "user")?;
                let taken = self
                    .users
                    .values()
                    .any(|other| other.id != user.id && other.email == user.email);
                if taken {
                    return Err(StoreError::Duplicate(format!("email {}", user.email)));
                }
                Ok(())
            }
            Change::PutHackathon(hackathon) => {
                check_put(self.hackathons.get(&hackathon.id), hackathon, "hackathon")
            }
            Change::PutTeam(team) => check_put(self.teams.get(&team.id), team, "team"),
            Change::DeleteHackathon { id, revision } | Change::ClaimHackathon { id, revision } => {
                check_revision(self.hackathons.get(id), *revision, "hackathon")
            }
            Change::DeleteTeam { id, revision } => {
                check_revision(self.teams.get(id), *revision, "team")
            }
        }
    }

    fn apply(&mut self, change: Change) {
        match change {
            Change::PutUser(user) => {
                self.users.insert(user.id, user);
            }
            Change::PutHackathon(hackathon) => {
                self.hackathons.insert(hackathon.id, hackathon);
            }
            Change::PutTeam(team) => {
                self.teams.insert(team.id, team);
            }
            Change::DeleteHackathon { id, .. } => {
                self.hackathons.remove(&id);
            }
            Change::DeleteTeam { id, .. } => {
                self.teams.remove(&id);
            }
            Change::ClaimHackathon { id, .. } => {
                if let Some(hackathon) = self.hackathons.get_mut(&id) {
                    hackathon.revision += 1;
                }
            }
        }
    }
}

fn check_put<D: Document>(stored: Option<&D>, incoming: &D, kind: &str) -> StoreResult<()> {
    match stored {
        None if incoming.revision() == 1 => Ok(()),
        Some(_) if incoming.revision() == 1 => Err(StoreError::Duplicate(kind.to_owned())),
        Some(stored) if stored.revision() == incoming.revision() - 1 => Ok(()),
        _ => Err(StoreError::Stale(kind.to_owned())),
    }
}

fn check_revision<D: Document>(stored: Option<&D>, revision: i64, kind: &str) -> StoreResult<()> {
    match stored {
        Some(stored) if stored.revision() == revision => Ok(()),
        _ => Err(StoreError::Stale(kind.to_owned())),
    }
}

/// Keeps every document in process memory. Used when no database is
/// configured and by the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Documents>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.documents.read().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .documents
            .read()
            .await
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn users(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let documents = self.documents.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| documents.users.get(id))
            .cloned()
            .collect())
    }

    async fn active_users(&self, offset: u64, limit: u64) -> StoreResult<Page<User>> {
        let documents = self.documents.read().await;
        let mut active: Vec<&User> = documents.users.values().filter(|user| user.is_active).collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = active.len() as u64;
        let items = active
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(Page { items, total })
    }

    async fn search_users(&self, search: &UserSearch, limit: usize) -> StoreResult<Vec<User>> {
        let documents = self.documents.read().await;
        let mut found: Vec<User> = documents
            .users
            .values()
            .filter(|user| search.matches(user))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit);
        Ok(found)
    }

    async fn hackathon(&self, id: HackathonId) -> StoreResult<Option<Hackathon>> {
        Ok(self.documents.read().await.hackathons.get(&id).cloned())
    }

    async fn hackathons(&self) -> StoreResult<Vec<Hackathon>> {
        let mut hackathons: Vec<Hackathon> =
            self.documents.read().await.hackathons.values().cloned().collect();
        hackathons.sort_by(|a, b| a.start_date.cmp(&b.start_date));
        Ok(hackathons)
    }

    async fn team(&self, id: TeamId) -> StoreResult<Option<Team>> {
        Ok(self.documents.read().await.teams.get(&id).cloned())
    }

    async fn teams(&self, filter: &TeamFilter) -> StoreResult<Vec<Team>> {
        let mut teams: Vec<Team> = self
            .documents
            .read()
            .await
            .teams
            .values()
            .filter(|team| filter.matches(team))
            .cloned()
            .collect();
        teams.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(teams)
    }

    async fn teams_in_hackathon(&self, hackathon: HackathonId) -> StoreResult<Vec<Team>> {
        self.teams(&TeamFilter {
            hackathon: Some(hackathon),
            ..TeamFilter::default()
        })
        .await
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        for change in changes.changes() {
            documents.check(change)?;
        }
        trace!(changes = changes.len(), "committing");
        for change in changes {
            documents.apply(change);
        }
        Ok(())
    }

    async fn notifications(&self, user: UserId) -> StoreResult<Vec<Notification>> {
        Ok(self
            .documents
            .read()
            .await
            .notifications
            .get(&user)
            .cloned()
            .unwrap_or_default())
    }

    async fn push_notification(
        &self,
        user: UserId,
        notification: Notification,
    ) -> StoreResult<()> {
        self.documents
            .write()
            .await
            .notifications
            .entry(user)
            .or_default()
            .push(notification);
        Ok(())
    }

    async fn mark_notification_read(
        &self,
        user: UserId,
        notification: NotificationId,
    ) -> StoreResult<bool> {
        let mut documents = self.documents.write().await;
        let found = documents
            .notifications
            .get_mut(&user)
            .and_then(|inbox| inbox.iter_mut().find(|entry| entry.id == notification))
            .map(|entry| entry.read = true);
        Ok(found.is_some())
    }

    async fn create_session(
        &self,
        token_digest: &str,
        user: UserId,
        _created_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.documents
            .write()
            .await
            .sessions
            .insert(token_digest.to_owned(), user);
        Ok(())
    }

    async fn session_user(&self, token_digest: &str) -> StoreResult<Option<UserId>> {
        Ok(self.documents.read().await.sessions.get(token_digest).copied())
    }

    async fn delete_session(&self, token_digest: &str) -> StoreResult<bool> {
        Ok(self
            .documents
            .write()
            .await
            .sessions
            .remove(token_digest)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;
    use crate::model::Profile;

    fn user(email: &str) -> User {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        User {
            id: UserId::random(),
            name: "Ada".to_owned(),
            email: email.to_owned(),
            password_hash: String::new(),
            profile: Profile::default(),
            is_active: true,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn stale_revision_rejects_the_whole_change_set() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut ada = user("ada@example.com");
        ada.touch(now);
        let mut changes = ChangeSet::new();
        changes.put_user(ada.clone());
        store.commit(changes).await.unwrap();

        let mut grace = user("grace@example.com");
        grace.touch(now);
        let mut outdated = ada.clone();
        outdated.name = "Ada Lovelace".to_owned();
        let mut changes = ChangeSet::new();
        changes.put_user(grace.clone()).put_user(outdated);

        assert!(matches!(
            store.commit(changes).await,
            Err(StoreError::Stale(_))
        ));
        assert!(store.user(grace.id).await.unwrap().is_none());
        assert_eq!(store.user(ada.id).await.unwrap().unwrap().name, "Ada");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut first = user("ada@example.com");
        first.touch(now);
        let mut changes = ChangeSet::new();
        changes.put_user(first);
        store.commit(changes).await.unwrap();

        let mut second = user("ada@example.com");
        second.touch(now);
        let mut changes = ChangeSet::new();
        changes.put_user(second);

        assert!(matches!(
            store.commit(changes).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn marking_a_foreign_notification_fails() {
        let store = MemoryStore::new();
        let owner = UserId::random();
        let notification = Notification {
            id: NotificationId::random(),
            kind: crate::model::NotificationKind::System,
            message: "hello".to_owned(),
            from: None,
            team: None,
            read: false,
            created_at: Utc::now(),
        };
        store.push_notification(owner, notification.clone()).await.unwrap();

        assert!(!store
            .mark_notification_read(UserId::random(), notification.id)
            .await
            .unwrap());
        assert!(store
            .mark_notification_read(owner, notification.id)
            .await
            .unwrap());
        assert!(store.notifications(owner).await.unwrap()[0].read);
    }
}
