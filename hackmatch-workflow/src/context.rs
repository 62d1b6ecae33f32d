use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::{WorkflowError, WorkflowResult};
use crate::ids::{HackathonId, TeamId, UserId};
use crate::memory::MemoryStore;
use crate::model::{Hackathon, Team, User};
use crate::notify::{deliver, InboxDispatcher, Notice, NotificationDispatcher};
use crate::store::{ChangeSet, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Used for teams outside of any hackathon.
    pub default_max_members: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_max_members: 5,
        }
    }
}

/// Everything an operation needs from the outside world.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub clock: Arc<dyn Clock>,
    pub settings: Settings,
}

impl Context {
    /// Notifications go to the inboxes kept by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, settings: Settings) -> Self {
        let notifier = Arc::new(InboxDispatcher::new(Arc::clone(&store), Arc::clone(&clock)));
        Self {
            store,
            notifier,
            clock,
            settings,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
            Settings::default(),
        )
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        self.notifier = notifier;
        self
    }

    pub(crate) async fn load_user(&self, id: UserId) -> WorkflowResult<User> {
        self.store
            .user(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("User not found"))
    }

    pub(crate) async fn load_hackathon(&self, id: HackathonId) -> WorkflowResult<Hackathon> {
        self.store
            .hackathon(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Hackathon not found"))
    }

    pub(crate) async fn load_team(&self, id: TeamId) -> WorkflowResult<Team> {
        self.store
            .team(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Team not found"))
    }

    /// Commits `changes` and only then hands `notices` to the dispatcher.
    pub(crate) async fn finish(
        &self,
        changes: ChangeSet,
        notices: Vec<Notice>,
    ) -> WorkflowResult<()> {
        if !changes.is_empty() {
            self.store.commit(changes).await?;
        }
        deliver(self.notifier.as_ref(), notices).await;
        Ok(())
    }
}
