use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::StoreResult;
use crate::ids::{NotificationId, TeamId, UserId};
use crate::model::{Notification, NotificationKind};
use crate::store::Store;

/// A notification that still has to be delivered to `recipient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub message: String,
    pub from: Option<UserId>,
    pub team: Option<TeamId>,
}

impl Notice {
    pub fn system(recipient: UserId, message: impl Into<String>) -> Self {
        Self {
            recipient,
            kind: NotificationKind::System,
            message: message.into(),
            from: None,
            team: None,
        }
    }

    pub fn team_request(recipient: UserId, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::TeamRequest,
            ..Self::system(recipient, message)
        }
    }

    #[must_use]
    pub fn from_user(mut self, from: UserId) -> Self {
        self.from = Some(from);
        self
    }

    #[must_use]
    pub fn about_team(mut self, team: TeamId) -> Self {
        self.team = Some(team);
        self
    }
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notice: Notice) -> StoreResult<()>;
}

/// Appends notices to the recipient's inbox in the store.
pub struct InboxDispatcher {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl InboxDispatcher {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl NotificationDispatcher for InboxDispatcher {
    async fn dispatch(&self, notice: Notice) -> StoreResult<()> {
        let notification = Notification {
            id: NotificationId::random(),
            kind: notice.kind,
            message: notice.message,
            from: notice.from,
            team: notice.team,
            read: false,
            created_at: self.clock.now(),
        };
        self.store
            .push_notification(notice.recipient, notification)
            .await
    }
}

/// Delivers after the state change has been committed. Failures are only
/// logged, the committed change stands.
pub async fn deliver(dispatcher: &dyn NotificationDispatcher, notices: Vec<Notice>) {
    for notice in notices {
        let recipient = notice.recipient;
        match dispatcher.dispatch(notice).await {
            Ok(()) => debug!(%recipient, "notification delivered"),
            Err(error) => warn!(%recipient, %error, "failed to deliver notification"),
        }
    }
}
