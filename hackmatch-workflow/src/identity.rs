use serde::Serialize;
use tracing::{info, instrument};

use crate::context::Context;
use crate::credentials;
use crate::error::{WorkflowError, WorkflowResult};
use crate::ids::{NotificationId, UserId};
use crate::model::{
    Availability, Document as _, Experience, Notification, NotificationKind, Profile, Role, User,
};
use crate::store::{ChangeSet, UserSearch};
use crate::validate;

pub const SEARCH_LIMIT: usize = 50;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub profile: ProfileUpdate,
}

/// Fields left at `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub availability: Option<Availability>,
    pub role: Option<Role>,
    pub experience: Option<Experience>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub portfolio: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    fn apply(self, user: &mut User) -> WorkflowResult<()> {
        if let Some(name) = self.name {
            user.name = user_name(&name)?;
        }
        let profile = &mut user.profile;
        if let Some(bio) = self.bio {
            validate::max_chars(&bio, 500, "Bio cannot exceed 500 characters")?;
            profile.bio = bio;
        }
        if let Some(skills) = self.skills {
            profile.skills = validate::list(skills);
        }
        if let Some(interests) = self.interests {
            profile.interests = validate::list(interests);
        }
        if let Some(availability) = self.availability {
            profile.availability = availability;
        }
        if let Some(role) = self.role {
            profile.role = role;
        }
        if let Some(experience) = self.experience {
            profile.experience = experience;
        }
        if let Some(github) = self.github {
            profile.github = github;
        }
        if let Some(linkedin) = self.linkedin {
            profile.linkedin = linkedin;
        }
        if let Some(portfolio) = self.portfolio {
            profile.portfolio = portfolio;
        }
        if let Some(avatar) = self.avatar {
            profile.avatar = avatar;
        }
        Ok(())
    }
}

fn user_name(name: &str) -> WorkflowResult<String> {
    let name = validate::required(name, "Please provide a name")?;
    validate::max_chars(&name, 50, "Name cannot exceed 50 characters")?;
    Ok(name)
}

/// A freshly issued session. The token is only ever shown here.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListing {
    pub users: Vec<User>,
    pub count: usize,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sender {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// A notification with its sender resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub from: Option<Sender>,
    pub team: Option<crate::ids::TeamId>,
    pub read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Users, their credentials and sessions, and their notification inboxes.
#[derive(Clone)]
pub struct IdentityDirectory {
    context: Context,
}

impl IdentityDirectory {
    #[must_use]
    pub const fn new(context: Context) -> Self {
        Self { context }
    }

    #[instrument(skip_all, fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> WorkflowResult<SignedIn> {
        let name = user_name(&registration.name)?;
        let email = validate::email(&registration.email)?;
        validate::password(&registration.password)?;
        if self.context.store.user_by_email(&email).await?.is_some() {
            return Err(WorkflowError::conflict("User already exists"));
        }

        let now = self.context.clock.now();
        let mut user = User {
            id: UserId::random(),
            name,
            email,
            password_hash: credentials::hash_password(&registration.password)
                .map_err(WorkflowError::Credentials)?,
            profile: Profile::default(),
            is_active: true,
            revision: 0,
            created_at: now,
            updated_at: now,
        };
        registration.profile.apply(&mut user)?;
        user.touch(now);

        let mut changes = ChangeSet::new();
        changes.put_user(user.clone());
        self.context.store.commit(changes).await?;
        info!(user = %user.id, "registered");

        let token = self.open_session(user.id).await?;
        Ok(SignedIn { user, token })
    }

    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> WorkflowResult<SignedIn> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(WorkflowError::validation(
                "Please provide an email and password",
            ));
        }
        let email = email.trim().to_lowercase();
        let user = self
            .context
            .store
            .user_by_email(&email)
            .await?
            .filter(|user| credentials::verify_password(password, &user.password_hash))
            .ok_or_else(|| WorkflowError::unauthenticated("Invalid credentials"))?;
        if !user.is_active {
            return Err(WorkflowError::unauthenticated("Account is deactivated"));
        }
        let token = self.open_session(user.id).await?;
        Ok(SignedIn { user, token })
    }

    async fn open_session(&self, user: UserId) -> WorkflowResult<String> {
        let token = credentials::new_session_token();
        self.context
            .store
            .create_session(
                &credentials::token_digest(&token),
                user,
                self.context.clock.now(),
            )
            .await?;
        Ok(token)
    }

    /// Resolves a bearer token to the active user it was issued to.
    pub async fn authenticate(&self, token: &str) -> WorkflowResult<User> {
        let unauthenticated = || WorkflowError::unauthenticated("Not authorized to access this route");
        let id = self
            .context
            .store
            .session_user(&credentials::token_digest(token))
            .await?
            .ok_or_else(unauthenticated)?;
        self.context
            .store
            .user(id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(unauthenticated)
    }

    pub async fn logout(&self, token: &str) -> WorkflowResult<()> {
        self.context
            .store
            .delete_session(&credentials::token_digest(token))
            .await?;
        Ok(())
    }

    pub async fn get_user(&self, id: UserId) -> WorkflowResult<User> {
        self.context.load_user(id).await
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        caller: UserId,
        update: ProfileUpdate,
    ) -> WorkflowResult<User> {
        let mut user = self.context.load_user(caller).await?;
        update.apply(&mut user)?;
        user.touch(self.context.clock.now());

        let mut changes = ChangeSet::new();
        changes.put_user(user.clone());
        self.context.store.commit(changes).await?;
        Ok(user)
    }

    pub async fn search_users(&self, search: &UserSearch) -> WorkflowResult<Vec<User>> {
        Ok(self.context.store.search_users(search, SEARCH_LIMIT).await?)
    }

    /// `page` starts at 1. Zero values fall back to the first page and the
    /// default page size.
    pub async fn list_users(&self, page: u64, limit: u64) -> WorkflowResult<UserListing> {
        let page = page.max(1);
        let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };
        let found = self
            .context
            .store
            .active_users((page - 1).saturating_mul(limit), limit)
            .await?;
        Ok(UserListing {
            count: found.items.len(),
            total: found.total,
            page,
            pages: found.total.div_ceil(limit),
            users: found.items,
        })
    }

    /// Newest first.
    pub async fn notifications(&self, caller: UserId) -> WorkflowResult<Vec<InboxEntry>> {
        let mut inbox = self.context.store.notifications(caller).await?;
        inbox.reverse();

        let mut senders: Vec<UserId> = inbox.iter().filter_map(|entry| entry.from).collect();
        senders.sort_unstable();
        senders.dedup();
        let senders = self.context.store.users(&senders).await?;

        Ok(inbox
            .into_iter()
            .map(|notification: Notification| InboxEntry {
                id: notification.id,
                kind: notification.kind,
                from: notification.from.and_then(|from| {
                    senders.iter().find(|user| user.id == from).map(|user| Sender {
                        id: user.id,
                        name: user.name.clone(),
                        email: user.email.clone(),
                    })
                }),
                message: notification.message,
                team: notification.team,
                read: notification.read,
                created_at: notification.created_at,
            })
            .collect())
    }

    pub async fn mark_notification_read(
        &self,
        caller: UserId,
        notification: NotificationId,
    ) -> WorkflowResult<()> {
        if self
            .context
            .store
            .mark_notification_read(caller, notification)
            .await?
        {
            Ok(())
        } else {
            Err(WorkflowError::not_found("Notification not found"))
        }
    }
}
