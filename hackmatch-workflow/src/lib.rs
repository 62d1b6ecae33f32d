//! Users, hackathons and teams, and the rules that tie them together.
//!
//! The three entry points are [`IdentityDirectory`], [`HackathonRegistry`]
//! and [`TeamWorkflow`]. They share one [`Context`] holding the [`Store`],
//! the [`NotificationDispatcher`] and the [`Clock`].

pub mod clock;
pub mod context;
pub mod credentials;
pub mod error;
pub mod hackathon;
pub mod identity;
pub mod ids;
pub mod memory;
pub mod model;
pub mod notify;
pub mod status;
pub mod store;
pub mod team;
pub mod validate;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{Context, Settings};
pub use error::{StoreError, StoreResult, WorkflowError, WorkflowResult};
pub use hackathon::HackathonRegistry;
pub use identity::IdentityDirectory;
pub use memory::MemoryStore;
pub use notify::{InboxDispatcher, Notice, NotificationDispatcher};
pub use store::Store;
pub use team::TeamWorkflow;

#[derive(Clone)]
pub struct Services {
    pub identity: IdentityDirectory,
    pub hackathons: HackathonRegistry,
    pub teams: TeamWorkflow,
}

impl Services {
    #[must_use]
    pub fn new(context: &Context) -> Self {
        Self {
            identity: IdentityDirectory::new(context.clone()),
            hackathons: HackathonRegistry::new(context.clone()),
            teams: TeamWorkflow::new(context.clone()),
        }
    }
}
