use std::env::VarError;

use diesel_async::pooled_connection::deadpool;
use hackmatch_workflow::model::UnknownVariant;
use hackmatch_workflow::StoreError;
use thiserror::Error;

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database url not set in env variable DATABASE_URL")]
    DatabaseEnvUrl(#[from] VarError),
    #[error("Failed to create database pool {0}")]
    PoolBuild(#[from] deadpool::BuildError),
    #[error("Database pool failed {0}")]
    Pool(#[from] deadpool::PoolError),
    #[error("Database query failed {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Failed to connect to the database {0}")]
    Connection(#[from] diesel::ConnectionError),
    #[error("Migration failed {0}")]
    Migration(Box<dyn std::error::Error + Send + Sync>),
    #[error("Migration task failed {0}")]
    MigrationTask(#[from] tokio::task::JoinError),
    #[error("{0} was modified concurrently")]
    Stale(&'static str),
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("Stored row is corrupt {0}")]
    Corrupt(#[from] UnknownVariant),
    #[error("Stored pending requests are corrupt {0}")]
    PendingRequests(#[from] serde_json::Error),
    #[error("Stored {0} is out of range")]
    OutOfRange(&'static str),
}

impl From<DatabaseError> for StoreError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::Stale(kind) => Self::Stale(kind.to_owned()),
            DatabaseError::Duplicate(what) => Self::Duplicate(what),
            error => Self::Backend(Box::new(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_conflicts_stay_recognisable() {
        assert!(matches!(
            StoreError::from(DatabaseError::Stale("team")),
            StoreError::Stale(kind) if kind == "team"
        ));
        assert!(matches!(
            StoreError::from(DatabaseError::Duplicate("email".to_owned())),
            StoreError::Duplicate(_)
        ));
        assert!(matches!(
            StoreError::from(DatabaseError::OutOfRange("max_members")),
            StoreError::Backend(_)
        ));
    }
}
