use std::borrow::Cow;

pub type StoreResult<T> = Result<T, StoreError>;
pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("{0} was modified concurrently, please retry")]
    Stale(String),
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("storage backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(Cow<'static, str>),
    #[error("{0}")]
    Conflict(Cow<'static, str>),
    #[error("{0}")]
    Authorization(Cow<'static, str>),
    #[error("{0}")]
    Authentication(Cow<'static, str>),
    #[error("{0}")]
    NotFound(Cow<'static, str>),
    #[error("store error: {0}")]
    Store(#[source] StoreError),
    #[error("password hashing failed: {0}")]
    Credentials(#[source] argon2::password_hash::Error),
}

impl From<StoreError> for WorkflowError {
    fn from(error: StoreError) -> Self {
        match error {
            error @ (StoreError::Stale(_) | StoreError::Duplicate(_)) => {
                Self::Conflict(error.to_string().into())
            }
            error @ StoreError::Backend(_) => Self::Store(error),
        }
    }
}

impl WorkflowError {
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Authorization(message.into())
    }

    pub fn unauthenticated(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(message.into())
    }
}
