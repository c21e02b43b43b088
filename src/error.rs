use thiserror::Error;

use crate::{post::PostId, user::UserId};

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("post {0} not found")]
    PostNotFound(PostId),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("user `{0}` not found")]
    UserNameNotFound(String),

    #[error("no account is linked to this identity")]
    UnknownIdentity,

    #[error("user {requester} may not delete post {post}")]
    Forbidden { post: PostId, requester: UserId },

    #[error("username `{0}` already exists")]
    UsernameTaken(String),

    #[error("this identity is already linked to an account")]
    IdentityTaken,

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    Invalid,
    Internal,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PostNotFound(_)
            | Self::UserNotFound(_)
            | Self::UserNameNotFound(_)
            | Self::UnknownIdentity => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::UsernameTaken(_) | Self::IdentityTaken => ErrorKind::Conflict,
            Self::InvalidInput(_) => ErrorKind::Invalid,
            Self::Poisoned | Self::Sqlite(_) => ErrorKind::Internal,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for LedgerError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::Poisoned
    }
}
