//! Client notification channel.
//!
//! # Responsibility
//! - Define the contract the workflow uses to tell connected clients about
//!   committed state changes.
//! - Provide the in-process hub implementation: broadcast fan-out plus a
//!   persisted per-user message log.
//!
//! # Invariants
//! - Nothing in this module writes assignment rows.
//! - Broadcasting with zero subscribers is not an error.

use crate::model::user::UserId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod hub;
pub mod message;

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors raised while delivering or persisting client messages.
#[derive(Debug)]
pub enum NotifyError {
    /// Message log read/write failed.
    Store(RepoError),
    /// Message payload could not be encoded or decoded.
    Codec(serde_json::Error),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "message log failure: {err}"),
            Self::Codec(err) => write!(f, "message payload codec failure: {err}"),
        }
    }
}

impl Error for NotifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Codec(err) => Some(err),
        }
    }
}

impl From<RepoError> for NotifyError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for NotifyError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(RepoError::from(value))
    }
}

impl From<serde_json::Error> for NotifyError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value)
    }
}

/// Outbound side channel consumed by the assignment workflow.
pub trait NotificationChannel {
    /// Sends one message to every connected client.
    fn broadcast(&self, message: &message::ClientMessage) -> NotifyResult<()>;
    /// Appends one message to the persisted log kept for `user_id`.
    fn append_log(&self, user_id: UserId, message: &message::ClientMessage) -> NotifyResult<()>;
}

impl<T: NotificationChannel + ?Sized> NotificationChannel for &T {
    fn broadcast(&self, message: &message::ClientMessage) -> NotifyResult<()> {
        (**self).broadcast(message)
    }

    fn append_log(&self, user_id: UserId, message: &message::ClientMessage) -> NotifyResult<()> {
        (**self).append_log(user_id, message)
    }
}
