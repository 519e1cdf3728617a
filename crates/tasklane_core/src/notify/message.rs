//! Wire shape of messages pushed to connected clients.

use crate::model::assignment::ActiveTaskSummary;
use crate::model::task::TaskId;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};

/// Message category understood by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A user switched the task they are working on.
    Update,
    /// Snapshot of a user's current task, replayed to newly connected clients.
    Login,
}

impl MessageKind {
    /// Stable string stored in `client_messages.kind`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Login => "login",
        }
    }
}

/// One client notification.
///
/// Field names follow the client protocol (`typeMessage`, `userId`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "typeMessage")]
    pub kind: MessageKind,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "taskId")]
    pub task_id: TaskId,
    #[serde(rename = "taskName")]
    pub task_description: String,
}

impl ClientMessage {
    pub fn new(kind: MessageKind, summary: &ActiveTaskSummary) -> Self {
        Self {
            kind,
            user_id: summary.user_id,
            user_name: summary.user_name.clone(),
            task_id: summary.task_id,
            task_description: summary.task_description.clone(),
        }
    }

    pub fn update(summary: &ActiveTaskSummary) -> Self {
        Self::new(MessageKind::Update, summary)
    }

    pub fn login(summary: &ActiveTaskSummary) -> Self {
        Self::new(MessageKind::Login, summary)
    }
}
