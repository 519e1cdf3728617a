//! Task value object.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};

/// Row id of a task.
pub type TaskId = i64;

/// A task and the user who owns it.
///
/// Only the owner may manage the task's assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub owner: UserId,
}
