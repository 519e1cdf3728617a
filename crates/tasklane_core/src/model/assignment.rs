//! Assignment relation and active-task projection.
//!
//! # Invariants
//! - At most one row exists per `(task, user)`.
//! - At most one row per user has `active == true`; the selection unit of
//!   work maintains this, the schema does not.

use crate::model::task::TaskId;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};

/// Link between one task and one assignee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub task: TaskId,
    pub user: UserId,
    /// Whether this is the user's currently selected task.
    pub active: bool,
}

/// Names read alongside a successful active-task selection.
///
/// Read inside the same transaction that flips the `active` flags, so the
/// notification describes exactly what was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTaskSummary {
    pub user_id: UserId,
    pub user_name: String,
    pub task_id: TaskId,
    pub task_description: String,
}
