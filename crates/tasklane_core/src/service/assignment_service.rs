//! Assignment workflow service.
//!
//! # Responsibility
//! - Assign, list and remove task assignees on behalf of the task owner.
//! - Spread an owner's unassigned tasks over the least loaded users.
//! - Switch a user's active task and notify connected clients.
//!
//! # Invariants
//! - Every owner-scoped operation re-checks ownership against storage first;
//!   the check result is never cached.
//! - A failed ownership check performs no writes.
//! - Client notifications are emitted only after the selection committed.

use crate::model::assignment::ActiveTaskSummary;
use crate::model::task::TaskId;
use crate::model::user::{User, UserId};
use crate::notify::message::ClientMessage;
use crate::notify::NotificationChannel;
use crate::repo::assignment_repo::{Activation, AssignmentRepository};
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AssignmentResult<T> = Result<T, AssignmentError>;

/// Why a caller was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// Caller does not own the task.
    NotOwner,
    /// User has no assignment for the task being selected.
    NotAssigned,
}

/// Service error for assignment use-cases.
#[derive(Debug)]
pub enum AssignmentError {
    /// Referenced task does not exist.
    NotFound(TaskId),
    /// Caller may not perform the operation on this task.
    Forbidden {
        task_id: TaskId,
        reason: ForbiddenReason,
    },
    /// Insert rejected by a uniqueness or reference constraint.
    ConstraintViolation(String),
    /// Balanced assignment found no user to give the task to.
    NoCandidateUser(TaskId),
    /// Any other persistence-layer failure.
    Persistence(RepoError),
}

impl Display for AssignmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(task_id) => write!(f, "task not found: {task_id}"),
            Self::Forbidden {
                task_id,
                reason: ForbiddenReason::NotOwner,
            } => write!(f, "caller is not the owner of task {task_id}"),
            Self::Forbidden {
                task_id,
                reason: ForbiddenReason::NotAssigned,
            } => write!(f, "user is not assigned to task {task_id}"),
            Self::ConstraintViolation(details) => write!(f, "{details}"),
            Self::NoCandidateUser(task_id) => {
                write!(f, "no user available to take task {task_id}")
            }
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AssignmentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AssignmentError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Constraint(err) => Self::ConstraintViolation(err.to_string()),
            other => Self::Persistence(other),
        }
    }
}

/// One task handed out by `assign_balanced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalancedAssignment {
    pub task_id: TaskId,
    pub user_id: UserId,
}

/// One task `assign_balanced` could not hand out.
#[derive(Debug)]
pub struct BalanceFailure {
    pub task_id: TaskId,
    pub error: AssignmentError,
}

/// Outcome of a balanced assignment run, in task id order.
#[derive(Debug, Default)]
pub struct BalanceReport {
    pub assigned: Vec<BalancedAssignment>,
    pub failed: Vec<BalanceFailure>,
}

impl BalanceReport {
    /// Number of unassigned tasks that were attempted.
    pub fn attempted(&self) -> usize {
        self.assigned.len() + self.failed.len()
    }
}

/// Assignment workflow over a repository and a notification channel.
pub struct AssignmentService<R: AssignmentRepository, N: NotificationChannel> {
    repo: R,
    notifier: N,
}

impl<R: AssignmentRepository, N: NotificationChannel> AssignmentService<R, N> {
    pub fn new(repo: R, notifier: N) -> Self {
        Self { repo, notifier }
    }

    /// Assigns `user_id` to `task_id` on behalf of `owner`.
    ///
    /// # Errors
    /// - `NotFound` / `Forbidden` from the ownership check.
    /// - `ConstraintViolation` when the pair already exists or the user row
    ///   is missing.
    pub fn assign_task_to_user(
        &self,
        user_id: UserId,
        task_id: TaskId,
        owner: UserId,
    ) -> AssignmentResult<()> {
        self.ensure_owner(task_id, owner)?;
        self.repo.insert_assignment(task_id, user_id)?;
        info!(
            "event=assign_task module=service status=ok task_id={task_id} user_id={user_id}"
        );
        Ok(())
    }

    /// Lists the users assigned to `task_id`, ordered by user id.
    ///
    /// An empty list means the task exists and has no assignees.
    pub fn get_users_assigned(&self, task_id: TaskId, owner: UserId) -> AssignmentResult<Vec<User>> {
        self.ensure_owner(task_id, owner)?;
        Ok(self.repo.list_assignees(task_id)?)
    }

    /// Removes `user_id` from `task_id`.
    ///
    /// Removing a pair that is not assigned succeeds without changes.
    pub fn remove_user(
        &self,
        task_id: TaskId,
        user_id: UserId,
        owner: UserId,
    ) -> AssignmentResult<()> {
        self.ensure_owner(task_id, owner)?;
        let removed = self.repo.delete_assignment(task_id, user_id)?;
        info!(
            "event=remove_assignee module=service status=ok task_id={task_id} user_id={user_id} removed={removed}"
        );
        Ok(())
    }

    /// Hands every unassigned task of `owner` to the least loaded user.
    ///
    /// Tasks are processed one after another in id order; the load count is
    /// re-read before each task so earlier picks are taken into account. A
    /// failure on one task is recorded in the report and the run continues.
    /// The call returns only after every task has been attempted.
    ///
    /// # Errors
    /// - `Persistence` when the unassigned-task listing itself fails.
    pub fn assign_balanced(&self, owner: UserId) -> AssignmentResult<BalanceReport> {
        let tasks = self.repo.unassigned_tasks(owner)?;
        let mut report = BalanceReport::default();

        for task_id in tasks {
            match self.assign_to_least_loaded(task_id, owner) {
                Ok(user_id) => report
                    .assigned
                    .push(BalancedAssignment { task_id, user_id }),
                Err(error) => {
                    warn!(
                        "event=assign_balanced module=service status=error task_id={task_id} error={error}"
                    );
                    report.failed.push(BalanceFailure { task_id, error });
                }
            }
        }

        info!(
            "event=assign_balanced module=service status=ok owner={owner} assigned={} failed={}",
            report.assigned.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Makes `task_id` the active task of `user_id`.
    ///
    /// The previous selection is cleared and the new one set in one unit of
    /// work. On commit an `update` message is broadcast and a `login`
    /// message is logged for the user.
    ///
    /// # Errors
    /// - `NotFound` when the task does not exist.
    /// - `Forbidden { reason: NotAssigned }` when the user is not assigned
    ///   to the task; the previous selection is left untouched.
    pub fn select_task(&self, user_id: UserId, task_id: TaskId) -> AssignmentResult<()> {
        match self.repo.activate_assignment(user_id, task_id)? {
            Activation::TaskMissing => Err(AssignmentError::NotFound(task_id)),
            Activation::NotAssigned => Err(AssignmentError::Forbidden {
                task_id,
                reason: ForbiddenReason::NotAssigned,
            }),
            Activation::Activated(summary) => {
                info!(
                    "event=select_task module=service status=ok user_id={user_id} task_id={task_id}"
                );
                self.publish_selection(&summary);
                Ok(())
            }
        }
    }

    /// Returns the task currently selected by `user_id`, if any.
    pub fn active_task(&self, user_id: UserId) -> AssignmentResult<Option<TaskId>> {
        Ok(self.repo.active_task(user_id)?)
    }

    fn ensure_owner(&self, task_id: TaskId, owner: UserId) -> AssignmentResult<()> {
        match self.repo.task_owner(task_id)? {
            None => Err(AssignmentError::NotFound(task_id)),
            Some(stored) if stored != owner => Err(AssignmentError::Forbidden {
                task_id,
                reason: ForbiddenReason::NotOwner,
            }),
            Some(_) => Ok(()),
        }
    }

    fn assign_to_least_loaded(&self, task_id: TaskId, owner: UserId) -> AssignmentResult<UserId> {
        let user_id = self
            .repo
            .least_assigned_user()?
            .ok_or(AssignmentError::NoCandidateUser(task_id))?;
        self.assign_task_to_user(user_id, task_id, owner)?;
        Ok(user_id)
    }

    // The selection is already committed here; delivery failures are logged
    // and do not change the outcome reported to the caller.
    fn publish_selection(&self, summary: &ActiveTaskSummary) {
        if let Err(err) = self.notifier.broadcast(&ClientMessage::update(summary)) {
            warn!(
                "event=client_broadcast module=service status=error user_id={} task_id={} error={err}",
                summary.user_id, summary.task_id
            );
        }
        if let Err(err) = self
            .notifier
            .append_log(summary.user_id, &ClientMessage::login(summary))
        {
            warn!(
                "event=client_log module=service status=error user_id={} task_id={} error={err}",
                summary.user_id, summary.task_id
            );
        }
    }
}
