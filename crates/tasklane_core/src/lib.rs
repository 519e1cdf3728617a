//! Core domain logic for tasklane.
//!
//! Owners assign users to their tasks, list and remove assignees, spread
//! unassigned tasks over the least loaded users, and users pick the one task
//! they are actively working on. All state lives in SQLite; committed
//! selections are pushed to connected clients through the notification hub.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::assignment::{ActiveTaskSummary, Assignment};
pub use model::task::{Task, TaskId};
pub use model::user::{User, UserId, UserValidationError};
pub use notify::hub::{ClientHub, DEFAULT_HUB_CAPACITY};
pub use notify::message::{ClientMessage, MessageKind};
pub use notify::{NotificationChannel, NotifyError, NotifyResult};
pub use repo::assignment_repo::{Activation, AssignmentRepository, SqliteAssignmentRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::assignment_service::{
    AssignmentError, AssignmentResult, AssignmentService, BalanceFailure, BalanceReport,
    BalancedAssignment, ForbiddenReason,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
