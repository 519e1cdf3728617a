//! Value objects shared by the assignment workflow.
//!
//! # Responsibility
//! - Define the user, task and assignment shapes read from storage.
//! - Keep identifiers as plain integer row ids, matching the SQL schema.
//!
//! # Invariants
//! - `User` and `Task` records are owned outside the workflow; the workflow
//!   reads them and never updates them in place.
//! - An `Assignment` is unique per `(task, user)` pair.

pub mod assignment;
pub mod task;
pub mod user;
