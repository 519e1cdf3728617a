//! Assignment repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the reads and writes the assignment workflow is composed from.
//! - Own the active-task selection unit of work.
//!
//! # Invariants
//! - `activate_assignment` runs its statements in issue order inside one
//!   `IMMEDIATE` transaction; any early return rolls the transaction back.
//! - After a committed activation exactly one row for the user is active.
//! - Listings never expose credential columns.

use crate::model::assignment::{ActiveTaskSummary, Assignment};
use crate::model::task::TaskId;
use crate::model::user::{User, UserId};
use crate::repo::{bool_to_int, ensure_schema_ready, int_to_bool, RepoError, RepoResult};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Result of one active-task selection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The selection was committed.
    Activated(ActiveTaskSummary),
    /// No task exists with the requested id; nothing was written.
    TaskMissing,
    /// The user has no assignment row for the task; rolled back.
    NotAssigned,
}

/// Repository interface consumed by the assignment workflow.
pub trait AssignmentRepository {
    /// Loads the owner of a task, or `None` when the task does not exist.
    fn task_owner(&self, task_id: TaskId) -> RepoResult<Option<UserId>>;
    /// Inserts one inactive `(task, user)` row.
    fn insert_assignment(&self, task_id: TaskId, user_id: UserId) -> RepoResult<()>;
    /// Lists assignees of a task ordered by user id.
    fn list_assignees(&self, task_id: TaskId) -> RepoResult<Vec<User>>;
    /// Deletes the `(task, user)` row and returns the number of rows removed.
    fn delete_assignment(&self, task_id: TaskId, user_id: UserId) -> RepoResult<usize>;
    /// Lists tasks owned by `owner` that have no assignment rows.
    fn unassigned_tasks(&self, owner: UserId) -> RepoResult<Vec<TaskId>>;
    /// Returns the user with the fewest assignments, lowest id first on ties.
    fn least_assigned_user(&self) -> RepoResult<Option<UserId>>;
    /// Makes `(user, task)` the user's only active assignment.
    fn activate_assignment(&self, user_id: UserId, task_id: TaskId) -> RepoResult<Activation>;
    /// Loads the task currently marked active for a user.
    fn active_task(&self, user_id: UserId) -> RepoResult<Option<TaskId>>;
    /// Lists every assignment row of a user ordered by task id.
    fn user_assignments(&self, user_id: UserId) -> RepoResult<Vec<Assignment>>;
}

/// SQLite-backed assignment repository.
pub struct SqliteAssignmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssignmentRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["users", "tasks", "assignments"])?;
        Ok(Self { conn })
    }
}

impl AssignmentRepository for SqliteAssignmentRepository<'_> {
    fn task_owner(&self, task_id: TaskId) -> RepoResult<Option<UserId>> {
        let owner = self
            .conn
            .query_row(
                "SELECT owner FROM tasks WHERE id = ?1;",
                [task_id],
                |row| row.get::<_, UserId>(0),
            )
            .optional()?;
        Ok(owner)
    }

    fn insert_assignment(&self, task_id: TaskId, user_id: UserId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO assignments (task, user, active) VALUES (?1, ?2, ?3);",
            params![task_id, user_id, bool_to_int(false)],
        )?;
        Ok(())
    }

    fn list_assignees(&self, task_id: TaskId) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.id, u.name, u.email
             FROM assignments a
             INNER JOIN users u ON u.id = a.user
             WHERE a.task = ?1
             ORDER BY u.id ASC;",
        )?;
        let mut rows = stmt.query([task_id])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(User::new(
                row.get("id")?,
                row.get::<_, String>("name")?,
                row.get::<_, String>("email")?,
            ));
        }
        Ok(users)
    }

    fn delete_assignment(&self, task_id: TaskId, user_id: UserId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM assignments WHERE task = ?1 AND user = ?2;",
            params![task_id, user_id],
        )?;
        Ok(removed)
    }

    fn unassigned_tasks(&self, owner: UserId) -> RepoResult<Vec<TaskId>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id
             FROM tasks t
             LEFT JOIN assignments a ON a.task = t.id
             WHERE t.owner = ?1
               AND a.task IS NULL
             ORDER BY t.id ASC;",
        )?;
        let mut rows = stmt.query([owner])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(row.get(0)?);
        }
        Ok(tasks)
    }

    fn least_assigned_user(&self) -> RepoResult<Option<UserId>> {
        let user = self
            .conn
            .query_row(
                "SELECT u.id, COUNT(a.task) AS assigned
                 FROM users u
                 LEFT JOIN assignments a ON a.user = u.id
                 GROUP BY u.id
                 ORDER BY assigned ASC, u.id ASC
                 LIMIT 1;",
                [],
                |row| row.get::<_, UserId>(0),
            )
            .optional()?;
        Ok(user)
    }

    fn activate_assignment(&self, user_id: UserId, task_id: TaskId) -> RepoResult<Activation> {
        // Dropping `tx` without commit rolls back.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        if !task_exists_in_tx(&tx, task_id)? {
            debug!(
                "event=activate_assignment module=repo status=rollback reason=task_missing task_id={task_id}"
            );
            return Ok(Activation::TaskMissing);
        }

        let summary = load_summary_in_tx(&tx, user_id, task_id)?;

        tx.execute(
            "UPDATE assignments SET active = ?2 WHERE user = ?1;",
            params![user_id, bool_to_int(false)],
        )?;
        let changed = tx.execute(
            "UPDATE assignments SET active = ?3 WHERE user = ?1 AND task = ?2;",
            params![user_id, task_id, bool_to_int(true)],
        )?;

        if changed == 0 {
            debug!(
                "event=activate_assignment module=repo status=rollback reason=not_assigned user_id={user_id} task_id={task_id}"
            );
            return Ok(Activation::NotAssigned);
        }

        let summary = summary.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "assignment ({task_id}, {user_id}) has no matching user or task row"
            ))
        })?;

        tx.commit()?;
        Ok(Activation::Activated(summary))
    }

    fn active_task(&self, user_id: UserId) -> RepoResult<Option<TaskId>> {
        let mut stmt = self.conn.prepare(
            "SELECT task FROM assignments WHERE user = ?1 AND active = 1 ORDER BY task ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let first = match rows.next()? {
            Some(row) => row.get::<_, TaskId>(0)?,
            None => return Ok(None),
        };
        if rows.next()?.is_some() {
            return Err(RepoError::InvalidData(format!(
                "user {user_id} has more than one active assignment"
            )));
        }
        Ok(Some(first))
    }

    fn user_assignments(&self, user_id: UserId) -> RepoResult<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(
            "SELECT task, user, active
             FROM assignments
             WHERE user = ?1
             ORDER BY task ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(Assignment {
                task: row.get("task")?,
                user: row.get("user")?,
                active: int_to_bool(row.get("active")?, "assignments.active")?,
            });
        }
        Ok(assignments)
    }
}

fn task_exists_in_tx(tx: &Transaction<'_>, task_id: TaskId) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1);",
        [task_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_summary_in_tx(
    tx: &Transaction<'_>,
    user_id: UserId,
    task_id: TaskId,
) -> RepoResult<Option<ActiveTaskSummary>> {
    let summary = tx
        .query_row(
            "SELECT u.name, t.description
             FROM assignments a
             INNER JOIN users u ON u.id = a.user
             INNER JOIN tasks t ON t.id = a.task
             WHERE a.user = ?1 AND a.task = ?2;",
            params![user_id, task_id],
            |row| {
                Ok(ActiveTaskSummary {
                    user_id,
                    user_name: row.get(0)?,
                    task_id,
                    task_description: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(summary)
}
