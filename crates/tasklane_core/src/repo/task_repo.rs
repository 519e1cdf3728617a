//! Task repository: creation and lookup of task records.
//!
//! Tasks are managed outside the assignment workflow; this repository exists
//! so callers and tests can seed and inspect them.

use crate::model::task::{Task, TaskId};
use crate::model::user::UserId;
use crate::repo::{ensure_schema_ready, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for task records.
pub trait TaskRepository {
    /// Creates a task owned by `owner` and returns it.
    fn create_task(&self, description: &str, owner: UserId) -> RepoResult<Task>;
    /// Loads one task by id.
    fn get_task(&self, task_id: TaskId) -> RepoResult<Option<Task>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["tasks"])?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, description: &str, owner: UserId) -> RepoResult<Task> {
        self.conn.execute(
            "INSERT INTO tasks (description, owner) VALUES (?1, ?2);",
            params![description, owner],
        )?;
        Ok(Task {
            id: self.conn.last_insert_rowid(),
            description: description.to_string(),
            owner,
        })
    }

    fn get_task(&self, task_id: TaskId) -> RepoResult<Option<Task>> {
        let task = self
            .conn
            .query_row(
                "SELECT id, description, owner FROM tasks WHERE id = ?1;",
                [task_id],
                |row| {
                    Ok(Task {
                        id: row.get(0)?,
                        description: row.get(1)?,
                        owner: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(task)
    }
}
