//! User repository: creation and lookup of user records.
//!
//! # Invariants
//! - Write paths call `User::validate()` before SQL mutations.
//! - Duplicate emails surface as `RepoError::Constraint`.

use crate::model::user::{User, UserId};
use crate::repo::{ensure_schema_ready, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for user records.
pub trait UserRepository {
    /// Creates a user and returns its public projection.
    fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: Option<&str>,
    ) -> RepoResult<User>;
    /// Loads one user, credentials included.
    fn get_user(&self, user_id: UserId) -> RepoResult<Option<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["users"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: Option<&str>,
    ) -> RepoResult<User> {
        let candidate = User::new(0, name.trim(), email.trim());
        candidate.validate()?;

        self.conn.execute(
            "INSERT INTO users (name, email, hash) VALUES (?1, ?2, ?3);",
            params![candidate.name, candidate.email, password_hash],
        )?;

        Ok(User {
            id: self.conn.last_insert_rowid(),
            ..candidate
        })
    }

    fn get_user(&self, user_id: UserId) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, email, hash FROM users WHERE id = ?1;",
                [user_id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        password_hash: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}
