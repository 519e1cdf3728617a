//! In-process client hub.
//!
//! # Responsibility
//! - Fan out `ClientMessage`s to every subscribed client receiver.
//! - Persist a per-user message log in `client_messages` so late joiners can
//!   be brought up to date.
//!
//! # Invariants
//! - Fan-out never blocks; a lagging receiver loses the oldest messages.
//! - Log rows store the JSON encoding of the message as sent.

use crate::model::user::UserId;
use crate::notify::message::{ClientMessage, MessageKind};
use crate::notify::{NotificationChannel, NotifyResult};
use crate::repo::ensure_schema_ready;
use log::debug;
use rusqlite::{params, Connection};
use tokio::sync::broadcast;

/// Default number of undelivered messages buffered per receiver.
pub const DEFAULT_HUB_CAPACITY: usize = 256;

/// Broadcast hub with a SQLite-backed message log.
pub struct ClientHub<'conn> {
    conn: &'conn Connection,
    sender: broadcast::Sender<ClientMessage>,
}

impl<'conn> ClientHub<'conn> {
    /// Creates a hub over a migrated connection.
    pub fn try_new(conn: &'conn Connection, capacity: usize) -> NotifyResult<Self> {
        ensure_schema_ready(conn, &["client_messages"])?;
        let (sender, _) = broadcast::channel(capacity.max(1));
        Ok(Self { conn, sender })
    }

    /// Creates a hub with `DEFAULT_HUB_CAPACITY`.
    pub fn with_default_capacity(conn: &'conn Connection) -> NotifyResult<Self> {
        Self::try_new(conn, DEFAULT_HUB_CAPACITY)
    }

    /// Registers a new client receiver.
    ///
    /// Only messages broadcast after this call are delivered; use
    /// `latest_logins` to replay current state.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientMessage> {
        self.sender.subscribe()
    }

    /// Number of connected receivers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Lists the logged messages of one user, oldest first.
    pub fn logged_messages(&self, user_id: UserId) -> NotifyResult<Vec<ClientMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload
             FROM client_messages
             WHERE user_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next()? {
            let payload: String = row.get(0)?;
            messages.push(serde_json::from_str(&payload)?);
        }
        Ok(messages)
    }

    /// Returns the most recent `login` message of every user, ordered by
    /// user id.
    pub fn latest_logins(&self) -> NotifyResult<Vec<ClientMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.payload
             FROM client_messages m
             WHERE m.kind = ?1
               AND m.id = (
                   SELECT MAX(latest.id)
                   FROM client_messages latest
                   WHERE latest.user_id = m.user_id
                     AND latest.kind = ?1
               )
             ORDER BY m.user_id ASC;",
        )?;
        let mut rows = stmt.query([MessageKind::Login.as_str()])?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next()? {
            let payload: String = row.get(0)?;
            messages.push(serde_json::from_str(&payload)?);
        }
        Ok(messages)
    }
}

impl NotificationChannel for ClientHub<'_> {
    fn broadcast(&self, message: &ClientMessage) -> NotifyResult<()> {
        // `send` only fails when nobody is listening.
        let delivered = self.sender.send(message.clone()).unwrap_or(0);
        debug!(
            "event=client_broadcast module=notify status=ok kind={} user_id={} task_id={} receivers={}",
            message.kind.as_str(),
            message.user_id,
            message.task_id,
            delivered
        );
        Ok(())
    }

    fn append_log(&self, user_id: UserId, message: &ClientMessage) -> NotifyResult<()> {
        let payload = serde_json::to_string(message)?;
        self.conn.execute(
            "INSERT INTO client_messages (user_id, kind, payload) VALUES (?1, ?2, ?3);",
            params![user_id, message.kind.as_str(), payload],
        )?;
        Ok(())
    }
}
