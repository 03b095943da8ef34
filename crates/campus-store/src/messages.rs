//! Persisted chat events.
//!
//! Messages arrive already stamped (ID and timestamp are assigned by the
//! publisher), so the store never generates identifiers here. Timestamps are
//! stored as fixed-width RFC 3339 strings with microsecond precision, which
//! keeps lexical and chronological order identical.

use campus_types::{Attachment, ChatEvent};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::StoreError;

const MESSAGE_COLUMNS: &str =
    "message_id, sender_id, receiver_id, content, attachment_json, created_at";

/// Canonical storage form of a message timestamp.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Inserts a stamped event and reads it back in the same statement.
///
/// Fails with `Conflict` if an event with the same ID was already stored.
pub fn insert_message(conn: &Connection, event: &ChatEvent) -> Result<ChatEvent, StoreError> {
    let attachment_json = event
        .attachment
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.query_row(
        &format!(
            "INSERT INTO messages (message_id, sender_id, receiver_id, content, attachment_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {MESSAGE_COLUMNS}"
        ),
        params![
            event.id,
            event.sender_id,
            event.receiver_id,
            event.content,
            attachment_json,
            format_timestamp(&event.created_at),
        ],
        map_row_to_message,
    )
    .map_err(|e| StoreError::unique_violation(e, format!("message already stored: {}", event.id)))
}

pub fn get_message(conn: &Connection, message_id: &str) -> Result<ChatEvent, StoreError> {
    conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE message_id = ?1"),
        [message_id],
        map_row_to_message,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(message_id.to_string()))
}

/// All messages, oldest first.
pub fn list_messages(conn: &Connection) -> Result<Vec<ChatEvent>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map([], map_row_to_message)?;
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

/// Messages relevant to `user_id`: sent by them, addressed to them, or
/// addressed to the whole group. Oldest first.
pub fn list_messages_for(conn: &Connection, user_id: &str) -> Result<Vec<ChatEvent>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE sender_id = ?1 OR receiver_id = ?1 OR receiver_id IS NULL
         ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map([user_id], map_row_to_message)?;
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

/// Direct messages exchanged between two users, oldest first.
pub fn list_conversation(
    conn: &Connection,
    user_a: &str,
    user_b: &str,
) -> Result<Vec<ChatEvent>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)
         ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![user_a, user_b], map_row_to_message)?;
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

fn map_row_to_message(row: &Row) -> rusqlite::Result<ChatEvent> {
    let attachment_json: Option<String> = row.get(4)?;
    let attachment: Option<Attachment> = match attachment_json {
        Some(s) => Some(serde_json::from_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };

    let created_at_str: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);

    Ok(ChatEvent {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        attachment,
        created_at,
    })
}
