//! Campus events (lectures, meetups) and their participants.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::StoreError;

/// A scheduled campus event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CampusEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub location: String,
    pub author_id: String,
    /// User IDs, in join order.
    pub participants: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampusEventParams {
    pub title: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub location: String,
}

const EVENT_COLUMNS: &str =
    "event_id, title, description, start_date, end_date, location, author_id, created_at";

pub fn create_campus_event(
    conn: &Connection,
    author_id: &str,
    params: &CreateCampusEventParams,
) -> Result<CampusEvent, StoreError> {
    let event_id = Uuid::new_v4().to_string();
    let event = conn.query_row(
        &format!(
            "INSERT INTO campus_events (event_id, title, description, start_date, end_date, location, author_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {EVENT_COLUMNS}"
        ),
        params![
            event_id,
            params.title,
            params.description,
            params.start_date,
            params.end_date,
            params.location,
            author_id,
        ],
        map_row_to_event,
    )?;
    Ok(event)
}

pub fn get_campus_event(conn: &Connection, event_id: &str) -> Result<CampusEvent, StoreError> {
    let mut event = conn
        .query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM campus_events WHERE event_id = ?1"),
            [event_id],
            map_row_to_event,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(event_id.to_string()))?;
    event.participants = list_participants(conn, event_id)?;
    Ok(event)
}

/// Lists events by start date, soonest first.
pub fn list_campus_events(conn: &Connection) -> Result<Vec<CampusEvent>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM campus_events ORDER BY start_date ASC, id ASC"
    ))?;
    let rows = stmt.query_map([], map_row_to_event)?;
    let mut events = Vec::new();
    for row in rows {
        let mut event = row?;
        event.participants = list_participants(conn, &event.id)?;
        events.push(event);
    }
    Ok(events)
}

/// Deletes an event; participant rows go with it.
pub fn delete_campus_event(conn: &Connection, event_id: &str) -> Result<(), StoreError> {
    let count = conn.execute("DELETE FROM campus_events WHERE event_id = ?1", [event_id])?;
    if count == 0 {
        return Err(StoreError::NotFound(event_id.to_string()));
    }
    Ok(())
}

/// Adds a participant. Joining twice is a no-op.
pub fn add_participant(
    conn: &Connection,
    event_id: &str,
    user_id: &str,
) -> Result<CampusEvent, StoreError> {
    // Check the event exists first to return a proper error.
    let _ = get_campus_event(conn, event_id)?;
    conn.execute(
        "INSERT OR IGNORE INTO campus_event_participants (event_id, user_id) VALUES (?1, ?2)",
        params![event_id, user_id],
    )?;
    get_campus_event(conn, event_id)
}

fn list_participants(conn: &Connection, event_id: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM campus_event_participants
         WHERE event_id = ?1 ORDER BY joined_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map([event_id], |row| row.get(0))?;
    let mut participants = Vec::new();
    for row in rows {
        participants.push(row?);
    }
    Ok(participants)
}

fn map_row_to_event(row: &Row) -> rusqlite::Result<CampusEvent> {
    Ok(CampusEvent {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        location: row.get(5)?,
        author_id: row.get(6)?,
        participants: Vec::new(),
        created_at: row.get(7)?,
    })
}
