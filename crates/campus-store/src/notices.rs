//! Notice board records.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::StoreError;

/// A notice on the board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub pinned: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoticeParams {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoticeParams {
    pub title: Option<String>,
    pub content: Option<String>,
    pub pinned: Option<bool>,
}

const NOTICE_COLUMNS: &str = "notice_id, title, content, author_id, pinned, created_at";

pub fn create_notice(
    conn: &Connection,
    author_id: &str,
    params: &CreateNoticeParams,
) -> Result<Notice, StoreError> {
    let notice_id = Uuid::new_v4().to_string();
    let notice = conn.query_row(
        &format!(
            "INSERT INTO notices (notice_id, title, content, author_id, pinned)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {NOTICE_COLUMNS}"
        ),
        params![notice_id, params.title, params.content, author_id, params.pinned],
        map_row_to_notice,
    )?;
    Ok(notice)
}

pub fn get_notice(conn: &Connection, notice_id: &str) -> Result<Notice, StoreError> {
    conn.query_row(
        &format!("SELECT {NOTICE_COLUMNS} FROM notices WHERE notice_id = ?1"),
        [notice_id],
        map_row_to_notice,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(notice_id.to_string()))
}

/// Lists notices, newest first.
pub fn list_notices(conn: &Connection) -> Result<Vec<Notice>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTICE_COLUMNS} FROM notices ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map([], map_row_to_notice)?;
    let mut notices = Vec::new();
    for row in rows {
        notices.push(row?);
    }
    Ok(notices)
}

/// Applies a partial update in a single statement. `None` fields are left untouched.
pub fn update_notice(
    conn: &Connection,
    notice_id: &str,
    updates: &UpdateNoticeParams,
) -> Result<Notice, StoreError> {
    conn.query_row(
        &format!(
            "UPDATE notices SET
                title = COALESCE(?1, title),
                content = COALESCE(?2, content),
                pinned = COALESCE(?3, pinned)
             WHERE notice_id = ?4
             RETURNING {NOTICE_COLUMNS}"
        ),
        params![updates.title, updates.content, updates.pinned, notice_id],
        map_row_to_notice,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(notice_id.to_string()))
}

pub fn delete_notice(conn: &Connection, notice_id: &str) -> Result<(), StoreError> {
    let count = conn.execute("DELETE FROM notices WHERE notice_id = ?1", [notice_id])?;
    if count == 0 {
        return Err(StoreError::NotFound(notice_id.to_string()));
    }
    Ok(())
}

fn map_row_to_notice(row: &Row) -> rusqlite::Result<Notice> {
    Ok(Notice {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        pinned: row.get(4)?,
        created_at: row.get(5)?,
    })
}
