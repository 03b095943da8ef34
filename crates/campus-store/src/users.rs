//! Member accounts and stored credentials.

use campus_types::{Actor, Role};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::StoreError;

/// A registered member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Public user ID (UUID).
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id.clone(), self.role)
    }
}

/// Parameters for creating a new member.
///
/// The password itself never reaches the store, only its salted digest.
#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_salt: String,
    pub password_hash: String,
}

/// Stored credential material for one account.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub user: User,
    pub password_salt: String,
    pub password_hash: String,
}

const USER_COLUMNS: &str = "user_id, name, email, role, avatar, created_at";

/// Creates a member. Fails with `Conflict` if the email is taken.
pub fn create_user(conn: &Connection, params: &CreateUserParams) -> Result<User, StoreError> {
    let user_id = Uuid::new_v4().to_string();
    conn.query_row(
        &format!(
            "INSERT INTO users (user_id, name, email, role, password_salt, password_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {USER_COLUMNS}"
        ),
        params![
            user_id,
            params.name,
            params.email,
            params.role.as_str(),
            params.password_salt,
            params.password_hash,
        ],
        map_row_to_user,
    )
    .map_err(|e| StoreError::unique_violation(e, format!("email already registered: {}", params.email)))
}

pub fn get_user(conn: &Connection, user_id: &str) -> Result<User, StoreError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
        [user_id],
        map_row_to_user,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
}

/// Lists members, optionally restricted to one role, ordered by name.
pub fn list_users(conn: &Connection, role: Option<Role>) -> Result<Vec<User>, StoreError> {
    let mut users = Vec::new();
    match role {
        Some(role) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY name ASC"
            ))?;
            for row in stmt.query_map([role.as_str()], map_row_to_user)? {
                users.push(row?);
            }
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY name ASC"))?;
            for row in stmt.query_map([], map_row_to_user)? {
                users.push(row?);
            }
        }
    }
    Ok(users)
}

/// Updates profile fields. The role is deliberately not updatable.
pub fn update_profile(
    conn: &Connection,
    user_id: &str,
    name: Option<&str>,
    avatar: Option<&str>,
) -> Result<User, StoreError> {
    conn.query_row(
        &format!(
            "UPDATE users SET name = COALESCE(?1, name), avatar = COALESCE(?2, avatar)
             WHERE user_id = ?3
             RETURNING {USER_COLUMNS}"
        ),
        params![name, avatar, user_id],
        map_row_to_user,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
}

/// Looks up credential material by email. `None` if no such account.
pub fn find_credentials(
    conn: &Connection,
    email: &str,
) -> Result<Option<StoredCredentials>, StoreError> {
    let found = conn
        .query_row(
            &format!(
                "SELECT {USER_COLUMNS}, password_salt, password_hash FROM users WHERE email = ?1"
            ),
            [email],
            |row| {
                Ok(StoredCredentials {
                    user: map_row_to_user(row)?,
                    password_salt: row.get(6)?,
                    password_hash: row.get(7)?,
                })
            },
        )
        .optional()?;
    Ok(found)
}

fn map_row_to_user(row: &Row) -> rusqlite::Result<User> {
    let role_label: String = row.get(3)?;
    let role = Role::parse(&role_label).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown role: {role_label}").into(),
        )
    })?;

    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role,
        avatar: row.get(4)?,
        created_at: row.get(5)?,
    })
}
