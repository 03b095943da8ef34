//! Pooled store facade with change notification.

use campus_db::DbPool;
use campus_types::{ChatEvent, Role};
use rusqlite::Connection;
use serde::Serialize;

use crate::campus_events::{self, CampusEvent, CreateCampusEventParams};
use crate::jobs::{self, CreateJobParams, Job, UpdateJobParams};
use crate::messages;
use crate::notices::{self, CreateNoticeParams, Notice, UpdateNoticeParams};
use crate::notify::{ChangeNotifier, Collection, StoreChange};
use crate::users::{self, CreateUserParams, StoredCredentials, User};
use crate::StoreError;

/// Keyed collections over a shared connection pool.
///
/// Every method is blocking; async callers wrap calls in
/// `tokio::task::spawn_blocking`. Every successful write notifies listeners
/// synchronously before returning.
#[derive(Debug, Clone)]
pub struct RecordStore {
    pool: DbPool,
    notifier: ChangeNotifier,
}

impl RecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.pool.get()?;
        f(&conn)
    }

    /// Runs a write, then publishes the post-write snapshot of `collection`.
    fn write<T>(
        &self,
        collection: Collection,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.pool.get()?;
        let out = f(&conn)?;
        if self.notifier.has_listeners() {
            match snapshot(&conn, collection) {
                Ok(snapshot) => self.notifier.notify(&StoreChange {
                    collection,
                    snapshot,
                }),
                // The write itself succeeded; a failed snapshot must not undo it.
                Err(e) => tracing::warn!(
                    collection = collection.as_str(),
                    "failed to build change snapshot: {}",
                    e
                ),
            }
        }
        Ok(out)
    }

    // ── users ───────────────────────────────────────────────────────

    pub fn create_user(&self, params: &CreateUserParams) -> Result<User, StoreError> {
        self.write(Collection::Users, |conn| users::create_user(conn, params))
    }

    pub fn get_user(&self, user_id: &str) -> Result<User, StoreError> {
        self.with_conn(|conn| users::get_user(conn, user_id))
    }

    pub fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, StoreError> {
        self.with_conn(|conn| users::list_users(conn, role))
    }

    pub fn update_profile(
        &self,
        user_id: &str,
        name: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<User, StoreError> {
        self.write(Collection::Users, |conn| {
            users::update_profile(conn, user_id, name, avatar)
        })
    }

    pub fn find_credentials(&self, email: &str) -> Result<Option<StoredCredentials>, StoreError> {
        self.with_conn(|conn| users::find_credentials(conn, email))
    }

    // ── messages ────────────────────────────────────────────────────

    /// Persists a stamped event and returns the stored copy.
    pub fn insert_message(&self, event: &ChatEvent) -> Result<ChatEvent, StoreError> {
        self.write(Collection::Messages, |conn| messages::insert_message(conn, event))
    }

    pub fn list_messages_for(&self, user_id: &str) -> Result<Vec<ChatEvent>, StoreError> {
        self.with_conn(|conn| messages::list_messages_for(conn, user_id))
    }

    pub fn list_conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<ChatEvent>, StoreError> {
        self.with_conn(|conn| messages::list_conversation(conn, user_a, user_b))
    }

    // ── notices ─────────────────────────────────────────────────────

    pub fn create_notice(
        &self,
        author_id: &str,
        params: &CreateNoticeParams,
    ) -> Result<Notice, StoreError> {
        self.write(Collection::Notices, |conn| {
            notices::create_notice(conn, author_id, params)
        })
    }

    pub fn get_notice(&self, notice_id: &str) -> Result<Notice, StoreError> {
        self.with_conn(|conn| notices::get_notice(conn, notice_id))
    }

    pub fn list_notices(&self) -> Result<Vec<Notice>, StoreError> {
        self.with_conn(notices::list_notices)
    }

    pub fn update_notice(
        &self,
        notice_id: &str,
        updates: &UpdateNoticeParams,
    ) -> Result<Notice, StoreError> {
        self.write(Collection::Notices, |conn| {
            notices::update_notice(conn, notice_id, updates)
        })
    }

    pub fn delete_notice(&self, notice_id: &str) -> Result<(), StoreError> {
        self.write(Collection::Notices, |conn| notices::delete_notice(conn, notice_id))
    }

    // ── campus events ───────────────────────────────────────────────

    pub fn create_campus_event(
        &self,
        author_id: &str,
        params: &CreateCampusEventParams,
    ) -> Result<CampusEvent, StoreError> {
        self.write(Collection::Events, |conn| {
            campus_events::create_campus_event(conn, author_id, params)
        })
    }

    pub fn get_campus_event(&self, event_id: &str) -> Result<CampusEvent, StoreError> {
        self.with_conn(|conn| campus_events::get_campus_event(conn, event_id))
    }

    pub fn list_campus_events(&self) -> Result<Vec<CampusEvent>, StoreError> {
        self.with_conn(campus_events::list_campus_events)
    }

    pub fn delete_campus_event(&self, event_id: &str) -> Result<(), StoreError> {
        self.write(Collection::Events, |conn| {
            campus_events::delete_campus_event(conn, event_id)
        })
    }

    pub fn add_participant(&self, event_id: &str, user_id: &str) -> Result<CampusEvent, StoreError> {
        self.write(Collection::Events, |conn| {
            campus_events::add_participant(conn, event_id, user_id)
        })
    }

    // ── jobs ────────────────────────────────────────────────────────

    pub fn create_job(&self, author_id: &str, params: &CreateJobParams) -> Result<Job, StoreError> {
        self.write(Collection::Jobs, |conn| jobs::create_job(conn, author_id, params))
    }

    pub fn get_job(&self, job_id: &str) -> Result<Job, StoreError> {
        self.with_conn(|conn| jobs::get_job(conn, job_id))
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.with_conn(jobs::list_jobs)
    }

    pub fn update_job(&self, job_id: &str, updates: &UpdateJobParams) -> Result<Job, StoreError> {
        self.write(Collection::Jobs, |conn| jobs::update_job(conn, job_id, updates))
    }

    pub fn delete_job(&self, job_id: &str) -> Result<(), StoreError> {
        self.write(Collection::Jobs, |conn| jobs::delete_job(conn, job_id))
    }
}

fn to_json<T: Serialize>(records: Vec<T>) -> Result<serde_json::Value, StoreError> {
    Ok(serde_json::to_value(records)?)
}

fn snapshot(conn: &Connection, collection: Collection) -> Result<serde_json::Value, StoreError> {
    match collection {
        Collection::Users => to_json(users::list_users(conn, None)?),
        Collection::Messages => to_json(messages::list_messages(conn)?),
        Collection::Notices => to_json(notices::list_notices(conn)?),
        Collection::Events => to_json(campus_events::list_campus_events(conn)?),
        Collection::Jobs => to_json(jobs::list_jobs(conn)?),
    }
}
