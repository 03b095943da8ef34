//! Record store for the Campus platform.
//!
//! Durable keyed collections (users, messages, notices, campus events, jobs)
//! on SQLite. Free functions take a `&Connection` and do one thing each;
//! [`RecordStore`] wraps them with pooling and synchronous change
//! notification (`{collection, snapshot}` on every write).

mod campus_events;
mod error;
mod jobs;
mod messages;
mod notices;
mod notify;
mod record_store;
mod users;

pub use campus_events::{
    add_participant, create_campus_event, delete_campus_event, get_campus_event,
    list_campus_events, CampusEvent, CreateCampusEventParams,
};
pub use error::StoreError;
pub use jobs::{
    create_job, delete_job, get_job, list_jobs, update_job, CreateJobParams, Job, UpdateJobParams,
};
pub use messages::{
    format_timestamp, get_message, insert_message, list_conversation, list_messages,
    list_messages_for,
};
pub use notices::{
    create_notice, delete_notice, get_notice, list_notices, update_notice, CreateNoticeParams,
    Notice, UpdateNoticeParams,
};
pub use notify::{ChangeNotifier, Collection, ListenerId, StoreChange};
pub use record_store::RecordStore;
pub use users::{
    create_user, find_credentials, get_user, list_users, update_profile, CreateUserParams,
    StoredCredentials, User,
};
