//! Shared types, error definitions, and constants for the Campus platform.
//!
//! This crate provides the foundational types used across all Campus crates:
//! member roles, the action and resource vocabulary consumed by the
//! authorization engine, the [`ChatEvent`] unit distributed by the real-time
//! layer, and the [`ActionError`] taxonomy surfaced to callers.
//!
//! No crate in the workspace depends on anything *except* `campus-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};

mod error;
mod event;

pub use error::ActionError;
pub use event::{Attachment, AttachmentKind, ChatEvent, MessageDraft};

/// Member roles on the platform.
///
/// A member's role is fixed at registration and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Teaching staff. Unrestricted.
    Faculty,
    /// Enrolled students.
    Student,
    /// Former students.
    Alumni,
}

impl Role {
    /// All roles, in declaration order.
    pub const ALL: [Role; 3] = [Role::Faculty, Role::Student, Role::Alumni];

    /// Returns the string label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Faculty => "faculty",
            Self::Student => "student",
            Self::Alumni => "alumni",
        }
    }

    /// Attempts to parse a role label.
    ///
    /// Returns `None` if the label does not correspond to a known role.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "faculty" => Some(Self::Faculty),
            "student" => Some(Self::Student),
            "alumni" => Some(Self::Alumni),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions an actor may attempt against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Joining a campus event as a participant.
    Participate,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Participate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Participate => "participate",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "create" => Some(Self::Create),
            "read" => Some(Self::Read),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "participate" => Some(Self::Participate),
            _ => None,
        }
    }
}

/// Kinds of resource subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Notice,
    /// A campus event (lecture, meetup), not a [`ChatEvent`].
    Event,
    Job,
    Message,
    User,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Notice,
        ResourceKind::Event,
        ResourceKind::Job,
        ResourceKind::Message,
        ResourceKind::User,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notice => "notice",
            Self::Event => "event",
            Self::Job => "job",
            Self::Message => "message",
            Self::User => "user",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "notice" => Some(Self::Notice),
            "event" => Some(Self::Event),
            "job" => Some(Self::Job),
            "message" => Some(Self::Message),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

/// Outcome of an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// The authenticated identity bound to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Public user ID (UUID).
    pub id: String,
    /// Role assigned at registration.
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Returns `true` if a resource authored by `author_id` belongs to this actor.
    pub fn owns(&self, author_id: &str) -> bool {
        self.id == author_id
    }
}
