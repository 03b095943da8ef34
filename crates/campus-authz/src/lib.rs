//! Authorization engine for the Campus platform.
//!
//! A pure, total rule evaluator mapping `(role, action, resource kind,
//! ownership)` to [`Decision::Allow`] or [`Decision::Deny`]. The rule table is
//! static: it is built into the binary and never mutated at runtime.
//!
//! Every mutating entry point for notices, events and jobs calls [`authorize`] (or
//! [`decide`]) before writing and turns a deny into
//! [`ActionError::PermissionDenied`] without touching the store.
//!
//! ```rust
//! use campus_authz::decide;
//! use campus_types::{Action, Actor, Decision, ResourceKind, Role};
//!
//! let alumnus = Actor::new("u-7", Role::Alumni);
//! assert_eq!(decide(&alumnus, Action::Create, ResourceKind::Job, false), Decision::Allow);
//! assert_eq!(decide(&alumnus, Action::Delete, ResourceKind::Job, false), Decision::Deny);
//! ```

mod rules;

pub use rules::{Match, Rule};

use campus_types::{Action, ActionError, Actor, Decision, ResourceKind, Role};

/// An ordered, immutable set of rules evaluated first-match-wins.
#[derive(Debug, Clone, Copy)]
pub struct PolicyTable {
    rules: &'static [Rule],
}

impl PolicyTable {
    /// The platform's rule table.
    pub const fn standard() -> Self {
        Self {
            rules: rules::STANDARD_RULES,
        }
    }

    pub fn rules(&self) -> &'static [Rule] {
        self.rules
    }

    /// Evaluates the table. Falls back to deny when no rule matches.
    pub fn evaluate(
        &self,
        role: Role,
        action: Action,
        kind: ResourceKind,
        is_owner: bool,
    ) -> Decision {
        self.rules
            .iter()
            .find(|rule| rule.matches(role, action, kind, is_owner))
            .map_or(Decision::Deny, |rule| rule.decision)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Decides whether `actor` may perform `action` on a resource of `kind`.
///
/// `is_owner` is the ownership fact: the resource's `author_id` equals the
/// actor's id. Callers without a concrete resource (e.g. creation) pass
/// `false`.
pub fn decide(actor: &Actor, action: Action, kind: ResourceKind, is_owner: bool) -> Decision {
    PolicyTable::standard().evaluate(actor.role, action, kind, is_owner)
}

/// String-level entry point. Unrecognized labels are denied.
pub fn decide_raw(role: &str, action: &str, kind: &str, is_owner: bool) -> Decision {
    match (Role::parse(role), Action::parse(action), ResourceKind::parse(kind)) {
        (Some(role), Some(action), Some(kind)) => {
            PolicyTable::standard().evaluate(role, action, kind, is_owner)
        }
        _ => Decision::Deny,
    }
}

/// [`decide`], with deny mapped to [`ActionError::PermissionDenied`].
///
/// # Errors
///
/// Returns `PermissionDenied` when the rule table denies the request.
pub fn authorize(
    actor: &Actor,
    action: Action,
    kind: ResourceKind,
    is_owner: bool,
) -> Result<(), ActionError> {
    match decide(actor, action, kind, is_owner) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            tracing::info!(
                actor_id = %actor.id,
                role = %actor.role,
                action = action.as_str(),
                kind = kind.as_str(),
                is_owner,
                "authorization denied"
            );
            Err(ActionError::PermissionDenied {
                action: action.as_str().to_string(),
                kind: kind.as_str().to_string(),
            })
        }
    }
}
