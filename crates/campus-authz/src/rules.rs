//! The static rule table.

use campus_types::{Action, Decision, ResourceKind, Role};

/// Field matcher for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match<T> {
    Any,
    Is(T),
}

impl<T: PartialEq> Match<T> {
    fn accepts(&self, value: &T) -> bool {
        match self {
            Self::Any => true,
            Self::Is(expected) => expected == value,
        }
    }
}

/// A single policy rule.
///
/// A rule with `requires_ownership` only matches when the actor owns the
/// resource; otherwise evaluation falls through to the next rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub role: Match<Role>,
    pub action: Match<Action>,
    pub kind: Match<ResourceKind>,
    pub requires_ownership: bool,
    pub decision: Decision,
}

impl Rule {
    const fn new(
        role: Match<Role>,
        action: Match<Action>,
        kind: Match<ResourceKind>,
        requires_ownership: bool,
        decision: Decision,
    ) -> Self {
        Self {
            role,
            action,
            kind,
            requires_ownership,
            decision,
        }
    }

    pub fn matches(&self, role: Role, action: Action, kind: ResourceKind, is_owner: bool) -> bool {
        self.role.accepts(&role)
            && self.action.accepts(&action)
            && self.kind.accepts(&kind)
            && (!self.requires_ownership || is_owner)
    }
}

use Decision::{Allow, Deny};
use Match::{Any, Is};

/// Platform rules, first match wins. Faculty must stay first so that no
/// later clause can narrow it.
pub(crate) const STANDARD_RULES: &[Rule] = &[
    Rule::new(Is(Role::Faculty), Any, Any, false, Allow),
    Rule::new(Is(Role::Alumni), Is(Action::Create), Is(ResourceKind::Job), false, Allow),
    Rule::new(Is(Role::Alumni), Is(Action::Delete), Is(ResourceKind::Job), true, Allow),
    Rule::new(Is(Role::Alumni), Is(Action::Read), Any, false, Allow),
    Rule::new(Is(Role::Alumni), Any, Any, false, Deny),
    Rule::new(Is(Role::Student), Is(Action::Read), Any, false, Allow),
    Rule::new(Is(Role::Student), Is(Action::Participate), Is(ResourceKind::Event), false, Allow),
    Rule::new(Is(Role::Student), Any, Any, false, Deny),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_gated_rule_needs_owner() {
        let rule = STANDARD_RULES[2];
        assert!(rule.requires_ownership);
        assert!(rule.matches(Role::Alumni, Action::Delete, ResourceKind::Job, true));
        assert!(!rule.matches(Role::Alumni, Action::Delete, ResourceKind::Job, false));
    }

    #[test]
    fn faculty_rule_is_first() {
        assert_eq!(STANDARD_RULES[0].role, Is(Role::Faculty));
        assert_eq!(STANDARD_RULES[0].decision, Allow);
    }
}
