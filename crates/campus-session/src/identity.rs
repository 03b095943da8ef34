//! The authenticated actor of one running client session.

use std::sync::RwLock;

use campus_types::{ActionError, Actor};

/// Holds at most one [`Actor`].
///
/// Operations call [`SessionIdentity::require`] once, at their start, and
/// carry the returned copy to completion. A concurrent logout therefore never
/// changes the identity an in-flight operation runs under.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    current: RwLock<Option<Actor>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the bound actor, taken under the lock.
    pub fn snapshot(&self) -> Option<Actor> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Like [`snapshot`](Self::snapshot), failing when nobody is bound.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` if no actor is bound.
    pub fn require(&self) -> Result<Actor, ActionError> {
        self.snapshot().ok_or(ActionError::NotAuthenticated)
    }

    /// Binds `actor`, returning whoever was bound before.
    pub fn bind(&self, actor: Actor) -> Option<Actor> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.replace(actor)
    }

    /// Clears the identity, returning the actor that was bound.
    pub fn unbind(&self) -> Option<Actor> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.take()
    }

    pub fn is_bound(&self) -> bool {
        self.snapshot().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_types::Role;

    #[test]
    fn unbound_identity_is_not_authenticated() {
        let identity = SessionIdentity::new();
        assert_eq!(identity.require(), Err(ActionError::NotAuthenticated));
        assert!(!identity.is_bound());
    }

    #[test]
    fn captured_actor_survives_logout() {
        let identity = SessionIdentity::new();
        identity.bind(Actor::new("u-1", Role::Alumni));

        let captured = identity.require().unwrap();
        assert_eq!(identity.unbind(), Some(captured.clone()));

        assert_eq!(captured.id, "u-1");
        assert!(identity.snapshot().is_none());
        assert_eq!(identity.unbind(), None);
    }

    #[test]
    fn rebinding_replaces_previous_actor() {
        let identity = SessionIdentity::new();
        assert!(identity.bind(Actor::new("a", Role::Student)).is_none());
        let previous = identity.bind(Actor::new("b", Role::Faculty));
        assert_eq!(previous.map(|a| a.id), Some("a".to_string()));
        assert_eq!(identity.require().unwrap().role, Role::Faculty);
    }
}
