//! Bearer-token registry of live sessions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use campus_session::Session;

/// Maps opaque bearer tokens to logged-in sessions.
///
/// Uses `std::sync::RwLock`: every critical section is a single map
/// operation and never spans an `.await`.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `session` under a fresh random token and returns the token.
    pub fn issue(&self, session: Arc<Session>) -> String {
        let token = hex::encode(rand::random::<[u8; 32]>());
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(token.clone(), session);
        token
    }

    pub fn get(&self, token: &str) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(token)
            .cloned()
    }

    /// Removes and returns the session for `token`.
    pub fn revoke(&self, token: &str) -> Option<Arc<Session>> {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(token)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}
