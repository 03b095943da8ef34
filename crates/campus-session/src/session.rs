//! Session lifecycle: login binds and subscribes, logout unbinds and releases.

use std::sync::Mutex;

use campus_realtime::{Distributor, InboxHandle, InboxSnapshot};
use campus_store::{RecordStore, User};
use campus_types::{ActionError, Actor, ChatEvent, MessageDraft};
use tokio::sync::watch;

use crate::credentials::authenticate;
use crate::identity::SessionIdentity;

/// One running client instance.
///
/// Sessions are created by the caller (one per login) and torn down on
/// logout; nothing about them is process-global.
#[derive(Debug)]
pub struct Session {
    identity: SessionIdentity,
    distributor: Distributor,
    inbox: Mutex<Option<InboxHandle>>,
}

impl Session {
    pub fn new(distributor: Distributor) -> Self {
        Self {
            identity: SessionIdentity::new(),
            distributor,
            inbox: Mutex::new(None),
        }
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn actor(&self) -> Option<Actor> {
        self.identity.snapshot()
    }

    pub(crate) fn store(&self) -> &RecordStore {
        self.distributor.store()
    }

    /// Checks credentials, binds the identity and opens the inbox.
    ///
    /// Logging in again replaces the previous identity and subscription.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated` on bad credentials.
    /// - `PersistenceFailure` if the inbox replay cannot be read; the
    ///   session is left logged out.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ActionError> {
        let user = authenticate(self.store(), email, password).await?;
        self.attach(user.actor()).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "session logged in");
        Ok(user)
    }

    /// Binds an already-verified actor and opens its inbox.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceFailure` if the inbox replay cannot be read.
    pub async fn attach(&self, actor: Actor) -> Result<(), ActionError> {
        let handle = match self.distributor.subscribe(actor.clone()).await {
            Ok(handle) => handle,
            Err(e) => {
                self.logout();
                return Err(e);
            }
        };
        // Identity and inbox change under the inbox lock, so concurrent
        // attaches cannot leave one actor bound to another actor's inbox.
        let mut inbox = self.lock_inbox();
        self.identity.bind(actor);
        if let Some(mut previous) = inbox.replace(handle) {
            previous.release();
        }
        Ok(())
    }

    /// Unbinds the identity and releases the inbox. Idempotent.
    pub fn logout(&self) {
        let mut inbox = self.lock_inbox();
        let actor = self.identity.unbind();
        if let Some(mut handle) = inbox.take() {
            handle.release();
        }
        drop(inbox);
        if let Some(actor) = actor {
            tracing::info!(actor_id = %actor.id, "session logged out");
        }
    }

    /// The current ordered inbox, or `None` when logged out.
    pub fn inbox(&self) -> Option<InboxSnapshot> {
        self.lock_inbox().as_ref().map(InboxHandle::snapshot)
    }

    /// The actor whose inbox is open, or `None` when logged out.
    pub fn inbox_owner(&self) -> Option<String> {
        self.lock_inbox()
            .as_ref()
            .map(|handle| handle.actor_id().to_string())
    }

    /// A receiver notified on every inbox change, or `None` when logged out.
    pub fn watch_inbox(&self) -> Option<watch::Receiver<InboxSnapshot>> {
        self.lock_inbox().as_ref().map(InboxHandle::watch)
    }

    /// Publishes a message as the bound actor.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when logged out; otherwise see
    /// [`Distributor::publish`].
    pub async fn publish(&self, draft: MessageDraft) -> Result<ChatEvent, ActionError> {
        let actor = self.identity.require()?;
        self.distributor.publish(&actor, draft).await
    }

    fn lock_inbox(&self) -> std::sync::MutexGuard<'_, Option<InboxHandle>> {
        self.inbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.logout();
    }
}
