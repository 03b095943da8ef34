//! Publish and subscribe.
//!
//! [`Distributor::publish`] stamps, persists, then broadcasts.
//! [`Distributor::subscribe`] attaches a session: it registers for live
//! events, replays what the store already holds, and spawns the task that
//! owns the session's [`Inbox`].

use std::sync::Arc;
use std::time::Duration;

use campus_store::RecordStore;
use campus_types::{ActionError, Actor, ChatEvent, MessageDraft};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval};

use crate::fanout::Fanout;
use crate::inbox::{Delivery, Inbox, DEFAULT_SEEN_CAPACITY};

/// The ordered sequence handed to consumers on every accepted event.
pub type InboxSnapshot = Arc<Vec<ChatEvent>>;

/// Per-session delivery settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributorConfig {
    /// Seen-set capacity per inbox.
    pub seen_capacity: usize,
    /// Fallback poll interval. `None` disables polling; a receiver lag
    /// still triggers a one-off re-read.
    pub poll_interval: Option<Duration>,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            seen_capacity: DEFAULT_SEEN_CAPACITY,
            poll_interval: Some(Duration::from_secs(5)),
        }
    }
}

/// Entry point of the real-time layer. Cheap to clone.
#[derive(Clone)]
pub struct Distributor {
    store: RecordStore,
    fanout: Arc<dyn Fanout>,
    config: DistributorConfig,
}

impl std::fmt::Debug for Distributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Distributor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Distributor {
    pub fn new(store: RecordStore, fanout: Arc<dyn Fanout>, config: DistributorConfig) -> Self {
        Self {
            store,
            fanout,
            config,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn config(&self) -> DistributorConfig {
        self.config
    }

    /// Publishes a message as `actor`.
    ///
    /// Holding an [`Actor`] is the only precondition: every role may message,
    /// so the rule table is not consulted here.
    ///
    /// Either the event is persisted (and broadcast, best effort) and returned,
    /// or nothing is persisted and nothing is broadcast.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the draft has neither content nor attachment.
    /// - `PersistenceFailure` if the store write fails.
    pub async fn publish(&self, actor: &Actor, draft: MessageDraft) -> Result<ChatEvent, ActionError> {
        if draft.content.trim().is_empty() && draft.attachment.is_none() {
            return Err(ActionError::InvalidInput("message is empty".to_string()));
        }

        let event = ChatEvent::stamp(&actor.id, draft);
        let store = self.store.clone();
        let fanout = Arc::clone(&self.fanout);

        let stored = tokio::task::spawn_blocking(move || {
            let stored = store.insert_message(&event)?;
            // Persisted is published: sessions that miss the broadcast get the
            // event from replay or the fallback poll.
            if let Err(e) = fanout.broadcast(&stored) {
                tracing::warn!(event_id = %stored.id, error = %e, "broadcast failed after persist");
            }
            Ok::<_, campus_store::StoreError>(stored)
        })
        .await
        .map_err(|e| ActionError::PersistenceFailure(format!("publish task failed: {e}")))?
        .map_err(|e| {
            tracing::error!(actor_id = %actor.id, error = %e, "failed to persist message");
            ActionError::PersistenceFailure(e.to_string())
        })?;

        tracing::debug!(
            actor_id = %actor.id,
            event_id = %stored.id,
            group = stored.receiver_id.is_none(),
            "message published"
        );
        Ok(stored)
    }

    /// Attaches a session for `actor`.
    ///
    /// The live receiver is registered before the replay read, so no event
    /// can fall between the two. The returned handle already reflects the
    /// replay.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceFailure` if the replay read fails.
    pub async fn subscribe(&self, actor: Actor) -> Result<InboxHandle, ActionError> {
        let live = self.fanout.subscribe();

        let mut inbox = Inbox::new(self.config.seen_capacity);
        let replayed = read_relevant(&self.store, &actor.id).await?;
        let replay_len = replayed.len();
        for event in replayed {
            inbox.accept(event);
        }

        let (snapshots_tx, snapshots_rx) = watch::channel(Arc::new(inbox.events().to_vec()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tracing::info!(actor_id = %actor.id, replayed = replay_len, "session subscribed");

        let poll = self
            .config
            .poll_interval
            .map(|period| tokio::time::interval_at(Instant::now() + period, period));

        let task = tokio::spawn(
            SessionLoop {
                actor_id: actor.id.clone(),
                store: self.store.clone(),
                inbox,
                live,
                poll,
                snapshots: snapshots_tx,
            }
            .run(shutdown_rx),
        );

        Ok(InboxHandle {
            actor_id: actor.id,
            snapshots: snapshots_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

async fn read_relevant(store: &RecordStore, user_id: &str) -> Result<Vec<ChatEvent>, ActionError> {
    let store = store.clone();
    let user_id = user_id.to_string();
    tokio::task::spawn_blocking(move || store.list_messages_for(&user_id))
        .await
        .map_err(|e| ActionError::PersistenceFailure(format!("replay task failed: {e}")))?
        .map_err(|e| ActionError::PersistenceFailure(e.to_string()))
}

/// The per-session task. Sole owner of the inbox.
struct SessionLoop {
    actor_id: String,
    store: RecordStore,
    inbox: Inbox,
    live: broadcast::Receiver<ChatEvent>,
    poll: Option<Interval>,
    snapshots: watch::Sender<InboxSnapshot>,
}

impl SessionLoop {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                received = self.live.recv() => match received {
                    Ok(event) => {
                        if event.is_relevant_to(&self.actor_id) {
                            self.deliver(vec![event]);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            actor_id = %self.actor_id,
                            skipped,
                            "session receiver lagged; re-reading store"
                        );
                        self.resync().await;
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!(actor_id = %self.actor_id, "fanout closed");
                        break;
                    }
                },
                _ = next_poll(&mut self.poll) => self.resync().await,
            }
        }
        tracing::info!(actor_id = %self.actor_id, "session inbox released");
    }

    async fn resync(&mut self) {
        match read_relevant(&self.store, &self.actor_id).await {
            Ok(events) => self.deliver(events),
            Err(e) => {
                tracing::warn!(actor_id = %self.actor_id, error = %e, "fallback poll failed");
            }
        }
    }

    fn deliver(&mut self, events: Vec<ChatEvent>) {
        let mut accepted = 0usize;
        for event in events {
            if self.inbox.accept(event) == Delivery::Accepted {
                accepted += 1;
            }
        }
        if accepted > 0 {
            self.snapshots
                .send_replace(Arc::new(self.inbox.events().to_vec()));
        }
    }
}

async fn next_poll(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// A session's subscription. Releasing it (explicitly or by drop) stops
/// delivery.
#[derive(Debug)]
pub struct InboxHandle {
    actor_id: String,
    snapshots: watch::Receiver<InboxSnapshot>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl InboxHandle {
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// The current ordered sequence.
    pub fn snapshot(&self) -> InboxSnapshot {
        Arc::clone(&self.snapshots.borrow())
    }

    /// A receiver notified with the full ordered sequence on every change.
    pub fn watch(&self) -> watch::Receiver<InboxSnapshot> {
        self.snapshots.clone()
    }

    /// Waits until the sequence satisfies `predicate`, returning it.
    ///
    /// Returns `None` if the session loop has stopped.
    pub async fn wait_until<F>(&self, mut predicate: F) -> Option<InboxSnapshot>
    where
        F: FnMut(&[ChatEvent]) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let snapshot = rx.wait_for(|snapshot| predicate(snapshot)).await.ok()?;
        Some(Arc::clone(&snapshot))
    }

    pub fn is_released(&self) -> bool {
        self.shutdown.is_none()
    }

    /// Stops delivery. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
            tracing::debug!(actor_id = %self.actor_id, "releasing inbox");
        }
        // The loop exits on its own once it sees the signal.
        self.task.take();
    }
}

impl Drop for InboxHandle {
    fn drop(&mut self) {
        self.release();
    }
}
