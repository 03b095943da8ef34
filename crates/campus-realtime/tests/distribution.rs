use std::sync::Arc;
use std::time::Duration;

use campus_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use campus_realtime::{
    Distributor, DistributorConfig, Fanout, FanoutError, LocalFanout, SharedLogFanout,
    SharedLogSettings,
};
use campus_store::RecordStore;
use campus_types::{ActionError, Actor, ChatEvent, MessageDraft, Role};
use tokio::sync::broadcast;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn open_pool(dir: &tempfile::TempDir) -> DbPool {
    let path = dir.path().join("campus.db");
    let pool = create_pool(path.to_str().expect("utf-8 path"), DbRuntimeSettings::default())
        .expect("failed to create pool");
    run_migrations(&pool.get().expect("conn")).expect("failed to run migrations");
    pool
}

fn no_poll() -> DistributorConfig {
    DistributorConfig {
        poll_interval: None,
        ..Default::default()
    }
}

fn local_distributor(pool: DbPool, config: DistributorConfig) -> (Distributor, Arc<LocalFanout>) {
    let fanout = Arc::new(LocalFanout::new(64));
    let distributor = Distributor::new(RecordStore::new(pool), fanout.clone(), config);
    (distributor, fanout)
}

fn to(receiver: Option<&str>, content: &str) -> MessageDraft {
    MessageDraft {
        receiver_id: receiver.map(str::to_string),
        content: content.to_string(),
        attachment: None,
    }
}

fn count(events: &[ChatEvent], id: &str) -> usize {
    events.iter().filter(|e| e.id == id).count()
}

/// Swallows every broadcast, as a partitioned transport would.
struct DroppingFanout {
    tx: broadcast::Sender<ChatEvent>,
}

impl Fanout for DroppingFanout {
    fn broadcast(&self, _event: &ChatEvent) -> Result<(), FanoutError> {
        Err(FanoutError::Database(rusqlite::Error::InvalidQuery))
    }

    fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.tx.subscribe()
    }
}

#[tokio::test]
async fn publisher_receives_own_event_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let (distributor, _fanout) = local_distributor(open_pool(&dir), no_poll());
    let alice = Actor::new("alice", Role::Student);

    let inbox = distributor.subscribe(alice.clone()).await.unwrap();
    let sent = distributor.publish(&alice, to(None, "hello")).await.unwrap();
    assert_eq!(sent.sender_id, "alice");

    let snapshot = timeout(WAIT, inbox.wait_until(|events| !events.is_empty()))
        .await
        .expect("timed out")
        .expect("session stopped");
    assert_eq!(snapshot.as_slice(), &[sent.clone()]);

    // A later subscription replays it once as well.
    let again = distributor.subscribe(alice).await.unwrap();
    assert_eq!(count(&again.snapshot(), &sent.id), 1);
}

#[tokio::test]
async fn direct_message_reaches_both_parties_and_nobody_else() {
    let dir = tempfile::tempdir().unwrap();
    let (distributor, _fanout) = local_distributor(open_pool(&dir), no_poll());
    let a = Actor::new("a", Role::Student);
    let b = Actor::new("b", Role::Student);
    let c = Actor::new("c", Role::Alumni);

    let inbox_a = distributor.subscribe(a.clone()).await.unwrap();
    let inbox_b = distributor.subscribe(b).await.unwrap();
    let inbox_c = distributor.subscribe(c).await.unwrap();

    let dm = distributor.publish(&a, to(Some("b"), "just us")).await.unwrap();
    let group = distributor.publish(&a, to(None, "everyone")).await.unwrap();

    for inbox in [&inbox_a, &inbox_b] {
        let snapshot = timeout(WAIT, inbox.wait_until(|events| events.len() == 2))
            .await
            .expect("timed out")
            .expect("session stopped");
        assert_eq!(count(&snapshot, &dm.id), 1);
        assert_eq!(count(&snapshot, &group.id), 1);
    }

    // The group message was broadcast after the DM, so once C has it C has
    // also processed (and dropped) the DM.
    let snapshot = timeout(WAIT, inbox_c.wait_until(|events| !events.is_empty()))
        .await
        .expect("timed out")
        .expect("session stopped");
    assert_eq!(snapshot.as_slice(), &[group]);
}

#[tokio::test]
async fn subscribe_replays_relevant_history_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (distributor, _fanout) = local_distributor(open_pool(&dir), no_poll());
    let prof = Actor::new("prof", Role::Faculty);

    let first = distributor.publish(&prof, to(None, "one")).await.unwrap();
    let private = distributor.publish(&prof, to(Some("someone"), "psst")).await.unwrap();
    let second = distributor.publish(&prof, to(Some("reader"), "two")).await.unwrap();

    let inbox = distributor
        .subscribe(Actor::new("reader", Role::Student))
        .await
        .unwrap();
    let snapshot = inbox.snapshot();
    let ids: Vec<_> = snapshot.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
    assert_eq!(count(&snapshot, &private.id), 0);
}

#[tokio::test]
async fn persistence_failure_broadcasts_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pool = open_pool(&dir);
    let (distributor, fanout) = local_distributor(pool.clone(), no_poll());
    let mut raw = fanout.subscribe();

    pool.get()
        .unwrap()
        .execute_batch("DROP TABLE messages;")
        .unwrap();

    let err = distributor
        .publish(&Actor::new("alice", Role::Student), to(None, "lost"))
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "persistence_failure");
    assert!(matches!(
        raw.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (distributor, _fanout) = local_distributor(open_pool(&dir), no_poll());

    let err = distributor
        .publish(&Actor::new("alice", Role::Alumni), to(None, "   "))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::InvalidInput(_)));
}

#[tokio::test]
async fn fallback_poll_recovers_from_failed_broadcast() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, _) = broadcast::channel(8);
    let distributor = Distributor::new(
        RecordStore::new(open_pool(&dir)),
        Arc::new(DroppingFanout { tx }),
        DistributorConfig {
            poll_interval: Some(Duration::from_millis(25)),
            ..Default::default()
        },
    );
    let alice = Actor::new("alice", Role::Student);
    let inbox = distributor.subscribe(alice.clone()).await.unwrap();

    // Broadcast fails, publish still succeeds.
    let sent = distributor.publish(&alice, to(None, "eventually")).await.unwrap();

    let snapshot = timeout(WAIT, inbox.wait_until(|events| !events.is_empty()))
        .await
        .expect("timed out")
        .expect("session stopped");
    assert_eq!(snapshot.as_slice(), &[sent]);
}

#[tokio::test]
async fn released_inbox_stops_receiving() {
    let dir = tempfile::tempdir().unwrap();
    let (distributor, _fanout) = local_distributor(open_pool(&dir), no_poll());
    let alice = Actor::new("alice", Role::Student);

    let mut inbox = distributor.subscribe(alice.clone()).await.unwrap();
    let mut changes = inbox.watch();
    inbox.release();
    inbox.release();
    assert!(inbox.is_released());

    distributor.publish(&alice, to(None, "after release")).await.unwrap();

    // The loop drops its sender on exit; no update ever arrives.
    let outcome = timeout(Duration::from_millis(200), changes.changed()).await;
    assert!(matches!(outcome, Ok(Err(_))), "unexpected update: {outcome:?}");
    assert!(inbox.snapshot().is_empty());
}

#[tokio::test]
async fn shared_log_fanout_crosses_processes() {
    let dir = tempfile::tempdir().unwrap();
    let settings = SharedLogSettings {
        tail_interval: Duration::from_millis(20),
        ..Default::default()
    };

    // Two independent stacks over one database file.
    let pool_one = open_pool(&dir);
    let pool_two = open_pool(&dir);
    let fanout_one = Arc::new(SharedLogFanout::spawn(pool_one.clone(), settings).unwrap());
    let fanout_two = Arc::new(SharedLogFanout::spawn(pool_two.clone(), settings).unwrap());
    let one = Distributor::new(RecordStore::new(pool_one), fanout_one, no_poll());
    let two = Distributor::new(RecordStore::new(pool_two), fanout_two, no_poll());

    let bob = Actor::new("bob", Role::Alumni);
    let remote_inbox = two.subscribe(bob.clone()).await.unwrap();
    let local_inbox = one.subscribe(Actor::new("alice", Role::Student)).await.unwrap();

    let sent = one
        .publish(&Actor::new("alice", Role::Student), to(Some("bob"), "across"))
        .await
        .unwrap();

    for inbox in [&remote_inbox, &local_inbox] {
        let snapshot = timeout(WAIT, inbox.wait_until(|events| !events.is_empty()))
            .await
            .expect("timed out")
            .expect("session stopped");
        assert_eq!(snapshot.as_slice(), &[sent.clone()]);
    }
}

#[tokio::test]
async fn every_role_can_publish() {
    let dir = tempfile::tempdir().unwrap();
    let (distributor, _fanout) = local_distributor(open_pool(&dir), no_poll());

    for (id, role) in [("s", Role::Student), ("al", Role::Alumni), ("f", Role::Faculty)] {
        let actor = Actor::new(id, role);
        let sent = distributor
            .publish(&actor, to(None, "hello from every role"))
            .await
            .unwrap_or_else(|e| panic!("{role} could not publish: {e}"));
        assert_eq!(sent.sender_id, id);
    }
}

#[tokio::test]
async fn lagged_receiver_resyncs_from_store() {
    let dir = tempfile::tempdir().unwrap();
    let pool = open_pool(&dir);
    let fanout = Arc::new(LocalFanout::new(1));
    let distributor = Distributor::new(RecordStore::new(pool), fanout.clone(), no_poll());
    let reader = Actor::new("reader", Role::Student);

    let inbox = distributor.subscribe(reader).await.unwrap();

    // The session task cannot run during this synchronous loop, so its
    // one-slot receiver overflows.
    let mut ids = Vec::new();
    for n in 0..20 {
        let event = ChatEvent::stamp("writer", to(None, &format!("burst {n}")));
        let stored = distributor.store().insert_message(&event).unwrap();
        fanout.broadcast(&stored).unwrap();
        ids.push(stored.id);
    }

    let snapshot = timeout(WAIT, inbox.wait_until(|events| events.len() >= ids.len()))
        .await
        .expect("timed out")
        .expect("session stopped");
    assert_eq!(snapshot.len(), ids.len());
    for id in &ids {
        assert_eq!(count(&snapshot, id), 1);
    }
    assert!(snapshot
        .windows(2)
        .all(|pair| pair[0].created_at <= pair[1].created_at));
}
