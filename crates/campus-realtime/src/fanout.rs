//! Fan-out channels: the broadcast primitive between publishers and sessions.
//!
//! Delivery is at-least-once with no ordering guarantee across sessions and
//! no deadline. Inboxes deduplicate and order; a fan-out only has to get
//! events to every attached receiver eventually.

use std::time::Duration;

use campus_db::DbPool;
use campus_types::ChatEvent;
use rusqlite::{params, Connection};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Default capacity of the in-process broadcast buffer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum number of log rows relayed per tick.
const RELAY_BATCH: i64 = 500;

/// Errors raised by a fan-out implementation.
#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    #[error("fanout database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("fanout connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("fanout serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An abstract at-least-once broadcast channel.
///
/// `broadcast` may block (it is called from a blocking task during publish).
/// Dropping a receiver returned by `subscribe` unsubscribes it.
pub trait Fanout: Send + Sync {
    fn broadcast(&self, event: &ChatEvent) -> Result<(), FanoutError>;

    fn subscribe(&self) -> broadcast::Receiver<ChatEvent>;
}

/// In-process fan-out over a `tokio::sync::broadcast` channel.
#[derive(Debug, Clone)]
pub struct LocalFanout {
    tx: broadcast::Sender<ChatEvent>,
}

impl LocalFanout {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LocalFanout {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Fanout for LocalFanout {
    fn broadcast(&self, event: &ChatEvent) -> Result<(), FanoutError> {
        // No receivers is not a failure: nobody is listening yet.
        if self.tx.send(event.clone()).is_err() {
            tracing::debug!(event_id = %event.id, "no live receivers for broadcast");
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.tx.subscribe()
    }
}

/// Tunables for [`SharedLogFanout`].
#[derive(Debug, Clone, Copy)]
pub struct SharedLogSettings {
    /// Capacity of the local re-broadcast buffer.
    pub channel_capacity: usize,
    /// How often the relay task tails the log.
    pub tail_interval: Duration,
}

impl Default for SharedLogSettings {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            tail_interval: Duration::from_millis(100),
        }
    }
}

/// Cross-process fan-out through the `fanout_log` table.
///
/// `broadcast` appends the event to the shared log. A relay task tails the
/// log by sequence number and re-broadcasts every new row to local
/// receivers, so every process attached to the same database file observes
/// every event, including its own.
#[derive(Debug)]
pub struct SharedLogFanout {
    pool: DbPool,
    local: broadcast::Sender<ChatEvent>,
    relay: JoinHandle<()>,
}

impl SharedLogFanout {
    /// Starts the relay from the current end of the log.
    ///
    /// Must be called from within a Tokio runtime. Events appended before
    /// this call are not relayed; sessions get those from replay.
    ///
    /// # Errors
    ///
    /// Returns an error if the current log position cannot be read.
    pub fn spawn(pool: DbPool, settings: SharedLogSettings) -> Result<Self, FanoutError> {
        let cursor = {
            let conn = pool.get()?;
            last_seq(&conn)?
        };
        let (local, _) = broadcast::channel(settings.channel_capacity.max(1));

        tracing::info!(
            cursor,
            tail_interval_ms = settings.tail_interval.as_millis() as u64,
            "starting shared-log fanout relay"
        );
        let relay = tokio::spawn(relay_loop(
            pool.clone(),
            local.clone(),
            cursor,
            settings.tail_interval,
        ));

        Ok(Self { pool, local, relay })
    }
}

impl Fanout for SharedLogFanout {
    fn broadcast(&self, event: &ChatEvent) -> Result<(), FanoutError> {
        let conn = self.pool.get()?;
        let seq = append_to_log(&conn, event)?;
        tracing::debug!(event_id = %event.id, seq, "appended event to fanout log");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.local.subscribe()
    }
}

impl Drop for SharedLogFanout {
    fn drop(&mut self) {
        self.relay.abort();
    }
}

async fn relay_loop(
    pool: DbPool,
    local: broadcast::Sender<ChatEvent>,
    mut cursor: i64,
    tail_interval: Duration,
) {
    let mut ticker = tokio::time::interval(tail_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let pool_clone = pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = pool_clone.get()?;
            read_log_after(&conn, cursor, RELAY_BATCH)
        })
        .await;

        let rows = match result {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, cursor, "failed to tail fanout log");
                continue;
            }
            Err(e) => {
                tracing::error!(error = %e, "fanout relay read panicked or was cancelled");
                continue;
            }
        };

        for (seq, event_json) in rows {
            cursor = seq;
            match serde_json::from_str::<ChatEvent>(&event_json) {
                Ok(event) => {
                    // Err only means no local receivers right now.
                    let _ = local.send(event);
                }
                Err(e) => {
                    tracing::warn!(seq, error = %e, "skipping malformed fanout log row");
                }
            }
        }
    }
}

/// Appends an event to the shared log, returning its sequence number.
pub fn append_to_log(conn: &Connection, event: &ChatEvent) -> Result<i64, FanoutError> {
    let event_json = serde_json::to_string(event)?;
    let seq = conn.query_row(
        "INSERT INTO fanout_log (event_json) VALUES (?1) RETURNING seq",
        [event_json],
        |row| row.get(0),
    )?;
    Ok(seq)
}

/// Highest sequence number in the log, or 0 when empty.
pub fn last_seq(conn: &Connection) -> Result<i64, FanoutError> {
    let seq: Option<i64> = conn.query_row("SELECT MAX(seq) FROM fanout_log", [], |row| row.get(0))?;
    Ok(seq.unwrap_or(0))
}

/// Rows with `seq > after`, ascending, at most `limit`.
pub fn read_log_after(
    conn: &Connection,
    after: i64,
    limit: i64,
) -> Result<Vec<(i64, String)>, FanoutError> {
    let mut stmt = conn.prepare(
        "SELECT seq, event_json FROM fanout_log WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![after, limit], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Deletes log rows older than `retention_secs`. Returns the number removed.
///
/// Sequence numbers are never reused (`AUTOINCREMENT`), so pruning cannot
/// move a relay cursor backwards.
pub fn prune_fanout_log(conn: &Connection, retention_secs: u64) -> Result<usize, FanoutError> {
    let modifier = format!("-{retention_secs} seconds");
    let deleted = conn.execute(
        "DELETE FROM fanout_log
         WHERE appended_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)",
        [modifier],
    )?;
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_db::run_migrations;
    use campus_types::MessageDraft;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().expect("failed to open in-memory db");
        run_migrations(&conn).expect("failed to run migrations");
        conn
    }

    fn sample() -> ChatEvent {
        ChatEvent::stamp(
            "alice",
            MessageDraft {
                receiver_id: None,
                content: "hello".to_string(),
                attachment: None,
            },
        )
    }

    #[test]
    fn log_is_read_in_sequence_order() {
        let conn = setup_db();
        assert_eq!(last_seq(&conn).unwrap(), 0);

        let first = append_to_log(&conn, &sample()).unwrap();
        let second = append_to_log(&conn, &sample()).unwrap();
        assert!(second > first);
        assert_eq!(last_seq(&conn).unwrap(), second);

        let rows = read_log_after(&conn, first, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, second);
        assert!(read_log_after(&conn, second, 10).unwrap().is_empty());
    }

    #[test]
    fn prune_removes_only_expired_rows() {
        let conn = setup_db();
        append_to_log(&conn, &sample()).unwrap();
        conn.execute(
            "INSERT INTO fanout_log (event_json, appended_at) VALUES ('{}', '2000-01-01T00:00:00.000Z')",
            [],
        )
        .unwrap();

        assert_eq!(prune_fanout_log(&conn, 3600).unwrap(), 1);
        assert_eq!(read_log_after(&conn, 0, 10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn local_fanout_reaches_every_receiver() {
        let fanout = LocalFanout::new(8);
        let mut a = fanout.subscribe();
        let mut b = fanout.subscribe();
        let event = sample();

        fanout.broadcast(&event).unwrap();
        assert_eq!(a.recv().await.unwrap(), event);
        assert_eq!(b.recv().await.unwrap(), event);

        drop(a);
        assert_eq!(fanout.receiver_count(), 1);
    }

    #[test]
    fn local_fanout_without_receivers_is_ok() {
        let fanout = LocalFanout::default();
        assert!(fanout.broadcast(&sample()).is_ok());
    }
}
