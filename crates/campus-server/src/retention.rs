//! Background task for pruning the shared fan-out log.

use campus_db::DbPool;
use std::time::Duration;
use tokio::time::sleep;

/// Starts a background task that periodically deletes fan-out log rows
/// older than `retention_secs`.
///
/// Relays only ever read rows newer than their cursor, and replay reads the
/// message store, so old log rows are safe to drop. This task runs
/// indefinitely.
pub async fn start_fanout_retention_task(pool: DbPool, interval_secs: u64, retention_secs: u64) {
    let interval = Duration::from_secs(interval_secs.max(1));
    tracing::info!(
        interval_secs,
        retention_secs,
        "starting fanout log retention task"
    );

    loop {
        sleep(interval).await;

        let pool_clone = pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = pool_clone.get()?;
            campus_realtime::prune_fanout_log(&conn, retention_secs)
        })
        .await;

        match result {
            Ok(Ok(count)) => {
                if count > 0 {
                    tracing::info!(count, "pruned fanout log rows");
                } else {
                    tracing::debug!("no fanout log rows to prune");
                }
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "failed to prune fanout log");
            }
            Err(e) => {
                tracing::error!(error = %e, "retention task panicked or was cancelled");
            }
        }
    }
}
