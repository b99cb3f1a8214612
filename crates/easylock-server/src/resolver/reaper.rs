//! Background task that expires timed locks.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::delay::DelayQueue;
use super::engine::LockEngine;

/// Spawns the reaper for `engine`, consuming due records from `queue` until
/// `shutdown` is cancelled.
///
/// A due record whose grant still holds the key is handled like an unlock
/// issued by the server, including the hand-off to the next waiter. Records
/// for grants that were already released or replaced are dropped.
pub fn spawn(
    engine: Arc<LockEngine>,
    queue: Arc<DelayQueue>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let record = tokio::select! {
                _ = shutdown.cancelled() => break,
                record = queue.next_due() => record,
            };

            match engine.revoke(&record.key, record.grant) {
                Some(revoked) => {
                    tracing::info!(
                        kind = %engine.kind(),
                        key = %record.key,
                        owner = %revoked.owner,
                        next = ?revoked.next.as_ref().map(|g| g.owner.to_string()),
                        "expired lock removed"
                    );
                }
                None => {
                    tracing::debug!(
                        key = %record.key,
                        grant = %record.grant,
                        "stale expiry record discarded"
                    );
                }
            }
        }
        tracing::debug!(kind = %engine.kind(), "reaper stopped");
    })
}
