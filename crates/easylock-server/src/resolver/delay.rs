//! Time-ordered queue of pending lock expirations.
//!
//! A min-heap of [`DelayRecord`]s ordered by deadline, then by insertion.
//! [`DelayQueue::next_due`] sleeps until the earliest deadline and is woken
//! early whenever a record with an earlier deadline is pushed.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::time::Instant;

use super::engine::GrantId;

/// Scheduled expiry of one grant.
#[derive(Debug, Clone)]
pub struct DelayRecord {
    pub key: String,
    pub grant: GrantId,
    pub expires_at: Instant,
    seq: u64,
}

impl PartialEq for DelayRecord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DelayRecord {}

impl PartialOrd for DelayRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.expires_at
            .cmp(&other.expires_at)
            .then(self.seq.cmp(&other.seq))
    }
}

#[derive(Default)]
pub struct DelayQueue {
    heap: Mutex<BinaryHeap<Reverse<DelayRecord>>>,
    seq: AtomicU64,
    wakeup: Notify,
}

impl DelayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, key: &str, grant: GrantId, expires_at: Instant) {
        let record = DelayRecord {
            key: key.to_string(),
            grant,
            expires_at,
            seq: self.seq.fetch_add(1, AtomicOrdering::Relaxed),
        };

        let earliest = {
            let mut heap = self.heap();
            let earliest = heap
                .peek()
                .map_or(true, |Reverse(head)| record < *head);
            heap.push(Reverse(record));
            earliest
        };
        if earliest {
            self.wakeup.notify_one();
        }
    }

    pub fn len(&self) -> usize {
        self.heap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap().is_empty()
    }

    /// Deadline of the earliest record, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap().peek().map(|Reverse(head)| head.expires_at)
    }

    /// Waits for the earliest record to come due and removes it.
    ///
    /// Cancel safe: a record is only removed on the poll that returns it.
    pub async fn next_due(&self) -> DelayRecord {
        loop {
            let deadline = {
                let mut heap = self.heap();
                match heap.peek().map(|Reverse(head)| head.expires_at) {
                    Some(at) if at <= Instant::now() => {
                        if let Some(Reverse(record)) = heap.pop() {
                            return record;
                        }
                        None
                    }
                    other => other,
                }
            };

            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => {}
                        _ = self.wakeup.notified() => {}
                    }
                }
                None => self.wakeup.notified().await,
            }
        }
    }

    fn heap(&self) -> MutexGuard<'_, BinaryHeap<Reverse<DelayRecord>>> {
        self.heap.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
