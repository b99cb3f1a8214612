//! Per-key lock state machine shared by every resolver variant.
//!
//! [`LockEngine`] keeps one [`KeySlot`] per key in a `DashMap`: the current
//! holder plus the FIFO queue of blocked callers. The map's per-key entry
//! guard is the admission monitor. Check-then-claim, enqueue-on-busy and
//! release-then-hand-off each run as one critical section on that key, so
//! work on one key never waits for another.
//!
//! Each queued caller owns a one-shot permission channel. A release pops
//! exactly one waiter, installs it as holder and publishes exactly one
//! permission, so nothing can barge in between the release and the wake-up.
//! A key's slot is dropped as soon as it has neither holder nor waiters.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use easylock_core::{LockKind, Owner, Request};

use super::delay::DelayQueue;
use super::ResolveError;

/// Upper bound for lease deadlines that would overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Serial number of one acquisition. Never reused within an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrantId(pub u64);

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A successful acquisition as seen by the caller.
#[derive(Debug, Clone)]
pub struct Grant {
    pub id: GrantId,
    pub owner: Owner,
    /// Hold count after this acquisition (always 1 for non-reentrant kinds).
    pub holds: u32,
    /// When the grant is reclaimed, for engines with expiry.
    pub expires_at: Option<Instant>,
}

#[derive(Debug)]
struct Holder {
    request: Request,
    grant: GrantId,
    holds: u32,
    acquired_at: Instant,
    expires_at: Option<Instant>,
}

impl Holder {
    fn grant(&self) -> Grant {
        Grant {
            id: self.grant,
            owner: self.request.owner.clone(),
            holds: self.holds,
            expires_at: self.expires_at,
        }
    }
}

struct Waiter {
    ticket: u64,
    request: Request,
    permit: oneshot::Sender<Grant>,
}

/// Holder and waiter queue for one key.
///
/// Invariant: `waiters` is non-empty only while `holder` is `Some`.
#[derive(Default)]
struct KeySlot {
    holder: Option<Holder>,
    waiters: VecDeque<Waiter>,
}

impl KeySlot {
    fn is_idle(&self) -> bool {
        self.holder.is_none() && self.waiters.is_empty()
    }
}

/// Outcome of a non-blocking acquisition attempt.
#[derive(Debug, Clone)]
pub enum Admission {
    /// The key was free and now belongs to the caller.
    Granted(Grant),
    /// The caller already held the key; its hold count went up.
    Reentered(Grant),
    /// Someone else holds the key.
    Busy { holder: Owner },
}

/// Outcome of an owner-initiated release.
#[derive(Debug, Clone)]
pub enum Release {
    /// The key was released and, if anyone was queued, handed to `next`.
    Released { next: Option<Grant> },
    /// Reentrant hold count was decremented but is still positive.
    Retained { holds: u32 },
    /// The caller is not the current holder. `holder` is who is, if anyone.
    NotHeld { holder: Option<Owner> },
}

/// A grant taken back by the server (expiry or abandoned hand-off).
#[derive(Debug, Clone)]
pub struct Revoked {
    pub owner: Owner,
    pub next: Option<Grant>,
}

/// Point-in-time view of one held key.
#[derive(Debug, Clone)]
pub struct KeyStatus {
    pub key: String,
    pub owner: Owner,
    pub identity: i32,
    pub holds: u32,
    pub waiting: usize,
    pub held_for: Duration,
    pub expires_in: Option<Duration>,
}

pub struct LockEngine {
    kind: LockKind,
    reentrant: bool,
    slots: DashMap<String, KeySlot>,
    grants: AtomicU64,
    tickets: AtomicU64,
    expiry: Option<Arc<DelayQueue>>,
}

impl LockEngine {
    /// Creates an engine for `kind`. Reentrancy follows the kind.
    pub fn new(kind: LockKind) -> Self {
        LockEngine {
            kind,
            reentrant: kind == LockKind::Reentrant,
            slots: DashMap::new(),
            grants: AtomicU64::new(0),
            tickets: AtomicU64::new(0),
            expiry: None,
        }
    }

    /// Schedules a delay record on `queue` for every grant this engine makes.
    pub fn with_expiry(mut self, queue: Arc<DelayQueue>) -> Self {
        self.expiry = Some(queue);
        self
    }

    pub fn kind(&self) -> LockKind {
        self.kind
    }

    /// Claims the key if it is free (or re-enters it), never queues.
    pub fn try_acquire(&self, request: &Request) -> Admission {
        let mut slot = self.slots.entry(request.key.clone()).or_default();
        self.admit(&request.key, &mut slot, request)
    }

    /// Claims the key, waiting in FIFO order behind earlier callers if it is
    /// held. Dropping the returned future or cancelling `cancel` gives up the
    /// place in the queue.
    pub async fn acquire(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Grant, ResolveError> {
        let pending = {
            let mut slot = self.slots.entry(request.key.clone()).or_default();
            let holder = match self.admit(&request.key, &mut slot, &request) {
                Admission::Granted(grant) | Admission::Reentered(grant) => return Ok(grant),
                Admission::Busy { holder } => holder,
            };

            let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
            let (permit, receiver) = oneshot::channel();
            tracing::debug!(
                kind = %self.kind,
                key = %request.key,
                owner = %request.owner,
                holder = %holder,
                position = slot.waiters.len() + 1,
                "queued for lock"
            );
            let key = request.key.clone();
            slot.waiters.push_back(Waiter {
                ticket,
                request,
                permit,
            });
            PendingLock {
                engine: self,
                key,
                ticket,
                receiver,
                settled: false,
            }
        };

        pending.wait(cancel).await
    }

    /// Releases the key on behalf of `request.owner`.
    pub fn release(&self, request: &Request) -> Release {
        let Entry::Occupied(mut entry) = self.slots.entry(request.key.clone()) else {
            return Release::NotHeld { holder: None };
        };
        let slot = entry.get_mut();

        match slot.holder.as_mut() {
            Some(holder) if holder.request.same_owner(request) => {
                if self.reentrant && holder.holds > 1 {
                    holder.holds -= 1;
                    tracing::debug!(
                        kind = %self.kind,
                        key = %request.key,
                        owner = %request.owner,
                        holds = holder.holds,
                        "reentrant hold released"
                    );
                    return Release::Retained {
                        holds: holder.holds,
                    };
                }
            }
            Some(holder) => {
                return Release::NotHeld {
                    holder: Some(holder.request.owner.clone()),
                }
            }
            None => return Release::NotHeld { holder: None },
        }

        slot.holder = None;
        tracing::info!(
            kind = %self.kind,
            key = %request.key,
            owner = %request.owner,
            "lock released"
        );
        let next = self.hand_off(&request.key, slot);
        if slot.is_idle() {
            entry.remove();
        }
        Release::Released { next }
    }

    /// Takes the key back from grant `grant`, if it is still the holder.
    ///
    /// Returns `None` when the grant is stale: the key was released, or has
    /// since been granted again.
    pub fn revoke(&self, key: &str, grant: GrantId) -> Option<Revoked> {
        let Entry::Occupied(mut entry) = self.slots.entry(key.to_string()) else {
            return None;
        };
        let slot = entry.get_mut();
        if slot.holder.as_ref().map(|h| h.grant) != Some(grant) {
            return None;
        }

        let holder = slot.holder.take()?;
        let next = self.hand_off(key, slot);
        if slot.is_idle() {
            entry.remove();
        }
        Some(Revoked {
            owner: holder.request.owner,
            next,
        })
    }

    /// Current holder of `key`, if any.
    pub fn holder(&self, key: &str) -> Option<Owner> {
        self.slots
            .get(key)
            .and_then(|slot| slot.holder.as_ref().map(|h| h.request.owner.clone()))
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| slot.holder.is_some())
    }

    /// Number of callers blocked on `key`.
    pub fn waiting(&self, key: &str) -> usize {
        self.slots.get(key).map_or(0, |slot| slot.waiters.len())
    }

    /// Number of keys with a holder or waiters.
    pub fn tracked_keys(&self) -> usize {
        self.slots.len()
    }

    pub fn snapshot(&self) -> Vec<KeyStatus> {
        let now = Instant::now();
        let mut held: Vec<KeyStatus> = self
            .slots
            .iter()
            .filter_map(|entry| {
                let holder = entry.value().holder.as_ref()?;
                Some(KeyStatus {
                    key: entry.key().clone(),
                    owner: holder.request.owner.clone(),
                    identity: holder.request.identity,
                    holds: holder.holds,
                    waiting: entry.value().waiters.len(),
                    held_for: now.saturating_duration_since(holder.acquired_at),
                    expires_in: holder
                        .expires_at
                        .map(|at| at.saturating_duration_since(now)),
                })
            })
            .collect();
        held.sort_by(|a, b| a.key.cmp(&b.key));
        held
    }

    fn admit(&self, key: &str, slot: &mut KeySlot, request: &Request) -> Admission {
        if let Some(holder) = slot.holder.as_mut() {
            if self.reentrant && holder.request.same_owner(request) {
                holder.holds += 1;
                tracing::debug!(
                    kind = %self.kind,
                    key,
                    owner = %request.owner,
                    holds = holder.holds,
                    "lock re-entered"
                );
                return Admission::Reentered(holder.grant());
            }
            return Admission::Busy {
                holder: holder.request.owner.clone(),
            };
        }
        Admission::Granted(self.install(key, slot, request.clone()))
    }

    /// Makes `request` the holder of an unheld slot.
    fn install(&self, key: &str, slot: &mut KeySlot, request: Request) -> Grant {
        let id = GrantId(self.grants.fetch_add(1, Ordering::Relaxed) + 1);
        let now = Instant::now();
        let expires_at = self.expiry.as_ref().map(|queue| {
            let at = now
                .checked_add(request.lease())
                .unwrap_or_else(|| now + FAR_FUTURE);
            queue.push(key, id, at);
            at
        });

        tracing::info!(
            kind = %self.kind,
            key,
            owner = %request.owner,
            grant = %id,
            "lock acquired"
        );

        let holder = Holder {
            request,
            grant: id,
            holds: 1,
            acquired_at: now,
            expires_at,
        };
        let grant = holder.grant();
        slot.holder = Some(holder);
        grant
    }

    /// Passes an unheld slot to the longest-waiting caller still listening.
    fn hand_off(&self, key: &str, slot: &mut KeySlot) -> Option<Grant> {
        while let Some(waiter) = slot.waiters.pop_front() {
            if waiter.permit.is_closed() {
                continue;
            }
            let grant = self.install(key, slot, waiter.request);
            if waiter.permit.send(grant.clone()).is_ok() {
                tracing::debug!(
                    kind = %self.kind,
                    key,
                    owner = %grant.owner,
                    remaining = slot.waiters.len(),
                    "lock handed off"
                );
                return Some(grant);
            }
            slot.holder = None;
        }
        None
    }

    /// Cleans up after a caller that stopped waiting.
    fn abandon(&self, key: &str, ticket: u64, receiver: &mut oneshot::Receiver<Grant>) {
        if let Some(mut slot) = self.slots.get_mut(key) {
            if let Some(pos) = slot.waiters.iter().position(|w| w.ticket == ticket) {
                slot.waiters.remove(pos);
                tracing::debug!(kind = %self.kind, key, "gave up waiting for lock");
                return;
            }
        }

        // Already handed off under the slot guard, so the grant is in the channel.
        if let Ok(grant) = receiver.try_recv() {
            tracing::debug!(
                kind = %self.kind,
                key,
                owner = %grant.owner,
                "returning lock handed to a departed waiter"
            );
            self.return_grant(key, grant.id);
        }
    }

    /// Gives back the one hold that grant `grant` was handed.
    ///
    /// Holds the same owner took by re-entering since then are kept; the key
    /// only moves on once no hold is left.
    fn return_grant(&self, key: &str, grant: GrantId) {
        let Entry::Occupied(mut entry) = self.slots.entry(key.to_string()) else {
            return;
        };
        let slot = entry.get_mut();
        match slot.holder.as_mut() {
            Some(holder) if holder.grant == grant => {
                if holder.holds > 1 {
                    holder.holds -= 1;
                    return;
                }
            }
            _ => return,
        }

        slot.holder = None;
        self.hand_off(key, slot);
        if slot.is_idle() {
            entry.remove();
        }
    }
}

/// A queued acquisition. Leaves the queue (or returns a grant it was handed)
/// if dropped before the permission is consumed.
struct PendingLock<'a> {
    engine: &'a LockEngine,
    key: String,
    ticket: u64,
    receiver: oneshot::Receiver<Grant>,
    settled: bool,
}

impl PendingLock<'_> {
    async fn wait(mut self, cancel: &CancellationToken) -> Result<Grant, ResolveError> {
        tokio::select! {
            biased;
            permit = &mut self.receiver => {
                self.settled = true;
                permit.map_err(|_| ResolveError::Abandoned { key: self.key.clone() })
            }
            _ = cancel.cancelled() => Err(ResolveError::Cancelled { key: self.key.clone() }),
        }
    }
}

impl Drop for PendingLock<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.engine.abandon(&self.key, self.ticket, &mut self.receiver);
        }
    }
}
