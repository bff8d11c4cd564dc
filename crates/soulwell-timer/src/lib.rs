//! Cancellable timers owned by a room executor.
//!
//! A room never sleeps on its own loop. Instead it asks [`Timers`] to run
//! a small task that waits and then posts a message back into the room's
//! command channel. The message carries the generation the timer was
//! started with; by the time it is processed the timer may have been
//! replaced or cancelled, so the room checks it with [`Timers::claim`]
//! and drops stale firings.
//!
//! ```ignore
//! let generation = timers.schedule(Key::Grace(player), grace, tx.clone(), move |generation| {
//!     RoomCommand::TimerFired { key: Key::Grace(player), generation }
//! });
//!
//! // later, in the room loop
//! RoomCommand::TimerFired { key, generation } => {
//!     if timers.claim(&key, generation) {
//!         // still the live timer: act on it
//!     }
//! }
//! ```
//!
//! Dropping `Timers` aborts every pending task, so a torn-down room never
//! hears from its timers again.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

/// At most one live timer per key.
pub struct Timers<K> {
    pending: HashMap<K, Pending>,
    next_generation: u64,
}

impl<K> Default for Timers<K> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            next_generation: 1,
        }
    }
}

impl<K: Eq + Hash + Clone + Debug> Timers<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts `make(generation)` to `tx` after `after`.
    ///
    /// Replaces any timer already running under `key`. Returns the new
    /// generation.
    pub fn schedule<M, F>(&mut self, key: K, after: Duration, tx: mpsc::Sender<M>, make: F) -> u64
    where
        M: Send + 'static,
        F: FnOnce(u64) -> M + Send + 'static,
    {
        let deadline = tokio::time::Instant::now() + after;
        self.spawn(key, tx, move |generation| async move {
            tokio::time::sleep_until(deadline).await;
            make(generation)
        })
    }

    /// Runs `task(generation)` in the background and posts its output to
    /// `tx`. Like [`schedule`](Self::schedule), for timers whose wait is
    /// more than a plain sleep.
    pub fn spawn<M, F, Fut>(&mut self, key: K, tx: mpsc::Sender<M>, task: F) -> u64
    where
        M: Send + 'static,
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = M> + Send + 'static,
    {
        let generation = self.next_generation;
        self.next_generation += 1;

        let fut = task(generation);
        let handle = tokio::spawn(async move {
            let msg = fut.await;
            // the room may already be gone
            let _ = tx.send(msg).await;
        });

        tracing::trace!(?key, generation, "timer scheduled");
        if let Some(old) = self.pending.insert(key, Pending { generation, handle }) {
            old.handle.abort();
        }
        generation
    }

    /// Stops the timer under `key`. Returns `false` if none was running.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some(p) => {
                p.handle.abort();
                tracing::trace!(?key, generation = p.generation, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Stops every timer whose key matches.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) {
        self.pending.retain(|k, p| {
            let drop = pred(k);
            if drop {
                p.handle.abort();
            }
            !drop
        });
    }

    pub fn cancel_all(&mut self) {
        for (_, p) in self.pending.drain() {
            p.handle.abort();
        }
    }

    /// `true` if `generation` is the live timer under `key`.
    pub fn is_current(&self, key: &K, generation: u64) -> bool {
        self.pending
            .get(key)
            .is_some_and(|p| p.generation == generation)
    }

    /// Accepts a firing. Returns `true` and forgets the timer if it is
    /// still the live one; `false` for anything stale.
    pub fn claim(&mut self, key: &K, generation: u64) -> bool {
        if self.is_current(key, generation) {
            self.pending.remove(key);
            true
        } else {
            tracing::trace!(?key, generation, "stale timer ignored");
            false
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K> Drop for Timers<K> {
    fn drop(&mut self) {
        for p in self.pending.values() {
            p.handle.abort();
        }
    }
}

/// `base` moved up or down by a random amount of at most `spread`,
/// never below zero. Keeps bots from answering with machine precision.
pub fn jittered(base: Duration, spread: Duration) -> Duration {
    let spread_ms = spread.as_millis() as u64;
    if spread_ms == 0 {
        return base;
    }
    let offset = rand::rng().random_range(0..=spread_ms * 2);
    let base_ms = base.as_millis() as u64;
    Duration::from_millis((base_ms + offset).saturating_sub(spread_ms))
}
