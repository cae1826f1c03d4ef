//! services/client/src/app/tracker.rs
//!
//! Shared progress bookkeeping for in-flight transfers.
//!
//! Byte callbacks arrive synchronously from the HTTP adapter, so the map sits
//! behind a `std::sync::Mutex` held only for the length of an update. Every
//! change is published on a `watch` channel for whoever renders it.

use pass_share_core::progress::{ProgressMap, TransferTicket};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

pub type ProgressSnapshot = BTreeMap<String, u8>;

#[derive(Clone)]
pub struct TransferTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    map: Mutex<ProgressMap>,
    updates: watch::Sender<ProgressSnapshot>,
    /// How long a finished transfer stays visible.
    linger: Duration,
}

impl TransferTracker {
    pub fn new(linger: Duration) -> Self {
        let (updates, _) = watch::channel(ProgressSnapshot::new());
        Self {
            inner: Arc::new(TrackerInner {
                map: Mutex::new(ProgressMap::new()),
                updates,
                linger,
            }),
        }
    }

    /// Runs `f` on the map and publishes a snapshot if it reports a change.
    fn update<R>(&self, f: impl FnOnce(&mut ProgressMap) -> (R, bool)) -> R {
        let mut map = self.inner.map.lock().unwrap_or_else(PoisonError::into_inner);
        let (result, changed) = f(&mut map);
        if changed {
            self.inner.updates.send_replace(map.snapshot());
        }
        result
    }

    pub fn start(&self, key: &str) -> TransferTicket {
        self.update(|map| (map.start(key), true))
    }

    pub fn report(&self, key: &str, ticket: TransferTicket, percent: u8) {
        self.update(|map| ((), map.update(key, ticket, percent)));
    }

    pub fn finish(&self, key: &str, ticket: TransferTicket) {
        self.update(|map| ((), map.finish(key, ticket)));
    }

    /// Removes the entry once the linger delay has passed.
    pub fn finish_later(&self, key: String, ticket: TransferTicket) {
        let tracker = self.clone();
        let linger = self.inner.linger;
        tokio::spawn(async move {
            tokio::time::sleep(linger).await;
            tracker.finish(&key, ticket);
        });
    }

    pub fn clear(&self) {
        self.update(|map| {
            let changed = !map.is_empty();
            map.clear();
            ((), changed)
        });
    }

    pub fn get(&self, key: &str) -> Option<u8> {
        self.update(|map| (map.get(key), false))
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.update(|map| (map.snapshot(), false))
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.inner.updates.subscribe()
    }
}
