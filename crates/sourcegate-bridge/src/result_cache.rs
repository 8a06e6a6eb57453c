// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Correlation id -> payload store between the dispatcher and the page.
//
// The dispatcher writes before it notifies; the page reads once when its
// dispatch function runs. A page that navigates away never reads, so every
// entry carries its insertion time and is purged once older than the TTL.
// Reads never see an expired entry. Writes purge at most once per TTL so a
// put stays O(1) between sweeps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use sourcegate_core::config::BridgeConfig;

#[derive(Debug)]
struct Entry {
    value: String,
    stored_at: Instant,
}

#[derive(Debug)]
struct Store {
    entries: HashMap<String, Entry>,
    last_sweep: Instant,
}

impl Store {
    fn purge(&mut self, ttl: Duration, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.stored_at) < ttl);
        self.last_sweep = now;
        before - self.entries.len()
    }
}

#[derive(Debug)]
pub struct ResultCache {
    store: Mutex<Store>,
    ttl: Duration,
}

static GLOBAL: OnceLock<Arc<ResultCache>> = OnceLock::new();

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: Mutex::new(Store {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            ttl,
        }
    }

    /// Process-wide cache for hosts that run several sessions against one
    /// store. Uses the default TTL.
    pub fn global() -> Arc<ResultCache> {
        GLOBAL
            .get_or_init(|| Arc::new(Self::new(BridgeConfig::default().result_ttl())))
            .clone()
    }

    // A panic while holding the lock leaves the map itself intact.
    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live(&self, entry: &Entry, now: Instant) -> bool {
        now.duration_since(entry.stored_at) < self.ttl
    }

    /// Store `value` under `key`, replacing any earlier value.
    pub fn put(&self, key: &str, value: impl Into<String>) {
        let now = Instant::now();
        let mut store = self.lock();
        if now.duration_since(store.last_sweep) >= self.ttl {
            store.purge(self.ttl, now);
        }
        store.entries.insert(
            key.to_owned(),
            Entry {
                value: value.into(),
                stored_at: now,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.lock()
            .entries
            .get(key)
            .filter(|entry| self.live(entry, now))
            .map(|entry| entry.value.clone())
    }

    /// Remove and return the value under `key`.
    pub fn take(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.lock()
            .entries
            .remove(key)
            .filter(|entry| self.live(entry, now))
            .map(|entry| entry.value)
    }

    /// Purge expired entries, returning how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let dropped = self.lock().purge(self.ttl, Instant::now());
        if dropped > 0 {
            debug!(dropped, "expired results swept");
        }
        dropped
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(BridgeConfig::default().result_ttl())
    }
}
