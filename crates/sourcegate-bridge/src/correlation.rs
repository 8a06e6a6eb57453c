// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page side of the protocol, implemented natively.
//
// Embedders that drive pages from their own JS engine, and the tests, need
// the same pending-callback bookkeeping the injected script keeps: one entry
// per outstanding id, settled at most once, unknown ids ignored.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::debug;

use sourcegate_core::call::Args;
use sourcegate_core::config::BridgeConfig;
use sourcegate_core::error::{BridgeError, Result};
use sourcegate_core::types::{CorrelationId, Notification};

use crate::capabilities::Capabilities;
use crate::session::BridgeSession;
use crate::traits::ScriptHost;

/// What a settled call hands its waiter: the cached text, either as a
/// resolved value or as a rejection message.
pub type Settlement = std::result::Result<String, String>;

/// Pending callbacks keyed by correlation id.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    pending: Mutex<HashMap<CorrelationId, oneshot::Sender<Settlement>>>,
}

impl CorrelationTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<CorrelationId, oneshot::Sender<Settlement>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `id` and return the receiver its settlement arrives on.
    /// Registering a live id again replaces the earlier waiter, which then
    /// observes a closed channel.
    pub fn register(&self, id: CorrelationId) -> oneshot::Receiver<Settlement> {
        let (tx, rx) = oneshot::channel();
        if self.lock().insert(id.clone(), tx).is_some() {
            debug!(%id, "pending id re-registered");
        }
        rx
    }

    /// Claim the waiter for `id`. Exactly one caller gets it.
    pub fn take_pending(&self, id: &CorrelationId) -> Option<oneshot::Sender<Settlement>> {
        self.lock().remove(id)
    }

    /// Settle `id`. Returns `false` for unknown or already settled ids.
    pub fn settle(&self, id: &CorrelationId, settlement: Settlement) -> bool {
        let Some(tx) = self.take_pending(id) else {
            debug!(%id, "settlement for unknown id ignored");
            return false;
        };
        // The waiter may have given up; the entry is gone either way.
        let _ = tx.send(settlement);
        true
    }

    pub fn resolve(&self, id: &CorrelationId, value: String) -> bool {
        self.settle(id, Ok(value))
    }

    pub fn reject(&self, id: &CorrelationId, message: String) -> bool {
        self.settle(id, Err(message))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// A page whose script side is native code. Holds its own session; the
/// session notifies back into the page through a weak reference.
pub struct InProcessPage {
    table: CorrelationTable,
    session: BridgeSession,
}

impl InProcessPage {
    pub fn open(config: &BridgeConfig, capabilities: Capabilities) -> Result<Arc<Self>> {
        let runtime = Handle::try_current()
            .map_err(|e| BridgeError::Config(format!("bridge needs a tokio runtime: {e}")))?;
        Ok(Arc::new_cyclic(|page: &Weak<Self>| {
            let host: Weak<dyn ScriptHost> = page.clone();
            Self {
                table: CorrelationTable::default(),
                session: BridgeSession::with_runtime(config, capabilities, host, runtime),
            }
        }))
    }

    pub fn session(&self) -> &BridgeSession {
        &self.session
    }

    pub fn pending(&self) -> usize {
        self.table.len()
    }

    /// Issue `name(args...)` the way a wrapper in the injected script does
    /// and wait for its settlement.
    pub async fn call<I, S>(&self, name: &str, args: I) -> Settlement
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let id = CorrelationId::generate(name);
        let settled = self.table.register(id.clone());
        let args = Args::new(args.into_iter().map(|arg| arg.map(Into::into)));
        self.session.request(name, args, id);
        settled
            .await
            .unwrap_or_else(|_| Err(BridgeError::SessionClosed.to_string()))
    }

    /// Deliver a notification as the host would, e.g. a duplicate from a
    /// misbehaving embedder. Unknown ids are ignored.
    pub fn dispatch(&self, notification: Notification) {
        self.notify(notification);
    }

    /// Tear the page down: close the session and fail every waiter.
    pub fn close(&self) {
        self.session.close();
        let ids: Vec<_> = self.table.lock().keys().cloned().collect();
        for id in ids {
            self.table.reject(&id, BridgeError::SessionClosed.to_string());
        }
    }
}

impl ScriptHost for InProcessPage {
    fn notify(&self, notification: Notification) {
        let Notification { id, success } = notification;
        // Claim the waiter before touching the cache so a duplicate can
        // neither consume the value nor settle twice. An id nobody waits
        // for keeps its cached value.
        let Some(tx) = self.table.take_pending(&id) else {
            debug!(%id, "notification for unknown id ignored");
            return;
        };
        let value = self.session.get_from_memory(id.as_str()).unwrap_or_default();
        let _ = tx.send(if success { Ok(value) } else { Err(value) });
    }
}
