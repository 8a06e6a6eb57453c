// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native entry point for page calls.
//
// `request` returns at once. The call runs on a Tokio task; a supervising
// task observes its outcome (including panics and the backstop deadline),
// stores the text in the result cache and notifies the host exactly once.
// Once the dispatcher is closed, in-flight work is aborted and nothing
// further is delivered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use sourcegate_core::call::{Args, Call};
use sourcegate_core::error::{BridgeError, Result};
use sourcegate_core::types::{CorrelationId, Notification};

use crate::capabilities::Capabilities;
use crate::result_cache::ResultCache;
use crate::traits::ScriptHost;

type InFlight = Arc<Mutex<HashMap<CorrelationId, AbortHandle>>>;

fn lock_in_flight(in_flight: &InFlight) -> MutexGuard<'_, HashMap<CorrelationId, AbortHandle>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Dispatcher {
    capabilities: Arc<Capabilities>,
    pub(crate) cache: Arc<ResultCache>,
    host: Weak<dyn ScriptHost>,
    runtime: Handle,
    deadline: Duration,
    in_flight: InFlight,
    closed: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(
        capabilities: Arc<Capabilities>,
        cache: Arc<ResultCache>,
        host: Weak<dyn ScriptHost>,
        runtime: Handle,
        deadline: Duration,
    ) -> Self {
        Self {
            capabilities,
            cache,
            host,
            runtime,
            deadline,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Accept one call from the page. Never blocks and never fails: every
    /// problem, an unknown name included, is reported through the normal
    /// delivery path.
    pub fn request(&self, name: &str, args: Args, id: CorrelationId) {
        if self.is_closed() {
            debug!(%id, name, "request after close ignored");
            return;
        }
        debug!(%id, name, "request accepted");

        let decoded = Call::parse(name, args);
        let capabilities = Arc::clone(&self.capabilities);
        let deadline = self.deadline;
        let work = self.runtime.spawn(async move {
            let call = match decoded {
                Ok(call) => call,
                Err(err) => return Err(err),
            };
            match tokio::time::timeout(deadline, capabilities.execute(call)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(BridgeError::Timeout(deadline.as_millis() as u64)),
            }
        });
        lock_in_flight(&self.in_flight).insert(id.clone(), work.abort_handle());

        let delivery = Delivery {
            cache: Arc::clone(&self.cache),
            host: self.host.clone(),
            closed: Arc::clone(&self.closed),
        };
        let in_flight = Arc::clone(&self.in_flight);
        self.runtime.spawn(async move {
            let outcome = match work.await {
                Ok(outcome) => outcome,
                Err(join) if join.is_panic() => {
                    warn!(%id, "handler panicked");
                    Err(BridgeError::HandlerPanicked)
                }
                Err(_) => {
                    debug!(%id, "call aborted");
                    return;
                }
            };
            lock_in_flight(&in_flight).remove(&id);
            delivery.deliver(id, outcome);
        });
    }

    pub fn in_flight(&self) -> usize {
        lock_in_flight(&self.in_flight).len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Abort in-flight calls and stop delivering. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let aborted: Vec<_> = lock_in_flight(&self.in_flight).drain().collect();
        for (_, handle) in &aborted {
            handle.abort();
        }
        info!(aborted = aborted.len(), "dispatcher closed");
    }
}

/// What the supervising task needs to report one outcome.
struct Delivery {
    cache: Arc<ResultCache>,
    host: Weak<dyn ScriptHost>,
    closed: Arc<AtomicBool>,
}

impl Delivery {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn deliver(&self, id: CorrelationId, outcome: Result<String>) {
        if self.is_closed() {
            debug!(%id, "session closed, result dropped");
            return;
        }
        let notification = match outcome {
            Ok(value) => {
                self.cache.put(id.as_str(), value);
                Notification::succeeded(id)
            }
            Err(err) => {
                if err.is_protocol() {
                    warn!(%id, error = %err, "request rejected");
                } else {
                    debug!(%id, error = %err, "call failed");
                }
                self.cache.put(id.as_str(), err.to_string());
                Notification::failed(id)
            }
        };
        // A close that landed between the check and the put may already
        // have cleared the cache; take our entry back out.
        if self.is_closed() {
            self.cache.take(notification.id.as_str());
            debug!(id = %notification.id, "session closed during delivery, result dropped");
            return;
        }
        match self.host.upgrade() {
            Some(host) => host.notify(notification),
            None => warn!(id = %notification.id, "host gone, notification dropped"),
        }
    }
}
