// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sourcegate bridge: the call/callback handshake between a sandboxed source
// page and native capabilities.
//
// A page calls `<java>.request(name, args, id)`; the dispatcher decodes the
// call, runs it on a Tokio task, stores the outcome in the result cache and
// asks the host to evaluate `window.<result>(id, success)`. The page then
// reads the payload through `<cache>.getFromMemory(id)`.

pub mod capabilities;
pub mod correlation;
pub mod dispatcher;
pub mod injector;
pub mod result_cache;
pub mod session;
pub mod traits;

pub mod stub;

pub use capabilities::Capabilities;
pub use correlation::{CorrelationTable, InProcessPage};
pub use dispatcher::Dispatcher;
pub use injector::{ScriptInjector, ScriptVariant};
pub use result_cache::ResultCache;
pub use session::BridgeSession;
pub use stub::StubHost;
pub use traits::{HostEvents, RuleEngine, ScriptHost, WebViewLoader, WebViewRequest};
