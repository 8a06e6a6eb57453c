// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host-supplied collaborators.
//
// The bridge runs inside some embedder: a WebView, a headless JS engine or a
// stdio peer. Everything it cannot do itself sits behind one of these traits.
// Hosts that lack a capability use `StubHost`, which answers `Unavailable`.

use async_trait::async_trait;
use tracing::info;

use sourcegate_core::error::Result;
use sourcegate_core::types::Notification;

/// Delivers terminal notifications back into the page.
///
/// A WebView host evaluates [`crate::injector::ScriptInjector::dispatch_call`]
/// for each notification; an in-process page settles its own promise.
/// Called from Tokio worker threads, so implementations must not block.
pub trait ScriptHost: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Evaluates the source's own rule language and scripts.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// `run(jsCode)`.
    async fn eval_js(&self, code: &str) -> Result<String>;

    /// `getStringAwait(rule, content)`.
    async fn get_string(
        &self,
        rule: Option<&str>,
        content: Option<&str>,
        is_url: bool,
    ) -> Result<String>;
}

/// Parameters for a headless web-view load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebViewRequest {
    pub html: Option<String>,
    pub url: Option<String>,
    pub js: Option<String>,
    /// Only for `webViewGetSourceAwait`: resource URL pattern whose source
    /// is returned instead of the page text.
    pub source_regex: Option<String>,
    pub cache_first: bool,
    pub delay_ms: u64,
}

/// Renders a page off-screen and returns text from it.
#[async_trait]
pub trait WebViewLoader: Send + Sync {
    async fn web_view(&self, request: &WebViewRequest) -> Result<String>;

    async fn web_view_get_source(&self, request: &WebViewRequest) -> Result<String>;
}

/// Fire-and-forget notifications a page may send through the bridge
/// objects. The defaults only log.
pub trait HostEvents: Send + Sync {
    /// The page pushed new reader configuration.
    fn up_config(&self, config: &str) {
        info!(len = config.len(), "page config update");
    }

    /// `screen.orientation.lock(o)`; `"unlock"` releases the lock.
    fn lock_orientation(&self, orientation: &str) {
        info!(orientation, "page requested orientation");
    }

    /// `window.close()`.
    fn close_requested(&self) {
        info!("page requested close");
    }

    fn toast(&self, message: &str) {
        info!(message, "page toast");
    }

    fn long_toast(&self, message: &str) {
        info!(message, "page long toast");
    }

    fn log(&self, message: &str) {
        info!(target: "sourcegate::page", "{message}");
    }
}
