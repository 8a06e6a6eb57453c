// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One bridge session per page load.
//
// A session owns fresh obfuscated names, the injector built from them, a
// result cache and a dispatcher. The host exposes `request` under
// `names().java`, `get_from_memory` under `names().cache` and the host
// events under `names().basic`, then injects `script_tag()` into the page.

use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tracing::info;

use sourcegate_core::call::Args;
use sourcegate_core::config::BridgeConfig;
use sourcegate_core::error::{BridgeError, Result};
use sourcegate_core::types::{CorrelationId, Notification};
use sourcegate_security::BridgeNames;

use crate::capabilities::Capabilities;
use crate::dispatcher::Dispatcher;
use crate::injector::{ScriptInjector, ScriptVariant};
use crate::result_cache::ResultCache;
use crate::stub::StubHost;
use crate::traits::{HostEvents, ScriptHost};

pub struct BridgeSession {
    injector: ScriptInjector,
    variant: ScriptVariant,
    cache: Arc<ResultCache>,
    dispatcher: Dispatcher,
    events: Arc<dyn HostEvents>,
}

impl BridgeSession {
    /// Open a session on the current Tokio runtime.
    pub fn new(
        config: &BridgeConfig,
        capabilities: Capabilities,
        host: Weak<dyn ScriptHost>,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| BridgeError::Config(format!("bridge needs a tokio runtime: {e}")))?;
        Ok(Self::with_runtime(config, capabilities, host, runtime))
    }

    pub fn with_runtime(
        config: &BridgeConfig,
        capabilities: Capabilities,
        host: Weak<dyn ScriptHost>,
        runtime: Handle,
    ) -> Self {
        let names = BridgeNames::generate();
        let cache = Arc::new(ResultCache::new(config.result_ttl()));
        let dispatcher = Dispatcher::new(
            Arc::new(capabilities),
            Arc::clone(&cache),
            host,
            runtime,
            config.call_deadline(),
        );
        info!(java = %names.java, decoy_url = %names.decoy_url, "bridge session opened");
        Self {
            injector: ScriptInjector::new(names),
            variant: ScriptVariant::Full,
            cache,
            dispatcher,
            events: Arc::new(StubHost),
        }
    }

    /// Script served for the decoy URL.
    pub fn with_variant(mut self, variant: ScriptVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn HostEvents>) -> Self {
        self.events = events;
        self
    }

    /// Store results in `cache` (e.g. [`ResultCache::global`]) instead of a
    /// session-private one.
    pub fn sharing_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.dispatcher.cache = Arc::clone(&cache);
        self.cache = cache;
        self
    }

    pub fn names(&self) -> &BridgeNames {
        self.injector.names()
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn injection_script(&self, variant: ScriptVariant) -> String {
        self.injector.script(variant)
    }

    pub fn basic_script(&self) -> String {
        self.injector.basic_script()
    }

    pub fn script_tag(&self) -> String {
        self.injector.script_tag()
    }

    /// Serve the injection script if `url` is this session's decoy URL.
    pub fn intercept(&self, url: &str) -> Option<String> {
        (url == self.names().decoy_url).then(|| self.injector.script(self.variant))
    }

    /// `<java>.request(name, args, id)`.
    pub fn request(&self, name: &str, args: Args, id: CorrelationId) {
        self.dispatcher.request(name, args, id);
    }

    /// `<cache>.getFromMemory(id)`. Each result is handed out once.
    pub fn get_from_memory(&self, id: &str) -> Option<String> {
        self.cache.take(id)
    }

    /// Script the host evaluates to deliver `notification` into the page.
    pub fn dispatch_call(&self, notification: &Notification) -> String {
        self.injector.dispatch_call(notification)
    }

    pub fn host_events(&self) -> &dyn HostEvents {
        self.events.as_ref()
    }

    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    pub fn is_closed(&self) -> bool {
        self.dispatcher.is_closed()
    }

    /// Page torn down: abort outstanding calls, drop undelivered results and
    /// stop notifying.
    pub fn close(&self) {
        self.dispatcher.close();
        self.cache.clear();
    }
}

impl Drop for BridgeSession {
    fn drop(&mut self) {
        self.dispatcher.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct Recorder(mpsc::UnboundedSender<Notification>);

    impl ScriptHost for Recorder {
        fn notify(&self, notification: Notification) {
            let _ = self.0.send(notification);
        }
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl HostEvents for Events {
        fn lock_orientation(&self, orientation: &str) {
            if let Ok(mut seen) = self.0.lock() {
                seen.push(orientation.to_owned());
            }
        }

        fn long_toast(&self, message: &str) {
            if let Ok(mut seen) = self.0.lock() {
                seen.push(format!("long:{message}"));
            }
        }
    }

    fn open(
        dir: &std::path::Path,
    ) -> (BridgeSession, Arc<dyn ScriptHost>, mpsc::UnboundedReceiver<Notification>) {
        let config = BridgeConfig::default().rooted_at(dir);
        let capabilities = Capabilities::from_config(&config).expect("capabilities");
        let (tx, rx) = mpsc::unbounded_channel();
        let host: Arc<dyn ScriptHost> = Arc::new(Recorder(tx));
        let session = BridgeSession::new(&config, capabilities, Arc::downgrade(&host)).expect("session");
        (session, host, rx)
    }

    #[tokio::test]
    async fn intercept_only_serves_decoy_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, _host, _rx) = open(dir.path());
        let decoy = session.names().decoy_url.clone();

        let script = session.intercept(&decoy).expect("decoy served");
        assert!(script.contains("function getAwait(...args)"));
        assert!(session.intercept("https://example.com/app.js").is_none());
        assert!(session.script_tag().contains(&decoy));

        let minimal = open(dir.path()).0.with_variant(ScriptVariant::Minimal);
        let decoy = minimal.names().decoy_url.clone();
        let script = minimal.intercept(&decoy).expect("decoy served");
        assert!(!script.contains("getAwait"));
    }

    #[tokio::test]
    async fn sessions_get_fresh_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (a, _ha, _ra) = open(dir.path());
        let (b, _hb, _rb) = open(dir.path());
        assert_ne!(a.names().java, b.names().java);
        assert_ne!(a.names().decoy_url, b.names().decoy_url);
    }

    #[tokio::test]
    async fn get_from_memory_hands_result_out_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("files")).expect("mkdir");
        std::fs::write(dir.path().join("files/a.txt"), "A").expect("write");
        let (session, _host, mut rx) = open(dir.path());

        session.request("readTxtFileAwait", Args::new([Some("a.txt".to_owned())]), "r1".into());
        let n = rx.recv().await.expect("notification");
        assert!(n.success);
        assert_eq!(session.get_from_memory("r1").as_deref(), Some("A"));
        assert_eq!(session.get_from_memory("r1"), None);
    }

    #[tokio::test]
    async fn close_clears_cache_and_silences() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, _host, mut rx) = open(dir.path());
        session.cache().put("left-over", "x");

        session.close();
        assert!(session.is_closed());
        assert!(session.cache().is_empty());

        session.request("readTxtFileAwait", Args::new([Some("a.txt".to_owned())]), "late".into());
        let waited = tokio::time::timeout(std::time::Duration::from_millis(200), rx.recv()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn shared_cache_receives_results() {
        let dir = tempfile::tempdir().expect("tempdir");
        let shared = Arc::new(ResultCache::default());
        let (session, _host, mut rx) = open(dir.path());
        let session = session.sharing_cache(Arc::clone(&shared));

        session.request("rmRf", Args::default(), "s1".into());
        rx.recv().await.expect("notification");
        assert_eq!(shared.get("s1").as_deref(), Some("unknown function: rmRf"));
    }

    #[tokio::test]
    async fn host_events_route_to_supplied_handler() {
        let dir = tempfile::tempdir().expect("tempdir");
        let events = Arc::new(Events::default());
        let (session, _host, _rx) = open(dir.path());
        let session = session.with_events(events.clone());

        session.host_events().lock_orientation("landscape");
        session.host_events().long_toast("saved");
        session.host_events().toast("default impl only logs");
        assert_eq!(
            *events.0.lock().expect("lock"),
            vec!["landscape".to_owned(), "long:saved".to_owned()]
        );
    }

    #[test]
    fn new_outside_runtime_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = BridgeConfig::default().rooted_at(dir.path());
        let capabilities = Capabilities::from_config(&config).expect("capabilities");
        let host: Arc<dyn ScriptHost> = Arc::new(StubNotify);
        let err = BridgeSession::new(&config, capabilities, Arc::downgrade(&host))
            .err()
            .expect("no runtime");
        assert!(matches!(err, BridgeError::Config(_)));
    }

    struct StubNotify;

    impl ScriptHost for StubNotify {
        fn notify(&self, _: Notification) {}
    }
}
