// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-side half of the bridge, generated per session.
//
// The injected script captures the randomly named bridge objects into
// closure locals, deletes them from `window`, defines one promise-returning
// wrapper per call name and installs the dispatch function the host invokes
// to deliver results. Wrappers come from `CallName::ALL`, the same table the
// decoder matches on.

use std::fmt::Write as _;

use serde_json::Value;

use sourcegate_core::call::CallName;
use sourcegate_core::types::Notification;
use sourcegate_security::BridgeNames;

/// Which wrappers the injected script defines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScriptVariant {
    /// Every call name.
    #[default]
    Full,
    /// Only `run`; captures just the entry point and cache accessor.
    Minimal,
}

#[derive(Debug, Clone)]
pub struct ScriptInjector {
    names: BridgeNames,
}

const PRELUDE: &str = "\
const requestId = n => 'req_' + n + '_' + Date.now() + '_' + Math.random().toString(36).slice(-3);
const params = a => a.map(p => p != null && typeof p.toString === 'function' ? p.toString() : null);
const pending = {};
";

impl ScriptInjector {
    pub fn new(names: BridgeNames) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &BridgeNames {
        &self.names
    }

    pub fn script(&self, variant: ScriptVariant) -> String {
        match variant {
            ScriptVariant::Full => self.render(&CallName::ALL, true),
            ScriptVariant::Minimal => self.render(&[CallName::Run], false),
        }
    }

    fn render(&self, calls: &[CallName], with_source: bool) -> String {
        let n = &self.names;
        let mut out = String::from(PRELUDE);
        let mut capture = |local: &str, global: &str| {
            let _ = writeln!(out, "const {local} = window.{global};\ndelete window.{global};");
        };
        capture("java", &n.java);
        if with_source {
            capture("source", &n.source);
        }
        capture("cache", &n.cache);

        for call in calls {
            out.push_str(&wrapper(*call));
        }

        let _ = write!(
            out,
            "window.{result} = function(id, success) {{
    const callback = pending[id];
    if (callback) {{
        const result = cache.getFromMemory(id);
        if (success) {{
            callback.resolve(result);
        }} else {{
            callback.reject(result);
        }}
        delete pending[id];
    }}
}};
",
            result = n.result
        );
        out
    }

    /// Orientation and `window.close` overrides routed to the basic accessor.
    pub fn basic_script(&self) -> String {
        format!(
            "(function() {{
if (screen.orientation) {{
    screen.orientation.lock = function(orientation) {{
        return new Promise(resolve => {{
            window.{basic}.lockOrientation(orientation);
            resolve();
        }});
    }};
    screen.orientation.unlock = function() {{
        return new Promise(resolve => {{
            window.{basic}.lockOrientation('unlock');
            resolve();
        }});
    }};
}}
window.close = function() {{
    window.{basic}.onCloseRequested();
}};
}})();
",
            basic = self.names.basic
        )
    }

    /// Tag placed in the page instead of the script text. The host serves
    /// the injection script when the page fetches this URL.
    pub fn script_tag(&self) -> String {
        format!("<script src=\"{}\"></script>", self.names.decoy_url)
    }

    /// Script the host evaluates to deliver one result. The id is emitted
    /// as a JSON string literal so page-chosen ids cannot escape it.
    pub fn dispatch_call(&self, notification: &Notification) -> String {
        let id = Value::String(notification.id.as_str().to_owned());
        format!(
            "window.{}({id}, {});",
            self.names.result, notification.success
        )
    }
}

fn wrapper(call: CallName) -> String {
    let name = call.as_str();
    let (signature, args) = if call.takes_single_arg() {
        let arg = call.single_arg_name();
        (arg.to_owned(), format!("[String({arg})]"))
    } else {
        ("...args".to_owned(), "params(args)".to_owned())
    };
    format!(
        "function {name}({signature}) {{
    return new Promise((resolve, reject) => {{
        const id = requestId(\"{name}\");
        pending[id] = {{ resolve, reject }};
        java.request(\"{name}\", {args}, id);
    }});
}}
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sourcegate_core::types::CorrelationId;

    fn injector() -> ScriptInjector {
        ScriptInjector::new(BridgeNames::generate())
    }

    #[test]
    fn full_script_wraps_every_call() {
        let injector = injector();
        let script = injector.script(ScriptVariant::Full);
        for call in CallName::ALL {
            assert!(
                script.contains(&format!("function {}(", call.as_str())),
                "missing wrapper for {call}"
            );
            assert!(script.contains(&format!("java.request(\"{}\"", call.as_str())));
        }
        assert!(script.contains("function run(jsCode)"));
        assert!(script.contains("java.request(\"importScriptAwait\", [String(url)], id)"));
        assert!(script.contains("java.request(\"getAwait\", params(args), id)"));
    }

    #[test]
    fn script_uses_session_names_and_deletes_globals() {
        let injector = injector();
        let n = injector.names().clone();
        let script = injector.script(ScriptVariant::Full);
        for global in [&n.java, &n.source, &n.cache] {
            assert!(script.contains(&format!("delete window.{global};")));
        }
        assert!(script.contains(&format!("window.{} = function(id, success)", n.result)));
        assert!(script.contains("cache.getFromMemory(id)"));
    }

    #[test]
    fn minimal_script_only_has_run() {
        let injector = injector();
        let script = injector.script(ScriptVariant::Minimal);
        assert!(script.contains("function run(jsCode)"));
        assert!(!script.contains("getAwait"));
        assert!(!script.contains(&injector.names().source));
        assert!(script.contains(&format!("window.{} =", injector.names().result)));
    }

    #[test]
    fn basic_script_routes_to_basic_accessor() {
        let injector = injector();
        let script = injector.basic_script();
        let basic = &injector.names().basic;
        assert!(script.contains(&format!("window.{basic}.lockOrientation('unlock')")));
        assert!(script.contains(&format!("window.{basic}.onCloseRequested()")));
    }

    #[test]
    fn script_tag_points_at_decoy() {
        let injector = injector();
        assert_eq!(
            injector.script_tag(),
            format!("<script src=\"{}\"></script>", injector.names().decoy_url)
        );
    }

    #[test]
    fn dispatch_call_quotes_hostile_ids() {
        let injector = injector();
        let hostile = CorrelationId::new("x\"); alert(1); (\"");
        let js = injector.dispatch_call(&Notification::failed(hostile));
        assert_eq!(
            js,
            format!(
                "window.{}(\"x\\\"); alert(1); (\\\"\", false);",
                injector.names().result
            )
        );
    }
}
