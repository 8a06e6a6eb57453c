// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line-delimited JSON spoken by `sourcegate serve`. One object per line,
// discriminated by `"type"`.

use serde::{Deserialize, Serialize};

use sourcegate_bridge::BridgeSession;
use sourcegate_core::types::CorrelationId;

/// Peer -> bridge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// `<java>.request(name, args, id)`.
    Request {
        name: String,
        #[serde(default)]
        args: Vec<Option<String>>,
        id: CorrelationId,
    },
    /// `<cache>.getFromMemory(id)`.
    Get { id: String },
    /// The page fetched `url`; reply with the bridge script if it is the decoy.
    Intercept { url: String },
    Event {
        event: PageEvent,
        #[serde(default)]
        value: Option<String>,
    },
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageEvent {
    Toast,
    LongToast,
    Log,
    UpConfig,
    LockOrientation,
    CloseRequested,
}

/// Names the peer installs on `window` before loading the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionNames {
    pub java: String,
    pub cache: String,
    pub source: String,
    pub basic: String,
    pub result: String,
}

/// Bridge -> peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Session {
        names: SessionNames,
        decoy_url: String,
        script_tag: String,
        basic_script: String,
    },
    /// Evaluate this in the page.
    Evaluate { script: String },
    Value { id: String, value: Option<String> },
    Script { url: String, script: Option<String> },
    Error { message: String },
}

impl Outbound {
    pub fn session(session: &BridgeSession) -> Self {
        let n = session.names();
        Self::Session {
            names: SessionNames {
                java: n.java.clone(),
                cache: n.cache.clone(),
                source: n.source.clone(),
                basic: n.basic.clone(),
                result: n.result.clone(),
            },
            decoy_url: n.decoy_url.clone(),
            script_tag: session.script_tag(),
            basic_script: session.basic_script(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_args_default_to_empty() {
        let msg: Inbound = serde_json::from_str(r#"{"type":"request","name":"run","id":"r1"}"#).unwrap();
        assert_eq!(
            msg,
            Inbound::Request {
                name: "run".into(),
                args: vec![],
                id: CorrelationId::new("r1"),
            }
        );
    }

    #[test]
    fn null_args_stay_null() {
        let msg: Inbound = serde_json::from_str(
            r#"{"type":"request","name":"decryptStrAwait","args":["AES/GCM/NoPadding","k",null,"00"],"id":"d"}"#,
        )
        .unwrap();
        let Inbound::Request { args, .. } = msg else {
            panic!("expected request");
        };
        assert_eq!(args[2], None);
    }

    #[test]
    fn events_parse() {
        let msg: Inbound =
            serde_json::from_str(r#"{"type":"event","event":"lock_orientation","value":"landscape"}"#).unwrap();
        assert_eq!(
            msg,
            Inbound::Event {
                event: PageEvent::LockOrientation,
                value: Some("landscape".into()),
            }
        );
    }

    #[test]
    fn long_toast_event_parses() {
        let msg: Inbound =
            serde_json::from_str(r#"{"type":"event","event":"long_toast","value":"saved"}"#).unwrap();
        assert_eq!(
            msg,
            Inbound::Event {
                event: PageEvent::LongToast,
                value: Some("saved".into()),
            }
        );
    }

    #[test]
    fn outbound_is_tagged() {
        let json = serde_json::to_string(&Outbound::Value {
            id: "x".into(),
            value: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"value","id":"x","value":null}"#);
    }
}
