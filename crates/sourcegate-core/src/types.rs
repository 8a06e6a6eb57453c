// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Sourcegate bridge.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token linking one call to its eventual result.
///
/// Pages generate their own (`req_<name>_<ms>_<rand>`); native callers use
/// [`CorrelationId::generate`]. The bridge never interprets the contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for a call issued from native code. Accepts a [`CallName`](crate::call::CallName)
    /// or a raw wire name, which need not be a known function.
    pub fn generate(call: impl std::fmt::Display) -> Self {
        Self(format!("req_{call}_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CorrelationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Terminal report for one call: the page reads the payload from the
/// result cache and settles its promise according to `success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: CorrelationId,
    pub success: bool,
}

impl Notification {
    pub fn succeeded(id: CorrelationId) -> Self {
        Self { id, success: true }
    }

    pub fn failed(id: CorrelationId) -> Self {
        Self { id, success: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallName;

    #[test]
    fn generated_ids_are_distinct() {
        let a = CorrelationId::generate(CallName::GetAwait);
        let b = CorrelationId::generate(CallName::GetAwait);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("req_getAwait_"));
    }

    #[test]
    fn id_serializes_as_plain_string() {
        let id = CorrelationId::new("req_run_1_abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"req_run_1_abc\"");
    }
}
