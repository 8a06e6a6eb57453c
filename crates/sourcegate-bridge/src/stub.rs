// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub host for embedders without a rule engine or web view (the stdio
// binary, CI). Those calls fail with `Unavailable`; host events only log.

use async_trait::async_trait;

use sourcegate_core::error::{BridgeError, Result};

use crate::traits::*;

/// Host that provides nothing beyond logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubHost;

#[async_trait]
impl RuleEngine for StubHost {
    async fn eval_js(&self, _code: &str) -> Result<String> {
        tracing::warn!("RuleEngine::eval_js called on stub host");
        Err(BridgeError::Unavailable("rule engine"))
    }

    async fn get_string(
        &self,
        _rule: Option<&str>,
        _content: Option<&str>,
        _is_url: bool,
    ) -> Result<String> {
        tracing::warn!("RuleEngine::get_string called on stub host");
        Err(BridgeError::Unavailable("rule engine"))
    }
}

#[async_trait]
impl WebViewLoader for StubHost {
    async fn web_view(&self, _request: &WebViewRequest) -> Result<String> {
        tracing::warn!("WebViewLoader::web_view called on stub host");
        Err(BridgeError::Unavailable("web view"))
    }

    async fn web_view_get_source(&self, _request: &WebViewRequest) -> Result<String> {
        Err(BridgeError::Unavailable("web view"))
    }
}

impl HostEvents for StubHost {}
