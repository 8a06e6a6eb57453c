// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Sourcegate.
//
// Only the `Display` text of these errors ever reaches a page: the dispatcher
// stores `err.to_string()` in the result cache and nothing else.

use thiserror::Error;

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Protocol errors --
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("missing {0}")]
    MissingArgument(&'static str),

    // -- Network errors --
    #[error("http request failed: {0}")]
    Http(String),

    #[error("timed out after {0}ms")]
    Timeout(u64),

    // -- Crypto errors --
    #[error("invalid key length: {0} bytes")]
    InvalidKey(usize),

    #[error("crypto operation failed: {0}")]
    Crypto(String),

    #[error("signing failed: {0}")]
    Signing(String),

    // -- File / script errors --
    #[error("path outside sandbox: {0}")]
    PathDenied(String),

    #[error("empty script: {0}")]
    EmptyScript(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    // -- Host / session --
    #[error("capability not available on this host: {0}")]
    Unavailable(&'static str),

    #[error("handler panicked")]
    HandlerPanicked,

    #[error("bridge session closed")]
    SessionClosed,
}

impl BridgeError {
    /// Whether the error came from the page's request rather than from a
    /// capability handler.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::UnknownFunction(_) | Self::MissingArgument(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_argument_names_the_field() {
        assert_eq!(BridgeError::MissingArgument("url").to_string(), "missing url");
    }

    #[test]
    fn protocol_errors_are_flagged() {
        assert!(BridgeError::UnknownFunction("evil".into()).is_protocol());
        assert!(!BridgeError::Timeout(9000).is_protocol());
    }
}
