// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sourcegate: Core call types, configuration and error definitions shared
// across all crates.

pub mod call;
pub mod config;
pub mod error;
pub mod types;

pub use call::{Args, Call, CallName, CipherSpec, Headers};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use types::*;
