// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sourcegate-security: the native crypto a page may ask for, plus the
// per-session name obfuscation that keeps third-party scripts from finding
// the bridge.

pub mod cipher;
pub mod digest;
pub mod obfuscate;
pub mod sign;

pub use cipher::SymmetricCipher;
pub use digest::sha256_hex;
pub use obfuscate::BridgeNames;
pub use sign::sign_hex;
