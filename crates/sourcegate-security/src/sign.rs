// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `createSignHexAwait`: message signing with ring.
//
// Supported algorithms (names are matched case-insensitively, ignoring `-`
// and `_`):
//   - HmacSHA256 / HmacSHA384 / HmacSHA512: the private key text is the
//     HMAC key; the public key is accepted and ignored.
//   - Ed25519: the private key is a 32-byte seed or a PKCS#8 document, in
//     hex or base64. A non-empty public key must match the derived one.

use ring::hmac;
use ring::signature::{Ed25519KeyPair, KeyPair};
use tracing::{debug, instrument};

use sourcegate_core::error::{BridgeError, Result};

use crate::cipher::decode_binary;

/// Sign `data` and return the signature as lowercase hex.
#[instrument(skip(public_key, private_key, data))]
pub fn sign_hex(algorithm: &str, public_key: &str, private_key: &str, data: &str) -> Result<String> {
    let normalized: String = algorithm
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();

    let signature = match normalized.as_str() {
        "hmacsha256" => hmac_sign(hmac::HMAC_SHA256, private_key, data),
        "hmacsha384" => hmac_sign(hmac::HMAC_SHA384, private_key, data),
        "hmacsha512" => hmac_sign(hmac::HMAC_SHA512, private_key, data),
        "ed25519" => ed25519_sign(public_key, private_key, data)?,
        _ => {
            return Err(BridgeError::Signing(format!(
                "unsupported algorithm: {algorithm}"
            )));
        }
    };

    debug!(len = signature.len(), "signature produced");
    Ok(hex::encode(signature))
}

fn hmac_sign(algorithm: hmac::Algorithm, key: &str, data: &str) -> Vec<u8> {
    let key = hmac::Key::new(algorithm, key.as_bytes());
    hmac::sign(&key, data.as_bytes()).as_ref().to_vec()
}

fn ed25519_sign(public_key: &str, private_key: &str, data: &str) -> Result<Vec<u8>> {
    let private = decode_binary(private_key)
        .map_err(|_| BridgeError::Signing("private key is neither hex nor base64".into()))?;

    let pair = if private.len() == 32 {
        Ed25519KeyPair::from_seed_unchecked(&private)
    } else {
        Ed25519KeyPair::from_pkcs8_maybe_unchecked(&private)
    }
    .map_err(|e| BridgeError::Signing(format!("invalid Ed25519 private key: {e}")))?;

    if !public_key.trim().is_empty() {
        let public = decode_binary(public_key)
            .map_err(|_| BridgeError::Signing("public key is neither hex nor base64".into()))?;
        if public.as_slice() != pair.public_key().as_ref() {
            return Err(BridgeError::Signing(
                "public key does not match private key".into(),
            ));
        }
    }

    Ok(pair.sign(data.as_bytes()).as_ref().to_vec())
}
