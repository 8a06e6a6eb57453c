// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Symmetric crypto for `decryptStrAwait`, `encryptBase64Await` and
// `encryptHexAwait`.
//
// Transformations use the `ALG/MODE/PADDING` form pages already know. A bare
// `AES` means `AES/ECB/PKCS5Padding`. Supported:
//   - `AES/ECB/PKCS5Padding` and `AES/CBC/PKCS5Padding` (PKCS#5 and PKCS#7
//     are the same for AES) with a 16-, 24- or 32-byte key. CBC needs a
//     16-byte IV; ECB ignores any IV it is given.
//   - `AES/GCM/NoPadding` with a 16- or 32-byte key and a 12-byte IV.
//     Ciphertext is `ct || tag`.
// Key and IV text are used as raw UTF-8 bytes.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::aead::{AES_128_GCM, AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use tracing::{debug, instrument};

use sourcegate_core::call::CipherSpec;
use sourcegate_core::error::{BridgeError, Result};

const BLOCK_LEN: usize = 16;

fn crypto_err(context: &str) -> impl FnOnce(ring::error::Unspecified) -> BridgeError + '_ {
    move |_| BridgeError::Crypto(format!("{context} failed"))
}

enum Mode {
    Gcm {
        key: LessSafeKey,
        nonce: [u8; NONCE_LEN],
    },
    Ecb {
        key: Vec<u8>,
    },
    Cbc {
        key: Vec<u8>,
        iv: [u8; BLOCK_LEN],
    },
}

/// A keyed cipher built from one page request.
pub struct SymmetricCipher {
    engine: Mode,
}

impl std::fmt::Debug for SymmetricCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match &self.engine {
            Mode::Gcm { .. } => "GCM",
            Mode::Ecb { .. } => "ECB",
            Mode::Cbc { .. } => "CBC",
        };
        f.debug_struct("SymmetricCipher")
            .field("mode", &mode)
            .finish_non_exhaustive()
    }
}

impl SymmetricCipher {
    /// Validate the transformation, key and IV.
    ///
    /// The key length is checked before the mode so a bad key is always
    /// reported as a key error, whatever mode the page asked for.
    #[instrument(skip_all, fields(transformation = %spec.transformation))]
    pub fn from_spec(spec: &CipherSpec) -> Result<Self> {
        let mut parts = spec.transformation.split('/').map(str::trim);
        let algorithm = parts.next().unwrap_or_default();
        let mode = parts.next().unwrap_or("ECB").to_ascii_uppercase();
        let padding = parts.next();

        if !algorithm.eq_ignore_ascii_case("AES") {
            return Err(BridgeError::Crypto(format!(
                "unsupported algorithm: {algorithm}"
            )));
        }

        let key_bytes = spec.key.as_bytes();
        if !matches!(key_bytes.len(), 16 | 24 | 32) {
            return Err(BridgeError::InvalidKey(key_bytes.len()));
        }

        let engine = match mode.as_str() {
            "GCM" => {
                if let Some(padding) = padding.filter(|p| !p.eq_ignore_ascii_case("NoPadding")) {
                    return Err(BridgeError::Crypto(format!(
                        "unsupported padding for GCM: {padding}"
                    )));
                }
                gcm_engine(key_bytes, spec.iv.as_deref())?
            }
            "ECB" | "CBC" => {
                if let Some(padding) = padding.filter(|p| !is_pkcs_padding(p)) {
                    return Err(BridgeError::Crypto(format!(
                        "unsupported padding for {mode}: {padding}"
                    )));
                }
                if mode == "ECB" {
                    Mode::Ecb {
                        key: key_bytes.to_vec(),
                    }
                } else {
                    let iv = spec.iv.as_deref().ok_or(BridgeError::MissingArgument("iv"))?;
                    let iv: [u8; BLOCK_LEN] = iv.as_bytes().try_into().map_err(|_| {
                        BridgeError::Crypto(format!(
                            "CBC requires a {BLOCK_LEN}-byte iv, got {}",
                            iv.len()
                        ))
                    })?;
                    Mode::Cbc {
                        key: key_bytes.to_vec(),
                        iv,
                    }
                }
            }
            other => {
                return Err(BridgeError::Crypto(format!("unsupported cipher mode: {other}")));
            }
        };

        debug!(key_len = key_bytes.len(), %mode, "cipher ready");
        Ok(Self { engine })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        match &self.engine {
            Mode::Gcm { key, nonce } => {
                let mut in_out = plaintext.to_vec();
                key.seal_in_place_append_tag(Nonce::assume_unique_for_key(*nonce), Aad::empty(), &mut in_out)
                    .map_err(crypto_err("encryption"))?;
                Ok(in_out)
            }
            Mode::Ecb { key } => match key.len() {
                16 => ecb_encrypt::<Aes128>(key, plaintext),
                24 => ecb_encrypt::<Aes192>(key, plaintext),
                32 => ecb_encrypt::<Aes256>(key, plaintext),
                n => Err(BridgeError::InvalidKey(n)),
            },
            Mode::Cbc { key, iv } => match key.len() {
                16 => cbc_encrypt::<Aes128>(key, iv, plaintext),
                24 => cbc_encrypt::<Aes192>(key, iv, plaintext),
                32 => cbc_encrypt::<Aes256>(key, iv, plaintext),
                n => Err(BridgeError::InvalidKey(n)),
            },
        }
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match &self.engine {
            Mode::Gcm { key, nonce } => {
                let mut in_out = ciphertext.to_vec();
                let plaintext = key
                    .open_in_place(Nonce::assume_unique_for_key(*nonce), Aad::empty(), &mut in_out)
                    .map_err(crypto_err("decryption"))?;
                Ok(plaintext.to_vec())
            }
            Mode::Ecb { key } => match key.len() {
                16 => ecb_decrypt::<Aes128>(key, ciphertext),
                24 => ecb_decrypt::<Aes192>(key, ciphertext),
                32 => ecb_decrypt::<Aes256>(key, ciphertext),
                n => Err(BridgeError::InvalidKey(n)),
            },
            Mode::Cbc { key, iv } => match key.len() {
                16 => cbc_decrypt::<Aes128>(key, iv, ciphertext),
                24 => cbc_decrypt::<Aes192>(key, iv, ciphertext),
                32 => cbc_decrypt::<Aes256>(key, iv, ciphertext),
                n => Err(BridgeError::InvalidKey(n)),
            },
        }
    }

    pub fn encrypt_base64(&self, data: &str) -> Result<String> {
        Ok(STANDARD.encode(self.encrypt(data.as_bytes())?))
    }

    pub fn encrypt_hex(&self, data: &str) -> Result<String> {
        Ok(hex::encode(self.encrypt(data.as_bytes())?))
    }

    /// Decrypt hex or base64 ciphertext into UTF-8 text.
    pub fn decrypt_str(&self, data: &str) -> Result<String> {
        let ciphertext = decode_binary(data)?;
        let plaintext = self.decrypt(&ciphertext)?;
        String::from_utf8(plaintext)
            .map_err(|_| BridgeError::Crypto("plaintext is not valid UTF-8".into()))
    }
}

fn is_pkcs_padding(padding: &str) -> bool {
    ["PKCS5Padding", "PKCS5", "PKCS7Padding", "PKCS7"]
        .iter()
        .any(|p| p.eq_ignore_ascii_case(padding))
}

fn gcm_engine(key: &[u8], iv: Option<&str>) -> Result<Mode> {
    let aead = match key.len() {
        16 => &AES_128_GCM,
        32 => &AES_256_GCM,
        n => {
            return Err(BridgeError::Crypto(format!(
                "GCM requires a 16- or 32-byte key, got {n}"
            )));
        }
    };
    let iv = iv.ok_or(BridgeError::MissingArgument("iv"))?;
    let nonce: [u8; NONCE_LEN] = iv.as_bytes().try_into().map_err(|_| {
        BridgeError::Crypto(format!("GCM requires a {NONCE_LEN}-byte iv, got {}", iv.len()))
    })?;
    let key = UnboundKey::new(aead, key).map_err(|_| BridgeError::InvalidKey(key.len()))?;
    Ok(Mode::Gcm {
        key: LessSafeKey::new(key),
        nonce,
    })
}

fn ecb_encrypt<C>(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    let cipher = ecb::Encryptor::<C>::new_from_slice(key)
        .map_err(|_| BridgeError::InvalidKey(key.len()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn ecb_decrypt<C>(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    let cipher = ecb::Decryptor::<C>::new_from_slice(key)
        .map_err(|_| BridgeError::InvalidKey(key.len()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| BridgeError::Crypto("decryption failed: bad padding".into()))
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    let cipher = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| BridgeError::InvalidKey(key.len()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    let cipher = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| BridgeError::InvalidKey(key.len()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| BridgeError::Crypto("decryption failed: bad padding".into()))
}

/// Hex when the text is even-length hex, otherwise standard base64.
pub(crate) fn decode_binary(data: &str) -> Result<Vec<u8>> {
    let data = data.trim();
    if data.len() % 2 == 0 && data.bytes().all(|b| b.is_ascii_hexdigit()) {
        return hex::decode(data).map_err(|e| BridgeError::Crypto(format!("bad hex: {e}")));
    }
    STANDARD
        .decode(data)
        .map_err(|e| BridgeError::Crypto(format!("input is neither hex nor base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(transformation: &str, key: &str, iv: Option<&str>) -> CipherSpec {
        CipherSpec {
            transformation: transformation.into(),
            key: key.into(),
            iv: iv.map(str::to_owned),
        }
    }

    fn gcm() -> SymmetricCipher {
        SymmetricCipher::from_spec(&spec("AES/GCM/NoPadding", "0123456789abcdef", Some("nonce-12byte")))
            .expect("valid cipher")
    }

    #[test]
    fn hex_round_trip() {
        let cipher = gcm();
        let hex = cipher.encrypt_hex("chapter 12").expect("encrypt");
        assert_eq!(hex.len(), 2 * ("chapter 12".len() + 16));
        assert_eq!(cipher.decrypt_str(&hex).expect("decrypt"), "chapter 12");
    }

    #[test]
    fn base64_round_trip_with_256_bit_key() {
        let cipher = SymmetricCipher::from_spec(&spec(
            "aes/gcm/nopadding",
            "0123456789abcdef0123456789abcdef",
            Some("nonce-12byte"),
        ))
        .expect("valid cipher");
        let b64 = cipher.encrypt_base64("密文").expect("encrypt");
        assert_eq!(cipher.decrypt_str(&b64).expect("decrypt"), "密文");
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let cipher = gcm();
        let mut bytes = cipher.encrypt(b"payload").expect("encrypt");
        bytes[0] ^= 0xff;
        assert!(matches!(cipher.decrypt(&bytes), Err(BridgeError::Crypto(_))));
    }

    #[test]
    fn short_key_is_a_key_error_even_for_unsupported_modes() {
        let err = SymmetricCipher::from_spec(&spec("AES/ECB/PKCS5", "key123", None)).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidKey(6)));
        assert_eq!(err.to_string(), "invalid key length: 6 bytes");
    }

    #[test]
    fn unsupported_mode_with_valid_key() {
        let err = SymmetricCipher::from_spec(&spec("AES/CTR/NoPadding", "0123456789abcdef", None))
            .unwrap_err();
        assert_eq!(err.to_string(), "crypto operation failed: unsupported cipher mode: CTR");
    }

    #[test]
    fn ecb_matches_known_ciphertext() {
        // openssl enc -aes-128-ecb -K 30313233343536373839616263646566
        let expected = "05ecfc88a69fd833794b58c08e7b439b";
        for transformation in ["AES", "AES/ECB/PKCS5Padding", "aes/ecb/pkcs7padding"] {
            let cipher = SymmetricCipher::from_spec(&spec(transformation, "0123456789abcdef", None))
                .expect("valid cipher");
            assert_eq!(cipher.encrypt_hex("chapter 12").expect("encrypt"), expected, "{transformation}");
            assert_eq!(cipher.decrypt_str(expected).expect("decrypt"), "chapter 12");
        }
    }

    #[test]
    fn ecb_ignores_iv() {
        let with_iv = SymmetricCipher::from_spec(&spec("AES/ECB/PKCS5Padding", "0123456789abcdef", Some("whatever")))
            .expect("valid cipher");
        assert_eq!(
            with_iv.encrypt_hex("chapter 12").expect("encrypt"),
            "05ecfc88a69fd833794b58c08e7b439b"
        );
    }

    #[test]
    fn cbc_matches_known_ciphertext() {
        // openssl enc -aes-128-cbc, iv "fedcba9876543210"
        let cipher = SymmetricCipher::from_spec(&spec(
            "AES/CBC/PKCS5Padding",
            "0123456789abcdef",
            Some("fedcba9876543210"),
        ))
        .expect("valid cipher");
        let expected = "cb8292a1a4c67f8665cf22ad0d966daa";
        assert_eq!(cipher.encrypt_hex("chapter 12").expect("encrypt"), expected);
        assert_eq!(cipher.decrypt_str(expected).expect("decrypt"), "chapter 12");
    }

    #[test]
    fn block_modes_round_trip_with_192_and_256_bit_keys() {
        for key in ["0123456789abcdef01234567", "0123456789abcdef0123456789abcdef"] {
            for (transformation, iv) in [("AES/ECB/PKCS5Padding", None), ("AES/CBC/PKCS5Padding", Some("fedcba9876543210"))] {
                let cipher = SymmetricCipher::from_spec(&spec(transformation, key, iv)).expect("valid cipher");
                let b64 = cipher.encrypt_base64("第一章 chapter one").expect("encrypt");
                assert_eq!(cipher.decrypt_str(&b64).expect("decrypt"), "第一章 chapter one");
            }
        }
    }

    #[test]
    fn cbc_needs_sixteen_byte_iv() {
        let missing = SymmetricCipher::from_spec(&spec("AES/CBC/PKCS5Padding", "0123456789abcdef", None))
            .unwrap_err();
        assert_eq!(missing.to_string(), "missing iv");

        let short = SymmetricCipher::from_spec(&spec("AES/CBC/PKCS5Padding", "0123456789abcdef", Some("abc")))
            .unwrap_err();
        assert!(short.to_string().contains("16-byte iv"));
    }

    #[test]
    fn block_modes_reject_other_padding() {
        let err = SymmetricCipher::from_spec(&spec("AES/CBC/NoPadding", "0123456789abcdef", Some("fedcba9876543210")))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported padding for CBC: NoPadding"));
    }

    #[test]
    fn wrong_key_fails_padding_check() {
        let good = SymmetricCipher::from_spec(&spec("AES", "0123456789abcdef", None)).expect("valid cipher");
        let other = SymmetricCipher::from_spec(&spec("AES", "fedcba9876543210", None)).expect("valid cipher");
        let ct = good.encrypt(b"a longer payload that spans blocks").expect("encrypt");
        assert!(matches!(other.decrypt(&ct), Err(BridgeError::Crypto(_))));
    }

    #[test]
    fn gcm_rejects_192_bit_key() {
        let err = SymmetricCipher::from_spec(&spec("AES/GCM/NoPadding", "0123456789abcdef01234567", Some("nonce-12byte")))
            .unwrap_err();
        assert!(err.to_string().contains("GCM requires a 16- or 32-byte key"));
    }

    #[test]
    fn non_aes_algorithm_rejected() {
        let err = SymmetricCipher::from_spec(&spec("DES/CBC/PKCS5Padding", "01234567", None))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported algorithm: DES"));
    }

    #[test]
    fn gcm_needs_twelve_byte_iv() {
        let missing = SymmetricCipher::from_spec(&spec("AES/GCM/NoPadding", "0123456789abcdef", None))
            .unwrap_err();
        assert_eq!(missing.to_string(), "missing iv");

        let short = SymmetricCipher::from_spec(&spec("AES/GCM/NoPadding", "0123456789abcdef", Some("abc")))
            .unwrap_err();
        assert!(short.to_string().contains("12-byte iv"));
    }

    #[test]
    fn garbage_ciphertext_is_reported() {
        assert!(gcm().decrypt_str("%%%").is_err());
    }
}
