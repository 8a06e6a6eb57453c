// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Call names and the typed request decoded from the page's argument list.
//
// Pages send `request(name, [p0..p5], id)` with every argument flattened to
// an optional string. `Call::decode` turns that into one variant per call
// name so handlers never index positional slots. `CallName::ALL` is also
// what the script injector generates wrappers from.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BridgeError, Result};

/// Maximum number of positional arguments a page may pass.
pub const MAX_ARGS: usize = 6;

/// Request headers decoded from the page's header JSON.
pub type Headers = BTreeMap<String, String>;

/// The closed set of functions a page may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallName {
    Run,
    AjaxAwait,
    ConnectAwait,
    GetAwait,
    HeadAwait,
    PostAwait,
    WebViewAwait,
    WebViewGetSourceAwait,
    DecryptStrAwait,
    EncryptBase64Await,
    EncryptHexAwait,
    CreateSignHexAwait,
    DownloadFileAwait,
    ReadTxtFileAwait,
    ImportScriptAwait,
    GetStringAwait,
}

impl CallName {
    pub const ALL: [CallName; 16] = [
        Self::Run,
        Self::AjaxAwait,
        Self::ConnectAwait,
        Self::GetAwait,
        Self::HeadAwait,
        Self::PostAwait,
        Self::WebViewAwait,
        Self::WebViewGetSourceAwait,
        Self::DecryptStrAwait,
        Self::EncryptBase64Await,
        Self::EncryptHexAwait,
        Self::CreateSignHexAwait,
        Self::DownloadFileAwait,
        Self::ReadTxtFileAwait,
        Self::ImportScriptAwait,
        Self::GetStringAwait,
    ];

    /// Name as seen by the page.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::AjaxAwait => "ajaxAwait",
            Self::ConnectAwait => "connectAwait",
            Self::GetAwait => "getAwait",
            Self::HeadAwait => "headAwait",
            Self::PostAwait => "postAwait",
            Self::WebViewAwait => "webViewAwait",
            Self::WebViewGetSourceAwait => "webViewGetSourceAwait",
            Self::DecryptStrAwait => "decryptStrAwait",
            Self::EncryptBase64Await => "encryptBase64Await",
            Self::EncryptHexAwait => "encryptHexAwait",
            Self::CreateSignHexAwait => "createSignHexAwait",
            Self::DownloadFileAwait => "downloadFileAwait",
            Self::ReadTxtFileAwait => "readTxtFileAwait",
            Self::ImportScriptAwait => "importScriptAwait",
            Self::GetStringAwait => "getStringAwait",
        }
    }

    /// Calls whose wrapper takes exactly one argument coerced with `String(x)`
    /// instead of a variadic list.
    pub fn takes_single_arg(&self) -> bool {
        matches!(
            self,
            Self::Run | Self::DownloadFileAwait | Self::ReadTxtFileAwait | Self::ImportScriptAwait
        )
    }

    /// Parameter name used for single-argument wrappers.
    pub fn single_arg_name(&self) -> &'static str {
        match self {
            Self::Run => "jsCode",
            Self::DownloadFileAwait | Self::ImportScriptAwait => "url",
            _ => "path",
        }
    }
}

impl std::fmt::Display for CallName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallName {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| BridgeError::UnknownFunction(s.to_owned()))
    }
}

/// The page's positional arguments, padded or truncated to [`MAX_ARGS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args([Option<String>; MAX_ARGS]);

impl Args {
    pub fn new(values: impl IntoIterator<Item = Option<String>>) -> Self {
        let mut slots: [Option<String>; MAX_ARGS] = Default::default();
        for (slot, value) in slots.iter_mut().zip(values) {
            *slot = value;
        }
        Self(slots)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|v| v.as_deref())
    }

    fn take(&mut self, index: usize) -> Option<String> {
        self.0.get_mut(index).and_then(Option::take)
    }

    fn required(&mut self, index: usize, field: &'static str) -> Result<String> {
        self.take(index).ok_or(BridgeError::MissingArgument(field))
    }

    /// Millisecond value; absent or non-numeric input yields `None` so the
    /// caller can apply its default.
    fn millis(&self, index: usize) -> Option<u64> {
        let raw = self.get(index)?;
        match raw.trim().parse::<u64>() {
            Ok(ms) => Some(ms),
            Err(_) => {
                debug!(index, raw, "ignoring non-numeric millisecond argument");
                None
            }
        }
    }

    /// `"true"` in any case is true, everything else (including absence) false.
    fn flag(&self, index: usize) -> bool {
        self.get(index)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    fn headers(&mut self, index: usize, field: &'static str) -> Result<Headers> {
        let raw = self.required(index, field)?;
        Ok(parse_headers(&raw))
    }
}

impl From<Vec<Option<String>>> for Args {
    fn from(values: Vec<Option<String>>) -> Self {
        Self::new(values)
    }
}

/// Decode header JSON, falling back to no headers when the text is not a
/// string-to-string object.
pub fn parse_headers(raw: &str) -> Headers {
    match serde_json::from_str::<Headers>(raw) {
        Ok(headers) => headers,
        Err(e) => {
            debug!(error = %e, "header json unparsable, sending no headers");
            Headers::new()
        }
    }
}

/// Algorithm, key and optional IV for a symmetric crypto call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherSpec {
    /// `ALG/MODE/PADDING`, e.g. `AES/GCM/NoPadding`.
    pub transformation: String,
    pub key: String,
    pub iv: Option<String>,
}

/// A decoded bridge request. One variant per [`CallName`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Run {
        code: String,
    },
    Ajax {
        url: String,
        timeout_ms: Option<u64>,
    },
    Connect {
        url: String,
        header: Option<String>,
        timeout_ms: Option<u64>,
    },
    Get {
        url: String,
        headers: Headers,
        timeout_ms: Option<u64>,
    },
    Head {
        url: String,
        headers: Headers,
        timeout_ms: Option<u64>,
    },
    Post {
        url: String,
        body: String,
        headers: Headers,
        timeout_ms: Option<u64>,
    },
    WebView {
        html: Option<String>,
        url: Option<String>,
        js: Option<String>,
        cache_first: bool,
    },
    WebViewGetSource {
        html: Option<String>,
        url: Option<String>,
        js: Option<String>,
        source_regex: String,
        cache_first: bool,
        delay_ms: u64,
    },
    DecryptStr {
        cipher: CipherSpec,
        data: String,
    },
    EncryptBase64 {
        cipher: CipherSpec,
        data: String,
    },
    EncryptHex {
        cipher: CipherSpec,
        data: String,
    },
    CreateSignHex {
        algorithm: String,
        public_key: String,
        private_key: String,
        data: String,
    },
    DownloadFile {
        url: String,
    },
    ReadTxtFile {
        path: String,
    },
    ImportScript {
        path: String,
    },
    GetString {
        rule: Option<String>,
        content: Option<String>,
    },
}

impl Call {
    /// Decode the page's arguments for `name`. Missing required arguments
    /// fail with [`BridgeError::MissingArgument`] naming the field.
    pub fn decode(name: CallName, mut args: Args) -> Result<Self> {
        let call = match name {
            CallName::Run => Self::Run {
                code: args.required(0, "code")?,
            },
            CallName::AjaxAwait => Self::Ajax {
                url: args.required(0, "url")?,
                timeout_ms: args.millis(1),
            },
            CallName::ConnectAwait => Self::Connect {
                url: args.required(0, "url")?,
                header: args.take(1),
                timeout_ms: args.millis(2),
            },
            CallName::GetAwait => Self::Get {
                url: args.required(0, "url")?,
                headers: args.headers(1, "header")?,
                timeout_ms: args.millis(2),
            },
            CallName::HeadAwait => Self::Head {
                url: args.required(0, "url")?,
                headers: args.headers(1, "header")?,
                timeout_ms: args.millis(2),
            },
            CallName::PostAwait => Self::Post {
                url: args.required(0, "url")?,
                body: args.required(1, "body")?,
                headers: args.headers(2, "header")?,
                timeout_ms: args.millis(3),
            },
            CallName::WebViewAwait => Self::WebView {
                cache_first: args.flag(3),
                html: args.take(0),
                url: args.take(1),
                js: args.take(2),
            },
            CallName::WebViewGetSourceAwait => Self::WebViewGetSource {
                source_regex: args.required(3, "source regex")?,
                cache_first: args.flag(4),
                delay_ms: args.millis(5).unwrap_or(0),
                html: args.take(0),
                url: args.take(1),
                js: args.take(2),
            },
            CallName::DecryptStrAwait => Self::DecryptStr {
                cipher: cipher_spec(&mut args)?,
                data: args.required(3, "data")?,
            },
            CallName::EncryptBase64Await => Self::EncryptBase64 {
                cipher: cipher_spec(&mut args)?,
                data: args.required(3, "data")?,
            },
            CallName::EncryptHexAwait => Self::EncryptHex {
                cipher: cipher_spec(&mut args)?,
                data: args.required(3, "data")?,
            },
            CallName::CreateSignHexAwait => Self::CreateSignHex {
                algorithm: args.required(0, "algorithm")?,
                public_key: args.required(1, "public key")?,
                private_key: args.required(2, "private key")?,
                data: args.required(3, "data")?,
            },
            CallName::DownloadFileAwait => Self::DownloadFile {
                url: args.required(0, "url")?,
            },
            CallName::ReadTxtFileAwait => Self::ReadTxtFile {
                path: args.required(0, "path")?,
            },
            CallName::ImportScriptAwait => Self::ImportScript {
                path: args.required(0, "path")?,
            },
            CallName::GetStringAwait => Self::GetString {
                rule: args.take(0),
                content: args.take(1),
            },
        };
        Ok(call)
    }

    /// Decode from the raw wire name.
    pub fn parse(name: &str, args: Args) -> Result<Self> {
        Self::decode(name.parse()?, args)
    }

    pub fn name(&self) -> CallName {
        match self {
            Self::Run { .. } => CallName::Run,
            Self::Ajax { .. } => CallName::AjaxAwait,
            Self::Connect { .. } => CallName::ConnectAwait,
            Self::Get { .. } => CallName::GetAwait,
            Self::Head { .. } => CallName::HeadAwait,
            Self::Post { .. } => CallName::PostAwait,
            Self::WebView { .. } => CallName::WebViewAwait,
            Self::WebViewGetSource { .. } => CallName::WebViewGetSourceAwait,
            Self::DecryptStr { .. } => CallName::DecryptStrAwait,
            Self::EncryptBase64 { .. } => CallName::EncryptBase64Await,
            Self::EncryptHex { .. } => CallName::EncryptHexAwait,
            Self::CreateSignHex { .. } => CallName::CreateSignHexAwait,
            Self::DownloadFile { .. } => CallName::DownloadFileAwait,
            Self::ReadTxtFile { .. } => CallName::ReadTxtFileAwait,
            Self::ImportScript { .. } => CallName::ImportScriptAwait,
            Self::GetString { .. } => CallName::GetStringAwait,
        }
    }
}

fn cipher_spec(args: &mut Args) -> Result<CipherSpec> {
    Ok(CipherSpec {
        transformation: args.required(0, "transformation")?,
        key: args.required(1, "key")?,
        iv: args.take(2),
    })
}
