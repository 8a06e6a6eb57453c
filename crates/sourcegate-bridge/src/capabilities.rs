// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Routes each decoded call to the handler that serves it.

use std::sync::Arc;

use tracing::instrument;

use sourcegate_core::call::Call;
use sourcegate_core::config::BridgeConfig;
use sourcegate_core::error::Result;
use sourcegate_io::{Downloader, FileSandbox, HttpClient, ScriptImporter};
use sourcegate_security::{SymmetricCipher, sign_hex};

use crate::stub::StubHost;
use crate::traits::{RuleEngine, WebViewLoader, WebViewRequest};

/// Every native capability a session can reach.
pub struct Capabilities {
    http: HttpClient,
    downloader: Downloader,
    files: FileSandbox,
    importer: ScriptImporter,
    rules: Arc<dyn RuleEngine>,
    web_view: Arc<dyn WebViewLoader>,
}

impl Capabilities {
    /// Network and file handlers from `config`; rule evaluation and web views
    /// start as [`StubHost`] until the embedder supplies its own.
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let http = HttpClient::new(config)?;
        let files = FileSandbox::from_config(config);
        Ok(Self {
            downloader: Downloader::new(http.clone(), config),
            importer: ScriptImporter::new(http.clone(), files.clone()),
            http,
            files,
            rules: Arc::new(StubHost),
            web_view: Arc::new(StubHost),
        })
    }

    pub fn with_rule_engine(mut self, rules: Arc<dyn RuleEngine>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_web_view(mut self, web_view: Arc<dyn WebViewLoader>) -> Self {
        self.web_view = web_view;
        self
    }

    /// Run one call to completion and return its text result.
    #[instrument(skip_all, fields(call = %call.name()))]
    pub async fn execute(&self, call: Call) -> Result<String> {
        match call {
            Call::Run { code } => self.rules.eval_js(&code).await,
            Call::Ajax { url, timeout_ms } => self.http.ajax(&url, timeout_ms).await,
            Call::Connect {
                url,
                header,
                timeout_ms,
            } => self.http.connect(&url, header.as_deref(), timeout_ms).await,
            Call::Get {
                url,
                headers,
                timeout_ms,
            } => self.http.get(&url, &headers, timeout_ms).await,
            Call::Head {
                url,
                headers,
                timeout_ms,
            } => self.http.head(&url, &headers, timeout_ms).await,
            Call::Post {
                url,
                body,
                headers,
                timeout_ms,
            } => self.http.post(&url, &body, &headers, timeout_ms).await,
            Call::WebView {
                html,
                url,
                js,
                cache_first,
            } => {
                let request = WebViewRequest {
                    html,
                    url,
                    js,
                    cache_first,
                    ..Default::default()
                };
                self.web_view.web_view(&request).await
            }
            Call::WebViewGetSource {
                html,
                url,
                js,
                source_regex,
                cache_first,
                delay_ms,
            } => {
                let request = WebViewRequest {
                    html,
                    url,
                    js,
                    source_regex: Some(source_regex),
                    cache_first,
                    delay_ms,
                };
                self.web_view.web_view_get_source(&request).await
            }
            Call::DecryptStr { cipher, data } => SymmetricCipher::from_spec(&cipher)?.decrypt_str(&data),
            Call::EncryptBase64 { cipher, data } => {
                SymmetricCipher::from_spec(&cipher)?.encrypt_base64(&data)
            }
            Call::EncryptHex { cipher, data } => SymmetricCipher::from_spec(&cipher)?.encrypt_hex(&data),
            Call::CreateSignHex {
                algorithm,
                public_key,
                private_key,
                data,
            } => sign_hex(&algorithm, &public_key, &private_key, &data),
            Call::DownloadFile { url } => {
                let path = self.downloader.download(&url).await?;
                Ok(path.to_string_lossy().into_owned())
            }
            Call::ReadTxtFile { path } => self.files.read_text(&path).await,
            Call::ImportScript { path } => self.importer.import(&path).await,
            Call::GetString { rule, content } => {
                self.rules
                    .get_string(rule.as_deref(), content.as_deref(), false)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sourcegate_core::call::{Args, CallName};

    struct EchoRules;

    #[async_trait]
    impl RuleEngine for EchoRules {
        async fn eval_js(&self, code: &str) -> Result<String> {
            Ok(format!("eval:{code}"))
        }

        async fn get_string(
            &self,
            rule: Option<&str>,
            content: Option<&str>,
            is_url: bool,
        ) -> Result<String> {
            Ok(format!("{}|{}|{is_url}", rule.unwrap_or(""), content.unwrap_or("")))
        }
    }

    fn args(values: &[Option<&str>]) -> Args {
        Args::new(values.iter().map(|v| v.map(str::to_owned)))
    }

    fn capabilities(root: &std::path::Path) -> Capabilities {
        let config = BridgeConfig::default().rooted_at(root);
        Capabilities::from_config(&config).expect("capabilities")
    }

    #[tokio::test]
    async fn rule_calls_reach_supplied_engine() {
        let dir = tempfile::tempdir().expect("tempdir");
        let caps = capabilities(dir.path()).with_rule_engine(Arc::new(EchoRules));

        let run = Call::decode(CallName::Run, args(&[Some("1+1")])).expect("decode");
        assert_eq!(caps.execute(run).await.expect("run"), "eval:1+1");

        let get = Call::decode(CallName::GetStringAwait, args(&[Some("$.title"), None])).expect("decode");
        assert_eq!(caps.execute(get).await.expect("getString"), "$.title||false");
    }

    #[tokio::test]
    async fn crypto_round_trip_through_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let caps = capabilities(dir.path());
        let gcm = [Some("AES/GCM/NoPadding"), Some("0123456789abcdef"), Some("nonce-12byte")];

        let encrypt = Call::decode(
            CallName::EncryptHexAwait,
            args(&[gcm[0], gcm[1], gcm[2], Some("chapter")]),
        )
        .expect("decode");
        let hex = caps.execute(encrypt).await.expect("encrypt");

        let decrypt = Call::decode(
            CallName::DecryptStrAwait,
            args(&[gcm[0], gcm[1], gcm[2], Some(hex.as_str())]),
        )
        .expect("decode");
        assert_eq!(caps.execute(decrypt).await.expect("decrypt"), "chapter");
    }

    #[tokio::test]
    async fn read_txt_file_uses_sandbox_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("files")).expect("mkdir");
        std::fs::write(dir.path().join("files/toc.txt"), "contents").expect("write");
        let caps = capabilities(dir.path());

        let read = Call::decode(CallName::ReadTxtFileAwait, args(&[Some("toc.txt")])).expect("decode");
        assert_eq!(caps.execute(read).await.expect("read"), "contents");
    }

    #[tokio::test]
    async fn web_view_is_unavailable_on_stub() {
        let dir = tempfile::tempdir().expect("tempdir");
        let caps = capabilities(dir.path());
        let call = Call::decode(CallName::WebViewAwait, args(&[None, Some("https://a.test")]))
            .expect("decode");
        let err = caps.execute(call).await.unwrap_err();
        assert_eq!(err.to_string(), "capability not available on this host: web view");
    }
}
