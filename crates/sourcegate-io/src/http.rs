// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async HTTP client behind `ajaxAwait`, `connectAwait`, `getAwait`,
// `headAwait`, `postAwait` and the downloader.
//
// Every request carries its own timeout: the page's value when it sent a
// number, otherwise the configured default. A timeout is reported as
// `BridgeError::Timeout` so the page sees "timed out after <ms>ms".
// Non-2xx responses are not errors here; the page gets the body and decides.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use tracing::{debug, instrument};

use sourcegate_core::call::{Headers, parse_headers};
use sourcegate_core::config::BridgeConfig;
use sourcegate_core::error::{BridgeError, Result};

/// Map a reqwest error, keeping timeouts distinguishable.
fn http_err(timeout_ms: u64) -> impl Fn(reqwest::Error) -> BridgeError {
    move |e| {
        if e.is_timeout() {
            BridgeError::Timeout(timeout_ms)
        } else {
            BridgeError::Http(e.to_string())
        }
    }
}

/// Shared HTTP client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    user_agent: String,
    default_timeout_ms: u64,
}

impl HttpClient {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BridgeError::Http(format!("client setup: {e}")))?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            default_timeout_ms: config.default_timeout_ms,
        })
    }

    fn timeout_ms(&self, requested: Option<u64>) -> u64 {
        requested.unwrap_or(self.default_timeout_ms)
    }

    /// Attach headers (plus our User-Agent unless the page set one) and send.
    async fn send(
        &self,
        builder: RequestBuilder,
        headers: &Headers,
        timeout_ms: u64,
    ) -> Result<Response> {
        let mut builder = builder.timeout(Duration::from_millis(timeout_ms));
        if !headers.keys().any(|k| k.eq_ignore_ascii_case("user-agent")) {
            builder = builder.header(reqwest::header::USER_AGENT, self.user_agent.as_str());
        }
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send().await.map_err(http_err(timeout_ms))?;
        debug!(status = %response.status(), "response received");
        Ok(response)
    }

    async fn body(response: Response, timeout_ms: u64) -> Result<String> {
        response.text().await.map_err(http_err(timeout_ms))
    }

    /// GET `url`, returning the body text.
    #[instrument(skip(self, headers), fields(headers = headers.len()))]
    pub async fn get(&self, url: &str, headers: &Headers, timeout_ms: Option<u64>) -> Result<String> {
        let timeout_ms = self.timeout_ms(timeout_ms);
        let response = self.send(self.client.get(url), headers, timeout_ms).await?;
        Self::body(response, timeout_ms).await
    }

    /// HEAD `url`, returning the response headers as a JSON object. Repeated
    /// headers are joined with `", "`.
    #[instrument(skip(self, headers), fields(headers = headers.len()))]
    pub async fn head(&self, url: &str, headers: &Headers, timeout_ms: Option<u64>) -> Result<String> {
        let timeout_ms = self.timeout_ms(timeout_ms);
        let response = self.send(self.client.head(url), headers, timeout_ms).await?;

        let mut out: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            out.entry(name.as_str().to_owned())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        Ok(serde_json::to_string(&out)?)
    }

    /// POST `body` to `url`, returning the response body text.
    #[instrument(skip(self, body, headers), fields(body_len = body.len()))]
    pub async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
        timeout_ms: Option<u64>,
    ) -> Result<String> {
        let timeout_ms = self.timeout_ms(timeout_ms);
        let builder = self.client.post(url).body(body.to_owned());
        let response = self.send(builder, headers, timeout_ms).await?;
        Self::body(response, timeout_ms).await
    }

    /// GET with optional raw header JSON, as `connectAwait` sends it.
    pub async fn connect(&self, url: &str, header: Option<&str>, timeout_ms: Option<u64>) -> Result<String> {
        let headers = header.map(parse_headers).unwrap_or_default();
        self.get(url, &headers, timeout_ms).await
    }

    /// Plain GET, as `ajaxAwait` sends it.
    pub async fn ajax(&self, url: &str, timeout_ms: Option<u64>) -> Result<String> {
        self.get(url, &Headers::new(), timeout_ms).await
    }

    /// GET that only accepts 2xx responses.
    async fn get_ok(&self, url: &str, timeout_ms: u64) -> Result<Response> {
        let response = self.send(self.client.get(url), &Headers::new(), timeout_ms).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Http(format!("status {}", status.as_u16())));
        }
        Ok(response)
    }

    /// GET raw bytes. Non-2xx statuses are errors here since a download of
    /// an error page is never what the caller wants.
    #[instrument(skip(self))]
    pub async fn get_bytes(&self, url: &str, timeout_ms: Option<u64>) -> Result<Vec<u8>> {
        let timeout_ms = self.timeout_ms(timeout_ms);
        let response = self.get_ok(url, timeout_ms).await?;
        let bytes = response.bytes().await.map_err(http_err(timeout_ms))?;
        Ok(bytes.to_vec())
    }

    /// GET body text, failing on non-2xx like [`HttpClient::get_bytes`].
    #[instrument(skip(self))]
    pub async fn get_text(&self, url: &str, timeout_ms: Option<u64>) -> Result<String> {
        let timeout_ms = self.timeout_ms(timeout_ms);
        let response = self.get_ok(url, timeout_ms).await?;
        Self::body(response, timeout_ms).await
    }
}
