// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `downloadFileAwait`: fetch a URL into the download directory and hand
// the page back the local path.
//
// Files are named by the SHA-256 of their URL (plus the URL's extension), so
// downloading the same URL twice overwrites one file rather than piling up
// copies. Each write goes to its own `.part-<uuid>` file first and is renamed
// into place, so concurrent downloads of one URL never share a partial file.

use std::path::PathBuf;

use tracing::{info, instrument, warn};
use url::Url;
use uuid::Uuid;

use sourcegate_core::config::BridgeConfig;
use sourcegate_core::error::{BridgeError, Result};
use sourcegate_security::sha256_hex;

use crate::http::HttpClient;
use crate::retry::{RetryConfig, with_retry};

/// Longest URL extension carried over to the local file name.
const MAX_EXTENSION_LEN: usize = 8;

pub struct Downloader {
    http: HttpClient,
    dir: PathBuf,
    retry: RetryConfig,
}

impl Downloader {
    pub fn new(http: HttpClient, config: &BridgeConfig) -> Self {
        Self {
            http,
            dir: config.download_dir.clone(),
            retry: RetryConfig {
                max_retries: config.download_retries,
                ..Default::default()
            },
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Download `url` and return the path of the stored file.
    #[instrument(skip(self))]
    pub async fn download(&self, url: &str) -> Result<PathBuf> {
        let parsed = Url::parse(url)
            .map_err(|e| BridgeError::Http(format!("unsupported url {url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BridgeError::Http(format!(
                "unsupported url scheme: {}",
                parsed.scheme()
            )));
        }

        let bytes = with_retry(&self.retry, || self.http.get_bytes(url, None)).await?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.dir.join(file_name_for(&parsed));
        let partial = self
            .dir
            .join(format!(".{}.part-{}", file_name_for(&parsed), Uuid::new_v4().simple()));
        let stored = match tokio::fs::write(&partial, &bytes).await {
            Ok(()) => tokio::fs::rename(&partial, &target).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                warn!(path = %partial.display(), error = %cleanup, "could not remove partial download");
            }
            return Err(e.into());
        }

        info!(path = %target.display(), bytes = bytes.len(), "download stored");
        Ok(target)
    }
}

/// `<sha256(url)>[.<ext>]`, with the extension taken from the last path
/// segment when it is short and alphanumeric.
fn file_name_for(url: &Url) -> String {
    let hash = sha256_hex(url.as_str().as_bytes());
    let extension = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|last| last.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });
    match extension {
        Some(ext) => format!("{hash}.{}", ext.to_ascii_lowercase()),
        None => hash,
    }
}
