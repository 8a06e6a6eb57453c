// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// File name of the persisted configuration inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Persistent bridge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Network timeout applied when a page omits one or sends garbage.
    pub default_timeout_ms: u64,
    /// Upper bound on any single call; a stalled handler is reported as a
    /// timeout once this elapses.
    pub call_deadline_secs: u64,
    /// How long an undelivered result may sit in the result cache.
    pub result_ttl_secs: u64,
    /// `User-Agent` sent unless the page supplies its own.
    pub user_agent: String,
    /// Root directory `readTxtFileAwait` and local `importScriptAwait` paths
    /// are resolved against.
    pub sandbox_root: PathBuf,
    /// Where `downloadFileAwait` stores fetched files.
    pub download_dir: PathBuf,
    /// Retries for transient download failures.
    pub download_retries: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 9000,
            call_deadline_secs: 120,
            result_ttl_secs: 120,
            user_agent: concat!("sourcegate/", env!("CARGO_PKG_VERSION")).to_owned(),
            sandbox_root: PathBuf::from("files"),
            download_dir: PathBuf::from("downloads"),
            download_retries: 2,
        }
    }
}

impl BridgeConfig {
    pub fn call_deadline(&self) -> Duration {
        Duration::from_secs(self.call_deadline_secs)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }

    /// Resolve relative directories against `data_dir`.
    pub fn rooted_at(mut self, data_dir: &Path) -> Self {
        if self.sandbox_root.is_relative() {
            self.sandbox_root = data_dir.join(&self.sandbox_root);
        }
        if self.download_dir.is_relative() {
            self.download_dir = data_dir.join(&self.download_dir);
        }
        self
    }

    /// Load `config.json` from `data_dir`, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        let loaded = std::fs::read_to_string(&path)
            .ok()
            .and_then(|data| match serde_json::from_str::<Self>(&data) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                    None
                }
            });
        debug!(from_file = loaded.is_some(), "bridge config loaded");
        loaded.unwrap_or_default().rooted_at(data_dir)
    }

    /// Write this configuration to `config.json` in `data_dir`.
    pub fn persist(&self, data_dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(data_dir.join(CONFIG_FILE), json)?;
        Ok(())
    }
}
