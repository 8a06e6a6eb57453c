// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sandboxed text reads for `readTxtFileAwait` and local script imports.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, instrument, warn};

use sourcegate_core::config::BridgeConfig;
use sourcegate_core::error::{BridgeError, Result};

/// Read-only view of one directory tree. Page-supplied paths are resolved
/// against `root` and may never leave it.
#[derive(Debug, Clone)]
pub struct FileSandbox {
    root: PathBuf,
}

impl FileSandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.sandbox_root.clone())
    }

    /// Map a page path onto the filesystem.
    ///
    /// Absolute paths, drive prefixes and any `..` component are refused
    /// outright. The joined path is then canonicalised so a symlink inside
    /// the sandbox cannot point back out of it.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let requested = Path::new(path);
        let lexically_safe = !path.is_empty()
            && requested
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !lexically_safe {
            warn!(path, "rejected sandbox path");
            return Err(BridgeError::PathDenied(path.to_owned()));
        }

        let root = self.root.canonicalize()?;
        let resolved = root.join(requested).canonicalize()?;
        if !resolved.starts_with(&root) {
            warn!(path, resolved = %resolved.display(), "path escaped sandbox via link");
            return Err(BridgeError::PathDenied(path.to_owned()));
        }
        Ok(resolved)
    }

    /// Read `path` as text. Invalid UTF-8 is decoded lossily rather than
    /// failing the call.
    #[instrument(skip(self))]
    pub async fn read_text(&self, path: &str) -> Result<String> {
        let resolved = self.resolve(path)?;
        let bytes = tokio::fs::read(&resolved).await?;
        debug!(bytes = bytes.len(), "sandbox file read");
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}
