// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sourcegate IO: the network and filesystem capabilities a source page can
// reach through the bridge: HTTP verbs with per-call timeouts, file
// downloads with retry, sandboxed text reads and script imports.

pub mod download;
pub mod files;
pub mod http;
pub mod import;
pub mod retry;

pub use download::Downloader;
pub use files::FileSandbox;
pub use http::HttpClient;
pub use import::ScriptImporter;
pub use retry::RetryConfig;
