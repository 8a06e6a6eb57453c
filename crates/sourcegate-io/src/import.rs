// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `importScriptAwait`: remote scripts are fetched once per process and
// memoised by URL; local ones are read through the file sandbox each time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, instrument};

use sourcegate_core::error::{BridgeError, Result};

use crate::files::FileSandbox;
use crate::http::HttpClient;

#[derive(Debug, Clone)]
pub struct ScriptImporter {
    http: HttpClient,
    files: FileSandbox,
    memo: Arc<Mutex<HashMap<String, String>>>,
}

fn is_remote(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl ScriptImporter {
    pub fn new(http: HttpClient, files: FileSandbox) -> Self {
        Self {
            http,
            files,
            memo: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn memoised(&self, url: &str) -> Option<String> {
        self.memo.lock().ok()?.get(url).cloned()
    }

    fn remember(&self, url: &str, script: &str) {
        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(url.to_owned(), script.to_owned());
        }
    }

    #[instrument(skip(self))]
    pub async fn import(&self, path: &str) -> Result<String> {
        let script = if is_remote(path) {
            if let Some(script) = self.memoised(path) {
                debug!("script served from memo");
                return Ok(script);
            }
            let script = self.http.get_text(path, None).await?;
            if !script.trim().is_empty() {
                self.remember(path, &script);
            }
            script
        } else {
            self.files.read_text(path).await?
        };

        if script.trim().is_empty() {
            return Err(BridgeError::EmptyScript(path.to_owned()));
        }
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sourcegate_core::config::BridgeConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn importer(root: &std::path::Path) -> ScriptImporter {
        let http = HttpClient::new(&BridgeConfig::default()).expect("client");
        ScriptImporter::new(http, FileSandbox::new(root))
    }

    #[tokio::test]
    async fn remote_scripts_are_fetched_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lib.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("var lib = 1;"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let importer = importer(dir.path());
        let url = format!("{}/lib.js", server.uri());
        assert_eq!(importer.import(&url).await.expect("first"), "var lib = 1;");
        assert_eq!(importer.clone().import(&url).await.expect("memo"), "var lib = 1;");
    }

    #[tokio::test]
    async fn failed_fetch_is_an_error_and_not_remembered() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lib.js"))
            .respond_with(ResponseTemplate::new(404).set_body_string("<h1>Not Found</h1>"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/lib.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("var lib = 1;"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let importer = importer(dir.path());
        let url = format!("{}/lib.js", server.uri());
        let err = importer.import(&url).await.unwrap_err();
        assert_eq!(err.to_string(), "http request failed: status 404");
        assert_eq!(importer.import(&url).await.expect("retry"), "var lib = 1;");
    }

    #[tokio::test]
    async fn local_scripts_read_through_sandbox() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("util.js"), "function f() {}").expect("write");
        let importer = importer(dir.path());

        assert_eq!(importer.import("util.js").await.expect("import"), "function f() {}");
        assert!(matches!(
            importer.import("../util.js").await.unwrap_err(),
            BridgeError::PathDenied(_)
        ));
    }

    #[tokio::test]
    async fn blank_script_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("blank.js"), "  \n").expect("write");
        let err = importer(dir.path()).import("blank.js").await.unwrap_err();
        assert_eq!(err.to_string(), "empty script: blank.js");
    }

    #[test]
    fn remote_detection_is_case_insensitive() {
        assert!(is_remote("HTTPS://cdn.test/a.js"));
        assert!(is_remote("http://x"));
        assert!(!is_remote("scripts/http.js"));
        assert!(!is_remote("ht"));
    }
}
