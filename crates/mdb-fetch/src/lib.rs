//! Direct HTTP download adapter.
//!
//! Streams a media URL to the destination directory with a hard size guard.
//! Failures come back as plain status + message data; the caller turns them
//! into user-facing text.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use mdb_core::{
    failure::UpstreamFailure,
    formatting::format_size,
    ports::{DownloadClient, DownloadRequest, MediaPayload},
};

const CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
const TRANSFER_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);
const ERROR_BODY_PREVIEW: usize = 200;

#[derive(Clone, Debug)]
pub struct DirectHttpClient {
    http: reqwest::Client,
}

impl Default for DirectHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectHttpClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(TRANSFER_TIMEOUT)
            .build()
            .expect("reqwest client build");
        Self { http }
    }
}

#[async_trait]
impl DownloadClient for DirectHttpClient {
    fn service_name(&self) -> &'static str {
        "direct-http"
    }

    async fn fetch(
        &self,
        req: &DownloadRequest,
    ) -> std::result::Result<MediaPayload, UpstreamFailure> {
        let mut resp = match self.http.get(&req.url).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                return Err(UpstreamFailure::new(None, format!("connection timeout: {e}")));
            }
            Err(e) => {
                return Err(UpstreamFailure::new(None, format!("request error: {e}")));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamFailure::new(
                Some(status.as_u16()),
                extract_error_message(&body),
            ));
        }

        if let Some(len) = resp.content_length() {
            if len > req.max_bytes {
                return Err(UpstreamFailure::new(
                    None,
                    format!(
                        "file too large: {} exceeds the {} limit",
                        format_size(len),
                        format_size(req.max_bytes)
                    ),
                ));
            }
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Err(e) = tokio::fs::create_dir_all(&req.dest_dir).await {
            return Err(UpstreamFailure::new(
                None,
                format!("cannot prepare {}: {e}", req.dest_dir.display()),
            ));
        }

        let dest = unique_dest(&req.dest_dir, &derive_file_name(&req.url));
        let mut file = match tokio::fs::File::create(&dest).await {
            Ok(file) => file,
            Err(e) => {
                return Err(UpstreamFailure::new(
                    None,
                    format!("cannot create {}: {e}", dest.display()),
                ));
            }
        };

        // Content-Length is advisory; the running total is the real guard.
        let mut total: u64 = 0;
        loop {
            let chunk = match resp.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    discard(&dest).await;
                    let msg = if e.is_timeout() {
                        format!("connection timeout while reading body: {e}")
                    } else {
                        format!("body read error: {e}")
                    };
                    return Err(UpstreamFailure::new(None, msg));
                }
            };

            total += chunk.len() as u64;
            if total > req.max_bytes {
                discard(&dest).await;
                return Err(UpstreamFailure::new(
                    None,
                    format!(
                        "file too large: download exceeded the {} limit",
                        format_size(req.max_bytes)
                    ),
                ));
            }

            if let Err(e) = file.write_all(&chunk).await {
                discard(&dest).await;
                return Err(UpstreamFailure::new(
                    None,
                    format!("cannot write {}: {e}", dest.display()),
                ));
            }
        }

        if let Err(e) = file.flush().await {
            discard(&dest).await;
            return Err(UpstreamFailure::new(
                None,
                format!("cannot flush {}: {e}", dest.display()),
            ));
        }

        Ok(MediaPayload {
            file_path: dest,
            bytes: total,
            content_type,
        })
    }
}

async fn discard(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}

/// Pull a human-meaningful message out of an upstream error body.
///
/// JSON bodies commonly carry `message` or `error` fields; anything else is
/// passed through truncated.
fn extract_error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(s) = v.get(key).and_then(|m| m.as_str()) {
                return s.to_string();
            }
        }
        if let Some(s) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return s.to_string();
        }
    }

    body.trim().chars().take(ERROR_BODY_PREVIEW).collect()
}

/// Last URL path segment, query and fragment stripped, unsafe characters
/// dropped.
fn derive_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);

    // Only the path after the host can yield a name.
    let after_scheme = match without_query.find("://") {
        Some(idx) => &without_query[idx + 3..],
        None => without_query,
    };
    let candidate = match after_scheme.find('/') {
        Some(idx) => after_scheme[idx + 1..]
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(""),
        None => "",
    };

    let cleaned: String = candidate
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "media.bin".to_string()
    } else {
        cleaned
    }
}

/// Avoid clobbering an existing file by appending a numeric suffix.
fn unique_dest(dir: &Path, name: &str) -> PathBuf {
    let mut dest = dir.join(name);
    if !dest.exists() {
        return dest;
    }

    let p = Path::new(name);
    let stem = p
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("media")
        .to_string();
    let ext = p.extension().and_then(|s| s.to_str());

    let mut n = 1u32;
    loop {
        let next = match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        dest = dir.join(next);
        if !dest.exists() {
            return dest;
        }
        n += 1;
    }
}
