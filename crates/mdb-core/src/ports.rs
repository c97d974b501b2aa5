use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    failure::UpstreamFailure,
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the first implementation; the shape is kept narrow so future
/// adapters can fit behind the same interface.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        caption: &str,
    ) -> Result<MessageRef>;
}

/// A single media-download request extracted from an incoming message.
#[derive(Clone, Debug)]
pub struct DownloadRequest {
    pub url: String,
    /// Hard ceiling for the fetched payload, in bytes.
    pub max_bytes: u64,
    pub dest_dir: PathBuf,
}

/// A fetched media file on local disk.
#[derive(Clone, Debug)]
pub struct MediaPayload {
    pub file_path: PathBuf,
    pub bytes: u64,
    pub content_type: Option<String>,
}

/// Port for fetching media from an upstream service.
///
/// Failures are plain data (status + message); the caller classifies them
/// into user-facing text.
#[async_trait]
pub trait DownloadClient: Send + Sync {
    fn service_name(&self) -> &'static str;

    async fn fetch(
        &self,
        req: &DownloadRequest,
    ) -> std::result::Result<MediaPayload, UpstreamFailure>;
}
