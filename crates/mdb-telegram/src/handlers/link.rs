use std::{sync::Arc, time::Duration};

use regex::Regex;
use teloxide::{prelude::*, types::ChatAction};
use tokio::sync::oneshot;

use mdb_core::{
    domain::ChatId,
    formatting::{escape_html, format_size, render_failure, truncate_text},
    ports::{DownloadRequest, MediaPayload},
};

use crate::router::AppState;

const MAX_RETRIES: u32 = 1;
const RETRY_DELAY: Duration = Duration::from_secs(2);

pub(crate) fn extract_url(text: &str) -> Option<String> {
    let re = Regex::new(r#"https?://[^\s<>"']+"#).expect("valid regex");
    let m = re.find(text)?;
    // Trailing sentence punctuation is almost never part of the link.
    let url = m.as_str().trim_end_matches(['.', ',', ';', ')', ']']);
    Some(url.to_string())
}

pub async fn handle_link(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);

    let Some(url) = extract_url(text) else {
        reply(&state, chat_id, "Send me a link to a video or image, or /help.").await;
        return Ok(());
    };

    tracing::info!("download requested: {url}");

    // Keep the "typing" indicator alive while the fetch runs.
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let typing_bot = bot.clone();
    let typing_chat = msg.chat.id;
    let typing_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3));
        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = interval.tick() => {
                    let _ = typing_bot
                        .send_chat_action(typing_chat, ChatAction::Typing)
                        .await;
                }
            }
        }
    });

    let status = format!("⬇️ Fetching <code>{}</code>...", escape_html(&url));
    reply(&state, chat_id, &status).await;

    fetch_and_deliver(&state, chat_id, &url).await;

    let _ = stop_tx.send(());
    let _ = typing_task.await;

    Ok(())
}

pub(crate) async fn fetch_and_deliver(state: &AppState, chat_id: ChatId, url: &str) {
    let request = DownloadRequest {
        url: url.to_string(),
        max_bytes: state.cfg.max_download_bytes,
        dest_dir: state.cfg.downloads_dir.clone(),
    };

    let mut attempt = 0;
    let payload = loop {
        match state.downloader.fetch(&request).await {
            Ok(payload) => break payload,
            Err(failure) => {
                let classification = failure.classify();
                if attempt < MAX_RETRIES && classification.kind.is_retryable() {
                    attempt += 1;
                    tracing::warn!("fetch failed ({failure}), retrying in {RETRY_DELAY:?}");
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
                tracing::warn!("fetch failed for {url}: {failure}");
                reply(state, chat_id, &render_failure(&classification)).await;
                return;
            }
        }
    };

    deliver(state, chat_id, &payload).await;
}

async fn deliver(state: &AppState, chat_id: ChatId, payload: &MediaPayload) {
    if payload.bytes > state.cfg.max_upload_bytes {
        let text = format!(
            "⚠️ Downloaded {} but it exceeds the {} upload limit.\n\n\
Saved on the server as <code>{}</code>.",
            format_size(payload.bytes),
            format_size(state.cfg.max_upload_bytes),
            escape_html(&payload.file_path.display().to_string()),
        );
        reply(state, chat_id, &text).await;
        return;
    }

    let name = payload
        .file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "media".to_string());
    let caption = format!(
        "✅ <b>{}</b> ({})",
        escape_html(&name),
        format_size(payload.bytes)
    );

    if let Err(e) = state
        .messenger
        .send_document(chat_id, &payload.file_path, &caption)
        .await
    {
        tracing::warn!("document delivery failed: {e}");
        let text = format!(
            "❌ Error: {}",
            escape_html(&truncate_text(&e.to_string(), 200))
        );
        reply(state, chat_id, &text).await;
    }
}

async fn reply(state: &AppState, chat_id: ChatId, html: &str) {
    if let Err(e) = state.messenger.send_html(chat_id, html).await {
        tracing::warn!("reply failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        path::{Path, PathBuf},
        sync::{
            atomic::{AtomicU32, Ordering},
            Mutex,
        },
    };

    use async_trait::async_trait;

    use mdb_core::{
        config::Config,
        domain::{MessageId, MessageRef},
        failure::UpstreamFailure,
        ports::{DownloadClient, MessagingPort},
        Error, Result,
    };

    // ============== Fakes ==============

    #[derive(Default)]
    struct FakeMessenger {
        sent: Mutex<Vec<String>>,
        documents: Mutex<Vec<(PathBuf, String)>>,
        fail_documents: bool,
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            self.sent.lock().unwrap().push(html.to_string());
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }

        async fn send_document(
            &self,
            chat_id: ChatId,
            path: &Path,
            caption: &str,
        ) -> Result<MessageRef> {
            if self.fail_documents {
                return Err(Error::External("telegram error: file too big".to_string()));
            }
            self.documents
                .lock()
                .unwrap()
                .push((path.to_path_buf(), caption.to_string()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(2),
            })
        }
    }

    struct FakeDownloader {
        responses: Mutex<Vec<std::result::Result<MediaPayload, UpstreamFailure>>>,
        calls: AtomicU32,
    }

    impl FakeDownloader {
        fn with(responses: Vec<std::result::Result<MediaPayload, UpstreamFailure>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl DownloadClient for FakeDownloader {
        fn service_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch(
            &self,
            _req: &DownloadRequest,
        ) -> std::result::Result<MediaPayload, UpstreamFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn test_config() -> Config {
        Config {
            bot_token: "token".to_string(),
            webhook_url: String::new(),
            secret_key: String::new(),
            default_encryption_key: String::new(),
            rapidapi_key: String::new(),
            youtube_api_version: "v2".to_string(),
            tiktok_api_version: "v1".to_string(),
            instagram_api_version: "v1".to_string(),
            admin_ids: vec![42],
            project_root: PathBuf::from("/srv/app"),
            downloads_dir: PathBuf::from("/srv/app/downloads"),
            sessions_dir: PathBuf::from("/srv/app/sessions"),
            logs_dir: PathBuf::from("/srv/app/logs"),
            temp_dir: PathBuf::from("/srv/app/tmp"),
            cache_dir: PathBuf::from("/srv/app/cache"),
            max_download_bytes: 2_147_483_648,
            max_upload_bytes: 52_428_800,
            session_timeout: Duration::from_secs(3600),
            session_cleanup_interval: Duration::from_secs(600),
        }
    }

    fn test_state(downloader: Arc<FakeDownloader>, messenger: Arc<FakeMessenger>) -> AppState {
        AppState {
            cfg: Arc::new(test_config()),
            downloader,
            messenger,
            started_at: chrono::Utc::now(),
        }
    }

    fn payload(bytes: u64) -> MediaPayload {
        MediaPayload {
            file_path: PathBuf::from("/srv/app/downloads/clip.mp4"),
            bytes,
            content_type: Some("video/mp4".to_string()),
        }
    }

    // ============== URL extraction ==============

    #[test]
    fn extracts_url_from_surrounding_text() {
        assert_eq!(
            extract_url("check this out https://youtu.be/abc123 please"),
            Some("https://youtu.be/abc123".to_string())
        );
        assert_eq!(extract_url("no link here"), None);
    }

    #[test]
    fn trims_trailing_punctuation_from_url() {
        assert_eq!(
            extract_url("see https://example.com/video."),
            Some("https://example.com/video".to_string())
        );
        assert_eq!(
            extract_url("(https://example.com/a)"),
            Some("https://example.com/a".to_string())
        );
    }

    // ============== Fetch and deliver ==============

    #[tokio::test]
    async fn failure_reply_carries_message_and_tip() {
        let downloader = FakeDownloader::with(vec![Err(UpstreamFailure::new(
            Some(503),
            "service unavailable",
        ))]);
        let messenger = Arc::new(FakeMessenger::default());
        let state = test_state(downloader.clone(), messenger.clone());

        fetch_and_deliver(&state, ChatId(7), "https://example.com/v").await;

        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("temporarily unavailable"));
        assert!(sent[0].contains("<i>"));
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn retries_once_when_rate_limited() {
        let downloader = FakeDownloader::with(vec![
            Err(UpstreamFailure::new(Some(429), "too many requests")),
            Ok(payload(1_000)),
        ]);
        let messenger = Arc::new(FakeMessenger::default());
        let state = test_state(downloader.clone(), messenger.clone());

        fetch_and_deliver(&state, ChatId(7), "https://example.com/v").await;

        assert_eq!(downloader.calls.load(Ordering::SeqCst), 2);
        assert_eq!(messenger.documents.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn does_not_retry_bad_requests() {
        let downloader = FakeDownloader::with(vec![Err(UpstreamFailure::new(
            Some(400),
            "invalid url",
        ))]);
        let messenger = Arc::new(FakeMessenger::default());
        let state = test_state(downloader.clone(), messenger.clone());

        fetch_and_deliver(&state, ChatId(7), "https://example.com/v").await;

        assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);
        assert!(messenger.documents.lock().unwrap().is_empty());
        let sent = messenger.sent.lock().unwrap();
        assert!(sent[0].contains("Bad request"));
    }

    #[tokio::test]
    async fn oversized_payload_stays_on_disk() {
        let downloader = FakeDownloader::with(vec![Ok(payload(60_000_000))]);
        let messenger = Arc::new(FakeMessenger::default());
        let state = test_state(downloader.clone(), messenger.clone());

        fetch_and_deliver(&state, ChatId(7), "https://example.com/v").await;

        assert!(messenger.documents.lock().unwrap().is_empty());
        let sent = messenger.sent.lock().unwrap();
        assert!(sent[0].contains("upload limit"));
        assert!(sent[0].contains("clip.mp4"));
    }

    #[tokio::test]
    async fn delivers_document_with_name_and_size_caption() {
        let downloader = FakeDownloader::with(vec![Ok(payload(1_048_576))]);
        let messenger = Arc::new(FakeMessenger::default());
        let state = test_state(downloader.clone(), messenger.clone());

        fetch_and_deliver(&state, ChatId(7), "https://example.com/v").await;

        let documents = messenger.documents.lock().unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].1.contains("clip.mp4"));
        assert!(documents[0].1.contains("1.0 MB"));
    }

    #[tokio::test]
    async fn delivery_failure_is_reported_to_the_chat() {
        let downloader = FakeDownloader::with(vec![Ok(payload(1_000))]);
        let messenger = Arc::new(FakeMessenger {
            fail_documents: true,
            ..FakeMessenger::default()
        });
        let state = test_state(downloader, messenger.clone());

        fetch_and_deliver(&state, ChatId(7), "https://example.com/v").await;

        let sent = messenger.sent.lock().unwrap();
        assert!(sent.last().is_some_and(|s| s.starts_with("❌ Error:")));
        assert!(sent.last().is_some_and(|s| s.contains("file too big")));
    }
}
