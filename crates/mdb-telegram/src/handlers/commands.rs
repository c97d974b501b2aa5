use std::sync::Arc;

use teloxide::prelude::*;

use mdb_core::{
    config::Config,
    domain::{ChatId, UserId},
    formatting::{escape_html, format_size},
    security::is_admin,
};

use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        return format!("{hours}h {mins}m {secs}s");
    }
    if mins > 0 {
        return format!("{mins}m {secs}s");
    }
    format!("{secs}s")
}

fn help_text(cfg: &Config) -> String {
    format!(
        "📥 <b>Media Download Bot</b>\n\n\
Send me a link to a video or image and I will fetch it for you.\n\n\
<b>📋 Commands:</b>\n\
/start - Show this help message\n\
/version - Show provider API versions\n\
/status - Bot status (admins only)\n\n\
<b>💡 Limits:</b>\n\
• Downloads up to {}\n\
• Files sent back to Telegram up to {}",
        format_size(cfg.max_download_bytes),
        format_size(cfg.max_upload_bytes),
    )
}

fn version_text(cfg: &Config) -> String {
    format!(
        "🧩 <b>Provider API Versions</b>\n\n\
YouTube: <code>{}</code>\n\
TikTok: <code>{}</code>\n\
Instagram: <code>{}</code>",
        escape_html(&cfg.youtube_api_version),
        escape_html(&cfg.tiktok_api_version),
        escape_html(&cfg.instagram_api_version),
    )
}

fn status_text(cfg: &Config, uptime_secs: i64, provider: &str) -> String {
    let mut lines: Vec<String> = vec!["📊 <b>Bot Status</b>\n".to_string()];

    lines.push(format!("⏱ Uptime: {}", format_duration(uptime_secs)));
    lines.push(format!("🌐 Provider: {}", escape_html(provider)));

    lines.push(format!(
        "\n📁 Downloads: <code>{}</code>",
        escape_html(&cfg.downloads_dir.display().to_string())
    ));
    lines.push(format!(
        "🗂 Temp: <code>{}</code>",
        escape_html(&cfg.temp_dir.display().to_string())
    ));

    lines.push(format!(
        "\n📦 Download limit: {}",
        format_size(cfg.max_download_bytes)
    ));
    lines.push(format!(
        "📤 Upload limit: {}",
        format_size(cfg.max_upload_bytes)
    ));
    lines.push(format!(
        "🧹 Janitor: every {}s, removes files older than {}s",
        cfg.session_cleanup_interval.as_secs(),
        cfg.session_timeout.as_secs()
    ));

    if !cfg.webhook_url.is_empty() {
        lines.push(format!(
            "\n🔗 Webhook: <code>{}</code>",
            escape_html(&cfg.webhook_url)
        ));
    }

    lines.join("\n")
}

async fn send_html(state: &AppState, chat_id: ChatId, html: &str) {
    if let Err(e) = state.messenger.send_html(chat_id, html).await {
        tracing::warn!("reply failed: {e}");
    }
}

pub async fn handle_command(_bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let user_id = msg.from().map(|u| UserId(u.id.0 as i64));
    let chat_id = ChatId(msg.chat.id.0);

    let (cmd, _arg) = parse_command(text);

    match cmd.as_str() {
        "start" | "help" => {
            send_html(&state, chat_id, &help_text(&state.cfg)).await;
            Ok(())
        }

        "version" => {
            send_html(&state, chat_id, &version_text(&state.cfg)).await;
            Ok(())
        }

        "status" => {
            if !is_admin(user_id, &state.cfg.admin_ids) {
                send_html(&state, chat_id, "🚫 Admins only.").await;
                return Ok(());
            }

            let uptime = chrono::Utc::now()
                .signed_duration_since(state.started_at)
                .num_seconds();
            let body = status_text(&state.cfg, uptime, state.downloader.service_name());
            send_html(&state, chat_id, &body).await;
            Ok(())
        }

        _ => {
            send_html(&state, chat_id, "Unknown command. Try /help.").await;
            Ok(())
        }
    }
}
