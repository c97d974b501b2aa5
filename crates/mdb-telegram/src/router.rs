use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use mdb_core::{
    config::Config,
    ports::{DownloadClient, MessagingPort},
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub downloader: Arc<dyn DownloadClient>,
    pub messenger: Arc<dyn MessagingPort>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

pub async fn run_polling(
    cfg: Arc<Config>,
    downloader: Arc<dyn DownloadClient>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    // Basic startup info.
    if let Ok(me) = bot.get_me().await {
        tracing::info!("mdb started: @{}", me.username());
    }
    tracing::info!("provider: {}", downloader.service_name());
    tracing::info!("downloads directory: {}", cfg.downloads_dir.display());
    tracing::info!("admins configured: {}", cfg.admin_ids.len());

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));

    let state = Arc::new(AppState {
        cfg,
        downloader,
        messenger,
        started_at: chrono::Utc::now(),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
