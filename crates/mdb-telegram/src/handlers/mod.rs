//! Telegram update handlers.
//!
//! Commands answer directly; any other text is treated as a potential media
//! link and routed to the download flow.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod commands;
mod link;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        let _ = bot
            .send_message(msg.chat.id, "Send me a media link, or /help.")
            .await;
        return Ok(());
    };

    if text.starts_with('/') {
        return commands::handle_command(bot, msg, state).await;
    }

    link::handle_link(bot, msg, state).await
}
