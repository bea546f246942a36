//! Message Handler module for processing incoming Telegram messages

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::debug;

use crate::dialogue::ConversationDialogue;
use crate::localization::t_lang;

use super::router::Router;
use super::ui_builder::{reply_markup, Markup, Reply};

/// Send `reply` as an HTML message with its keyboard, if any
pub async fn send_reply(bot: &Bot, chat_id: ChatId, reply: &Reply, language: &str) -> Result<()> {
    let request = bot
        .send_message(chat_id, reply.text.clone())
        .parse_mode(ParseMode::Html);
    match &reply.markup {
        Some(markup) => request.reply_markup(reply_markup(markup, language)).await?,
        None => request.await?,
    };
    Ok(())
}

async fn handle_unsupported_message(bot: &Bot, msg: &Message, language: &str) -> Result<()> {
    debug!(user_id = %msg.chat.id, "Received unsupported message type from user");

    let reply = Reply::text(t_lang("unsupported-message", language)).with_markup(Markup::MainMenu);
    send_reply(bot, msg.chat.id, &reply, language).await
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    dialogue: ConversationDialogue,
    router: Arc<Router>,
) -> Result<()> {
    // Extract user's language code from Telegram
    let language = router.language_for(
        msg.from
            .as_ref()
            .and_then(|user| user.language_code.as_deref()),
    );

    let Some(text) = msg.text() else {
        return handle_unsupported_message(&bot, &msg, language).await;
    };

    debug!(user_id = %msg.chat.id, message_length = text.len(), "Received text message from user");

    let today = Local::now().date_naive();
    let reply = router
        .handle_text(&dialogue, msg.chat.id.0, text, language, today)
        .await;
    send_reply(&bot, msg.chat.id, &reply, language).await
}
