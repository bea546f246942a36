//! Callback Handler module for processing inline keyboard callback queries

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use teloxide::prelude::*;
use tracing::{debug, warn};

use crate::dialogue::ConversationDialogue;

use super::message_handler::send_reply;
use super::router::Router;
use super::ui_builder::Reply;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: ConversationDialogue,
    router: Arc<Router>,
) -> Result<()> {
    debug!(user_id = %q.from.id, data = ?q.data, "Received callback query from user");

    // Stop the button's loading indicator; an expired query still gets routed
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!(user_id = %q.from.id, error = %e, "Failed to answer callback query");
    }

    match route_callback(&q, &dialogue, &router).await {
        Some((chat_id, language, reply)) => send_reply(&bot, chat_id, &reply, language).await,
        None => Ok(()),
    }
}

/// Route a button press to the chat it came from
pub async fn route_callback(
    q: &CallbackQuery,
    dialogue: &ConversationDialogue,
    router: &Router,
) -> Option<(ChatId, &'static str, Reply)> {
    let Some(chat_id) = q.message.as_ref().map(|msg| msg.chat().id) else {
        warn!(user_id = %q.from.id, "Callback query without a message, ignoring");
        return None;
    };

    let language = router.language_for(q.from.language_code.as_deref());
    let data = q.data.as_deref().unwrap_or_default();
    let today = Local::now().date_naive();

    let reply = router
        .handle_callback(dialogue, chat_id.0, data, language, today)
        .await;
    Some((chat_id, language, reply))
}
