use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ChatAction;
use tracing::error;

use crate::handlers::commands::{require_group, sender_id};
use crate::handlers::media::download_reply_image;
use crate::handlers::responses::{reply_text, send_placeholder, send_response};
use crate::relay::{render_reply, require_audience, RelayError};
use crate::state::{AppState, PrivateText};
use crate::utils::telegram::start_chat_action_heartbeat;
use crate::utils::timing::CommandTimer;

const GETAI_USAGE: &str = "Usage: /getai [reply to image]";
const AICOOK_USAGE: &str = "Usage: /aicook [reply to image]";

fn finish_timer(timer: CommandTimer, result: &Result<String, RelayError>) {
    match result {
        Ok(_) => timer.finish("success", None),
        Err(RelayError::Usage(_)) => timer.finish("usage", None),
        Err(err) => timer.finish("error", Some(&err.to_string())),
    }
}

async fn deliver(
    bot: &Bot,
    state: &AppState,
    placeholder: &Message,
    result: Result<String, RelayError>,
) -> Result<()> {
    send_response(
        bot,
        placeholder.chat.id,
        placeholder.id,
        &render_reply(result),
        state.config.telegram_max_length,
    )
    .await
}

pub async fn askai_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    prompt: Option<String>,
) -> Result<()> {
    if !require_group(&bot, &message).await? {
        return Ok(());
    }
    let timer = CommandTimer::start("askai", &message);
    let placeholder = send_placeholder(&bot, &message, "Please Wait...").await?;

    let replied = message.reply_to_message().and_then(|reply| reply.text());
    let result = state.relay.ask(prompt.as_deref(), replied).await;
    finish_timer(timer, &result);
    deliver(&bot, &state, &placeholder, result).await
}

pub async fn getai_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    if !require_group(&bot, &message).await? {
        return Ok(());
    }
    let timer = CommandTimer::start("getai", &message);
    let placeholder = send_placeholder(&bot, &message, "Please Wait...").await?;

    let result = match download_reply_image(&bot, &message, &state.config.download_dir, GETAI_USAGE)
        .await
    {
        Ok(file) => state.relay.describe_image(file).await,
        Err(err) => Err(err),
    };
    finish_timer(timer, &result);
    deliver(&bot, &state, &placeholder, result).await
}

pub async fn aicook_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    if !require_group(&bot, &message).await? {
        return Ok(());
    }
    let timer = CommandTimer::start("aicook", &message);
    let placeholder = send_placeholder(&bot, &message, "Cooking...").await?;

    let result = match download_reply_image(&bot, &message, &state.config.download_dir, AICOOK_USAGE)
        .await
    {
        Ok(file) => state.relay.recipe_from_image(file).await,
        Err(err) => Err(err),
    };
    finish_timer(timer, &result);
    deliver(&bot, &state, &placeholder, result).await
}

pub async fn aiseller_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    audience: String,
) -> Result<()> {
    if !require_group(&bot, &message).await? {
        return Ok(());
    }
    let timer = CommandTimer::start("aiseller", &message);
    let placeholder = send_placeholder(&bot, &message, "Generating...").await?;

    let result = async {
        let audience = require_audience(&audience)?;
        let file = download_reply_image(
            &bot,
            &message,
            &state.config.download_dir,
            crate::relay::SELLER_USAGE,
        )
        .await?;
        state.relay.marketing_copy(audience, file).await
    }
    .await;
    finish_timer(timer, &result);
    deliver(&bot, &state, &placeholder, result).await
}

/// Private text: wizard input is answered inline, anything else is relayed
/// to Gemini on its own task.
pub async fn private_text_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(text) = message.text() else {
        return Ok(());
    };
    if text.trim_start().starts_with('/') {
        return Ok(());
    }
    let Some(user_id) = sender_id(&message) else {
        return Ok(());
    };

    match state.route_private_text(user_id, text) {
        PrivateText::Wizard(reply) => {
            reply_text(&bot, &message, &reply.text, state.config.telegram_max_length).await
        }
        PrivateText::Relay => {
            tokio::spawn(async move {
                if let Err(err) = private_chat(bot, state, message).await {
                    error!("private chat handler failed: {err}");
                }
            });
            Ok(())
        }
    }
}

async fn private_chat(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(text) = message.text() else {
        return Ok(());
    };
    let timer = CommandTimer::start("chat", &message);
    let result = {
        let _heartbeat = start_chat_action_heartbeat(bot.clone(), message.chat.id, ChatAction::Typing);
        state.relay.chat(text).await
    };
    finish_timer(timer, &result);
    reply_text(
        &bot,
        &message,
        &render_reply(result),
        state.config.telegram_max_length,
    )
    .await
}
