use std::time::Duration;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode, ReplyParameters};
use tracing::warn;

const TRUNCATION_NOTICE: &str = "...\n\n(Response was truncated due to length)";

/// Cuts `text` to at most `max_length` characters, marking the cut.
pub fn truncate_for_telegram(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let keep = max_length.saturating_sub(TRUNCATION_NOTICE.chars().count());
    let head: String = text.chars().take(keep).collect();
    format!("{head}{TRUNCATION_NOTICE}")
}

async fn edit_text_with_retry(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    text: &str,
    parse_mode: Option<ParseMode>,
) -> Result<()> {
    let mut delay = Duration::from_secs_f32(1.5);
    for attempt in 0..3 {
        let request = bot.edit_message_text(chat_id, message_id, text.to_string());
        let request = if let Some(mode) = parse_mode {
            request.parse_mode(mode)
        } else {
            request
        };

        match request.await {
            Ok(_) => return Ok(()),
            Err(err) => {
                if attempt == 2 {
                    return Err(err.into());
                }
                warn!("edit_message_text failed: {err}");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }

    Ok(())
}

/// Posts the "working on it" note that is later replaced by the answer.
pub async fn send_placeholder(bot: &Bot, message: &Message, text: &str) -> Result<Message> {
    let placeholder = bot
        .send_message(message.chat.id, text)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    Ok(placeholder)
}

/// Replaces a placeholder with the final reply. Markdown first, plain text
/// if Telegram rejects the entities.
#[allow(deprecated)]
pub async fn send_response(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    response: &str,
    max_length: usize,
) -> Result<()> {
    let response = truncate_for_telegram(response, max_length);
    if let Err(err) =
        edit_text_with_retry(bot, chat_id, message_id, &response, Some(ParseMode::Markdown)).await
    {
        warn!("Failed to send formatted response: {err}");
        edit_text_with_retry(bot, chat_id, message_id, &response, None).await?;
    }

    Ok(())
}

/// Replies to `message` with Markdown, falling back to plain text.
#[allow(deprecated)]
pub async fn reply_text(bot: &Bot, message: &Message, text: &str, max_length: usize) -> Result<()> {
    let text = truncate_for_telegram(text, max_length);
    let formatted = bot
        .send_message(message.chat.id, text.clone())
        .reply_parameters(ReplyParameters::new(message.id))
        .parse_mode(ParseMode::Markdown)
        .await;

    if let Err(err) = formatted {
        warn!("Failed to send formatted reply: {err}");
        bot.send_message(message.chat.id, text)
            .reply_parameters(ReplyParameters::new(message.id))
            .await?;
    }

    Ok(())
}
