use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ReplyParameters, WebAppInfo};
use tracing::{info, warn};
use url::Url;

use crate::handlers::responses::reply_text;
use crate::state::AppState;

pub const PRIVATE_ONLY_HINT: &str = "This command only works in a private chat with the bot.";
pub const GROUP_ONLY_HINT: &str = "This command only works in group chats.";

const WEBAPP_TEXT: &str = "🤖 *Gemini AI Web App*

Experience our AI assistant in a beautiful web interface!

✨ *Features:*
- Interactive chat interface
- Telegram Web App integration
- Optimized for mobile
- Ad-supported free service

Click the button below to launch the web app:";

pub fn sender_id(message: &Message) -> Option<i64> {
    message
        .from
        .as_ref()
        .and_then(|user| i64::try_from(user.id.0).ok())
}

pub fn is_group_chat(message: &Message) -> bool {
    message.chat.is_group() || message.chat.is_supergroup()
}

/// Replies with a hint and returns false when the chat is not private.
async fn require_private(bot: &Bot, message: &Message) -> Result<bool> {
    if message.chat.is_private() {
        return Ok(true);
    }
    bot.send_message(message.chat.id, PRIVATE_ONLY_HINT)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    Ok(false)
}

pub async fn require_group(bot: &Bot, message: &Message) -> Result<bool> {
    if is_group_chat(message) {
        return Ok(true);
    }
    bot.send_message(message.chat.id, GROUP_ONLY_HINT)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    Ok(false)
}

pub async fn start_handler(bot: Bot, message: Message) -> Result<()> {
    bot.send_message(
        message.chat.id,
        "Hello! I relay your questions to Gemini AI. Use /help to see commands.",
    )
    .reply_parameters(ReplyParameters::new(message.id))
    .await?;
    Ok(())
}

pub async fn help_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let help_text = "
*Gemini AI Bot Commands*

/askai - Ask Gemini a question (groups)
Usage: `/askai [prompt]` or reply to a message with `/askai`

/getai - Describe an image (groups)
Usage: reply to an image with `/getai`

/aicook - Identify a baked good and get a recipe (groups)
Usage: reply to a food photo with `/aicook`

/aiseller - Write marketing copy for a product (groups)
Usage: reply to a product image with `/aiseller [target audience]`

/webapp - Open the web app

*Private chat*
Send any text to chat with Gemini.
/config - Configure the promotional links
/cancelconfig - Cancel the configuration session
/network - Show network and deployment information
/autoconfig - Use the detected address as the Web App URL
";

    reply_text(&bot, &message, help_text, state.config.telegram_max_length).await
}

pub async fn config_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    if !require_private(&bot, &message).await? {
        return Ok(());
    }
    let Some(user_id) = sender_id(&message) else {
        return Ok(());
    };

    if state.ads.is_in_session(user_id) {
        bot.send_message(
            message.chat.id,
            "You already have an active configuration session. Type /cancelconfig to cancel it first.",
        )
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
        return Ok(());
    }

    state.ads.start_session(user_id);
    let prompt = format!(
        "🔧 *Ad Configuration Setup*\n\n\
         {}\n\n\
         🌐 *Step 1: Web App URL (Required)*\n\
         Please provide your Web App URL in this format:\n\
         - https://www.example.com/\n\
         - https://example.com/path\n\
         - Type 'auto' to use local network IP: {}\n\n\
         Type your Web App URL now or 'auto':",
        state.ads.network_status(),
        state.ads.suggested_web_app_url()
    );
    reply_text(&bot, &message, &prompt, state.config.telegram_max_length).await
}

pub async fn cancel_config_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(user_id) = sender_id(&message) else {
        return Ok(());
    };
    let reply = state.ads.cancel_session(user_id);
    bot.send_message(message.chat.id, reply)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    Ok(())
}

pub async fn network_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    if !require_private(&bot, &message).await? {
        return Ok(());
    }
    let status = state.ads.network_status();
    reply_text(&bot, &message, &status, state.config.telegram_max_length).await
}

pub async fn autoconfig_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    if !require_private(&bot, &message).await? {
        return Ok(());
    }
    let result = state.ads.auto_configure();
    reply_text(&bot, &message, &result, state.config.telegram_max_length).await
}

/// Launch button for the web app. Telegram only accepts https URLs for Web
/// App buttons, so anything else becomes a plain link.
fn web_app_button(raw_url: &str) -> Option<InlineKeyboardButton> {
    let url = Url::parse(raw_url).ok()?;
    let button = if url.scheme() == "https" {
        InlineKeyboardButton::web_app("🌐 Open Web App", WebAppInfo { url })
    } else {
        InlineKeyboardButton::url("🌐 Open Web App", url)
    };
    Some(button)
}

#[allow(deprecated)]
pub async fn webapp_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let settings = state.ads.settings();
    let web_app_url = settings
        .web_app_url
        .clone()
        .unwrap_or_else(|| state.ads.suggested_web_app_url());

    let mut rows = Vec::new();
    match web_app_button(&web_app_url) {
        Some(button) => rows.push(vec![button]),
        None => warn!("Web App URL is not a valid URL: {web_app_url}"),
    }
    if let Some(bot_url) = settings.bot_url.as_deref().and_then(|url| Url::parse(url).ok()) {
        rows.push(vec![InlineKeyboardButton::url("📱 Bot Link", bot_url)]);
    }
    info!(url = %web_app_url, "Sending web app launcher");

    let request = bot
        .send_message(message.chat.id, WEBAPP_TEXT)
        .reply_parameters(ReplyParameters::new(message.id))
        .parse_mode(teloxide::types::ParseMode::Markdown);
    let request = if rows.is_empty() {
        request
    } else {
        request.reply_markup(InlineKeyboardMarkup::new(rows))
    };

    if let Err(err) = request.await {
        warn!("Failed to send web app launcher: {err}");
        bot.send_message(message.chat.id, format!("Error opening web app: {err}"))
            .reply_parameters(ReplyParameters::new(message.id))
            .await?;
    }
    Ok(())
}
