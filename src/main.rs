use std::error::Error;
use std::sync::Arc;

use anyhow::anyhow;
use dotenvy::dotenv;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

mod ads;
mod config;
mod handlers;
mod llm;
mod network;
mod relay;
mod state;
mod utils;
mod web;

use ads::AdService;
use config::{Config, ProcessEnv};
use handlers::{commands, relay as relay_handlers};
use llm::{CompletionBackend, GeminiClient};
use state::AppState;
use utils::logging::init_logging;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    Start,
    Help,
    Config,
    Cancelconfig,
    Network,
    Autoconfig,
    Webapp,
    Askai(String),
    Getai,
    Aicook,
    Aiseller(String),
}

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    /// Telegram dispatcher and web server in one process.
    Full,
    /// Web server only; no bot token needed.
    WebOnly,
}

fn usage() -> &'static str {
    "Usage: gemini_relay_bot [serve-web]\n  (no argument)  run the Telegram bot and the web server\n  serve-web      run only the web server"
}

fn parse_run_mode(args: &[String]) -> anyhow::Result<RunMode> {
    match args.get(1).map(|value| value.as_str()) {
        None => Ok(RunMode::Full),
        Some("serve-web") => Ok(RunMode::WebOnly),
        Some("--help") | Some("-h") => Err(anyhow!(usage())),
        Some(other) => Err(anyhow!("Unknown argument: {other}\n{}", usage())),
    }
}

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    let config = Arc::new(Config::load()?);
    let _guards = init_logging(&config);

    let args: Vec<String> = std::env::args().collect();
    let mode = parse_run_mode(&args)?;
    if mode == RunMode::Full && config.bot_token.trim().is_empty() {
        return Err("BOT_TOKEN is required unless running serve-web".into());
    }

    let deployment = Arc::new(network::probe(&ProcessEnv, config.web_port).await);
    info!(
        cloud = deployment.is_cloud(),
        platform = deployment.platform_name(),
        host_ip = %deployment.host_ip,
        wifi = %deployment.wifi_ssid,
        "Deployment environment detected"
    );

    let ads = Arc::new(AdService::new(config.ad_settings(), deployment));
    info!("Ad configuration loaded:\n{}", ads.config_status());
    let backend: Arc<dyn CompletionBackend> = Arc::new(GeminiClient::from_config(&config));
    let state = AppState::new(config.clone(), ads, backend);
    info!(
        "Starting Gemini relay (model={}, mode={:?})",
        config.gemini_model, mode
    );

    if mode == RunMode::WebOnly {
        web::serve(state).await?;
        return Ok(());
    }

    let web_state = state.clone();
    tokio::spawn(async move {
        if let Err(err) = web::serve(web_state).await {
            error!("web server failed: {err:#}");
        }
    });

    let bot = Bot::new(config.bot_token.clone());

    let command_handler = dptree::entry()
        .filter_command::<Command>()
        .endpoint(handle_command);

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(
            dptree::filter(|msg: Message| msg.chat.is_private() && msg.text().is_some())
                .endpoint(handle_private_text),
        )
        .endpoint(ignore_message);

    Dispatcher::builder(bot, message_handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(
    bot: Bot,
    state: AppState,
    message: Message,
    command: Command,
) -> HandlerResult {
    match command {
        Command::Start => commands::start_handler(bot, message).await?,
        Command::Help => commands::help_handler(bot, state, message).await?,
        Command::Config => commands::config_handler(bot, state, message).await?,
        Command::Cancelconfig => commands::cancel_config_handler(bot, state, message).await?,
        Command::Network => commands::network_handler(bot, state, message).await?,
        Command::Autoconfig => commands::autoconfig_handler(bot, state, message).await?,
        Command::Webapp => commands::webapp_handler(bot, state, message).await?,
        Command::Askai(arg) => {
            let prompt = if arg.trim().is_empty() { None } else { Some(arg) };
            tokio::spawn(async move {
                if let Err(err) = relay_handlers::askai_handler(bot, state, message, prompt).await {
                    error!("askai handler failed: {err}");
                }
            });
        }
        Command::Getai => {
            tokio::spawn(async move {
                if let Err(err) = relay_handlers::getai_handler(bot, state, message).await {
                    error!("getai handler failed: {err}");
                }
            });
        }
        Command::Aicook => {
            tokio::spawn(async move {
                if let Err(err) = relay_handlers::aicook_handler(bot, state, message).await {
                    error!("aicook handler failed: {err}");
                }
            });
        }
        Command::Aiseller(audience) => {
            tokio::spawn(async move {
                if let Err(err) =
                    relay_handlers::aiseller_handler(bot, state, message, audience).await
                {
                    error!("aiseller handler failed: {err}");
                }
            });
        }
    }
    Ok(())
}

async fn handle_private_text(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    relay_handlers::private_text_handler(bot, state, message).await?;
    Ok(())
}

async fn ignore_message(_message: Message) -> HandlerResult {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn run_mode_defaults_to_full() {
        assert_eq!(parse_run_mode(&args(&["bot"])).unwrap(), RunMode::Full);
        assert_eq!(
            parse_run_mode(&args(&["bot", "serve-web"])).unwrap(),
            RunMode::WebOnly
        );
        assert!(parse_run_mode(&args(&["bot", "import"])).is_err());
    }

    #[test]
    fn commands_parse_lowercase_names() {
        let parsed = Command::parse("/aiseller busy parents", "relay_bot").unwrap();
        assert!(matches!(parsed, Command::Aiseller(audience) if audience == "busy parents"));
        assert!(matches!(
            Command::parse("/cancelconfig", "relay_bot").unwrap(),
            Command::Cancelconfig
        ));
    }
}
