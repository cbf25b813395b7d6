use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use teloxide::types::Message;
use tracing::info;

const LOGGED_TEXT_CHARS: usize = 300;

/// Timing record for one relay command, written to the `bot.timing` target.
#[derive(Debug)]
pub struct CommandTimer {
    command: &'static str,
    chat_id: i64,
    user_id: Option<i64>,
    message_id: i32,
    started_at: DateTime<Utc>,
    started_perf: Instant,
}

fn loggable_text(message: &Message) -> Option<String> {
    message
        .text()
        .or_else(|| message.caption())
        .map(|value| value.replace('\n', " ").chars().take(LOGGED_TEXT_CHARS).collect())
}

impl CommandTimer {
    /// Logs `command_received` and starts the clock.
    pub fn start(command: &'static str, message: &Message) -> Self {
        let user = message.from.as_ref();
        let timer = CommandTimer {
            command,
            chat_id: message.chat.id.0,
            user_id: user.and_then(|u| i64::try_from(u.id.0).ok()),
            message_id: message.id.0,
            started_at: Utc::now(),
            started_perf: Instant::now(),
        };
        info!(
            target: "bot.timing",
            "event=command_received command={} chat_id={} user_id={:?} username={:?} message_id={} received_at={} text={:?}",
            timer.command,
            timer.chat_id,
            timer.user_id,
            user.and_then(|u| u.username.as_deref()),
            timer.message_id,
            timer.started_at.to_rfc3339(),
            loggable_text(message)
        );
        timer
    }

    pub fn finish(self, status: &str, detail: Option<&str>) {
        info!(
            target: "bot.timing",
            "event=command_completed command={} chat_id={} user_id={:?} message_id={} started_at={} response_sent_at={} duration_s={:.3} status={} detail={}",
            self.command,
            self.chat_id,
            self.user_id,
            self.message_id,
            self.started_at.to_rfc3339(),
            Utc::now().to_rfc3339(),
            self.started_perf.elapsed().as_secs_f64(),
            status,
            detail.unwrap_or_default()
        );
    }
}

pub async fn log_llm_timing<T, E, F, Fut>(
    provider: &str,
    model: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    let metadata_text = metadata
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string());
    info!(
        target: "bot.timing",
        "event=llm_request provider={} model={} operation={} started_at={} metadata={}",
        provider,
        model,
        operation,
        started_at.to_rfc3339(),
        metadata_text
    );

    let result = call().await;
    let status = match &result {
        Ok(_) => "success".to_string(),
        Err(err) => format!("error({err})"),
    };

    let completed_at = Utc::now();
    let duration = started_perf.elapsed().as_secs_f64();
    info!(
        target: "bot.timing",
        "event=llm_response provider={} model={} operation={} completed_at={} duration_s={:.3} status={} metadata={}",
        provider,
        model,
        operation,
        completed_at.to_rfc3339(),
        duration,
        status,
        metadata_text
    );

    result
}
