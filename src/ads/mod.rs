pub mod cadence;
pub mod session;
pub mod validation;

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::network::{network_status, DeploymentContext};

pub use cadence::Cadence;
pub use session::{ConfigSession, WizardReply, WizardStep};
use validation::{is_valid_telegram_bot_url, is_valid_web_app_url};

const BOT_URL_PROMPT: &str = "📱 Now please provide your Bot URL (e.g., https://t.me/yourbotname)\nOr type 'skip' to skip this step:";

/// Live promotional settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdSettings {
    pub bot_url: Option<String>,
    pub web_app_url: Option<String>,
    pub enabled: bool,
    pub frequency: NonZeroU32,
}

impl AdSettings {
    pub fn message(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let bot_url = self.bot_url.as_deref().filter(|url| !url.is_empty());
        let web_app_url = self.web_app_url.as_deref().filter(|url| !url.is_empty());
        if bot_url.is_none() && web_app_url.is_none() {
            return None;
        }

        let mut text = String::from("🤖 *Check out our other services:*\n");
        if let Some(url) = bot_url {
            text.push_str(&format!("📱 Bot: {url}\n"));
        }
        if let Some(url) = web_app_url {
            text.push_str(&format!("🌐 Web App: {url}\n"));
        }
        Some(text.trim().to_string())
    }
}

/// Ad configuration store: live settings, per-user wizard sessions and the
/// cadence counter. Shared by the Telegram and web surfaces.
pub struct AdService {
    settings: RwLock<AdSettings>,
    sessions: Mutex<HashMap<i64, ConfigSession>>,
    cadence: Cadence,
    deployment: Arc<DeploymentContext>,
}

impl AdService {
    pub fn new(settings: AdSettings, deployment: Arc<DeploymentContext>) -> Self {
        AdService {
            settings: RwLock::new(settings),
            sessions: Mutex::new(HashMap::new()),
            cadence: Cadence::new(),
            deployment,
        }
    }

    pub fn settings(&self) -> AdSettings {
        self.settings.read().clone()
    }

    pub fn ad_message(&self) -> Option<String> {
        self.settings.read().message()
    }

    /// Counts one relay turn and returns the ad to append, if one is due.
    pub fn record_turn(&self) -> Option<String> {
        let (enabled, frequency) = {
            let settings = self.settings.read();
            (settings.enabled, settings.frequency)
        };
        if self.cadence.tick(enabled, frequency) {
            self.ad_message()
        } else {
            None
        }
    }

    pub fn turns(&self) -> u64 {
        self.cadence.turns()
    }

    pub fn suggested_web_app_url(&self) -> String {
        self.deployment.suggested_web_app_url()
    }

    pub fn config_status(&self) -> String {
        let settings = self.settings.read();
        format!(
            "Ad Status: {}\nBot URL: {}\nWeb App URL: {}\nAd Frequency: Every {} interactions\n",
            if settings.enabled { "Enabled" } else { "Disabled" },
            settings.bot_url.as_deref().unwrap_or("Not configured"),
            settings
                .web_app_url
                .as_deref()
                .unwrap_or("Not configured (Required field)"),
            settings.frequency
        )
    }

    pub fn network_status(&self) -> String {
        let current = self.settings.read().web_app_url.clone();
        network_status(&self.deployment, current.as_deref())
    }

    /// Replaces any existing session for `user_id`. Callers check
    /// [`AdService::is_in_session`] first when an overwrite is unwanted.
    pub fn start_session(&self, user_id: i64) {
        self.sessions.lock().insert(user_id, ConfigSession::new(user_id));
        info!(user_id, "Started ad configuration session");
    }

    pub fn is_in_session(&self, user_id: i64) -> bool {
        self.sessions.lock().contains_key(&user_id)
    }

    pub fn session_step(&self, user_id: i64) -> Option<WizardStep> {
        self.sessions.lock().get(&user_id).map(|session| session.step)
    }

    pub fn process_input(&self, user_id: i64, input: &str) -> WizardReply {
        let input = input.trim();
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.get_mut(&user_id) else {
            return WizardReply::pending("No active configuration session.");
        };

        match session.step {
            WizardStep::AwaitingWebAppUrl => {
                if input.eq_ignore_ascii_case("auto") {
                    session.draft_web_app_url = self.deployment.suggested_web_app_url();
                    session.step = WizardStep::AwaitingBotUrl;
                    WizardReply::pending(format!(
                        "✅ Auto-configured Web App URL: {}\n\n{BOT_URL_PROMPT}",
                        session.draft_web_app_url
                    ))
                } else if is_valid_web_app_url(input) {
                    session.draft_web_app_url = input.to_string();
                    session.step = WizardStep::AwaitingBotUrl;
                    WizardReply::pending(format!("✅ Web App URL saved!\n\n{BOT_URL_PROMPT}"))
                } else {
                    WizardReply::pending(
                        "❌ Invalid URL format. Please provide a valid Web App URL (e.g., https://www.example.com/) or type 'auto' for auto-configuration:",
                    )
                }
            }
            WizardStep::AwaitingBotUrl => {
                if input.eq_ignore_ascii_case("skip") {
                    session.draft_bot_url.clear();
                } else if is_valid_telegram_bot_url(input) {
                    session.draft_bot_url = input.to_string();
                } else {
                    return WizardReply::pending(
                        "❌ Invalid Bot URL format. Please provide a valid Telegram bot URL (e.g., https://t.me/yourbotname) or type 'skip':",
                    );
                }

                let Some(session) = sessions.remove(&user_id) else {
                    return WizardReply::pending("No active configuration session.");
                };
                let frequency = self.commit(&session);
                info!(user_id, "Completed ad configuration session");
                let bot_url = if session.draft_bot_url.is_empty() {
                    "Not configured"
                } else {
                    session.draft_bot_url.as_str()
                };
                WizardReply::complete(format!(
                    "✅ *Configuration Complete!*\n\n\
                     🌐 Web App URL: {}\n\
                     📱 Bot URL: {}\n\n\
                     Your ads are now configured and will be displayed every {} interactions.",
                    session.draft_web_app_url, bot_url, frequency
                ))
            }
        }
    }

    /// Only non-empty drafts overwrite live values.
    fn commit(&self, session: &ConfigSession) -> NonZeroU32 {
        let mut settings = self.settings.write();
        if !session.draft_web_app_url.is_empty() {
            settings.web_app_url = Some(session.draft_web_app_url.clone());
        }
        if !session.draft_bot_url.is_empty() {
            settings.bot_url = Some(session.draft_bot_url.clone());
        }
        settings.frequency
    }

    pub fn cancel_session(&self, user_id: i64) -> String {
        if self.sessions.lock().remove(&user_id).is_some() {
            info!(user_id, "Cancelled ad configuration session");
            "❌ Configuration cancelled.".to_string()
        } else {
            "No active configuration session to cancel.".to_string()
        }
    }

    pub fn auto_configure(&self) -> String {
        let suggested = self.deployment.suggested_web_app_url();
        self.settings.write().web_app_url = Some(suggested.clone());
        info!(url = %suggested, "Auto-configured web app url");

        if self.deployment.is_cloud() {
            format!(
                "✅ *Auto-configured for Cloud Deployment:*\n\n\
                 ☁️ Platform: {}\n\
                 🌐 Web App URL: {}\n\n\
                 Note: Make sure this URL matches your actual deployed domain.\n\
                 For production, consider setting AD_WEB_APP_URL environment variable.",
                self.deployment.platform_name(),
                suggested
            )
        } else {
            format!(
                "✅ *Auto-configured Web App URL:*\n\n\
                 🌐 Web App URL: {}\n\
                 📍 Host IP: {}\n\
                 📶 WiFi Network: {}\n\n\
                 This URL will work for devices on the same WiFi network.",
                suggested, self.deployment.host_ip, self.deployment.wifi_ssid
            )
        }
    }
}
