use std::collections::HashMap;
use std::env;
use std::num::NonZeroU32;
use std::path::PathBuf;

use anyhow::Result;
use tracing::warn;

use crate::ads::validation::is_valid_web_app_url;
use crate::ads::AdSettings;

const DEFAULT_AD_BOT_URL: &str = "https://t.me/Master32v_bot";
const DEFAULT_AD_FREQUENCY: NonZeroU32 = match NonZeroU32::new(5) {
    Some(value) => value,
    None => unreachable!(),
};

/// Where configuration values come from. The process environment in
/// production, a plain map in tests.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub gemini_temperature: f32,
    pub gemini_top_k: i32,
    pub gemini_top_p: f32,
    pub gemini_max_output_tokens: i32,
    pub gemini_safety_settings: String,
    pub gemini_timeout_seconds: u64,
    pub telegram_max_length: usize,
    pub web_bind_addr: String,
    pub web_port: u16,
    pub web_static_dir: Option<PathBuf>,
    pub download_dir: PathBuf,
    pub ad_bot_url: Option<String>,
    pub ad_web_app_url: Option<String>,
    pub ad_enabled: bool,
    pub ad_frequency: NonZeroU32,
}

fn env_bool(source: &impl EnvSource, name: &str, default: bool) -> bool {
    source
        .var(name)
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_string(source: &impl EnvSource, name: &str, default: &str) -> String {
    source.var(name).unwrap_or_else(|| default.to_string())
}

fn env_optional(source: &impl EnvSource, name: &str) -> Option<String> {
    source
        .var(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_f32(source: &impl EnvSource, name: &str, default: f32) -> f32 {
    source
        .var(name)
        .and_then(|value| value.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_i32(source: &impl EnvSource, name: &str, default: i32) -> i32 {
    source
        .var(name)
        .and_then(|value| value.trim().parse::<i32>().ok())
        .unwrap_or(default)
}

fn env_u64(source: &impl EnvSource, name: &str, default: u64) -> u64 {
    source
        .var(name)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(source: &impl EnvSource, name: &str, default: usize) -> usize {
    source
        .var(name)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_u16(source: &impl EnvSource, name: &str, default: u16) -> u16 {
    source
        .var(name)
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(default)
}

fn normalize_gemini_safety_settings(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "permissive".to_string();
    }

    let lowered = trimmed.to_lowercase();
    match lowered.as_str() {
        "permissive" | "off" | "none" => "permissive".to_string(),
        "standard" => "standard".to_string(),
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}'; defaulting to permissive.",
                value
            );
            "permissive".to_string()
        }
    }
}

fn parse_ad_frequency(source: &impl EnvSource) -> NonZeroU32 {
    let Some(raw) = source.var("AD_FREQUENCY") else {
        return DEFAULT_AD_FREQUENCY;
    };
    match raw.trim().parse::<u32>().ok().and_then(NonZeroU32::new) {
        Some(frequency) => frequency,
        None => {
            warn!(
                "AD_FREQUENCY must be a positive integer, got '{}'; using {}.",
                raw, DEFAULT_AD_FREQUENCY
            );
            DEFAULT_AD_FREQUENCY
        }
    }
}

fn parse_ad_web_app_url(source: &impl EnvSource) -> Option<String> {
    let url = env_optional(source, "AD_WEB_APP_URL")?;
    if is_valid_web_app_url(&url) {
        return Some(url);
    }
    warn!(
        "Invalid AD_WEB_APP_URL '{}'; expected https://www.example.com/ or https://example.com/path. Ignoring it.",
        url
    );
    None
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl EnvSource) -> Result<Self> {
        let gemini_api_key = env_optional(source, "GEMINI_API_KEY")
            .or_else(|| env_optional(source, "API_KEY"))
            .unwrap_or_default();
        if gemini_api_key.is_empty() {
            warn!("GEMINI_API_KEY is not set; every relay will answer with an error.");
        }

        let ad_bot_url = match source.var("AD_BOT_URL") {
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(value.trim().to_string()),
            None => Some(DEFAULT_AD_BOT_URL.to_string()),
        };

        let download_dir = env_optional(source, "DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let gemini_base_url = env_string(
            source,
            "GEMINI_BASE_URL",
            "https://generativelanguage.googleapis.com",
        )
        .trim_end_matches('/')
        .to_string();
        if gemini_base_url.is_empty() {
            return Err(anyhow::anyhow!("GEMINI_BASE_URL must not be empty"));
        }

        Ok(Config {
            bot_token: env_string(source, "BOT_TOKEN", "").trim().to_string(),
            log_level: env_string(source, "LOG_LEVEL", "info").to_lowercase(),
            log_dir: PathBuf::from(env_string(source, "LOG_DIR", "logs")),
            gemini_api_key,
            gemini_model: env_string(source, "GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_base_url,
            gemini_temperature: env_f32(source, "GEMINI_TEMPERATURE", 0.7),
            gemini_top_k: env_i32(source, "GEMINI_TOP_K", 40),
            gemini_top_p: env_f32(source, "GEMINI_TOP_P", 0.95),
            gemini_max_output_tokens: env_i32(source, "GEMINI_MAX_OUTPUT_TOKENS", 2048),
            gemini_safety_settings: normalize_gemini_safety_settings(env_string(
                source,
                "GEMINI_SAFETY_SETTINGS",
                "permissive",
            )),
            gemini_timeout_seconds: env_u64(source, "GEMINI_TIMEOUT_SECONDS", 90).max(1),
            telegram_max_length: env_usize(source, "TELEGRAM_MAX_LENGTH", 4000),
            web_bind_addr: env_string(source, "WEB_BIND_ADDR", "0.0.0.0"),
            web_port: env_u16(source, "PORT", 5000),
            web_static_dir: env_optional(source, "WEB_STATIC_DIR").map(PathBuf::from),
            download_dir,
            ad_bot_url,
            ad_web_app_url: parse_ad_web_app_url(source),
            ad_enabled: env_bool(source, "AD_ENABLED", true),
            ad_frequency: parse_ad_frequency(source),
        })
    }

    pub fn ad_settings(&self) -> AdSettings {
        AdSettings {
            bot_url: self.ad_bot_url.clone(),
            web_app_url: self.ad_web_app_url.clone(),
            enabled: self.ad_enabled,
            frequency: self.ad_frequency,
        }
    }
}

pub const COOK_INSTRUCTION: &str = "Accurately identify the baked good in the image and provide an appropriate and recipe consistent with your analysis. ";

pub const MARKETING_INSTRUCTION: &str =
    "Given an image of a product and its target audience, write an engaging marketing description";

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = Config::from_source(&source(&[])).unwrap();
        assert_eq!(config.ad_bot_url.as_deref(), Some(DEFAULT_AD_BOT_URL));
        assert_eq!(config.ad_web_app_url, None);
        assert!(config.ad_enabled);
        assert_eq!(config.ad_frequency.get(), 5);
        assert_eq!(config.web_port, 5000);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn zero_or_garbage_frequency_falls_back_to_default() {
        let zero = Config::from_source(&source(&[("AD_FREQUENCY", "0")])).unwrap();
        assert_eq!(zero.ad_frequency.get(), 5);

        let garbage = Config::from_source(&source(&[("AD_FREQUENCY", "often")])).unwrap();
        assert_eq!(garbage.ad_frequency.get(), 5);

        let three = Config::from_source(&source(&[("AD_FREQUENCY", " 3 ")])).unwrap();
        assert_eq!(three.ad_frequency.get(), 3);
    }

    #[test]
    fn invalid_web_app_url_is_dropped_at_load() {
        let config = Config::from_source(&source(&[("AD_WEB_APP_URL", "notaurl")])).unwrap();
        assert_eq!(config.ad_web_app_url, None);

        let config =
            Config::from_source(&source(&[("AD_WEB_APP_URL", "https://example.com/")])).unwrap();
        assert_eq!(
            config.ad_web_app_url.as_deref(),
            Some("https://example.com/")
        );
    }

    #[test]
    fn api_key_falls_back_to_legacy_name() {
        let config = Config::from_source(&source(&[("API_KEY", "legacy")])).unwrap();
        assert_eq!(config.gemini_api_key, "legacy");

        let config = Config::from_source(&source(&[
            ("API_KEY", "legacy"),
            ("GEMINI_API_KEY", "primary"),
        ]))
        .unwrap();
        assert_eq!(config.gemini_api_key, "primary");
    }

    #[test]
    fn ads_can_be_disabled_and_bot_url_cleared() {
        let config = Config::from_source(&source(&[
            ("AD_ENABLED", "FALSE"),
            ("AD_BOT_URL", ""),
        ]))
        .unwrap();
        assert!(!config.ad_enabled);
        assert_eq!(config.ad_bot_url, None);
    }
}
