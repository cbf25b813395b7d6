use once_cell::sync::Lazy;
use regex::Regex;

static WEB_APP_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)?[a-zA-Z0-9-]+\.[a-zA-Z]{2,}(?:/.*)?$")
        .expect("valid web app url regex")
});
static TELEGRAM_BOT_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https://t\.me/[A-Za-z0-9_]+$").expect("valid bot url regex"));

pub fn is_valid_web_app_url(url: &str) -> bool {
    WEB_APP_URL_RE.is_match(url)
}

pub fn is_valid_telegram_bot_url(url: &str) -> bool {
    TELEGRAM_BOT_URL_RE.is_match(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_app_urls() {
        assert!(is_valid_web_app_url("https://example.com/"));
        assert!(is_valid_web_app_url("https://www.example.com/path/page"));
        assert!(is_valid_web_app_url("http://example.org"));
        assert!(is_valid_web_app_url("https://example.com/a b"));
        assert!(!is_valid_web_app_url("notaurl"));
        assert!(!is_valid_web_app_url("ftp://example.com/"));
        assert!(!is_valid_web_app_url("https://localhost/"));
        assert!(!is_valid_web_app_url("https://sub.example.com/"));
        assert!(!is_valid_web_app_url("https://my-app.vercel.app/"));
        assert!(!is_valid_web_app_url("https://example.com:8443/x"));
    }

    #[test]
    fn telegram_bot_urls() {
        assert!(is_valid_telegram_bot_url("https://t.me/my_bot"));
        assert!(!is_valid_telegram_bot_url("http://t.me/my_bot"));
        assert!(!is_valid_telegram_bot_url("https://t.me/"));
        assert!(!is_valid_telegram_bot_url("https://t.me/my-bot"));
        assert!(!is_valid_telegram_bot_url("https://telegram.me/my_bot"));
    }
}
