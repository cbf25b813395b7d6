use std::sync::Arc;

use tracing::{debug, info};

use crate::ads::{AdService, WizardReply};
use crate::config::Config;
use crate::llm::CompletionBackend;
use crate::relay::Relay;

/// Where a private, non-command text goes.
#[derive(Debug, PartialEq, Eq)]
pub enum PrivateText {
    /// Consumed by the open configuration session.
    Wizard(WizardReply),
    /// No session; relay the text to the completion backend.
    Relay,
}

/// Shared between the Telegram dispatcher and the web router.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ads: Arc<AdService>,
    pub relay: Relay,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        ads: Arc<AdService>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        let relay = Relay::new(backend, ads.clone());
        AppState { config, ads, relay }
    }

    /// Feeds `text` to the user's configuration session if one is open.
    /// Wizard turns never reach the backend or the ad cadence.
    pub fn route_private_text(&self, user_id: i64, text: &str) -> PrivateText {
        let Some(step) = self.ads.session_step(user_id) else {
            return PrivateText::Relay;
        };
        debug!(user_id, ?step, "Handling configuration wizard input");
        let reply = self.ads.process_input(user_id, text);
        if reply.complete {
            info!(user_id, "Ad settings updated:\n{}", self.ads.config_status());
        }
        PrivateText::Wizard(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::network::{DeploymentContext, HostAddress};
    use crate::relay::testing::StubBackend;

    const USER: i64 = 7;

    fn state(backend: Arc<StubBackend>) -> AppState {
        let env: HashMap<String, String> = [("AD_FREQUENCY", "1")]
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let config = Config::from_source(&env).unwrap();
        let deployment = DeploymentContext::local(
            HostAddress::Detected(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9))),
            "Lab",
            config.web_port,
        );
        let ads = Arc::new(AdService::new(config.ad_settings(), Arc::new(deployment)));
        AppState::new(Arc::new(config), ads, backend)
    }

    fn wizard_text(route: PrivateText) -> WizardReply {
        match route {
            PrivateText::Wizard(reply) => reply,
            PrivateText::Relay => panic!("expected the wizard to consume the text"),
        }
    }

    #[test]
    fn wizard_turns_are_never_relayed_or_counted() {
        let backend = Arc::new(StubBackend::replying("unused"));
        let state = state(backend.clone());
        state.ads.start_session(USER);

        let reply = wizard_text(state.route_private_text(USER, "what is this?"));
        assert!(reply.text.starts_with("❌ Invalid URL format"));
        let reply = wizard_text(state.route_private_text(USER, "https://example.com/"));
        assert!(!reply.complete);
        let reply = wizard_text(state.route_private_text(USER, "skip"));
        assert!(reply.complete);

        assert_eq!(state.ads.turns(), 0);
        assert_eq!(backend.call_count(), 0);
        assert_eq!(
            state.ads.settings().web_app_url.as_deref(),
            Some("https://example.com/")
        );
    }

    #[tokio::test]
    async fn text_outside_a_session_is_relayed() {
        let backend = Arc::new(StubBackend::replying("hello back"));
        let state = state(backend.clone());

        assert_eq!(state.route_private_text(USER, "hello"), PrivateText::Relay);
        let reply = state.relay.chat("hello").await.unwrap();
        assert!(reply.starts_with("hello back\n\n🤖"));
        assert_eq!(state.ads.turns(), 1);
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn other_users_text_is_relayed_while_a_session_is_open() {
        let state = state(Arc::new(StubBackend::replying("unused")));
        state.ads.start_session(USER);
        assert_eq!(state.route_private_text(USER + 1, "hi"), PrivateText::Relay);
        assert!(state.ads.is_in_session(USER));
    }
}
