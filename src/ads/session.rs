#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    AwaitingWebAppUrl,
    AwaitingBotUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSession {
    pub user_id: i64,
    pub step: WizardStep,
    pub draft_web_app_url: String,
    pub draft_bot_url: String,
}

impl ConfigSession {
    pub fn new(user_id: i64) -> Self {
        ConfigSession {
            user_id,
            step: WizardStep::AwaitingWebAppUrl,
            draft_web_app_url: String::new(),
            draft_bot_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardReply {
    pub text: String,
    pub complete: bool,
}

impl WizardReply {
    pub fn pending(text: impl Into<String>) -> Self {
        WizardReply {
            text: text.into(),
            complete: false,
        }
    }

    pub fn complete(text: impl Into<String>) -> Self {
        WizardReply {
            text: text.into(),
            complete: true,
        }
    }
}
