use std::sync::Arc;

use tracing::{info, warn};

use crate::ads::AdService;
use crate::config::{COOK_INSTRUCTION, MARKETING_INSTRUCTION};
use crate::llm::media::{load_image, MediaError};
use crate::llm::{BackendError, CompletionBackend, ContentPart, GenerationProfile, TransientFile};

pub const ASK_USAGE: &str = "Usage: /askai [prompt/reply to message]";
pub const SELLER_USAGE: &str = "Usage: /aiseller [target audience] [reply to product image]";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Could not process the image: {0}")]
    Image(String),
}

impl From<MediaError> for RelayError {
    fn from(err: MediaError) -> Self {
        RelayError::Image(err.to_string())
    }
}

impl RelayError {
    pub fn user_message(&self) -> String {
        match self {
            RelayError::Usage(usage) => usage.clone(),
            RelayError::Backend(_) | RelayError::Image(_) => format!("An error occurred: {self}"),
        }
    }
}

/// Turns a relay outcome into the text shown to the user.
pub fn render_reply(result: Result<String, RelayError>) -> String {
    match result {
        Ok(text) => text,
        Err(err) => {
            warn!("Relay request failed: {err}");
            err.user_message()
        }
    }
}

pub fn require_audience(audience: &str) -> Result<&str, RelayError> {
    let audience = audience.trim();
    if audience.is_empty() {
        return Err(RelayError::Usage(SELLER_USAGE.to_string()));
    }
    Ok(audience)
}

/// Forwards prompts to the completion backend and appends ads on cadence.
#[derive(Clone)]
pub struct Relay {
    backend: Arc<dyn CompletionBackend>,
    ads: Arc<AdService>,
}

impl Relay {
    pub fn new(backend: Arc<dyn CompletionBackend>, ads: Arc<AdService>) -> Self {
        Relay { backend, ads }
    }

    fn with_ad(&self, reply: String) -> String {
        match self.ads.record_turn() {
            Some(ad) => {
                info!(turn = self.ads.turns(), "Appending ad to relay reply");
                format!("{reply}\n\n{ad}")
            }
            None => reply,
        }
    }

    pub async fn chat(&self, prompt: &str) -> Result<String, RelayError> {
        let reply = self.backend.chat(prompt).await?;
        Ok(self.with_ad(reply))
    }

    pub async fn ask(
        &self,
        inline: Option<&str>,
        replied: Option<&str>,
    ) -> Result<String, RelayError> {
        let prompt = inline
            .filter(|text| !text.trim().is_empty())
            .or_else(|| replied.filter(|text| !text.trim().is_empty()))
            .ok_or_else(|| RelayError::Usage(ASK_USAGE.to_string()))?;

        let reply = self.backend.chat(prompt).await?;
        Ok(self.with_ad(format!("*Answer:* {reply}")))
    }

    pub async fn describe_image(&self, file: TransientFile) -> Result<String, RelayError> {
        let reply = self
            .generate_with_image(file, GenerationProfile::Default, |image| vec![image])
            .await?;
        Ok(format!("*Detail Of Image:* {reply}"))
    }

    pub async fn recipe_from_image(&self, file: TransientFile) -> Result<String, RelayError> {
        self.generate_with_image(file, GenerationProfile::Cook, |image| {
            vec![ContentPart::text(COOK_INSTRUCTION), image]
        })
        .await
    }

    pub async fn marketing_copy(
        &self,
        audience: &str,
        file: TransientFile,
    ) -> Result<String, RelayError> {
        let audience = match require_audience(audience) {
            Ok(audience) => audience.to_string(),
            Err(err) => {
                file.remove();
                return Err(err);
            }
        };
        self.generate_with_image(file, GenerationProfile::Default, move |image| {
            vec![
                ContentPart::text(MARKETING_INSTRUCTION),
                ContentPart::text("Product Image: "),
                image,
                ContentPart::text("Target Audience: "),
                ContentPart::text(audience),
            ]
        })
        .await
    }

    async fn generate_with_image<F>(
        &self,
        file: TransientFile,
        profile: GenerationProfile,
        build_parts: F,
    ) -> Result<String, RelayError>
    where
        F: FnOnce(ContentPart) -> Vec<ContentPart>,
    {
        let result = async {
            let image = load_image(file.path()).await?;
            let parts = build_parts(ContentPart::Image(image));
            Ok::<_, RelayError>(self.backend.generate(parts, profile).await?)
        }
        .await;
        file.remove();
        result
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::llm::{BackendError, CompletionBackend, ContentPart, GenerationProfile};

    #[derive(Debug, Clone)]
    pub(crate) struct RecordedCall {
        pub parts: Vec<ContentPart>,
        pub profile: Option<GenerationProfile>,
    }

    /// Backend double that answers every request with a fixed outcome.
    pub(crate) struct StubBackend {
        reply: Option<String>,
        pub calls: Mutex<Vec<RecordedCall>>,
    }

    impl StubBackend {
        pub(crate) fn replying(reply: &str) -> Self {
            StubBackend {
                reply: Some(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            StubBackend {
                reply: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        fn outcome(&self) -> Result<String, BackendError> {
            self.reply.clone().ok_or(BackendError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for StubBackend {
        async fn chat(&self, prompt: &str) -> Result<String, BackendError> {
            self.calls.lock().push(RecordedCall {
                parts: vec![ContentPart::text(prompt)],
                profile: None,
            });
            self.outcome()
        }

        async fn generate(
            &self,
            parts: Vec<ContentPart>,
            profile: GenerationProfile,
        ) -> Result<String, BackendError> {
            self.calls.lock().push(RecordedCall {
                parts,
                profile: Some(profile),
            });
            self.outcome()
        }
    }
}
