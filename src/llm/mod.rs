pub mod gemini;
pub mod media;

use async_trait::async_trait;

pub use gemini::GeminiClient;
pub use media::{ImagePart, TransientFile};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,
    #[error("Gemini request failed: {0}")]
    Transport(String),
    #[error("Gemini quota exceeded: {0}")]
    Quota(String),
    #[error("Gemini request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Gemini blocked the request: {0}")]
    Blocked(String),
    #[error("Gemini returned no text")]
    EmptyResponse,
    #[error("Gemini response could not be decoded: {0}")]
    Decode(String),
}

/// Sampling presets. `Cook` is the lower-temperature preset used for recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationProfile {
    Default,
    Cook,
}

#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    Image(ImagePart),
}

impl ContentPart {
    pub fn text(value: impl Into<String>) -> Self {
        ContentPart::Text(value.into())
    }
}

/// The completion service. Prompt in, text out.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Single-turn chat with a plain text prompt.
    async fn chat(&self, prompt: &str) -> Result<String, BackendError>;

    /// Multi-part content generation (text and images).
    async fn generate(
        &self,
        parts: Vec<ContentPart>,
        profile: GenerationProfile,
    ) -> Result<String, BackendError>;
}
