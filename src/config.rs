use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_FAST_MODEL: &str = "veo-3.1-fast-generate-preview";
pub const DEFAULT_FULL_MODEL: &str = "veo-3.1-generate-preview";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Kore";
pub const DEFAULT_CREDENTIAL_VAR: &str = "API_KEY";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    /// `None` polls until the backend reports completion.
    pub max_polls: Option<u32>,
    pub fast_model: String,
    pub full_model: String,
    pub text_model: String,
    pub speech_model: String,
    pub default_voice: String,
    pub request_timeout: Duration,
    pub credential_var: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(10),
            max_polls: None,
            fast_model: DEFAULT_FAST_MODEL.to_string(),
            full_model: DEFAULT_FULL_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            speech_model: DEFAULT_SPEECH_MODEL.to_string(),
            default_voice: DEFAULT_VOICE.to_string(),
            request_timeout: Duration::from_secs(120),
            credential_var: DEFAULT_CREDENTIAL_VAR.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = env::var("LUMINA_BASE_URL").unwrap_or(defaults.base_url);
        let poll_interval = env::var("LUMINA_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);
        let max_polls = env::var("LUMINA_MAX_POLLS")
            .ok()
            .and_then(|s| s.parse().ok());
        let fast_model = env::var("LUMINA_FAST_MODEL").unwrap_or(defaults.fast_model);
        let full_model = env::var("LUMINA_FULL_MODEL").unwrap_or(defaults.full_model);
        let text_model = env::var("LUMINA_TEXT_MODEL").unwrap_or(defaults.text_model);
        let speech_model = env::var("LUMINA_SPEECH_MODEL").unwrap_or(defaults.speech_model);
        let default_voice = env::var("LUMINA_DEFAULT_VOICE").unwrap_or(defaults.default_voice);
        let request_timeout = env::var("LUMINA_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        GeminiConfig {
            base_url,
            poll_interval,
            max_polls,
            fast_model,
            full_model,
            text_model,
            speech_model,
            default_voice,
            request_timeout,
            credential_var: defaults.credential_var,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    pub fn with_models(
        mut self,
        fast_model: impl Into<String>,
        full_model: impl Into<String>,
    ) -> Self {
        self.fast_model = fast_model.into();
        self.full_model = full_model.into();
        self
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_speech_model(mut self, model: impl Into<String>) -> Self {
        self.speech_model = model.into();
        self
    }

    pub fn with_default_voice(mut self, voice: impl Into<String>) -> Self {
        self.default_voice = voice.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_credential_var(mut self, var: impl Into<String>) -> Self {
        self.credential_var = var.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeminiConfig::new();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.max_polls, None);
        assert_eq!(config.fast_model, DEFAULT_FAST_MODEL);
        assert_eq!(config.full_model, DEFAULT_FULL_MODEL);
        assert_eq!(config.credential_var, "API_KEY");
    }

    #[test]
    fn test_builder_trims_base_url() {
        let config = GeminiConfig::new()
            .with_base_url("http://127.0.0.1:9000/v1beta/")
            .with_poll_interval(Duration::ZERO)
            .with_max_polls(3);
        assert_eq!(config.base_url, "http://127.0.0.1:9000/v1beta");
        assert_eq!(config.poll_interval, Duration::ZERO);
        assert_eq!(config.max_polls, Some(3));
    }
}
