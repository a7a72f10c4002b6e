use std::env;
use std::time::Duration;

pub const DEFAULT_GATEWAY_BASE: &str = "https://ai.gateway.lovable.dev/v1";
pub const DEFAULT_IMAGE_MODEL: &str = "google/gemini-2.5-flash-image-preview";
pub const DEFAULT_FALLBACK_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_FALLBACK_SIZE: &str = "1024x1024";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Secondary image-edit provider used only after the primary answers 402.
#[derive(Clone, PartialEq, Eq)]
pub struct FallbackConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub size: String,
}

impl FallbackConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn edits_endpoint(&self) -> String {
        format!("{}/images/edits", self.api_base)
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_FALLBACK_BASE.to_string(),
            api_key: None,
            model: None,
            size: DEFAULT_FALLBACK_SIZE.to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub image_model: String,
    pub fallback: FallbackConfig,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GATEWAY_BASE.to_string(),
            api_key: None,
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            fallback: FallbackConfig::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: non_empty_env("AI_GATEWAY_BASE")
                .map(|value| trim_base(&value))
                .unwrap_or(defaults.api_base),
            api_key: non_empty_env("LOVABLE_API_KEY"),
            image_model: non_empty_env("ROOMCRAFT_IMAGE_MODEL").unwrap_or(defaults.image_model),
            fallback: FallbackConfig {
                api_base: non_empty_env("OPENAI_API_BASE")
                    .map(|value| trim_base(&value))
                    .unwrap_or(defaults.fallback.api_base),
                api_key: non_empty_env("OPENAI_API_KEY"),
                model: non_empty_env("FALLBACK_IMAGE_MODEL"),
                size: non_empty_env("FALLBACK_IMAGE_SIZE").unwrap_or(defaults.fallback.size),
            },
            timeout: non_empty_env("ROOMCRAFT_HTTP_TIMEOUT_SECS")
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn chat_completions_endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

// Keys stay out of logs.
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("image_model", &self.image_model)
            .field("fallback", &self.fallback)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl std::fmt::Debug for FallbackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("model", &self.model)
            .field("size", &self.size)
            .finish()
    }
}

/// Managed auth/data backend (PostgREST + GoTrue style API).
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

impl BackendConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            url: trim_base(&non_empty_env("SUPABASE_URL")?),
            anon_key: non_empty_env("SUPABASE_ANON_KEY")?,
        })
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"<set>")
            .finish()
    }
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn trim_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_never_prints_keys() {
        let config = GatewayConfig {
            api_key: Some("primary-secret".to_string()),
            fallback: FallbackConfig {
                api_key: Some("fallback-secret".to_string()),
                ..FallbackConfig::default()
            },
            ..GatewayConfig::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("primary-secret"));
        assert!(!printed.contains("fallback-secret"));
        assert!(printed.contains("<set>"));
    }

    #[test]
    fn endpoints_join_the_trimmed_base() {
        let config = GatewayConfig {
            api_base: trim_base("https://gateway.example/v1/ "),
            ..GatewayConfig::default()
        };
        assert_eq!(
            config.chat_completions_endpoint(),
            "https://gateway.example/v1/chat/completions"
        );
        assert_eq!(
            FallbackConfig::default().edits_endpoint(),
            "https://api.openai.com/v1/images/edits"
        );
        assert!(!FallbackConfig::default().is_configured());
    }
}
