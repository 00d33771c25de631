use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

fn default_endpoint() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}

fn default_model() -> String {
    "facebook/bart-large-mnli".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Which classifier implementation backs intent resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    /// Zero-shot model served by the Hugging Face inference API.
    #[default]
    #[serde(alias = "hf")]
    HuggingFace,
    /// Offline cue-phrase scorer.
    Keyword,
}

impl std::str::FromStr for ClassifierBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "keyword" => Ok(Self::Keyword),
            other => Err(format!("unknown classifier backend: {other}")),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub backend: ClassifierBackend,
    /// Base URL of the inference API; the model id is appended.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Bearer token for the inference API.
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,
    /// Score each label independently instead of softmaxing across labels.
    #[serde(default)]
    pub multi_label: bool,
    /// Upper bound on a single classification, in seconds. Default: 30.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::default(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_token: None,
            multi_label: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("multi_label", &self.multi_label)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full URL of the model's inference endpoint.
    pub fn model_url(&self) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.model.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_toml() {
        let config: ClassifierConfig = toml::from_str("").expect("empty config should parse");
        assert_eq!(config.backend, ClassifierBackend::HuggingFace);
        assert_eq!(config.model, "facebook/bart-large-mnli");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.multi_label);
    }

    #[test]
    fn backend_parses_from_toml_and_str() {
        let config: ClassifierConfig =
            toml::from_str("backend = \"keyword\"").expect("config should parse");
        assert_eq!(config.backend, ClassifierBackend::Keyword);
        assert_eq!("HF".parse::<ClassifierBackend>(), Ok(ClassifierBackend::HuggingFace));
        assert!("bert".parse::<ClassifierBackend>().is_err());
    }

    #[test]
    fn model_url_joins_without_double_slash() {
        let config = ClassifierConfig {
            endpoint: "http://localhost:9000/models/".to_string(),
            ..ClassifierConfig::default()
        };
        assert_eq!(
            config.model_url(),
            "http://localhost:9000/models/facebook/bart-large-mnli"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let config = ClassifierConfig {
            api_token: Some("hf_secret".to_string()),
            ..ClassifierConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hf_secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
