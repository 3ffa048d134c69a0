//! Generation parameters and their persistence.

pub mod store;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use store::{ConfigStore, Credential, CredentialSource, FileConfigStore, MemoryConfigStore};

/// Environment variable holding the API token. Takes precedence over the stored one.
pub const TOKEN_ENV_VAR: &str = "HF_API_TOKEN";

pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.1-8B-Instruct";
pub const DEFAULT_MAX_TOKENS: u32 = 200;
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_MAX_LENGTH: usize = 100;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a git commit message generator. Generate a single, clear commit message \
in imperative mood (e.g., 'Add feature' not 'Added feature'). \
Keep it under 100 characters. Focus on WHAT changed, not HOW. \
Return ONLY the commit message, no explanations or quotes.";

/// Inference provider the router should send the request to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// Let the router pick.
    #[default]
    Auto,
    Cerebras,
    Cohere,
    FeatherlessAi,
    FireworksAi,
    Groq,
    HfInference,
    Hyperbolic,
    Nebius,
    Novita,
    Nscale,
    Sambanova,
    Together,
}

impl Provider {
    pub const ALL: [Provider; 13] = [
        Provider::Auto,
        Provider::Cerebras,
        Provider::Cohere,
        Provider::FeatherlessAi,
        Provider::FireworksAi,
        Provider::Groq,
        Provider::HfInference,
        Provider::Hyperbolic,
        Provider::Nebius,
        Provider::Novita,
        Provider::Nscale,
        Provider::Sambanova,
        Provider::Together,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Auto => "auto",
            Provider::Cerebras => "cerebras",
            Provider::Cohere => "cohere",
            Provider::FeatherlessAi => "featherless-ai",
            Provider::FireworksAi => "fireworks-ai",
            Provider::Groq => "groq",
            Provider::HfInference => "hf-inference",
            Provider::Hyperbolic => "hyperbolic",
            Provider::Nebius => "nebius",
            Provider::Novita => "novita",
            Provider::Nscale => "nscale",
            Provider::Sambanova => "sambanova",
            Provider::Together => "together",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "provider",
                reason: format!(
                    "unknown provider '{}' (expected one of: {})",
                    s,
                    Provider::ALL.map(|p| p.as_str()).join(", ")
                ),
            })
    }
}

/// Parameters used to build and send every inference request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub system_prompt: String,
    pub model: String,
    pub provider: Provider,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_length: usize,
    /// Cap on consecutive retries in one commit flow. `None` means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            provider: Provider::Auto,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            max_length: DEFAULT_MAX_LENGTH,
            max_retries: None,
        }
    }
}

impl GenerationConfig {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_non_empty("system_prompt", &self.system_prompt)?;
        validate_non_empty("model", &self.model)?;
        validate_temperature(self.temperature)?;
        validate_positive("max_tokens", u64::from(self.max_tokens))?;
        validate_positive("max_length", self.max_length as u64)?;
        Ok(())
    }
}

/// A partial update to [`GenerationConfig`], as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub system_prompt: Option<String>,
    pub model: Option<String>,
    pub provider: Option<Provider>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub max_length: Option<usize>,
    /// `Some(None)` removes the retry cap.
    pub max_retries: Option<Option<u32>>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.system_prompt.is_none()
            && self.model.is_none()
            && self.provider.is_none()
            && self.max_tokens.is_none()
            && self.temperature.is_none()
            && self.max_length.is_none()
            && self.max_retries.is_none()
    }

    /// Apply the update, rejecting the whole update if any value is out of range.
    pub fn apply_to(self, config: &GenerationConfig) -> Result<GenerationConfig, ConfigError> {
        let mut updated = config.clone();

        if let Some(prompt) = self.system_prompt {
            updated.system_prompt = prompt;
        }
        if let Some(model) = self.model {
            updated.model = model.trim().to_string();
        }
        if let Some(provider) = self.provider {
            updated.provider = provider;
        }
        if let Some(max_tokens) = self.max_tokens {
            updated.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            updated.temperature = temperature;
        }
        if let Some(max_length) = self.max_length {
            updated.max_length = max_length;
        }
        if let Some(max_retries) = self.max_retries {
            updated.max_retries = max_retries;
        }

        updated.validate()?;
        Ok(updated)
    }
}

pub fn validate_temperature(value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            field: "temperature",
            reason: format!("{value} is outside 0.0..=1.0"),
        });
    }
    Ok(())
}

fn validate_positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be a positive integer".to_string(),
        });
    }
    Ok(())
}

fn validate_non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Show the first 6 and last 4 characters of a token; short tokens are hidden entirely.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len().max(4));
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
