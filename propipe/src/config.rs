//! Pipe configuration.
//!
//! Settings come from environment variables ([`PipeConfig::from_env`]) or from
//! any serde source such as a TOML file. Every setting except the key list
//! has a default.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::keys::parse_key_list;

/// Reasoning effort requested from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    /// Low reasoning effort.
    Low,
    /// Medium reasoning effort.
    #[default]
    Medium,
    /// High reasoning effort.
    High,
}

impl ReasoningEffort {
    /// Returns the string representation for the API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for ReasoningEffort {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ConfigError::invalid(
                "THINKING_EFFORT",
                s,
                "expected low, medium or high",
            )),
        }
    }
}

impl std::fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a [`Pipe`](crate::Pipe).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipeConfig {
    /// API keys, used round-robin.
    #[serde(deserialize_with = "deserialize_keys")]
    pub api_keys: Vec<String>,
    /// Base URL for the API.
    pub base_url: String,
    /// Prefix added before model names in [`Pipe::models`](crate::Pipe::models).
    pub name_prefix: String,
    /// Reasoning effort sent with every request.
    pub thinking_effort: ReasoningEffort,
    /// Append the per-message statistics block.
    pub show_token_stats: bool,
    /// Append the conversation totals block.
    pub show_cumulative_cost: bool,
    /// Cap on output tokens, reasoning included.
    pub max_output_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Log conversation ids and raw response keys.
    pub debug_mode: bool,
}

impl PipeConfig {
    /// Default API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    /// Default model name prefix.
    pub const DEFAULT_NAME_PREFIX: &'static str = "OpenAI: ";
    /// Default output token cap.
    pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 3200;
    /// Largest output token cap sent to the models; larger settings are clamped.
    pub const MAX_OUTPUT_TOKENS_LIMIT: u32 = 32768;
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

    /// Creates a configuration with the given keys and defaults elsewhere.
    #[must_use]
    pub fn new<I, S>(api_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            api_keys: api_keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads `API_KEYS`, `BASE_URL`, `NAME_PREFIX`, `THINKING_EFFORT`,
    /// `SHOW_TOKEN_STATS`, `SHOW_CUMULATIVE_COST`, `MAX_OUTPUT_TOKENS`,
    /// `TIMEOUT_SECONDS` and `DEBUG_MODE`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for any unparsable or
    /// out-of-range value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup.
    ///
    /// Unset keys keep their defaults. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for any unparsable or
    /// out-of-range value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(keys) = get("API_KEYS") {
            config.api_keys = parse_key_list(&keys);
        }
        if let Some(url) = get("BASE_URL") {
            config.base_url = url.trim().trim_end_matches('/').to_owned();
        }
        if let Some(prefix) = lookup("NAME_PREFIX") {
            config.name_prefix = prefix;
        }
        if let Some(effort) = get("THINKING_EFFORT") {
            config.thinking_effort = effort.parse()?;
        }
        if let Some(v) = get("SHOW_TOKEN_STATS") {
            config.show_token_stats = parse_bool("SHOW_TOKEN_STATS", &v)?;
        }
        if let Some(v) = get("SHOW_CUMULATIVE_COST") {
            config.show_cumulative_cost = parse_bool("SHOW_CUMULATIVE_COST", &v)?;
        }
        if let Some(v) = get("MAX_OUTPUT_TOKENS") {
            config.max_output_tokens = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("MAX_OUTPUT_TOKENS", &v, "not an integer"))?;
        }
        if let Some(v) = get("TIMEOUT_SECONDS") {
            config.timeout_secs = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("TIMEOUT_SECONDS", &v, "not an integer"))?;
        }
        if let Some(v) = get("DEBUG_MODE") {
            config.debug_mode = parse_bool("DEBUG_MODE", &v)?;
        }

        config.check_settings()?;
        Ok(config)
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the reasoning effort.
    #[must_use]
    pub const fn with_effort(mut self, effort: ReasoningEffort) -> Self {
        self.thinking_effort = effort;
        self
    }

    /// Sets both display switches.
    #[must_use]
    pub const fn with_display(mut self, token_stats: bool, cumulative_cost: bool) -> Self {
        self.show_token_stats = token_stats;
        self.show_cumulative_cost = cumulative_cost;
        self
    }

    /// Sets the output token cap.
    #[must_use]
    pub const fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Checks every setting, including the presence of keys.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_settings()?;
        if self.api_keys.is_empty() {
            return Err(ConfigError::NoApiKeys);
        }
        Ok(())
    }

    /// Output token cap sent to the API, at most [`Self::MAX_OUTPUT_TOKENS_LIMIT`].
    #[must_use]
    pub fn effective_max_output_tokens(&self) -> u32 {
        self.max_output_tokens.clamp(1, Self::MAX_OUTPUT_TOKENS_LIMIT)
    }

    /// Checks every setting except the key list.
    ///
    /// An empty pool is left to the rotator so it can be reported per turn.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending key.
    pub fn check_settings(&self) -> Result<(), ConfigError> {
        if self.max_output_tokens == 0 {
            return Err(ConfigError::invalid(
                "MAX_OUTPUT_TOKENS",
                "0",
                "must be a positive integer",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "TIMEOUT_SECONDS",
                "0",
                "must be a positive integer",
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("BASE_URL", "", "must not be empty"));
        }
        Ok(())
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            name_prefix: Self::DEFAULT_NAME_PREFIX.to_owned(),
            thinking_effort: ReasoningEffort::default(),
            show_token_stats: true,
            show_cumulative_cost: true,
            max_output_tokens: Self::DEFAULT_MAX_OUTPUT_TOKENS,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            debug_mode: false,
        }
    }
}

// Keys are reported by count only.
impl std::fmt::Debug for PipeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeConfig")
            .field("api_keys", &format_args!("[{} redacted]", self.api_keys.len()))
            .field("base_url", &self.base_url)
            .field("name_prefix", &self.name_prefix)
            .field("thinking_effort", &self.thinking_effort)
            .field("show_token_stats", &self.show_token_stats)
            .field("show_cumulative_cost", &self.show_cumulative_cost)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("debug_mode", &self.debug_mode)
            .finish()
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, value, "expected a boolean")),
    }
}

/// Accepts either a comma-separated string or a list of strings.
fn deserialize_keys<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keys {
        Csv(String),
        List(Vec<String>),
    }

    Ok(match Keys::deserialize(deserializer)? {
        Keys::Csv(s) => parse_key_list(&s),
        Keys::List(list) => parse_key_list(&list.join(",")),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = PipeConfig::default();
        assert!(config.api_keys.is_empty());
        assert_eq!(config.thinking_effort, ReasoningEffort::Medium);
        assert!(config.show_token_stats);
        assert!(config.show_cumulative_cost);
        assert_eq!(config.max_output_tokens, 3200);
        assert_eq!(config.timeout_secs, 600);
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn reads_all_keys() {
        let config = PipeConfig::from_lookup(lookup(&[
            ("API_KEYS", " sk-a , sk-b,, "),
            ("THINKING_EFFORT", "High"),
            ("SHOW_TOKEN_STATS", "false"),
            ("SHOW_CUMULATIVE_COST", "0"),
            ("MAX_OUTPUT_TOKENS", "8000"),
            ("TIMEOUT_SECONDS", "30"),
            ("BASE_URL", "http://localhost:9000/v1/"),
            ("DEBUG_MODE", "yes"),
        ]))
        .unwrap();

        assert_eq!(config.api_keys, vec!["sk-a", "sk-b"]);
        assert_eq!(config.thinking_effort, ReasoningEffort::High);
        assert!(!config.show_token_stats);
        assert!(!config.show_cumulative_cost);
        assert_eq!(config.max_output_tokens, 8000);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.base_url, "http://localhost:9000/v1");
        assert!(config.debug_mode);
    }

    #[test]
    fn invalid_effort_is_config_error() {
        let err = PipeConfig::from_lookup(lookup(&[("THINKING_EFFORT", "extreme")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "THINKING_EFFORT",
                ..
            }
        ));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        for (key, value) in [
            ("MAX_OUTPUT_TOKENS", "0"),
            ("MAX_OUTPUT_TOKENS", "lots"),
            ("TIMEOUT_SECONDS", "0"),
            ("TIMEOUT_SECONDS", "-5"),
        ] {
            let result = PipeConfig::from_lookup(lookup(&[(key, value)]));
            assert!(result.is_err(), "{key}={value} should be rejected");
        }
    }

    #[test]
    fn oversized_output_cap_is_clamped_not_rejected() {
        let config = PipeConfig::from_lookup(lookup(&[("MAX_OUTPUT_TOKENS", "40000")])).unwrap();
        assert_eq!(config.max_output_tokens, 40000);
        assert_eq!(config.effective_max_output_tokens(), 32768);
        assert_eq!(PipeConfig::default().effective_max_output_tokens(), 3200);
    }

    #[test]
    fn builder_and_serde_values_are_checked() {
        let err = PipeConfig::new(["sk"]).with_timeout(0).check_settings().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "TIMEOUT_SECONDS",
                ..
            }
        ));

        let parsed: PipeConfig =
            serde_json::from_str(r#"{"api_keys": "sk", "max_output_tokens": 0}"#).unwrap();
        let err = parsed.check_settings().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "MAX_OUTPUT_TOKENS",
                ..
            }
        ));
    }

    #[test]
    fn validate_requires_keys() {
        assert_eq!(PipeConfig::default().validate(), Err(ConfigError::NoApiKeys));
        assert!(PipeConfig::new(["sk-a"]).validate().is_ok());
    }

    #[test]
    fn debug_redacts_keys() {
        let shown = format!("{:?}", PipeConfig::new(["sk-secret", "sk-other"]));
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains("[2 redacted]"));
    }

    #[test]
    fn deserializes_keys_from_string_or_list() {
        let from_csv: PipeConfig = serde_json::from_str(r#"{"api_keys": "a, b"}"#).unwrap();
        let from_list: PipeConfig = serde_json::from_str(r#"{"api_keys": ["a", " ", "b"]}"#).unwrap();
        assert_eq!(from_csv.api_keys, vec!["a", "b"]);
        assert_eq!(from_list.api_keys, vec!["a", "b"]);
        assert_eq!(from_csv.max_output_tokens, 3200);
    }
}
