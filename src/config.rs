//! Server configuration from environment variables

use crate::llm::LlmConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Smallest thinking budget the provider accepts
const MIN_THINKING_BUDGET: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// `None` allows any origin
    pub allowed_origins: Option<Vec<String>>,
    pub max_tool_rounds: u32,
    pub tool_timeout: Duration,
    /// External tool program; the demo bridge is used when unset
    pub tool_command: Option<String>,
    pub worlds_dir: PathBuf,
    pub llm: LlmConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let allowed_origins = non_empty(&lookup, "WORLDSMITH_ALLOWED_ORIGINS").map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect()
        });

        Ok(Self {
            port: parse_var(&lookup, "WORLDSMITH_PORT", 8000, "port number")?,
            allowed_origins,
            max_tool_rounds: parse_var(&lookup, "WORLDSMITH_MAX_TOOL_ROUNDS", 5, "round count")?
                .max(1),
            tool_timeout: Duration::from_secs(parse_var(
                &lookup,
                "WORLDSMITH_TOOL_TIMEOUT_SECS",
                120,
                "number of seconds",
            )?),
            tool_command: non_empty(&lookup, "WORLDSMITH_TOOL_COMMAND"),
            worlds_dir: non_empty(&lookup, "WORLDSMITH_WORLDS_DIR")
                .map_or_else(|| PathBuf::from("worlds"), PathBuf::from),
            llm: LlmConfig::from_lookup(&lookup)?,
        })
    }
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let thinking_budget = parse_var(
            &lookup,
            "WORLDSMITH_THINKING_BUDGET",
            defaults.thinking_budget,
            "token count",
        )?;
        if thinking_budget != 0 && thinking_budget < MIN_THINKING_BUDGET {
            return Err(ConfigError::Invalid {
                name: "WORLDSMITH_THINKING_BUDGET",
                value: thinking_budget.to_string(),
                expected: "token count of 0 or at least 1024",
            });
        }

        Ok(Self {
            api_key: non_empty(&lookup, "ANTHROPIC_API_KEY"),
            gateway: non_empty(&lookup, "LLM_GATEWAY"),
            model: non_empty(&lookup, "WORLDSMITH_MODEL").unwrap_or(defaults.model),
            max_tokens: parse_var(
                &lookup,
                "WORLDSMITH_MAX_TOKENS",
                defaults.max_tokens,
                "token count",
            )?,
            thinking_budget,
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match non_empty(lookup, name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
            expected,
        }),
    }
}
