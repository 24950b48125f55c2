//! Configuration for the completion provider and the dispatcher
//!
//! Loaded once at startup (defaults, then an optional JSON file, then
//! environment overrides) and passed by value into the client and the
//! dispatcher. Nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use log::debug;
use crate::error::Error;
use crate::request::ModelId;

pub const DEFAULT_API_BASE: &str
  = "https://openrouter.ai/api/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

pub const ENV_MODELS: &str = "PARALLM_MODELS";
pub const ENV_TIMEOUT_SECS: &str = "PARALLM_TIMEOUT_SECS";
pub const ENV_DISPATCH_TIMEOUT_SECS: &str
  = "PARALLM_DISPATCH_TIMEOUT_SECS";
pub const ENV_OUTPUT_DIR: &str = "PARALLM_OUTPUT_DIR";
pub const ENV_API_BASE: &str = "OPENROUTER_API_BASE";

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig
{   /// API base URL
    pub api_base: String
  , /// Name of the environment variable holding the API key
    pub api_key_env: String
  , /// Sent as HTTP-Referer for attribution on openrouter.ai
    pub site_url: Option<String>
  , /// Sent as X-Title for attribution on openrouter.ai
    pub site_name: Option<String>
}

impl Default for ProviderConfig
{   fn default() -> Self
    {   ProviderConfig
        {   api_base: DEFAULT_API_BASE.to_string()
          , api_key_env: DEFAULT_API_KEY_ENV.to_string()
          , site_url: None
          , site_name: None
        }
    }
}

/// Dispatch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig
{   /// Per-model request timeout in seconds
    pub timeout_secs: u64
  , /// Optional deadline for the whole dispatch in seconds
    pub dispatch_timeout_secs: Option<u64>
}

impl Default for DispatchConfig
{   fn default() -> Self
    {   DispatchConfig
        {   timeout_secs: 120
          , dispatch_timeout_secs: None
        }
    }
}

impl DispatchConfig
{   pub fn timeout(&self) -> Duration
    {   Duration::from_secs(self.timeout_secs)
    }

    pub fn dispatch_timeout(&self) -> Option<Duration>
    {   self.dispatch_timeout_secs.map(Duration::from_secs)
    }
}

/// parallm configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig
{   pub provider: ProviderConfig
  , pub dispatch: DispatchConfig
  , /// Models queried by every dispatch
    pub models: Vec<ModelId>
  , /// Directory receiving persisted batches
    pub output_dir: PathBuf
}

impl Default for CompareConfig
{   fn default() -> Self
    {   CompareConfig
        {   provider: ProviderConfig::default()
          , dispatch: DispatchConfig::default()
          , models: default_models()
          , output_dir: PathBuf::from(".")
        }
    }
}

pub fn default_models() -> Vec<ModelId>
{   vec![
      "anthropic/claude-3.7-sonnet".to_string(),
      "google/gemini-pro-1.5".to_string(),
      "openai/o1".to_string(),
    ]
}

impl CompareConfig
{   /// Defaults, then `path` if given, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, Error>
    {   let mut config = match path
        {   Some(p) => Self::from_json_file(p)?
          , None => CompareConfig::default()
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        debug!(
          "Loaded config with {} models, timeout {}s",
          config.models.len(),
          config.dispatch.timeout_secs
        );
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Error>
    {   let raw = std::fs::read_to_string(path).map_err(|e| {
          Error::InvalidConfiguration(format!(
            "cannot read {}: {}", path.display(), e
          ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
          Error::InvalidConfiguration(format!(
            "cannot parse {}: {}", path.display(), e
          ))
        })
    }

    /// Apply overrides from a variable lookup (the process environment
    /// in production, a map in tests)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), Error>
    where
      F: Fn(&str) -> Option<String>
    {   if let Some(raw) = lookup(ENV_MODELS)
        {   self.models = parse_model_list(&raw);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS)
        {   self.dispatch.timeout_secs
              = parse_secs(ENV_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DISPATCH_TIMEOUT_SECS)
        {   self.dispatch.dispatch_timeout_secs
              = Some(parse_secs(ENV_DISPATCH_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_OUTPUT_DIR)
        {   self.output_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup(ENV_API_BASE)
        {   self.provider.api_base = raw;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Error>
    {   if self.models.is_empty()
        {   return Err(Error::InvalidConfiguration(
              "no models configured".to_string()
            ));
        }
        if self.models.iter().any(|m| m.trim().is_empty())
        {   return Err(Error::InvalidConfiguration(
              "blank model identifier".to_string()
            ));
        }
        if self.dispatch.timeout_secs == 0
        {   return Err(Error::InvalidConfiguration(
              "timeout_secs must be greater than zero".to_string()
            ));
        }
        if self.dispatch.dispatch_timeout_secs == Some(0)
        {   return Err(Error::InvalidConfiguration(
              "dispatch_timeout_secs must be greater than zero"
                .to_string()
            ));
        }
        if self.provider.api_base.trim().is_empty()
        {   return Err(Error::InvalidConfiguration(
              "api_base is empty".to_string()
            ));
        }
        Ok(())
    }

    /// Read the API credential named by `provider.api_key_env`
    pub fn api_key(&self) -> Result<String, Error>
    {   match std::env::var(&self.provider.api_key_env)
        {   Ok(key) if !key.trim().is_empty() => Ok(key)
          , _ => Err(Error::MissingApiKey(
              self.provider.api_key_env.clone()
            ))
        }
    }
}

fn parse_secs(var: &str, raw: &str) -> Result<u64, Error>
{   raw.trim().parse().map_err(|_| {
      Error::InvalidConfiguration(format!(
        "{} must be a whole number of seconds, got {:?}",
        var, raw
      ))
    })
}

/// Split a comma separated model list, dropping empty entries
pub fn parse_model_list(raw: &str) -> Vec<ModelId>
{   raw.split(',')
      .map(str::trim)
      .filter(|m| !m.is_empty())
      .map(str::to_string)
      .collect()
}
