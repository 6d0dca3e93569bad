use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use rfpflow_utils::types::StageId;

/// Default generation timeout in seconds
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 120;

/// Minimum allowed generation timeout in seconds
pub const MIN_STAGE_TIMEOUT_SECS: u64 = 5;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_UPLOAD_DIR: &str = "uploaded_rfps";
pub const DEFAULT_CONFIG_FILE: &str = "rfpflow.toml";
pub const CONFIG_ENV_VAR: &str = "RFPFLOW_CONFIG";

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

/// Where a configuration value came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from `rfpflow.toml`.
    Config,
    /// Built-in default value (lowest precedence).
    Default,
}

/// Command-line overrides that participate in discovery.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file path (`--config`)
    pub config_path: Option<PathBuf>,
    /// Listener address override (`--bind`)
    pub bind: Option<String>,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Generation defaults applied to every stage unless overridden.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Per-stage overrides from `[stages.<name>]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Fully resolved generation parameters for one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSettings {
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl StageSettings {
    /// Built-in tuning per stage, used when neither `[defaults]` nor
    /// `[stages.<name>]` say otherwise.
    #[must_use]
    pub const fn builtin(stage: StageId) -> (u32, f32) {
        match stage {
            StageId::Analysis => (10_000, 0.3),
            StageId::VendorMatch => (4096, 0.2),
            StageId::Bom => (1500, 0.2),
            StageId::Scope => (1000, 0.3),
            StageId::Proposal => (10_000, 0.3),
        }
    }
}

/// Upload directory and optional state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            state_file: None,
        }
    }
}

/// Provider endpoint base URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmEndpoints {
    pub openai_base_url: String,
    pub openrouter_base_url: String,
    pub anthropic_base_url: String,
}

impl Default for LlmEndpoints {
    fn default() -> Self {
        Self {
            openai_base_url: DEFAULT_OPENAI_URL.to_string(),
            openrouter_base_url: DEFAULT_OPENROUTER_URL.to_string(),
            anthropic_base_url: DEFAULT_ANTHROPIC_URL.to_string(),
        }
    }
}

/// Seed row for the provider registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSeed {
    pub name: String,
    pub model: String,
    /// Literal key. Prefer `api_key_env`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable holding the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub selected: bool,
}

impl ProviderSeed {
    /// Resolve the credential: literal key first, then the named env var.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .filter(|v| !v.is_empty())
        })
    }
}

/// Seed row for the read-only vendor directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorSeed {
    pub nome: String,
    #[serde(default)]
    pub tecnologias: String,
    #[serde(default)]
    pub produtos: String,
    #[serde(default)]
    pub certificacoes: String,
    #[serde(default)]
    pub requisitos_atendidos: String,
}

/// Effective rfpflow configuration.
///
/// Built by [`Config::discover`] with precedence CLI > `rfpflow.toml` >
/// built-in defaults, or constructed directly for embedding and tests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub defaults: Defaults,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub stages: BTreeMap<String, StageOverrides>,
    pub storage: StorageConfig,
    pub llm: LlmEndpoints,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderSeed>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vendors: Vec<VendorSeed>,
    #[serde(skip)]
    pub source_attribution: HashMap<String, ConfigSource>,
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Config {
    /// Resolve generation parameters for `stage`.
    ///
    /// Precedence: `[stages.<name>]` > `[defaults]` > built-in per-stage
    /// tuning. The timeout never drops below [`MIN_STAGE_TIMEOUT_SECS`].
    #[must_use]
    pub fn stage_settings(&self, stage: StageId) -> StageSettings {
        let overrides = self.stages.get(stage.as_str());
        let (builtin_tokens, builtin_temperature) = StageSettings::builtin(stage);

        let timeout_secs = overrides
            .and_then(|o| o.timeout_secs)
            .or(self.defaults.stage_timeout_secs)
            .unwrap_or(DEFAULT_STAGE_TIMEOUT_SECS)
            .max(MIN_STAGE_TIMEOUT_SECS);

        StageSettings {
            timeout: Duration::from_secs(timeout_secs),
            max_tokens: overrides
                .and_then(|o| o.max_tokens)
                .or(self.defaults.max_tokens)
                .unwrap_or(builtin_tokens),
            temperature: overrides
                .and_then(|o| o.temperature)
                .or(self.defaults.temperature)
                .unwrap_or(builtin_temperature),
        }
    }

    /// Render the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Fails only if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
