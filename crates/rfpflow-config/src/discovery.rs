use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::model::{
    CONFIG_ENV_VAR, CliArgs, Config, ConfigSource, DEFAULT_CONFIG_FILE, Defaults, LlmEndpoints,
    ProviderSeed, ServerConfig, StageOverrides, StorageConfig, VendorSeed,
};

/// TOML configuration file structure; every section optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    server: Option<TomlServer>,
    defaults: Option<Defaults>,
    stages: Option<BTreeMap<String, StageOverrides>>,
    storage: Option<TomlStorage>,
    llm: Option<TomlLlm>,
    providers: Option<Vec<ProviderSeed>>,
    vendors: Option<Vec<VendorSeed>>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlServer {
    bind: Option<String>,
    cors_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlStorage {
    upload_dir: Option<PathBuf>,
    state_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlLlm {
    openai_base_url: Option<String>,
    openrouter_base_url: Option<String>,
    anthropic_base_url: Option<String>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// The file is `--config` if given, else `$RFPFLOW_CONFIG`, else
    /// `./rfpflow.toml` when present.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        Self::discover_from(&start_dir, env_path, cli_args)
    }

    /// Path-driven variant of [`Config::discover`] that never reads
    /// process-global state. Used by tests.
    pub fn discover_from(
        start_dir: &Path,
        env_path: Option<PathBuf>,
        cli_args: &CliArgs,
    ) -> Result<Self> {
        let mut source_attribution = HashMap::new();
        for key in [
            "server.bind",
            "server.cors_origins",
            "defaults",
            "storage.upload_dir",
            "llm",
        ] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        let mut server = ServerConfig::default();
        let mut defaults = Defaults::default();
        let mut stages = BTreeMap::new();
        let mut storage = StorageConfig::default();
        let mut llm = LlmEndpoints::default();
        let mut providers = Vec::new();
        let mut vendors = Vec::new();

        let config_path = match (&cli_args.config_path, env_path) {
            (Some(explicit), _) => Some(Self::require_exists(explicit)?),
            (None, Some(from_env)) => Some(Self::require_exists(&from_env)?),
            (None, None) => {
                let candidate = start_dir.join(DEFAULT_CONFIG_FILE);
                candidate.is_file().then_some(candidate)
            }
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;

            if let Some(file_server) = file_config.server {
                if let Some(bind) = file_server.bind {
                    server.bind = bind;
                    source_attribution.insert("server.bind".to_string(), ConfigSource::Config);
                }
                if let Some(origins) = file_server.cors_origins {
                    server.cors_origins = origins;
                    source_attribution
                        .insert("server.cors_origins".to_string(), ConfigSource::Config);
                }
            }

            if let Some(file_defaults) = file_config.defaults {
                defaults = file_defaults;
                source_attribution.insert("defaults".to_string(), ConfigSource::Config);
            }

            if let Some(file_stages) = file_config.stages {
                stages = file_stages;
                source_attribution.insert("stages".to_string(), ConfigSource::Config);
            }

            if let Some(file_storage) = file_config.storage {
                if let Some(dir) = file_storage.upload_dir {
                    storage.upload_dir = dir;
                    source_attribution
                        .insert("storage.upload_dir".to_string(), ConfigSource::Config);
                }
                if file_storage.state_file.is_some() {
                    storage.state_file = file_storage.state_file;
                    source_attribution
                        .insert("storage.state_file".to_string(), ConfigSource::Config);
                }
            }

            if let Some(file_llm) = file_config.llm {
                if let Some(url) = file_llm.openai_base_url {
                    llm.openai_base_url = url;
                }
                if let Some(url) = file_llm.openrouter_base_url {
                    llm.openrouter_base_url = url;
                }
                if let Some(url) = file_llm.anthropic_base_url {
                    llm.anthropic_base_url = url;
                }
                source_attribution.insert("llm".to_string(), ConfigSource::Config);
            }

            if let Some(file_providers) = file_config.providers {
                providers = file_providers;
                source_attribution.insert("providers".to_string(), ConfigSource::Config);
            }

            if let Some(file_vendors) = file_config.vendors {
                vendors = file_vendors;
                source_attribution.insert("vendors".to_string(), ConfigSource::Config);
            }
        }

        // CLI overrides
        if let Some(bind) = &cli_args.bind {
            server.bind = bind.clone();
            source_attribution.insert("server.bind".to_string(), ConfigSource::Cli);
        }

        let config = Self {
            server,
            defaults,
            stages,
            storage,
            llm,
            providers,
            vendors,
            source_attribution,
            config_path,
        };

        config.validate()?;
        config.warn_on_clamped_timeouts();

        Ok(config)
    }

    fn require_exists(path: &Path) -> Result<PathBuf> {
        if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(ConfigError::NotFound {
                path: path.display().to_string(),
            }
            .into())
        }
    }

    /// Load configuration from TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(e.to_string()))
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;
        Ok(config)
    }
}
