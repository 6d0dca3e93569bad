use std::collections::HashSet;
use std::net::SocketAddr;

use rfpflow_utils::types::StageId;

use crate::error::ConfigError;
use crate::model::{Config, MIN_STAGE_TIMEOUT_SECS};

fn invalid(key: impl Into<String>, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
    }
}

fn check_timeout(key: &str, secs: Option<u64>) -> Result<(), ConfigError> {
    match secs {
        Some(0) => Err(invalid(key, "must be greater than 0")),
        Some(s) if s > 7200 => Err(invalid(
            key,
            "exceeds maximum limit of 7200 seconds (2 hours)",
        )),
        _ => Ok(()),
    }
}

fn check_temperature(key: &str, temperature: Option<f32>) -> Result<(), ConfigError> {
    match temperature {
        Some(t) if !(0.0..=2.0).contains(&t) => Err(invalid(key, "must be within 0.0..=2.0")),
        _ => Ok(()),
    }
}

fn check_max_tokens(key: &str, max_tokens: Option<u32>) -> Result<(), ConfigError> {
    match max_tokens {
        Some(0) => Err(invalid(key, "must be greater than 0")),
        _ => Ok(()),
    }
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|e| invalid("server.bind", format!("'{}': {e}", self.server.bind)))?;

        check_timeout("defaults.stage_timeout_secs", self.defaults.stage_timeout_secs)?;
        check_temperature("defaults.temperature", self.defaults.temperature)?;
        check_max_tokens("defaults.max_tokens", self.defaults.max_tokens)?;

        for (name, overrides) in &self.stages {
            name.parse::<StageId>()
                .map_err(|e| invalid(format!("stages.{name}"), e))?;
            check_timeout(&format!("stages.{name}.timeout_secs"), overrides.timeout_secs)?;
            check_temperature(&format!("stages.{name}.temperature"), overrides.temperature)?;
            check_max_tokens(&format!("stages.{name}.max_tokens"), overrides.max_tokens)?;
        }

        let selected = self.providers.iter().filter(|p| p.selected).count();
        if selected > 1 {
            return Err(invalid(
                "providers",
                format!("{selected} providers marked selected; at most one may be"),
            ));
        }
        for provider in &self.providers {
            if provider.name.trim().is_empty() || provider.model.trim().is_empty() {
                return Err(invalid("providers", "name and model must be non-empty"));
            }
        }

        let mut names = HashSet::new();
        for vendor in &self.vendors {
            let key = vendor.nome.trim().to_lowercase();
            if key.is_empty() {
                return Err(invalid("vendors", "vendor name must be non-empty"));
            }
            if !names.insert(key) {
                return Err(invalid(
                    "vendors",
                    format!("duplicate vendor name '{}'", vendor.nome),
                ));
            }
        }

        Ok(())
    }

    /// Timeouts below the floor are accepted but raised to it.
    pub(crate) fn warn_on_clamped_timeouts(&self) {
        let mut candidates = vec![(
            "defaults.stage_timeout_secs".to_string(),
            self.defaults.stage_timeout_secs,
        )];
        candidates.extend(
            self.stages
                .iter()
                .map(|(name, o)| (format!("stages.{name}.timeout_secs"), o.timeout_secs)),
        );

        for (key, secs) in candidates {
            if let Some(s) = secs
                && s < MIN_STAGE_TIMEOUT_SECS
            {
                tracing::warn!(
                    key = %key,
                    configured = s,
                    effective = MIN_STAGE_TIMEOUT_SECS,
                    "Stage timeout below minimum, clamping"
                );
            }
        }
    }
}
