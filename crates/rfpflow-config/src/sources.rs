use std::collections::BTreeMap;

use crate::model::{Config, ConfigSource};

fn source_label(source: Option<&ConfigSource>) -> &'static str {
    match source {
        Some(ConfigSource::Cli) => "cli",
        Some(ConfigSource::Config) => "config",
        Some(ConfigSource::Default) | None => "default",
    }
}

impl Config {
    /// Effective configuration as `key -> (value, source)` pairs.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut out = BTreeMap::new();
        let mut add = |key: &str, attribution: &str, value: String| {
            let source = source_label(self.source_attribution.get(attribution));
            out.insert(key.to_string(), (value, source.to_string()));
        };

        add("server.bind", "server.bind", self.server.bind.clone());
        add(
            "server.cors_origins",
            "server.cors_origins",
            self.server.cors_origins.join(", "),
        );
        add(
            "storage.upload_dir",
            "storage.upload_dir",
            self.storage.upload_dir.display().to_string(),
        );
        if let Some(state_file) = &self.storage.state_file {
            add(
                "storage.state_file",
                "storage.state_file",
                state_file.display().to_string(),
            );
        }
        add("providers", "providers", self.providers.len().to_string());
        add("vendors", "vendors", self.vendors.len().to_string());

        out
    }
}
