use crate::core::transaction::MANUAL_SOURCE;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceDefinition {
    pub key: String,
    pub label: String,
}

/// Display labels for source keys.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCatalog {
    labels: BTreeMap<String, String>,
}

impl SourceCatalog {
    pub fn new(definitions: &[SourceDefinition]) -> Self {
        let mut labels: BTreeMap<String, String> = default_sources()
            .into_iter()
            .map(|d| (d.key, d.label))
            .collect();
        for definition in definitions {
            labels.insert(definition.key.clone(), definition.label.clone());
        }
        Self { labels }
    }

    /// Label of `source`, falling back to the manual label for unknown keys.
    pub fn label(&self, source: &str) -> &str {
        self.labels
            .get(source)
            .or_else(|| self.labels.get(MANUAL_SOURCE))
            .map(String::as_str)
            .unwrap_or("Manual")
    }

    /// Known keys that can be fetched, in catalog order.
    pub fn feed_keys(&self) -> impl Iterator<Item = &str> {
        self.labels
            .keys()
            .map(String::as_str)
            .filter(|k| *k != MANUAL_SOURCE)
    }
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self::new(&[])
    }
}

fn default_sources() -> Vec<SourceDefinition> {
    [
        ("nubank_pj_pix", "Nubank PJ"),
        ("nubank_pf_pix", "Nubank PF"),
        ("nubank_cc", "Nubank Cartão"),
        ("picpay_pf_pix", "PicPay PF"),
        ("picpay_pj_pix", "PicPay PJ"),
        (MANUAL_SOURCE, "Manual"),
    ]
    .into_iter()
    .map(|(key, label)| SourceDefinition {
        key: key.to_string(),
        label: label.to_string(),
    })
    .collect()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FetchConfig {
    #[serde(default = "default_retries")]
    pub retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_retries() -> usize {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    "strato/0.1".to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub data_path: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceDefinition>,
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl AppConfig {
    /// Loads the config from the default location, or the built-in defaults when
    /// no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("app", "strato", "strato")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("app", "strato", "strato")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn catalog(&self) -> SourceCatalog {
        SourceCatalog::new(&self.sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
data_path: "/tmp/strato"
sources:
  - key: "inter_pf_pix"
    label: "Inter PF"
  - key: "nubank_cc"
    label: "Cartão"
fetch:
  retries: 5
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.data_path.as_deref(), Some("/tmp/strato"));
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.fetch.retries, 5);
        assert_eq!(config.fetch.retry_delay_ms, 500);
        assert_eq!(config.fetch.user_agent, "strato/0.1");

        let catalog = config.catalog();
        assert_eq!(catalog.label("inter_pf_pix"), "Inter PF");
        assert_eq!(catalog.label("nubank_cc"), "Cartão");
        assert_eq!(catalog.label("picpay_pj_pix"), "PicPay PJ");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.fetch.retries, 2);
    }

    #[test]
    fn test_catalog_falls_back_to_manual_label() {
        let catalog = SourceCatalog::default();
        assert_eq!(catalog.label("unknown_wallet"), "Manual");
        assert_eq!(catalog.label("nubank_pf_pix"), "Nubank PF");
        assert!(catalog.feed_keys().all(|k| k != MANUAL_SOURCE));
        assert_eq!(catalog.feed_keys().count(), 5);
    }

    #[test]
    fn test_data_path_override() {
        let config = AppConfig {
            data_path: Some("/var/lib/strato".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/var/lib/strato")
        );
    }
}
