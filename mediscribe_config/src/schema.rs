use mediscribe_extraction::{ExtractionConfig, ExtractionEngine};
use mediscribe_store::{RecordStore, StoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const APP_DIR: &str = "mediscribe";
const CONFIG_FILE: &str = "config.json";
const STORE_FILE: &str = "medical_records.json";

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

impl StoreConfig {
    /// `~/mediscribe/medical_records.json`, or a relative path without a home.
    fn default_path() -> PathBuf {
        dirs::home_dir().map_or_else(
            || PathBuf::from(STORE_FILE),
            |home| home.join(APP_DIR).join(STORE_FILE),
        )
    }
}

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(APP_DIR))
    }

    /// Load `~/mediscribe/config.json`.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE);

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Create one with Config::create_config().",
                config_path.display()
            );
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {e}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;

        Ok(config)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    /// Write the default configuration to `~/mediscribe/config.json`.
    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_path = Self::ensure_config_dir()?.join(CONFIG_FILE);
        Self::create_config_at(&config_path)?;
        Ok(config_path)
    }

    /// Write the default configuration to `path`. Never overwrites.
    pub fn create_config_at(path: &Path) -> anyhow::Result<()> {
        if path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                path.display()
            );
        }

        let template = serde_json::to_string_pretty(&Self::default())?;
        std::fs::write(path, template)?;

        info!("Created config file at: {}", path.display());
        Ok(())
    }

    #[must_use]
    pub fn build_engine(&self) -> ExtractionEngine {
        ExtractionEngine::new(&self.extraction)
    }

    pub fn open_store(&self) -> Result<RecordStore, StoreError> {
        RecordStore::open(&self.store.path)
    }
}
