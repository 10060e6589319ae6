//! Per-market ranking configuration, loaded from TOML.
//!
//! ```toml
//! [market]
//! name = "us"
//! index_symbol = "SPY"
//! sink_key = "us_latest"
//!
//! [ranking]
//! periods = [{ days = 180, weight = 0.5 }, { days = 30, weight = 0.5 }]
//! ma_window = 50
//! rs_formula = "signed_ratio"
//! sort_by = "a"
//!
//! [[universe.members]]
//! code = "NVDA"
//! name = "NVIDIA Corporation"
//! sector = "Tech"
//!
//! [publish]
//! mirror_dir = "out"
//! store = { base_url = "https://store.example.com/v1", collection = "rs_data", token_env = "RS_STORE_TOKEN" }
//! ```

use rsrank_core::data::Universe;
use rsrank_core::ranking::RankingParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Exchange listing the Korea preset reads display names from, relative to
/// the working directory. Export it as `Code,Name` (or `Symbol,Name`) rows;
/// when the file is missing the run falls back to universe names.
pub const KRX_LISTING_PATH: &str = "krx_listing.csv";

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub name: String,
    /// Benchmark symbol as the provider knows it (e.g. `^KS11`, `SPY`).
    pub index_symbol: String,
    /// Appended to each universe code to form the provider symbol (e.g. `.KS`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_suffix: Option<String>,
    /// Document key the snapshot replaces.
    pub sink_key: String,
    /// CSV of `Code,Name` rows with authoritative display names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_registry: Option<PathBuf>,
    /// Whether the snapshot carries `sort_standard`.
    #[serde(default = "default_true")]
    pub emit_sort_standard: bool,
}

impl MarketConfig {
    pub fn provider_symbol(&self, code: &str) -> String {
        match &self.symbol_suffix {
            Some(suffix) => format!("{code}{suffix}"),
            None => code.to_string(),
        }
    }
}

/// Remote document store endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub base_url: String,
    pub collection: String,
    /// Environment variable holding a bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub market: MarketConfig,
    #[serde(default)]
    pub ranking: RankingParams,
    pub universe: Universe,
    #[serde(default)]
    pub publish: PublishConfig,
}

impl RankingConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ranking
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.market.index_symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("market.index_symbol is empty".into()));
        }
        if self.market.sink_key.trim().is_empty() {
            return Err(ConfigError::Invalid("market.sink_key is empty".into()));
        }
        if self.universe.is_empty() {
            return Err(ConfigError::Invalid("universe has no members".into()));
        }
        if let Some(code) = self.universe.duplicate_code() {
            return Err(ConfigError::Invalid(format!(
                "universe code '{code}' appears more than once"
            )));
        }
        Ok(())
    }

    /// KOSPI large caps against the KOSPI composite, named from the KRX
    /// listing at [`KRX_LISTING_PATH`].
    pub fn korea() -> Self {
        Self {
            market: MarketConfig {
                name: "kr".into(),
                index_symbol: "^KS11".into(),
                symbol_suffix: Some(".KS".into()),
                sink_key: "latest".into(),
                name_registry: Some(PathBuf::from(KRX_LISTING_PATH)),
                emit_sort_standard: false,
            },
            ranking: RankingParams::reference(),
            universe: Universe::kospi_large_caps(),
            publish: PublishConfig::default(),
        }
    }

    /// US large caps against SPY.
    pub fn us() -> Self {
        Self {
            market: MarketConfig {
                name: "us".into(),
                index_symbol: "SPY".into(),
                symbol_suffix: None,
                sink_key: "us_latest".into(),
                name_registry: None,
                emit_sort_standard: true,
            },
            ranking: RankingParams::reference(),
            universe: Universe::us_large_caps(),
            publish: PublishConfig::default(),
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "kr" | "korea" | "kospi" => Some(Self::korea()),
            "us" | "usa" => Some(Self::us()),
            _ => None,
        }
    }
}
