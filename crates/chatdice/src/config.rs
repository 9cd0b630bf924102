// ABOUTME: Runtime configuration read from CHATDICE_* environment variables.
// ABOUTME: Picks the local or remote dice engine and loads roll tables from JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::engine::{ApiVersion, DiceEngine, LocalEngine, RemoteEngine};
use crate::error::Result;
use crate::system::DEFAULT_SYSTEM;
use crate::table::RollDescriptor;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Engine and session settings.
///
/// Supported environment variables:
/// - `CHATDICE_API_URL`: dice API base URL; unset selects the local engine
/// - `CHATDICE_API_VERSION`: `v1` or `v2` (default `v2`)
/// - `CHATDICE_TIMEOUT_SECS`: dice API request timeout (default 10)
/// - `CHATDICE_SYSTEM`: rule system id (default `DiceBot`)
/// - `CHATDICE_SEED`: fixed seed for the local engine
/// - `CHATDICE_TABLES`: path to a JSON array of roll tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: Option<String>,
    pub api_version: ApiVersion,
    pub timeout: Duration,
    pub system: String,
    pub seed: Option<u64>,
    pub tables: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            api_version: ApiVersion::default(),
            timeout: DEFAULT_TIMEOUT,
            system: DEFAULT_SYSTEM.to_string(),
            seed: None,
            tables: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| var(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        config.api_url = var("CHATDICE_API_URL");
        if let Some(version) = var("CHATDICE_API_VERSION") {
            config.api_version = version.parse()?;
        }
        if let Some(val) = var("CHATDICE_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => warn!(val = %val, "CHATDICE_TIMEOUT_SECS is not a positive integer, ignoring"),
            }
        }
        if let Some(system) = var("CHATDICE_SYSTEM") {
            config.system = system.trim().to_string();
        }
        if let Some(val) = var("CHATDICE_SEED") {
            match val.trim().parse::<u64>() {
                Ok(seed) => config.seed = Some(seed),
                Err(_) => warn!(val = %val, "CHATDICE_SEED is not a valid u64, ignoring"),
            }
        }
        config.tables = var("CHATDICE_TABLES").map(PathBuf::from);

        Ok(config)
    }

    /// The remote engine when an API URL is set, otherwise the local one.
    pub fn build_engine(&self) -> Result<Arc<dyn DiceEngine>> {
        match &self.api_url {
            Some(url) => {
                info!(url = %url, version = %self.api_version, "using dice API");
                Ok(Arc::new(RemoteEngine::new(url, self.api_version, self.timeout)?))
            }
            None => {
                info!("using local dice engine");
                Ok(Arc::new(match self.seed {
                    Some(seed) => LocalEngine::with_seed(seed),
                    None => LocalEngine::new(),
                }))
            }
        }
    }

    /// The configured roll tables, or none when no file is set.
    pub fn load_tables(&self) -> Result<Vec<RollDescriptor>> {
        match &self.tables {
            Some(path) => load_tables(path),
            None => Ok(Vec::new()),
        }
    }
}

/// Read a JSON array of roll tables.
pub fn load_tables(path: &Path) -> Result<Vec<RollDescriptor>> {
    let text = std::fs::read_to_string(path)?;
    let tables: Vec<RollDescriptor> = serde_json::from_str(&text)?;
    info!(path = %path.display(), count = tables.len(), "loaded roll tables");
    Ok(tables)
}
