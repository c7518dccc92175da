//! CLI configuration
//!
//! Read from an optional `tessera.toml`; flags override what it sets.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tessera_core::logging_facility::Profile;

pub const DEFAULT_CONFIG_FILE: &str = "tessera.toml";
pub const DEFAULT_DB_PATH: &str = ".tessera/store.db";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub db_path: PathBuf,
    pub log_profile: Profile,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_profile: Profile::Development,
        }
    }
}

/// Load configuration
///
/// An explicit path must exist. Without one, `./tessera.toml` is used when
/// present and defaults otherwise.
pub fn load(explicit: Option<&Path>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.exists() {
                return Ok(CliConfig::default());
            }
            fallback
        }
    };

    let text = std::fs::read_to_string(&path)
        .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
    parse(&text).map_err(|e| format!("invalid config {}: {}", path.display(), e).into())
}

fn parse(text: &str) -> Result<CliConfig, toml::de::Error> {
    toml::from_str(text)
}
