//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path to a MaxMind ISP database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isp_database: Option<PathBuf>,

    /// Path to a MaxMind City database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_database: Option<PathBuf>,

    /// Worker thread count; unset uses one per CPU.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("isp_database", &self.isp_database)
            .field("geo_database", &self.geo_database)
            .field("threads", &self.threads)
            .finish()
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // VSC_ISP_DATABASE, VSC_GEO_DATABASE, VSC_THREADS
        figment = figment.merge(Env::prefixed("VSC_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for vsc.
///
/// On Linux: `~/.config/vsc`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("vsc"))
}
