use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::session::Geolocation;
use crate::error::ConfigError;

pub const CONFIG_VERSION: u64 = 1;

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("taskflow")
}

fn default_version() -> u64 {
    CONFIG_VERSION
}

fn default_redirect_delay_ms() -> u64 {
    500
}

fn default_geolocation_timeout_secs() -> u64 {
    10
}

/// Default location of the config file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("taskflow")
        .join("config.json")
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct TaskflowConfig {
    #[serde(default = "default_version")]
    pub version: u64,
    pub data_directory: PathBuf,
    pub debug_logging: bool,
    /// Pause between a successful login and showing the dashboard.
    #[serde(default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,
    #[serde(default = "default_geolocation_timeout_secs")]
    pub geolocation_timeout_secs: u64,
    /// Fixed position reported at login. Without one the device has no
    /// geolocation capability.
    pub location: Option<Geolocation>,
}

impl Default for TaskflowConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            data_directory: default_data_dir(),
            debug_logging: false,
            redirect_delay_ms: default_redirect_delay_ms(),
            geolocation_timeout_secs: default_geolocation_timeout_secs(),
            location: None,
        }
    }
}

impl TaskflowConfig {
    /// Read the config file. A missing file gives the defaults; an unusable
    /// one gives the error together with the defaults, for the caller to log
    /// once logging is up.
    pub fn load(path: &Path) -> Result<Self, (ConfigError, Self)> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                let path = path.to_path_buf();
                return Err((ConfigError::Io { path, source }, Self::default()));
            }
        };
        serde_json::from_str(&content).map_err(|source| {
            let path = path.to_path_buf();
            (ConfigError::Malformed { path, source }, Self::default())
        })
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs)
    }

    /// Ensure the data directory exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_directory)
    }
}
