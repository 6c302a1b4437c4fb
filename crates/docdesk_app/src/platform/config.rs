use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use docdesk_core::{DEFAULT_MAX_SELECTION, DEFAULT_MIN_SELECTION};
use docdesk_engine::ApiSettings;
use serde::Deserialize;

use super::logging::LogDestination;

pub const CONFIG_FILENAME: &str = "docdesk.ron";

/// Shell settings read from `docdesk.ron`; every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub min_selection: usize,
    pub max_selection: usize,
    pub tick_interval_ms: u64,
    pub log_destination: LogDestination,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            data_dir: PathBuf::from(".docdesk"),
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            min_selection: DEFAULT_MIN_SELECTION,
            max_selection: DEFAULT_MAX_SELECTION,
            tick_interval_ms: 100,
            log_destination: LogDestination::File,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", path.display()));
            }
        };
        ron::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Applies `DOCDESK_API_URL`, `DOCDESK_DATA_DIR` and `DOCDESK_LOG`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("DOCDESK_API_URL") {
            self.api_base_url = url;
        }
        if let Some(dir) = lookup("DOCDESK_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("DOCDESK_LOG") {
            self.log_level = level;
        }
        self
    }

    pub fn api_settings(&self) -> anyhow::Result<ApiSettings> {
        let mut settings = ApiSettings::new(&self.api_base_url)
            .with_context(|| format!("invalid api_base_url {:?}", self.api_base_url))?;
        settings.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        settings.request_timeout = Duration::from_secs(self.request_timeout_secs);
        Ok(settings)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(10))
    }
}
