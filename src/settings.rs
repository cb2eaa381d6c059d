use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::client::RetryPolicy;
use crate::{AppError, Result};

pub const SETTINGS_FILE: &str = "slack-export.toml";

/// Largest page size Slack accepts for history and replies.
pub const MAX_PAGE_LIMIT: u16 = 1000;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// IANA name used to interpret `--start`/`--end` and render timestamps
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_page_limit", rename = "page-limit")]
    pub page_limit: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries", rename = "max-retries")]
    pub max_retries: u32,
    #[serde(default = "default_delay_secs", rename = "default-delay-secs")]
    pub default_delay_secs: u64,
}

fn default_timezone() -> String {
    "Asia/Tokyo".to_string()
}

fn default_page_limit() -> u16 {
    MAX_PAGE_LIMIT
}

fn default_max_retries() -> u32 {
    5
}

fn default_delay_secs() -> u64 {
    60
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            page_limit: default_page_limit(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            default_delay_secs: default_delay_secs(),
        }
    }
}

impl Settings {
    /// Load `slack-export.toml` from the working directory, or defaults if absent.
    pub fn load() -> Result<Self> {
        let path = Path::new(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| AppError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| AppError::TomlParse(e.to_string()))
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.export
            .timezone
            .parse::<Tz>()
            .map_err(|_| AppError::InvalidTimezone(self.export.timezone.clone()))
    }

    pub fn page_limit(&self) -> u16 {
        self.export.page_limit.clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            default_delay: Duration::from_secs(self.retry.default_delay_secs),
        }
    }
}
