use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "sheetchat.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub data_dir: PathBuf,
    pub query_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5001".into(),
            data_dir: PathBuf::from("./data/sheetchat"),
            query_timeout_secs: 5 * 60,
        }
    }
}

impl Settings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.api_url)
            .with_context(|| format!("api_url '{}' is not a valid url", self.api_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api_url '{}' must use http or https", self.api_url);
        }
        if self.query_timeout_secs == 0 {
            bail!("query_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

pub fn load_settings(config_path: &Path) -> Settings {
    load_settings_with(config_path, |name| std::env::var(name).ok())
}

/// File values override defaults and environment values override the file.
pub fn load_settings_with(config_path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("api_url") {
                    settings.api_url = v.clone();
                }
                if let Some(v) = file_cfg.get("data_dir") {
                    settings.data_dir = PathBuf::from(v);
                }
                if let Some(v) = file_cfg.get("query_timeout_secs") {
                    if let Ok(parsed) = v.parse::<u64>() {
                        settings.query_timeout_secs = parsed;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(path = %config_path.display(), "config: ignoring unreadable file: {err}");
            }
        }
    }

    if let Some(v) = env("SHEETCHAT_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = env("SHEETCHAT_DATA_DIR") {
        settings.data_dir = PathBuf::from(v);
    }
    if let Some(v) = env("APP__DATA_DIR") {
        settings.data_dir = PathBuf::from(v);
    }

    if let Some(v) = env("APP__QUERY_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.query_timeout_secs = parsed;
        }
    }

    settings
}
