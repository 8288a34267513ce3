use std::{collections::HashMap, fs, path::Path, str::FromStr, time::Duration};

use dashboard_core::render::{DEFAULT_PAGE_SIZE, PLACEHOLDER_SHEET_URL};
use tracing::{debug, warn};
use webhooks::{
    WebhookConfig, DEFAULT_CHAT_TIMEOUT, DEFAULT_CHAT_WEBHOOK_URL, DEFAULT_IMAGE_TIMEOUT,
    DEFAULT_IMAGE_WEBHOOK_URL, DEFAULT_WEBHOOK_USER,
};

pub const SETTINGS_FILE: &str = "dashboard.toml";

/// Keys accepted in the settings file; `APP__<KEY>` overrides each one.
const KEYS: [&str; 12] = [
    "bind_addr",
    "default_sheet_url",
    "chat_webhook_url",
    "image_webhook_url",
    "webhook_user",
    "chat_timeout_secs",
    "image_timeout_secs",
    "sheet_timeout_secs",
    "page_size",
    "auto_refresh_secs",
    "session_idle_secs",
    "max_upload_bytes",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub default_sheet_url: String,
    pub chat_webhook_url: String,
    pub image_webhook_url: String,
    pub webhook_user: String,
    pub chat_timeout_secs: u64,
    pub image_timeout_secs: u64,
    pub sheet_timeout_secs: u64,
    pub page_size: usize,
    pub auto_refresh_secs: u64,
    pub session_idle_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8501".into(),
            default_sheet_url: PLACEHOLDER_SHEET_URL.into(),
            chat_webhook_url: DEFAULT_CHAT_WEBHOOK_URL.into(),
            image_webhook_url: DEFAULT_IMAGE_WEBHOOK_URL.into(),
            webhook_user: DEFAULT_WEBHOOK_USER.into(),
            chat_timeout_secs: DEFAULT_CHAT_TIMEOUT.as_secs(),
            image_timeout_secs: DEFAULT_IMAGE_TIMEOUT.as_secs(),
            sheet_timeout_secs: sheets::DEFAULT_SHEET_TIMEOUT.as_secs(),
            page_size: DEFAULT_PAGE_SIZE,
            auto_refresh_secs: dashboard_core::refresh::DEFAULT_AUTO_REFRESH.as_secs(),
            session_idle_secs: dashboard_core::session::DEFAULT_SESSION_IDLE.as_secs(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Settings {
    pub fn webhook_config(&self) -> WebhookConfig {
        WebhookConfig {
            chat_url: self.chat_webhook_url.clone(),
            image_url: self.image_webhook_url.clone(),
            user: self.webhook_user.clone(),
            chat_timeout: Duration::from_secs(self.chat_timeout_secs),
            image_timeout: Duration::from_secs(self.image_timeout_secs),
        }
    }

    pub fn sheet_timeout(&self) -> Duration {
        Duration::from_secs(self.sheet_timeout_secs)
    }

    pub fn auto_refresh(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_secs)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    fn apply(&mut self, key: &str, value: String) {
        match key {
            "bind_addr" => self.server_bind = value,
            "default_sheet_url" => self.default_sheet_url = value,
            "chat_webhook_url" => self.chat_webhook_url = value,
            "image_webhook_url" => self.image_webhook_url = value,
            "webhook_user" => self.webhook_user = value,
            "chat_timeout_secs" => set_positive(&mut self.chat_timeout_secs, key, &value),
            "image_timeout_secs" => set_positive(&mut self.image_timeout_secs, key, &value),
            "sheet_timeout_secs" => set_positive(&mut self.sheet_timeout_secs, key, &value),
            "page_size" => set_positive(&mut self.page_size, key, &value),
            "auto_refresh_secs" => set_positive(&mut self.auto_refresh_secs, key, &value),
            "session_idle_secs" => set_positive(&mut self.session_idle_secs, key, &value),
            "max_upload_bytes" => set_positive(&mut self.max_upload_bytes, key, &value),
            _ => debug!(key, "ignoring unknown setting"),
        }
    }
}

/// Numeric settings must be at least one; zero keeps the current value.
fn set_positive<T: FromStr + Default + PartialEq>(slot: &mut T, key: &str, value: &str) {
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed == T::default() => warn!(key, value, "ignoring zero setting"),
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key, value, "ignoring non-numeric setting"),
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |name| std::env::var(name).ok())
}

/// Defaults, then the optional settings file, then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match parse_settings_file(&raw) {
            Ok(file_cfg) => {
                for (key, value) in file_cfg {
                    settings.apply(&key, value);
                }
            }
            Err(error) => warn!(path = %path.display(), %error, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("DASHBOARD_BIND") {
        settings.server_bind = v;
    }
    for key in KEYS {
        if let Some(v) = env(&format!("APP__{}", key.to_ascii_uppercase())) {
            settings.apply(key, v);
        }
    }

    settings
}

/// Flat `key = value` table; non-string scalars are taken by their literal text.
fn parse_settings_file(raw: &str) -> Result<HashMap<String, String>, toml::de::Error> {
    let table = toml::from_str::<toml::Table>(raw)?;
    Ok(table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(text) => text,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
