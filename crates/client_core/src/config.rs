use std::{collections::HashMap, fs, path::Path, time::Duration};

use crate::list::ListOptions;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:6130";
pub const SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub page_size: u32,
    pub debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub token: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            page_size: 10,
            debounce_ms: 300,
            request_timeout_secs: 30,
            token: None,
        }
    }
}

impl ClientSettings {
    /// List options seeded with the configured page size and debounce window.
    pub fn list_options(&self) -> ListOptions {
        ListOptions::default()
            .with_page_size(self.page_size)
            .with_debounce(Duration::from_millis(self.debounce_ms))
    }
}

pub fn load_settings() -> ClientSettings {
    let file_cfg = read_settings_file(Path::new(SETTINGS_FILE)).unwrap_or_default();
    let env: HashMap<String, String> = std::env::vars().collect();
    resolve_settings(&file_cfg, &env)
}

fn read_settings_file(path: &Path) -> Option<HashMap<String, String>> {
    let raw = fs::read_to_string(path).ok()?;
    toml::from_str::<HashMap<String, String>>(&raw).ok()
}

/// Defaults, then the settings file, then the environment. Later layers win.
fn resolve_settings(
    file_cfg: &HashMap<String, String>,
    env: &HashMap<String, String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Some(v) = file_cfg.get("api_base_url") {
        settings.api_base_url = v.clone();
    }
    if let Some(v) = file_cfg.get("page_size").and_then(|v| parse_positive(v)) {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.get("debounce_ms").and_then(|v| v.parse().ok()) {
        settings.debounce_ms = v;
    }
    if let Some(v) = file_cfg
        .get("request_timeout_secs")
        .and_then(|v| v.parse().ok())
    {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.get("token") {
        settings.token = Some(v.clone());
    }

    if let Some(v) = env.get("API_BASE_URL") {
        settings.api_base_url = v.clone();
    }
    if let Some(v) = env.get("APP__API_BASE_URL") {
        settings.api_base_url = v.clone();
    }

    if let Some(v) = env.get("APP__PAGE_SIZE").and_then(|v| parse_positive(v)) {
        settings.page_size = v;
    }
    if let Some(v) = env.get("APP__DEBOUNCE_MS").and_then(|v| v.parse().ok()) {
        settings.debounce_ms = v;
    }
    if let Some(v) = env
        .get("APP__REQUEST_TIMEOUT_SECS")
        .and_then(|v| v.parse().ok())
    {
        settings.request_timeout_secs = v;
    }

    if let Some(v) = env.get("API_TOKEN") {
        settings.token = Some(v.clone());
    }
    if let Some(v) = env.get("APP__API_TOKEN") {
        settings.token = Some(v.clone());
    }

    settings.api_base_url = normalize_base_url(&settings.api_base_url);
    settings.token = settings.token.filter(|token| !token.trim().is_empty());
    settings
}

fn parse_positive(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|v| *v > 0)
}

pub fn normalize_base_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return DEFAULT_API_BASE_URL.to_string();
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    with_scheme.trim_end_matches('/').to_string()
}
