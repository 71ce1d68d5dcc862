use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "BLOGFEED";

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Origin of the feed backend. Supplied per deployment, never defaulted.
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            page_size: default_page_size(),
            timeout: default_timeout(),
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscordConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_identity_url")]
    pub identity_url: String,
    #[serde(default = "default_cdn_url")]
    pub cdn_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            redirect_uri: default_redirect_uri(),
            authorize_url: default_authorize_url(),
            identity_url: default_identity_url(),
            cdn_url: default_cdn_url(),
            scopes: default_scopes(),
        }
    }
}

fn default_redirect_uri() -> String {
    "http://localhost:5173/".into()
}

fn default_authorize_url() -> String {
    "https://discord.com/api/oauth2/authorize".into()
}

fn default_identity_url() -> String {
    "https://discord.com/api/users/@me".into()
}

fn default_cdn_url() -> String {
    "https://cdn.discordapp.com".into()
}

fn default_scopes() -> Vec<String> {
    vec!["identify".into()]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix)?);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.api.base_url.is_empty() {
        base.api.base_url = other.api.base_url;
    }
    if other.api.page_size != 0 && other.api.page_size != DEFAULT_PAGE_SIZE {
        base.api.page_size = other.api.page_size;
    }
    if other.api.timeout != default_timeout() {
        base.api.timeout = other.api.timeout;
    }

    if !other.discord.client_id.is_empty() {
        base.discord.client_id = other.discord.client_id;
    }
    if !other.discord.redirect_uri.is_empty()
        && other.discord.redirect_uri != default_redirect_uri()
    {
        base.discord.redirect_uri = other.discord.redirect_uri;
    }
    if !other.discord.authorize_url.is_empty()
        && other.discord.authorize_url != default_authorize_url()
    {
        base.discord.authorize_url = other.discord.authorize_url;
    }
    if !other.discord.identity_url.is_empty()
        && other.discord.identity_url != default_identity_url()
    {
        base.discord.identity_url = other.discord.identity_url;
    }
    if !other.discord.cdn_url.is_empty() && other.discord.cdn_url != default_cdn_url() {
        base.discord.cdn_url = other.discord.cdn_url;
    }
    if !other.discord.scopes.is_empty() && other.discord.scopes != default_scopes() {
        base.discord.scopes = other.discord.scopes;
    }

    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    base
}

fn load_env(prefix: &str) -> Result<Config> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    if map.is_empty() {
        return Ok(Config::default());
    }

    let mut cfg = Config::default();

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.page_size" => {
            if let Ok(parsed) = value.parse::<u32>() {
                cfg.api.page_size = parsed;
            }
        }
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = duration;
            }
        }
        "discord.client_id" => cfg.discord.client_id = value,
        "discord.redirect_uri" => cfg.discord.redirect_uri = value,
        "discord.authorize_url" => cfg.discord.authorize_url = value,
        "discord.identity_url" => cfg.discord.identity_url = value,
        "discord.cdn_url" => cfg.discord.cdn_url = value,
        "discord.scopes" => {
            cfg.discord.scopes = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("blog-feed").join("config.yaml"))
}
