use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::{fs, io, path::{Path, PathBuf}};

pub const DATA_DIR: &str = "rfocus";
pub const TOKEN_ENV: &str = "RFOCUS_API_TOKEN";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub remote_url: Option<String>,
    pub api_token: Option<String>,
    pub sounds_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            api_token: None,
            sounds_dir: PathBuf::from(DATA_DIR).join("sounds"),
            request_timeout_secs: 5,
            log_level: "info".into(),
        }
    }
}

impl AppConfig {
    /// Loads `config.json`, writing a template on first run.
    pub fn load() -> Self {
        let path = get_path("config.json");
        if !path.exists() {
            let _ = save_json(&path, &Self::default());
        }
        let mut config: Self = load_json(&path);
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                config.api_token = Some(token);
            }
        }
        config
    }

    /// The remote is only usable with both an address and a token.
    pub fn remote(&self) -> Option<(&str, &str)> {
        match (self.remote_url.as_deref(), self.api_token.as_deref()) {
            (Some(url), Some(token)) if !url.trim().is_empty() => Some((url, token)),
            _ => None,
        }
    }
}

pub fn data_dir() -> PathBuf {
    let path = PathBuf::from(".").join(DATA_DIR);
    let _ = fs::create_dir_all(&path);
    path
}

pub fn get_path(filename: &str) -> PathBuf {
    data_dir().join(filename)
}

/// Reads a JSON file, falling back to defaults when it is missing or broken.
pub fn load_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn save_json<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    fs::write(path, serde_json::to_string_pretty(data)?)
}
