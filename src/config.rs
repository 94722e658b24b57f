use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/todo.json";
pub const DEFAULT_DB_PATH: &str = "data/chats.db";

/// Group id (without the `@g.us` suffix) to track.
pub const GROUP_ENV: &str = "TEMPGROUP";
pub const DB_PATH_ENV: &str = "TODO_DB_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub monitored_group: Option<String>,
    #[serde(default = "default_db_path")]
    pub database_path: String,
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            monitored_group: None,
            database_path: default_db_path(),
        }
    }
}

impl AppConfig {
    /// Environment values win over whatever the file said.
    pub fn apply_env(mut self) -> Self {
        self.apply_overrides(env::var(GROUP_ENV).ok(), env::var(DB_PATH_ENV).ok());
        self
    }

    pub fn apply_overrides(&mut self, group: Option<String>, database_path: Option<String>) {
        if let Some(group) = group.filter(|g| !g.is_empty()) {
            self.monitored_group = Some(group);
        }
        if let Some(path) = database_path.filter(|p| !p.is_empty()) {
            self.database_path = path;
        }
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}
