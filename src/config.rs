use log::{info, warn};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

const APP_DIR: &str = "educhat";
const CONFIG_FILE: &str = "config.json";

/// Namespace key the conversation state is persisted under
pub const DEFAULT_STORAGE_KEY: &str = "chat-storage";

static DATA_DIR_OVERRIDE: OnceCell<PathBuf> = OnceCell::new();

pub fn set_data_dir_override(path: PathBuf) {
    let _ = DATA_DIR_OVERRIDE.set(path);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantConfig {
    pub id: String,
    pub name: String,
}

/// Simulated latencies, all in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub reply_delay_ms: u64,
    pub voice_reply_delay_ms: u64,
    pub sent_after_ms: u64,
    pub delivered_after_ms: u64,
    pub read_after_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            reply_delay_ms: 1500,
            voice_reply_delay_ms: 2000,
            sent_after_ms: 800,
            delivered_after_ms: 1000,
            read_after_ms: 2000,
        }
    }
}

impl Timings {
    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }

    pub fn voice_reply_delay(&self) -> Duration {
        Duration::from_millis(self.voice_reply_delay_ms)
    }

    /// The three chained progression delays, each measured from the previous step
    pub fn progression_steps(&self) -> [Duration; 3] {
        [
            Duration::from_millis(self.sent_after_ms),
            Duration::from_millis(self.delivered_after_ms),
            Duration::from_millis(self.read_after_ms),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub user: ParticipantConfig,
    pub assistant: ParticipantConfig,
    pub chat_id: String,
    pub chat_name: String,
    pub storage_key: String,
    pub timings: Timings,
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            user: ParticipantConfig {
                id: "user1".to_string(),
                name: "You".to_string(),
            },
            assistant: ParticipantConfig {
                id: "ai".to_string(),
                name: "EduAI".to_string(),
            },
            chat_id: "chat1".to_string(),
            chat_name: "Educational AI Chat".to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            timings: Timings::default(),
        }
    }
}

impl ChatConfig {
    /// Load configuration from `path`, or from the default config location
    /// when no path is given. A missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => {
                    info!("No config file found, using defaults");
                    return Ok(ChatConfig::default());
                }
            },
        };

        let path_str = path.display().to_string();
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        let config: ChatConfig = serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path_str.clone(),
            source,
        })?;

        info!("Loaded config from {}", path_str);
        Ok(config)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Directory holding persisted conversation state, created on demand
pub fn data_dir() -> Option<PathBuf> {
    let dir = match DATA_DIR_OVERRIDE.get() {
        Some(dir) => dir.clone(),
        None => dirs::data_dir()?.join(APP_DIR),
    };

    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("Failed to create data directory {}: {}", dir.display(), e);
            return None;
        }
    }

    Some(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_simulated_latencies() {
        let timings = Timings::default();
        assert_eq!(timings.reply_delay(), Duration::from_millis(1500));
        assert_eq!(timings.voice_reply_delay(), Duration::from_millis(2000));
        assert_eq!(
            timings.progression_steps(),
            [
                Duration::from_millis(800),
                Duration::from_millis(1000),
                Duration::from_millis(2000),
            ]
        );
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{ "chat_name": "Physics Tutor", "timings": {{ "reply_delay_ms": 10 }} }}"#).unwrap();

        let config = ChatConfig::load(Some(&path)).unwrap();
        assert_eq!(config.chat_name, "Physics Tutor");
        assert_eq!(config.timings.reply_delay_ms, 10);
        assert_eq!(config.timings.sent_after_ms, 800);
        assert_eq!(config.assistant.id, "ai");
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        match ChatConfig::load(Some(&path)) {
            Err(ConfigError::Json { .. }) => (),
            other => panic!("Expected a JSON error, got {:?}", other),
        }
    }
}
