use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TabspaceConfig {
    /// Page opened in the pinned anchor tab that keeps the window alive.
    pub anchor_url: String,
    /// SQLite file for the workspace store. `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    pub queue_capacity: usize,
    pub event_capacity: usize,
    pub watcher_debounce_ms: u64,
}

impl Default for TabspaceConfig {
    fn default() -> Self {
        Self {
            anchor_url: "chrome-extension://tabspace/options.html".to_string(),
            db_path: None,
            queue_capacity: 256,
            event_capacity: 256,
            watcher_debounce_ms: 150,
        }
    }
}

impl TabspaceConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
