use crate::core::moderation::{GateError, GateSettings, SettingsStore};
use async_trait::async_trait;
use std::path::PathBuf;

/// Settings store backed by a JSON file the operator edits by hand.
///
/// The file is re-read on every `load()`, so edits take effect on the next
/// event without a restart. A missing file means default policy.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn load(&self) -> Result<GateSettings, GateError> {
        if !self.path.exists() {
            return Ok(GateSettings::default());
        }

        let file = std::fs::File::open(&self.path).map_err(|e| {
            GateError::Config(format!("Failed to open {}: {}", self.path.display(), e))
        })?;
        serde_json::from_reader(file).map_err(|e| {
            GateError::Config(format!("Invalid settings file {}: {}", self.path.display(), e))
        })
    }
}
