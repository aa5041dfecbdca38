// In-memory implementation of SettingsStore.
//
// Used by tests and local runs where there is no settings file to watch.
// The policy can be swapped at runtime; the gate sees the new policy on
// its next settings load.

use crate::core::moderation::{GateError, GateSettings, SettingsStore};
use async_trait::async_trait;
use tokio::sync::RwLock;

pub struct InMemorySettingsStore {
    settings: RwLock<GateSettings>,
}

impl InMemorySettingsStore {
    pub fn new(settings: GateSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Replace the held policy.
    pub async fn set(&self, settings: GateSettings) {
        *self.settings.write().await = settings;
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<GateSettings, GateError> {
        Ok(self.settings.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_is_visible_on_next_load() {
        let store = InMemorySettingsStore::new(GateSettings::default());
        assert_eq!(store.load().await.unwrap().account_age.threshold, 30);

        let mut updated = GateSettings::default();
        updated.account_age.threshold = 90;
        store.set(updated).await;

        assert_eq!(store.load().await.unwrap().account_age.threshold, 90);
    }
}
