use std::sync::{Arc, RwLock};

use crate::config::{ClientConfig, DEFAULT_HISTORY_KEY, DEFAULT_SETTINGS_KEY};
use crate::error::Result;
use crate::gallery::Gallery;
use crate::store::{ImageStore, MemoryStore};
use crate::types::{AppSettings, GeneratedImage};

/// Application state shared by the pager, the generator and the UI layer.
///
/// History and settings are read from the store once in [`AppState::load`].
/// Every mutating method writes the full blob back before returning; if that
/// write fails the error is returned and the in-memory state is unchanged.
pub struct AppState {
    store: Arc<dyn ImageStore>,
    history_key: String,
    settings_key: String,
    history: RwLock<Gallery>,
    settings: RwLock<AppSettings>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("history_key", &self.history_key)
            .field("settings_key", &self.settings_key)
            .field("history_len", &self.history_len())
            .finish()
    }
}

impl AppState {
    /// Load persisted history and settings.
    ///
    /// Unreadable blobs are logged and replaced with empty defaults; store
    /// I/O failures are returned.
    pub fn load(store: Arc<dyn ImageStore>, config: &ClientConfig) -> Result<Self> {
        let history = match store.load(&config.history_key)? {
            Some(json) => Gallery::from_json(&json).unwrap_or_else(|e| {
                tracing::warn!(key = %config.history_key, error = %e, "Failed to parse history");
                Gallery::new()
            }),
            None => Gallery::new(),
        };

        let settings = match store.load(&config.settings_key)? {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(key = %config.settings_key, error = %e, "Failed to parse settings");
                AppSettings::default()
            }),
            None => AppSettings::default(),
        };

        tracing::debug!(images = history.len(), "Loaded application state");
        Ok(Self {
            store,
            history_key: config.history_key.clone(),
            settings_key: config.settings_key.clone(),
            history: RwLock::new(history),
            settings: RwLock::new(settings),
        })
    }

    /// Fresh state backed by a [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            history_key: DEFAULT_HISTORY_KEY.to_string(),
            settings_key: DEFAULT_SETTINGS_KEY.to_string(),
            history: RwLock::new(Gallery::new()),
            settings: RwLock::new(AppSettings::default()),
        }
    }

    /// Snapshot of the visible history, newest first.
    pub fn history(&self) -> Vec<GeneratedImage> {
        self.read_history(|g| g.images().to_vec())
    }

    pub fn history_len(&self) -> usize {
        self.read_history(|g| g.len())
    }

    pub fn settings(&self) -> AppSettings {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn update_settings(&self, settings: AppSettings) -> Result<()> {
        let mut current = self.settings.write().unwrap_or_else(|e| e.into_inner());
        let json = serde_json::to_string(&settings)?;
        self.store.save(&self.settings_key, &json)?;
        *current = settings;
        Ok(())
    }

    pub fn prepend_image(&self, image: GeneratedImage) -> Result<()> {
        self.mutate_history(|g| g.prepend(image))
    }

    pub fn replace_history(&self, images: Vec<GeneratedImage>) -> Result<()> {
        self.mutate_history(|g| g.replace(images))
    }

    /// Append to the tail, skipping ids already shown. Returns the number added.
    pub fn append_history(&self, images: Vec<GeneratedImage>) -> Result<usize> {
        self.mutate_history(|g| g.append(images))
    }

    /// Remove an image from the local history only; no backend call is made.
    pub fn delete_image(&self, id: &str) -> Result<bool> {
        self.mutate_history(|g| g.remove(id))
    }

    fn read_history<R>(&self, f: impl FnOnce(&Gallery) -> R) -> R {
        let gallery = self.history.read().unwrap_or_else(|e| e.into_inner());
        f(&*gallery)
    }

    // Changes are applied to a copy and only become visible once saved.
    // The lock is held across the save so memory and store never diverge.
    fn mutate_history<R>(&self, f: impl FnOnce(&mut Gallery) -> R) -> Result<R> {
        let mut gallery = self.history.write().unwrap_or_else(|e| e.into_inner());
        let mut next = gallery.clone();
        let result = f(&mut next);
        let json = next.to_json()?;
        self.store.save(&self.history_key, &json)?;
        *gallery = next;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenError;
    use crate::store::FileStore;
    use tempfile::tempdir;

    fn image(id: &str) -> GeneratedImage {
        GeneratedImage {
            id: id.to_string(),
            url: format!("https://img.example/{}.png", id),
            prompt: "p".into(),
            negative_prompt: None,
            aspect_ratio: None,
            width: Some(512),
            height: Some(512),
            timestamp: 42,
        }
    }

    #[test]
    fn test_history_survives_reload() {
        let temp = tempdir().unwrap();
        let config = ClientConfig::default();
        let store: Arc<dyn ImageStore> = Arc::new(FileStore::new(temp.path()));

        let state = AppState::load(store.clone(), &config).unwrap();
        state.prepend_image(image("a")).unwrap();
        state.prepend_image(image("b")).unwrap();
        state.prepend_image(image("c")).unwrap();
        assert!(state.delete_image("b").unwrap());

        let reloaded = AppState::load(store, &config).unwrap();
        assert_eq!(reloaded.history(), state.history());
        assert_eq!(
            reloaded.history().iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
            vec!["c", "a"]
        );
    }

    #[test]
    fn test_settings_survive_reload() {
        let store: Arc<dyn ImageStore> = Arc::new(MemoryStore::new());
        let config = ClientConfig::default();
        let state = AppState::load(store.clone(), &config).unwrap();
        assert_eq!(state.settings(), AppSettings::default());

        let settings = AppSettings {
            use_custom_backend: true,
            custom_backend_url: "http://gpu.lan/generate".into(),
        };
        state.update_settings(settings.clone()).unwrap();

        let reloaded = AppState::load(store, &config).unwrap();
        assert_eq!(reloaded.settings(), settings);
    }

    #[test]
    fn test_corrupt_history_falls_back_to_empty() {
        let store = Arc::new(MemoryStore::new());
        store.save("z-image-history", "{not json").unwrap();
        let state = AppState::load(store, &ClientConfig::default()).unwrap();
        assert_eq!(state.history_len(), 0);
    }

    struct BrokenStore;

    impl ImageStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn save(&self, key: &str, _value: &str) -> Result<()> {
            Err(GenError::Storage {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[test]
    fn test_failed_save_changes_nothing() {
        let state = AppState::load(Arc::new(BrokenStore), &ClientConfig::default()).unwrap();

        assert!(state.prepend_image(image("a")).is_err());
        assert!(state.replace_history(vec![image("b")]).is_err());
        assert_eq!(state.history_len(), 0);

        let settings = AppSettings {
            use_custom_backend: true,
            custom_backend_url: "http://gpu.lan/generate".into(),
        };
        assert!(state.update_settings(settings).is_err());
        assert_eq!(state.settings(), AppSettings::default());
    }

    #[test]
    fn test_delete_missing_id_leaves_history() {
        let state = AppState::in_memory();
        state.replace_history(vec![image("a"), image("b")]).unwrap();
        assert!(!state.delete_image("nope").unwrap());
        assert_eq!(state.history_len(), 2);
    }
}
