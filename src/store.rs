//! Persistence for the kiosk configuration document

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::config::{normalize, ConfigPatch, KioskConfig};

/// Raw storage for the JSON document
pub trait ConfigStore: Send + Sync {
    /// `None` when nothing was saved yet
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, document: &str) -> Result<()>;
    fn delete(&self) -> Result<()>;
}

/// Document in a JSON file, replaced atomically on save
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read config from {:?}", self.path)),
        }
    }

    fn save(&self, document: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, document).with_context(|| format!("Failed to write config to {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move config into place at {:?}", self.path))?;
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete config at {:?}", self.path)),
        }
    }
}

/// In-memory store for tests
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    pub document: Mutex<Option<String>>,
}

#[cfg(test)]
impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, document: &str) -> Result<()> {
        *self.document.lock() = Some(document.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        *self.document.lock() = None;
        Ok(())
    }
}

/// The current configuration plus the store behind it.
///
/// Readers get a cheap snapshot through [`ConfigContext::current`]; writers
/// are serialized, persist first and only then publish the new document.
/// Each writer takes a `publish` callback that runs before the next writer
/// starts, so observers see documents in the order they were saved.
pub struct ConfigContext {
    store: Box<dyn ConfigStore>,
    current: ArcSwap<KioskConfig>,
    write: Mutex<()>,
}

impl ConfigContext {
    /// Load the stored document; a missing or corrupt one yields defaults
    pub fn load(store: Box<dyn ConfigStore>) -> Self {
        let config = match store.load() {
            Ok(Some(document)) => match ConfigPatch::from_json(&document) {
                Ok(patch) => {
                    tracing::info!("Loaded kiosk configuration");
                    normalize(&patch)
                }
                Err(e) => {
                    tracing::warn!("Configuration document is corrupt, using defaults: {}", e);
                    KioskConfig::default()
                }
            },
            Ok(None) => {
                tracing::info!("No saved configuration, using defaults");
                KioskConfig::default()
            }
            Err(e) => {
                tracing::warn!("Could not read configuration, using defaults: {:#}", e);
                KioskConfig::default()
            }
        };

        Self {
            store,
            current: ArcSwap::from_pointee(config),
            write: Mutex::new(()),
        }
    }

    pub fn current(&self) -> Arc<KioskConfig> {
        self.current.load_full()
    }

    /// Layer a partial document over the current one and persist the result
    pub fn update<P>(&self, patch: ConfigPatch, publish: P) -> Result<Arc<KioskConfig>>
    where
        P: FnOnce(&Arc<KioskConfig>),
    {
        let _guard = self.write.lock();
        let merged = ConfigPatch::from(&*self.current()).overlay(patch);
        let config = self.commit(normalize(&merged))?;
        publish(&config);
        Ok(config)
    }

    /// Edit the document in place; `edit` returns whether anything changed
    pub fn modify<F, P>(&self, edit: F, publish: P) -> Result<Option<Arc<KioskConfig>>>
    where
        F: FnOnce(&mut KioskConfig) -> bool,
        P: FnOnce(&Arc<KioskConfig>),
    {
        let _guard = self.write.lock();
        let mut config = (*self.current()).clone();
        if !edit(&mut config) {
            return Ok(None);
        }
        let config = self.commit(normalize(&ConfigPatch::from(&config)))?;
        publish(&config);
        Ok(Some(config))
    }

    /// Forget the stored document and go back to defaults
    pub fn reset<P>(&self, publish: P) -> Result<Arc<KioskConfig>>
    where
        P: FnOnce(&Arc<KioskConfig>),
    {
        let _guard = self.write.lock();
        self.store.delete()?;
        let config = Arc::new(KioskConfig::default());
        self.current.store(config.clone());
        tracing::info!("Configuration reset to defaults");
        publish(&config);
        Ok(config)
    }

    fn commit(&self, config: KioskConfig) -> Result<Arc<KioskConfig>> {
        let document = serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?;
        self.store.save(&document)?;
        let config = Arc::new(config);
        self.current.store(config.clone());
        tracing::info!("Saved kiosk configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(json: &str) -> ConfigPatch {
        ConfigPatch::from_json(json).unwrap()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ConfigContext::load(Box::new(JsonFileStore::new(dir.path().join("kiosk.json"))));
        assert_eq!(*ctx.current(), KioskConfig::default());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.json");
        std::fs::write(&path, "{ this is not json").unwrap();
        let ctx = ConfigContext::load(Box::new(JsonFileStore::new(&path)));
        assert_eq!(*ctx.current(), KioskConfig::default());
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kiosk.json");
        let ctx = ConfigContext::load(Box::new(JsonFileStore::new(&path)));
        let saved = ctx
            .update(
                patch(r#"{"idleVideos": ["idle.mp4"], "printer": {"deviceName": "Selphy"}}"#),
                |_| {},
            )
            .unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reloaded = ConfigContext::load(Box::new(JsonFileStore::new(&path)));
        assert_eq!(reloaded.current(), saved);
    }

    #[test]
    fn test_update_layers_sections() {
        let ctx = ConfigContext::load(Box::<MemoryStore>::default());
        ctx.update(patch(r#"{"printer": {"deviceName": "Selphy", "sheetsRemaining": 40}}"#), |_| {})
            .unwrap();
        let config = ctx
            .update(patch(r#"{"printer": {"sheetsRemaining": 39}}"#), |_| {})
            .unwrap();
        assert_eq!(config.printer.device_name, "Selphy");
        assert_eq!(config.printer.sheets_remaining, 39);
    }

    #[test]
    fn test_modify_skips_save_when_unchanged() {
        let store = MemoryStore::default();
        let ctx = ConfigContext::load(Box::new(store));
        let published = Mutex::new(0);
        assert!(ctx.modify(|_| false, |_| *published.lock() += 1).unwrap().is_none());
        assert_eq!(*published.lock(), 0);

        let config = ctx
            .modify(
                |c| c.add_media(crate::config::MediaPool::Overlay, "santa.png"),
                |_| *published.lock() += 1,
            )
            .unwrap()
            .unwrap();
        assert_eq!(*published.lock(), 1);
        assert_eq!(config.santa_overlays, vec!["santa.png".to_string()]);
    }

    #[test]
    fn test_reset_deletes_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.json");
        let ctx = ConfigContext::load(Box::new(JsonFileStore::new(&path)));
        ctx.update(patch(r#"{"mirrorCamera": false}"#), |_| {}).unwrap();
        assert!(!ctx.current().mirror_camera);

        ctx.reset(|_| {}).unwrap();
        assert!(!path.exists());
        assert!(ctx.current().mirror_camera);
    }

    #[test]
    fn test_concurrent_writers_publish_in_save_order() {
        let store = Arc::new(MemoryStore::default());
        let ctx = Arc::new(ConfigContext::load(Box::new(SharedStore(store.clone()))));
        let published: Arc<Mutex<Vec<u32>>> = Arc::default();

        let writers: Vec<_> = (1..=16u32)
            .map(|n| {
                let ctx = ctx.clone();
                let published = published.clone();
                std::thread::spawn(move || {
                    let edit = patch(&format!(r#"{{"printer": {{"sheetsRemaining": {}}}}}"#, n));
                    ctx.update(edit, |config| {
                        published.lock().push(config.printer.sheets_remaining)
                    })
                    .unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let published = published.lock();
        assert_eq!(published.len(), 16);
        let saved = store.document.lock().clone().unwrap();
        let saved = normalize(&ConfigPatch::from_json(&saved).unwrap());
        assert_eq!(published.last(), Some(&saved.printer.sheets_remaining));
        assert_eq!(ctx.current().printer.sheets_remaining, saved.printer.sheets_remaining);
    }

    /// Lets a test keep a handle on the store it hands to the context
    struct SharedStore(Arc<MemoryStore>);

    impl ConfigStore for SharedStore {
        fn load(&self) -> Result<Option<String>> {
            self.0.load()
        }

        fn save(&self, document: &str) -> Result<()> {
            self.0.save(document)
        }

        fn delete(&self) -> Result<()> {
            self.0.delete()
        }
    }
}
