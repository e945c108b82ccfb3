use super::InputSettings;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const CONFIG_DIR: &str = "pocket8";
const CONFIG_FILE: &str = "input.toml";

/// TOML file holding [`InputSettings`].
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/pocket8/input.toml`
    pub fn default_location() -> Self {
        let mut path = get_config_dir();
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the settings, falling back to defaults when the file is missing or unreadable.
    pub async fn load(&self) -> InputSettings {
        match self.try_load().await {
            Ok(Some(settings)) => {
                info!("Loaded input settings from {}", self.path.display());
                settings
            }
            Ok(None) => {
                info!(
                    "No input settings at {}, using defaults",
                    self.path.display()
                );
                InputSettings::default()
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                InputSettings::default()
            }
        }
    }

    /// `Ok(None)` when the file does not exist.
    pub async fn try_load(&self) -> Result<Option<InputSettings>> {
        if !tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| eyre!("Failed to check if settings file exists: {}", e))?
        {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| eyre!("Failed to read settings file: {}", e))?;

        let settings = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse settings file {}: {}", self.path.display(), e))?;
        Ok(Some(settings))
    }

    pub async fn save(&self, settings: &InputSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create settings directory: {}", e))?;
        }

        let content = toml::to_string_pretty(settings)
            .map_err(|e| eyre!("Failed to serialize settings: {}", e))?;

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| eyre!("Failed to write settings file: {}", e))?;

        debug!("Input settings saved to {}", self.path.display());
        Ok(())
    }

    /// Writes the file every time `settings` changes, until cancelled or the portal is gone.
    pub fn spawn_persist_task(
        self,
        mut settings: watch::Receiver<InputSettings>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        info!("Starting settings persist task for {}", self.path.display());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = settings.changed() => {
                        if changed.is_err() {
                            debug!("Config portal dropped, stopping persist task");
                            break;
                        }
                        let snapshot = settings.borrow_and_update().clone();
                        if let Err(e) = self.save(&snapshot).await {
                            error!("Failed to persist input settings: {}", e);
                        }
                    }
                }
            }
        })
    }
}

fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| {
            warn!("Could not determine config or home directory, using current directory");
            PathBuf::from(".")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{ConfigPortal, PortalAction};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("nested").join(CONFIG_FILE))
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.try_load().await.unwrap().is_none());
        assert_eq!(store.load().await, InputSettings::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let settings = InputSettings {
            swap_buttons: true,
            poll_interval_ms: 8,
            ..Default::default()
        };

        store.save(&settings).await.unwrap();
        assert_eq!(store.load().await, settings);
    }

    #[tokio::test]
    async fn test_corrupt_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        tokio::fs::create_dir_all(store.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(store.path(), "swap_buttons = [").await.unwrap();

        assert!(store.try_load().await.is_err());
        assert_eq!(store.load().await, InputSettings::default());
    }

    #[tokio::test]
    async fn test_persist_task_writes_changes() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let portal = ConfigPortal::default();
        let cancel = CancellationToken::new();
        let handle = store
            .clone()
            .spawn_persist_task(portal.subscribe(), cancel.clone());

        portal.execute_portal_action(PortalAction::ToggleSwapButtons);

        let mut saved = false;
        for _ in 0..100 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            if let Ok(Some(settings)) = store.try_load().await {
                if settings.swap_buttons {
                    saved = true;
                    break;
                }
            }
        }
        assert!(saved, "settings never reached {}", store.path().display());

        cancel.cancel();
        handle.await.unwrap();
    }
}
