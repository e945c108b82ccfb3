//! # Configuration Portal
//!
//! Owns the current [`InputSettings`] and hands out `watch` receivers for them.
//!
//! ## Action/Result Pattern
//! Writers do not mutate settings directly. They submit a [`PortalAction`] and get a
//! [`ConfigResult`] back, which keeps every mutation in one place and makes it
//! trivial to log or persist changes.
//!
//! ```text
//! UI / CLI ──PortalAction──► ConfigPortal ──watch──► InputSystem (once per tick)
//!                                 │
//!                                 └──────watch──► ConfigStore persist task
//! ```
//!
//! Receivers only see a notification when an action really changed something.

use super::InputSettings;
use crate::mapping::{ButtonMask, KeyCode, Keymap, MappingError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct ConfigPortal {
    settings: watch::Sender<InputSettings>,
}

impl Default for ConfigPortal {
    fn default() -> Self {
        Self::new(InputSettings::default())
    }
}

impl ConfigPortal {
    pub fn new(settings: InputSettings) -> Self {
        let (tx, _rx) = watch::channel(settings);
        Self { settings: tx }
    }

    /// Receiver that is notified on every effective change.
    pub fn subscribe(&self) -> watch::Receiver<InputSettings> {
        self.settings.subscribe()
    }

    pub fn snapshot(&self) -> InputSettings {
        self.settings.borrow().clone()
    }

    pub fn execute_portal_action(&self, action: PortalAction) -> ConfigResult {
        debug!("Executing portal action {:?}", action);
        let result = match action {
            PortalAction::GetSettings => Ok(ConfigResult::Settings(self.snapshot())),
            PortalAction::GetKeymap => Ok(ConfigResult::Keymap(self.settings.borrow().keymap.clone())),
            PortalAction::GetSwapButtons => {
                Ok(ConfigResult::SwapButtons(self.settings.borrow().swap_buttons))
            }
            PortalAction::WriteSwapButtons(swap) => {
                self.modify(|settings| {
                    let changed = settings.swap_buttons != swap;
                    settings.swap_buttons = swap;
                    Ok(changed)
                })
                .map(|_| ConfigResult::SwapButtons(swap))
            }
            PortalAction::ToggleSwapButtons => {
                let swap = !self.settings.borrow().swap_buttons;
                self.modify(|settings| {
                    settings.swap_buttons = swap;
                    Ok(true)
                })
                .map(|_| ConfigResult::SwapButtons(swap))
            }
            PortalAction::BindKey { key, mask, append } => self
                .modify(|settings| {
                    let before = settings.keymap.lookup(key.as_str());
                    settings.keymap.bind(key.clone(), mask, append)?;
                    Ok(before != settings.keymap.lookup(key.as_str()))
                })
                .map(|_| ConfigResult::Success),
            PortalAction::UnbindKey { key, mask } => self
                .modify(|settings| {
                    let before = settings.keymap.lookup(key.as_str());
                    if !settings.keymap.unbind(key.as_str(), mask) {
                        return Err(ConfigError::NotBound(key.to_string()));
                    }
                    Ok(before != settings.keymap.lookup(key.as_str()))
                })
                .map(|_| ConfigResult::Success),
            PortalAction::ResetKeymap => self
                .modify(|settings| {
                    let changed = settings.keymap != Keymap::default_config();
                    settings.keymap.reset();
                    Ok(changed)
                })
                .map(|_| ConfigResult::Success),
            PortalAction::WriteSettings(new_settings) => self
                .modify(|settings| {
                    let changed = *settings != *new_settings;
                    *settings = *new_settings;
                    Ok(changed)
                })
                .map(|_| ConfigResult::Success),
        };

        match result {
            Ok(res) => res,
            Err(e) => {
                warn!("Portal action failed: {}", e);
                ConfigResult::Failed(e)
            }
        }
    }

    /// Applies `change` to a copy; subscribers are notified only when it reports a change.
    fn modify<F>(&self, change: F) -> Result<bool, ConfigError>
    where
        F: FnOnce(&mut InputSettings) -> Result<bool, ConfigError>,
    {
        let mut next = self.snapshot();
        let changed = change(&mut next)?;
        if changed {
            self.settings.send_replace(next);
            info!("Input settings updated");
        }
        Ok(changed)
    }
}

#[derive(Debug)]
pub enum PortalAction {
    GetSettings,
    GetKeymap,
    GetSwapButtons,
    WriteSwapButtons(bool),
    ToggleSwapButtons,
    BindKey {
        key: KeyCode,
        mask: ButtonMask,
        append: bool,
    },
    UnbindKey {
        key: KeyCode,
        mask: ButtonMask,
    },
    ResetKeymap,
    WriteSettings(Box<InputSettings>),
}

#[derive(Debug)]
pub enum ConfigResult {
    Success,
    Settings(InputSettings),
    Keymap(Keymap),
    SwapButtons(bool),
    Failed(ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("Key '{0}' has no binding")]
    NotBound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_swap_notifies() {
        let portal = ConfigPortal::default();
        let mut rx = portal.subscribe();
        assert!(!rx.has_changed().unwrap());

        let result = portal.execute_portal_action(PortalAction::ToggleSwapButtons);
        assert!(matches!(result, ConfigResult::SwapButtons(true)));
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().swap_buttons);
    }

    #[test]
    fn test_noop_write_does_not_notify() {
        let portal = ConfigPortal::default();
        let rx = portal.subscribe();
        portal.execute_portal_action(PortalAction::WriteSwapButtons(false));
        portal.execute_portal_action(PortalAction::ResetKeymap);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_bind_and_unbind_through_portal() {
        let portal = ConfigPortal::default();
        let bind = PortalAction::BindKey {
            key: "w".into(),
            mask: ButtonMask::UP,
            append: true,
        };
        assert!(matches!(portal.execute_portal_action(bind), ConfigResult::Success));

        let ConfigResult::Keymap(keymap) = portal.execute_portal_action(PortalAction::GetKeymap) else {
            panic!("expected keymap");
        };
        assert_eq!(keymap.lookup("w"), ButtonMask::UP);

        let unbind = PortalAction::UnbindKey {
            key: "w".into(),
            mask: ButtonMask::UP,
        };
        portal.execute_portal_action(unbind);
        assert!(portal.snapshot().keymap.lookup("w").is_empty());
    }

    #[test]
    fn test_failures_are_reported() {
        let portal = ConfigPortal::default();
        let empty = PortalAction::BindKey {
            key: "w".into(),
            mask: ButtonMask::empty(),
            append: false,
        };
        assert!(matches!(
            portal.execute_portal_action(empty),
            ConfigResult::Failed(ConfigError::Mapping(MappingError::EmptyBinding(_)))
        ));

        let missing = PortalAction::UnbindKey {
            key: "F1".into(),
            mask: ButtonMask::UP,
        };
        assert!(matches!(
            portal.execute_portal_action(missing),
            ConfigResult::Failed(ConfigError::NotBound(_))
        ));
    }
}
