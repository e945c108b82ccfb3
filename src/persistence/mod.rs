//! # Persistence Module
//!
//! Settings model for the input subsystem plus the two pieces that manage it at
//! runtime:
//!
//! - [`config_portal`]: in-memory owner of the current [`InputSettings`]; every
//!   change is broadcast on a `watch` channel so the input system can re-cache once
//!   per tick.
//! - [`config_store`]: TOML file on disk, loaded at startup and rewritten whenever
//!   the portal publishes a change.
//!
//! Missing or corrupt files degrade to defaults rather than preventing startup.
//! Every field carries a serde default so older files keep loading after new
//! settings are added.

pub mod config_portal;
pub mod config_store;

pub use config_portal::{ConfigError, ConfigPortal, ConfigResult, PortalAction};
pub use config_store::ConfigStore;

use crate::engine::FrameSyncSettings;
use crate::mapping::keymap::keys;
use crate::mapping::{KeyCode, Keymap, RepeatTiming};
use serde::{Deserialize, Serialize};

/// Everything the input subsystem can be configured with.
///
/// Scalar fields come first: TOML emits plain values before tables.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InputSettings {
    /// Exchange the roles of the south/west and east/north face buttons
    pub swap_buttons: bool,
    /// Ticks during which confirm/back are absorbed after `swap_buttons` changed
    pub swap_cooldown_ticks: u32,
    /// Render loop period when the binary drives the ticks itself
    pub poll_interval_ms: u64,
    pub repeat: RepeatTiming,
    pub ui_keys: UiKeyAliases,
    pub gamepad: GamepadSettings,
    pub frame_sync: FrameSyncSettings,
    pub keymap: Keymap,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            swap_buttons: false,
            swap_cooldown_ticks: 10,
            poll_interval_ms: 16,
            repeat: RepeatTiming::default(),
            ui_keys: UiKeyAliases::default(),
            gamepad: GamepadSettings::default(),
            frame_sync: FrameSyncSettings::default(),
            keymap: Keymap::default_config(),
        }
    }
}

/// Raw keys that produce UI events in addition to the gamepad.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct UiKeyAliases {
    pub confirm: Vec<KeyCode>,
    pub back: Vec<KeyCode>,
    pub menu: Vec<KeyCode>,
    pub wiggle: Vec<KeyCode>,
}

impl Default for UiKeyAliases {
    fn default() -> Self {
        let codes = |list: &[&str]| -> Vec<KeyCode> { list.iter().map(|k| KeyCode::new(*k)).collect() };
        Self {
            confirm: codes(&["z", keys::ENTER, keys::SPACE]),
            back: codes(&["x", keys::BACKSPACE, keys::ESCAPE]),
            menu: codes(&[keys::ESCAPE]),
            wiggle: codes(&["e"]),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct GamepadSettings {
    /// Analog stick threshold, 0.0..1.0
    pub deadzone: f32,
}

impl Default for GamepadSettings {
    fn default() -> Self {
        Self { deadzone: 0.3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ButtonMask;

    #[test]
    fn test_defaults() {
        let settings = InputSettings::default();
        assert!(!settings.swap_buttons);
        assert_eq!(settings.swap_cooldown_ticks, 10);
        assert_eq!(settings.repeat.initial_delay_ms, 400);
        assert_eq!(settings.repeat.interval_ms, 100);
        assert_eq!(settings.frame_sync.discovery_attempts, 50);
        assert_eq!(settings.frame_sync.fallback_interval_ms, 8);
        assert!(settings.ui_keys.confirm.contains(&KeyCode::new(" ")));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let text = r#"
            swap_buttons = true

            [repeat]
            interval_ms = 50
        "#;
        let settings: InputSettings = toml::from_str(text).unwrap();
        assert!(settings.swap_buttons);
        assert_eq!(settings.repeat.interval_ms, 50);
        assert_eq!(settings.repeat.initial_delay_ms, 400);
        assert_eq!(settings.keymap, Keymap::default_config());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut settings = InputSettings::default();
        settings.swap_buttons = true;
        settings
            .keymap
            .bind("w", ButtonMask::UP | ButtonMask::LEFT, false)
            .unwrap();

        let text = toml::to_string_pretty(&settings).unwrap();
        let back: InputSettings = toml::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }
}
