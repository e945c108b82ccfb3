//! Physical key → logical button table.
//!
//! The table is edited through explicit bind/unbind/reset calls (normally via the
//! config portal) and read by the keyboard tracker once per raw key event.

use crate::mapping::{ButtonMask, MappingError};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Well-known key identifiers used by the defaults and the UI heuristics.
pub mod keys {
    pub const ARROW_LEFT: &str = "ArrowLeft";
    pub const ARROW_RIGHT: &str = "ArrowRight";
    pub const ARROW_UP: &str = "ArrowUp";
    pub const ARROW_DOWN: &str = "ArrowDown";
    pub const ENTER: &str = "Enter";
    pub const ESCAPE: &str = "Escape";
    pub const BACKSPACE: &str = "Backspace";
    pub const SPACE: &str = " ";
}

/// Platform key identifier.
///
/// Single character identifiers are stored lower case so `"Z"` and `"z"` name the
/// same physical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct KeyCode(String);

impl KeyCode {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_uppercase() => Self(c.to_lowercase().collect()),
            _ => Self(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for KeyCode {
    fn from(value: String) -> Self {
        KeyCode::new(value)
    }
}

impl From<&str> for KeyCode {
    fn from(value: &str) -> Self {
        KeyCode::new(value)
    }
}

impl From<KeyCode> for String {
    fn from(value: KeyCode) -> Self {
        value.0
    }
}

impl Borrow<str> for KeyCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key → button bits. One key may drive several buttons (diagonals).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keymap {
    bindings: BTreeMap<KeyCode, ButtonMask>,
}

impl Default for Keymap {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Keymap {
    /// Arrow keys for the d-pad, three keys per face button, Enter/Escape for pause.
    pub fn default_config() -> Self {
        let mut bindings = BTreeMap::new();
        bindings.insert(KeyCode::new(keys::ARROW_LEFT), ButtonMask::LEFT);
        bindings.insert(KeyCode::new(keys::ARROW_RIGHT), ButtonMask::RIGHT);
        bindings.insert(KeyCode::new(keys::ARROW_UP), ButtonMask::UP);
        bindings.insert(KeyCode::new(keys::ARROW_DOWN), ButtonMask::DOWN);
        for key in ["z", "c", "n"] {
            bindings.insert(KeyCode::new(key), ButtonMask::PRIMARY);
        }
        for key in ["x", "v", "m"] {
            bindings.insert(KeyCode::new(key), ButtonMask::SECONDARY);
        }
        bindings.insert(KeyCode::new(keys::ENTER), ButtonMask::PAUSE);
        bindings.insert(KeyCode::new(keys::ESCAPE), ButtonMask::PAUSE);

        Self { bindings }
    }

    /// Map without any binding.
    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Binds `mask` to `key`. With `append` the bits are added to the existing
    /// binding, otherwise they replace it.
    pub fn bind(
        &mut self,
        key: impl Into<KeyCode>,
        mask: ButtonMask,
        append: bool,
    ) -> Result<(), MappingError> {
        let key = key.into();
        if key.is_empty() {
            return Err(MappingError::InvalidKey(key.to_string()));
        }
        if mask.is_empty() {
            return Err(MappingError::EmptyBinding(key.to_string()));
        }

        let entry = self.bindings.entry(key.clone()).or_default();
        if append {
            *entry |= mask;
        } else {
            *entry = mask;
        }
        debug!("Bound key '{}' to {:?} (append: {})", key, *entry, append);
        Ok(())
    }

    /// Clears `mask` from `key`'s binding; the entry disappears once no bit is left.
    /// Returns whether the key had a binding.
    pub fn unbind(&mut self, key: &str, mask: ButtonMask) -> bool {
        let key = KeyCode::new(key);
        let Some(bits) = self.bindings.get_mut(&key) else {
            return false;
        };
        bits.remove(mask);
        if bits.is_empty() {
            self.bindings.remove(&key);
            debug!("Removed binding for key '{}'", key);
        }
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default_config();
    }

    /// Bits driven by `key`; empty when the key is unbound.
    pub fn lookup(&self, key: &str) -> ButtonMask {
        if let Some(bits) = self.bindings.get(key) {
            return *bits;
        }
        // Stored identifiers are normalised, raw lookups may not be.
        let normalised = KeyCode::new(key);
        self.bindings
            .get(&normalised)
            .copied()
            .unwrap_or_else(ButtonMask::empty)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyCode, &ButtonMask)> {
        self.bindings.iter()
    }
}
