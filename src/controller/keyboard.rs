//! Keyboard tracker.
//!
//! Turns host key events into the keyboard mask and remembers which raw keys are
//! held, so UI mode can react to keys that are not bound to any button
//! (`Backspace`, `" "`, `e`, ...).

use crate::mapping::keymap::keys;
use crate::mapping::{ButtonMask, KeyCode, Keymap, MaskSlot};
use std::collections::HashMap;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

/// Key event as delivered by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub kind: KeyEventKind,
    /// Dispatched by this crate into the engine; never interpreted again.
    pub synthetic: bool,
}

impl KeyEvent {
    pub fn down(key: impl Into<KeyCode>) -> Self {
        Self {
            key: key.into(),
            kind: KeyEventKind::Down,
            synthetic: false,
        }
    }

    pub fn up(key: impl Into<KeyCode>) -> Self {
        Self {
            key: key.into(),
            kind: KeyEventKind::Up,
            synthetic: false,
        }
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }
}

/// What the host should do with the event afterwards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyDisposition {
    /// Suppress the host's default action (scrolling, history back, ...).
    pub prevent_default: bool,
    /// The event was taken into account.
    pub handled: bool,
}

const DEFAULT_ACTION_KEYS: [&str; 7] = [
    keys::ESCAPE,
    keys::BACKSPACE,
    keys::SPACE,
    keys::ARROW_LEFT,
    keys::ARROW_RIGHT,
    keys::ARROW_UP,
    keys::ARROW_DOWN,
];

/// Sole writer of the keyboard slot
#[derive(Debug)]
pub struct KeyboardTracker {
    slot: MaskSlot,
    keymap: Keymap,
    // Held key -> bits resolved when it went down
    held: HashMap<KeyCode, ButtonMask>,
    text_input_focused: bool,
}

impl KeyboardTracker {
    pub fn new(slot: MaskSlot, keymap: Keymap) -> Self {
        Self {
            slot,
            keymap,
            held: HashMap::new(),
            text_input_focused: false,
        }
    }

    /// Replaces the cached keymap. Keys already held keep the bits they resolved to.
    pub fn set_keymap(&mut self, keymap: Keymap) {
        debug!("Keyboard tracker picked up keymap with {} bindings", keymap.len());
        self.keymap = keymap;
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn set_text_input_focused(&mut self, focused: bool) {
        self.text_input_focused = focused;
    }

    pub fn text_input_focused(&self) -> bool {
        self.text_input_focused
    }

    pub fn handle(&mut self, event: &KeyEvent) -> KeyDisposition {
        if event.synthetic {
            trace!("Ignoring synthetic key event {:?}", event.key);
            return KeyDisposition::default();
        }

        let prevent_default =
            !self.text_input_focused && DEFAULT_ACTION_KEYS.contains(&event.key.as_str());

        match event.kind {
            KeyEventKind::Down => {
                if !self.held.contains_key(&event.key) {
                    let bits = self.keymap.lookup(event.key.as_str());
                    self.held.insert(event.key.clone(), bits);
                    if !bits.is_empty() {
                        self.slot.insert(bits);
                        debug!("Key '{}' down -> {:?}", event.key, bits);
                    }
                }
            }
            KeyEventKind::Up => {
                if let Some(bits) = self.held.remove(&event.key) {
                    if !bits.is_empty() {
                        self.slot.set(self.held_mask());
                        debug!("Key '{}' up, released {:?}", event.key, bits);
                    }
                }
            }
        }

        KeyDisposition {
            prevent_default,
            handled: true,
        }
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains_key(key) || self.held.contains_key(&KeyCode::new(key))
    }

    pub fn mask(&self) -> ButtonMask {
        self.slot.get()
    }

    /// Forgets every held key, e.g. when the host window loses focus.
    pub fn release_all(&mut self) {
        if !self.held.is_empty() {
            debug!("Releasing {} held keys", self.held.len());
        }
        self.held.clear();
        self.slot.clear();
    }

    fn held_mask(&self) -> ButtonMask {
        self.held
            .values()
            .fold(ButtonMask::empty(), |acc, bits| acc | *bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PublicationSink;
    use crate::mapping::Compositor;

    fn tracker() -> KeyboardTracker {
        let (_, slots) = Compositor::new(PublicationSink::new());
        KeyboardTracker::new(slots.keyboard, Keymap::default_config())
    }

    #[test]
    fn test_down_and_up_update_mask() {
        let mut kb = tracker();
        kb.handle(&KeyEvent::down("ArrowUp"));
        kb.handle(&KeyEvent::down("z"));
        assert_eq!(kb.mask(), ButtonMask::UP | ButtonMask::PRIMARY);

        kb.handle(&KeyEvent::up("ArrowUp"));
        assert_eq!(kb.mask(), ButtonMask::PRIMARY);
    }

    #[test]
    fn test_shared_bit_stays_while_other_key_held() {
        let mut kb = tracker();
        kb.handle(&KeyEvent::down("z"));
        kb.handle(&KeyEvent::down("c"));
        kb.handle(&KeyEvent::up("z"));
        assert_eq!(kb.mask(), ButtonMask::PRIMARY);
        kb.handle(&KeyEvent::up("c"));
        assert!(kb.mask().is_empty());
    }

    #[test]
    fn test_synthetic_events_are_ignored() {
        let mut kb = tracker();
        let disposition = kb.handle(&KeyEvent::down("Enter").synthetic());
        assert!(!disposition.handled);
        assert!(kb.mask().is_empty());
        assert!(!kb.is_held("Enter"));
    }

    #[test]
    fn test_prevent_default_unless_text_focused() {
        let mut kb = tracker();
        assert!(kb.handle(&KeyEvent::down(" ")).prevent_default);
        assert!(!kb.handle(&KeyEvent::down("q")).prevent_default);

        kb.set_text_input_focused(true);
        assert!(!kb.handle(&KeyEvent::down("Backspace")).prevent_default);
    }

    #[test]
    fn test_unbound_keys_are_still_tracked() {
        let mut kb = tracker();
        kb.handle(&KeyEvent::down("E"));
        assert!(kb.is_held("e"));
        assert!(kb.mask().is_empty());
    }

    #[test]
    fn test_rebinding_while_held_releases_cached_bits() {
        let mut kb = tracker();
        kb.handle(&KeyEvent::down("ArrowLeft"));
        let mut keymap = Keymap::default_config();
        keymap.unbind("ArrowLeft", ButtonMask::LEFT);
        kb.set_keymap(keymap);

        kb.handle(&KeyEvent::up("ArrowLeft"));
        assert!(kb.mask().is_empty());
    }

    #[test]
    fn test_release_all() {
        let mut kb = tracker();
        kb.handle(&KeyEvent::down("ArrowDown"));
        kb.handle(&KeyEvent::down("x"));
        kb.release_all();
        assert!(kb.mask().is_empty());
        assert!(!kb.is_held("x"));
    }
}
