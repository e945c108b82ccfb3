//! On-screen buttons.
//!
//! In GAME mode a virtual key drives its button bit directly. In UI mode it stands
//! in for the physical key it aliases, so focus navigation treats a tap on the
//! on-screen d-pad like an arrow key.

use super::ControllerError;
use crate::mapping::keymap::keys;
use crate::mapping::{ButtonMask, MaskSlot, Mode};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualKey {
    Left,
    Right,
    Up,
    Down,
    Primary,
    Secondary,
    Confirm,
}

impl VirtualKey {
    pub const ALL: [VirtualKey; 7] = [
        VirtualKey::Left,
        VirtualKey::Right,
        VirtualKey::Up,
        VirtualKey::Down,
        VirtualKey::Primary,
        VirtualKey::Secondary,
        VirtualKey::Confirm,
    ];

    /// Button driven in GAME mode
    pub fn button(self) -> ButtonMask {
        match self {
            VirtualKey::Left => ButtonMask::LEFT,
            VirtualKey::Right => ButtonMask::RIGHT,
            VirtualKey::Up => ButtonMask::UP,
            VirtualKey::Down => ButtonMask::DOWN,
            VirtualKey::Primary => ButtonMask::PRIMARY,
            VirtualKey::Secondary => ButtonMask::SECONDARY,
            VirtualKey::Confirm => ButtonMask::PAUSE,
        }
    }

    /// Physical key impersonated in UI mode
    pub fn ui_alias(self) -> &'static str {
        match self {
            VirtualKey::Left => keys::ARROW_LEFT,
            VirtualKey::Right => keys::ARROW_RIGHT,
            VirtualKey::Up => keys::ARROW_UP,
            VirtualKey::Down => keys::ARROW_DOWN,
            VirtualKey::Primary => "z",
            VirtualKey::Secondary => "x",
            VirtualKey::Confirm => keys::ENTER,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VirtualKey::Left => "left",
            VirtualKey::Right => "right",
            VirtualKey::Up => "up",
            VirtualKey::Down => "down",
            VirtualKey::Primary => "primary",
            VirtualKey::Secondary => "secondary",
            VirtualKey::Confirm => "confirm",
        }
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VirtualKey {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VirtualKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ControllerError::UnknownVirtualKey(s.to_string()))
    }
}

/// Sole writer of the virtual slot
#[derive(Debug)]
pub struct VirtualInput {
    slot: MaskSlot,
    // Keys held in UI mode, by the physical key they alias
    aliases: HashSet<&'static str>,
}

impl VirtualInput {
    pub fn new(slot: MaskSlot) -> Self {
        Self {
            slot,
            aliases: HashSet::new(),
        }
    }

    /// Returns true when the virtual mask changed and should be published.
    pub fn press(&mut self, key: VirtualKey, mode: Mode) -> bool {
        debug!("Virtual key {} pressed in {} mode", key, mode);
        match mode {
            Mode::Game => {
                self.slot.insert(key.button());
                true
            }
            Mode::Ui => {
                self.aliases.insert(key.ui_alias());
                false
            }
        }
    }

    pub fn release(&mut self, key: VirtualKey, mode: Mode) -> bool {
        debug!("Virtual key {} released in {} mode", key, mode);
        match mode {
            Mode::Game => {
                self.slot.remove(key.button());
                true
            }
            Mode::Ui => {
                self.aliases.remove(key.ui_alias());
                false
            }
        }
    }

    pub fn is_alias_held(&self, key: &str) -> bool {
        self.aliases.contains(key)
    }

    pub fn mask(&self) -> ButtonMask {
        self.slot.get()
    }

    /// Drops every held virtual key in both modes.
    pub fn release_all(&mut self) {
        self.aliases.clear();
        self.slot.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PublicationSink;
    use crate::mapping::Compositor;

    fn virtual_input() -> VirtualInput {
        let (_, slots) = Compositor::new(PublicationSink::new());
        VirtualInput::new(slots.virtual_input)
    }

    #[test]
    fn test_game_mode_drives_bits() {
        let mut vi = virtual_input();
        assert!(vi.press(VirtualKey::Left, Mode::Game));
        vi.press(VirtualKey::Confirm, Mode::Game);
        assert_eq!(vi.mask(), ButtonMask::LEFT | ButtonMask::PAUSE);

        vi.release(VirtualKey::Left, Mode::Game);
        assert_eq!(vi.mask(), ButtonMask::PAUSE);
    }

    #[test]
    fn test_ui_mode_holds_aliases() {
        let mut vi = virtual_input();
        assert!(!vi.press(VirtualKey::Down, Mode::Ui));
        assert!(vi.is_alias_held("ArrowDown"));
        assert!(vi.mask().is_empty());

        vi.release(VirtualKey::Down, Mode::Ui);
        assert!(!vi.is_alias_held("ArrowDown"));
    }

    #[test]
    fn test_release_all_clears_both() {
        let mut vi = virtual_input();
        vi.press(VirtualKey::Primary, Mode::Game);
        vi.press(VirtualKey::Secondary, Mode::Ui);
        vi.release_all();
        assert!(vi.mask().is_empty());
        assert!(!vi.is_alias_held("x"));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Confirm".parse::<VirtualKey>().unwrap(), VirtualKey::Confirm);
        assert!("jump".parse::<VirtualKey>().is_err());
    }
}
