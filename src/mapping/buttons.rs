//! Logical button bits shared by every input source.
//!
//! The low six bits match the layout the engine polls each frame
//! (`LEFT=1, RIGHT=2, UP=4, DOWN=8, PRIMARY=16, SECONDARY=32`).
//! `PAUSE` lives above that range: it is tracked in the canonical state but
//! delivered to the engine as a keystroke, never as a sustained bit.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Set of logical buttons. Combine with bitwise OR: `ButtonMask::LEFT | ButtonMask::UP`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ButtonMask: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const UP = 1 << 2;
        const DOWN = 1 << 3;
        const PRIMARY = 1 << 4;
        const SECONDARY = 1 << 5;
        const PAUSE = 1 << 6;
    }
}

impl ButtonMask {
    /// Bits the engine is allowed to see.
    pub const PUBLISHED: ButtonMask = ButtonMask::LEFT
        .union(ButtonMask::RIGHT)
        .union(ButtonMask::UP)
        .union(ButtonMask::DOWN)
        .union(ButtonMask::PRIMARY)
        .union(ButtonMask::SECONDARY);

    pub const DIRECTIONS: ButtonMask = ButtonMask::LEFT
        .union(ButtonMask::RIGHT)
        .union(ButtonMask::UP)
        .union(ButtonMask::DOWN);

    /// Strips everything the sink must not carry.
    #[inline]
    pub fn published(self) -> u8 {
        (self & Self::PUBLISHED).bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_do_not_overlap() {
        let all = [
            ButtonMask::LEFT,
            ButtonMask::RIGHT,
            ButtonMask::UP,
            ButtonMask::DOWN,
            ButtonMask::PRIMARY,
            ButtonMask::SECONDARY,
            ButtonMask::PAUSE,
        ];
        let mut seen = 0u8;
        for bit in all {
            assert_eq!(bit.bits().count_ones(), 1);
            assert_eq!(seen & bit.bits(), 0);
            seen |= bit.bits();
        }
        assert_eq!(seen, ButtonMask::all().bits());
    }

    #[test]
    fn test_engine_layout() {
        assert_eq!(ButtonMask::LEFT.bits(), 1);
        assert_eq!(ButtonMask::RIGHT.bits(), 2);
        assert_eq!(ButtonMask::UP.bits(), 4);
        assert_eq!(ButtonMask::DOWN.bits(), 8);
        assert_eq!(ButtonMask::PRIMARY.bits(), 16);
        assert_eq!(ButtonMask::SECONDARY.bits(), 32);
        assert_eq!(ButtonMask::PUBLISHED.bits(), 63);
    }

    #[test]
    fn test_pause_never_published() {
        let mask = ButtonMask::PAUSE | ButtonMask::UP;
        assert_eq!(mask.published(), 4);
    }
}
