//! Publication sink: the cell the engine reads at the start of every frame.
//!
//! One writer (the compositor) and one reader (the engine adapter). Every write is
//! a single atomic store of the whole state, so a reader can never observe a
//! partially updated value.

use crate::mapping::{ButtonMask, MappingError};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Shared handle to the published button byte.
#[derive(Debug, Clone, Default)]
pub struct PublicationSink {
    cell: Arc<AtomicU8>,
}

impl PublicationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the engine-visible part of `mask`.
    #[inline]
    pub fn store(&self, mask: ButtonMask) {
        self.cell.store(mask.published(), Ordering::SeqCst);
    }

    #[inline]
    pub fn clear(&self) {
        self.cell.store(0, Ordering::SeqCst);
    }

    /// Engine side read.
    #[inline]
    pub fn load(&self) -> PublishedState {
        PublishedState(self.cell.load(Ordering::Acquire))
    }
}

/// Value of the sink, always within 0..=63.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishedState(u8);

impl PublishedState {
    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn buttons(self) -> ButtonMask {
        ButtonMask::from_bits_truncate(self.0)
    }

    pub fn is_pressed(self, button: ButtonMask) -> bool {
        self.buttons().contains(button)
    }
}

impl TryFrom<u8> for PublishedState {
    type Error = MappingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value & !ButtonMask::PUBLISHED.bits() != 0 {
            return Err(MappingError::UnknownBits(value));
        }
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_masks_pause() {
        let sink = PublicationSink::new();
        sink.store(ButtonMask::PAUSE | ButtonMask::PRIMARY);
        assert_eq!(sink.load().bits(), 16);
        assert!(sink.load().is_pressed(ButtonMask::PRIMARY));
    }

    #[test]
    fn test_clones_share_the_cell() {
        let writer = PublicationSink::new();
        let reader = writer.clone();
        writer.store(ButtonMask::LEFT | ButtonMask::DOWN);
        assert_eq!(reader.load().bits(), 9);
        writer.clear();
        assert_eq!(reader.load().bits(), 0);
    }

    #[test]
    fn test_out_of_range_values_are_invalid() {
        assert!(PublishedState::try_from(63).is_ok());
        assert!(matches!(
            PublishedState::try_from(64),
            Err(MappingError::UnknownBits(64))
        ));
    }
}
