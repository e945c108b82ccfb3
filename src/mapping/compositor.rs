//! Mask compositor and per-source mask slots.
//!
//! ```text
//! GamepadCollector ──► [gamepad slot]  ─┐
//! KeyboardTracker  ──► [keyboard slot] ─┼─► Compositor::canonical ──► PublicationSink
//! VirtualInput     ──► [virtual slot]  ─┘        (GAME mode only)
//! ```
//!
//! Each slot has exactly one writer: the `MaskSlot` handed out by
//! [`Compositor::new`]. The compositor itself only reads them, which keeps the
//! publish path free of locks and allocations.

use crate::engine::PublicationSink;
use crate::mapping::ButtonMask;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Input source classes feeding the compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Gamepad,
    Keyboard,
    Virtual,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Gamepad => write!(f, "Gamepad"),
            Source::Keyboard => write!(f, "Keyboard"),
            Source::Virtual => write!(f, "Virtual"),
        }
    }
}

#[derive(Debug, Default)]
struct SourceMasks {
    gamepad: AtomicU8,
    keyboard: AtomicU8,
    virtual_input: AtomicU8,
}

impl SourceMasks {
    fn cell(&self, source: Source) -> &AtomicU8 {
        match source {
            Source::Gamepad => &self.gamepad,
            Source::Keyboard => &self.keyboard,
            Source::Virtual => &self.virtual_input,
        }
    }
}

/// Write access to one source's mask. Not `Clone`: one writer per source.
#[derive(Debug)]
pub struct MaskSlot {
    masks: Arc<SourceMasks>,
    source: Source,
}

impl MaskSlot {
    pub fn get(&self) -> ButtonMask {
        ButtonMask::from_bits_truncate(self.masks.cell(self.source).load(Ordering::Acquire))
    }

    /// Replaces the whole mask.
    pub fn set(&self, mask: ButtonMask) {
        self.masks
            .cell(self.source)
            .store(mask.bits(), Ordering::Release);
    }

    /// ORs `mask` in.
    pub fn insert(&self, mask: ButtonMask) {
        self.masks
            .cell(self.source)
            .fetch_or(mask.bits(), Ordering::AcqRel);
    }

    /// ANDs `mask` out.
    pub fn remove(&self, mask: ButtonMask) {
        self.masks
            .cell(self.source)
            .fetch_and(!mask.bits(), Ordering::AcqRel);
    }

    pub fn clear(&self) {
        self.set(ButtonMask::empty());
    }
}

/// Writers for the three slots, handed out once.
#[derive(Debug)]
pub struct SourceSlots {
    pub gamepad: MaskSlot,
    pub keyboard: MaskSlot,
    pub virtual_input: MaskSlot,
}

/// Merges the source masks and publishes the result while in GAME mode.
#[derive(Debug)]
pub struct Compositor {
    masks: Arc<SourceMasks>,
    sink: PublicationSink,
    game_mode: AtomicBool,
}

impl Compositor {
    /// Creates the compositor and the only writers its slots will ever have.
    pub fn new(sink: PublicationSink) -> (Arc<Self>, SourceSlots) {
        let masks = Arc::new(SourceMasks::default());
        let slot = |source| MaskSlot {
            masks: masks.clone(),
            source,
        };
        let slots = SourceSlots {
            gamepad: slot(Source::Gamepad),
            keyboard: slot(Source::Keyboard),
            virtual_input: slot(Source::Virtual),
        };
        debug!("Created compositor with gamepad, keyboard and virtual slots");

        let compositor = Arc::new(Self {
            masks,
            sink,
            game_mode: AtomicBool::new(false),
        });
        (compositor, slots)
    }

    /// Current canonical state: the OR of the three slots.
    #[inline]
    pub fn canonical(&self) -> ButtonMask {
        let bits = self.masks.gamepad.load(Ordering::Acquire)
            | self.masks.keyboard.load(Ordering::Acquire)
            | self.masks.virtual_input.load(Ordering::Acquire);
        ButtonMask::from_bits_truncate(bits)
    }

    pub fn source_mask(&self, source: Source) -> ButtonMask {
        ButtonMask::from_bits_truncate(self.masks.cell(source).load(Ordering::Acquire))
    }

    /// Recomposes and, in GAME mode, stores the result into the sink.
    ///
    /// Idempotent; called from the render loop, the fallback timer and the
    /// engine's pre-frame hook in any order.
    #[inline]
    pub fn publish(&self) -> ButtonMask {
        let canonical = self.canonical();
        if self.game_mode.load(Ordering::SeqCst) {
            self.sink.store(canonical);
            // Lost a race with leaving GAME mode: the sink must end up cleared.
            if !self.game_mode.load(Ordering::SeqCst) {
                self.sink.clear();
            }
            trace!("Published {:#04x}", canonical.published());
        }
        canonical
    }

    pub fn is_game_mode(&self) -> bool {
        self.game_mode.load(Ordering::SeqCst)
    }

    pub(crate) fn set_game_mode(&self, enabled: bool) {
        self.game_mode.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.sink.clear();
        }
    }

    pub fn sink(&self) -> &PublicationSink {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<Compositor>, SourceSlots, PublicationSink) {
        let sink = PublicationSink::new();
        let (compositor, slots) = Compositor::new(sink.clone());
        (compositor, slots, sink)
    }

    #[test]
    fn test_canonical_is_or_of_slots() {
        let (compositor, slots, _) = setup();
        let writes = [
            (Source::Gamepad, ButtonMask::LEFT),
            (Source::Keyboard, ButtonMask::UP | ButtonMask::PRIMARY),
            (Source::Virtual, ButtonMask::SECONDARY),
            (Source::Gamepad, ButtonMask::empty()),
            (Source::Keyboard, ButtonMask::DOWN),
            (Source::Virtual, ButtonMask::LEFT | ButtonMask::PAUSE),
        ];

        for (source, mask) in writes {
            match source {
                Source::Gamepad => slots.gamepad.set(mask),
                Source::Keyboard => slots.keyboard.set(mask),
                Source::Virtual => slots.virtual_input.set(mask),
            }
            let expected = slots.gamepad.get() | slots.keyboard.get() | slots.virtual_input.get();
            assert_eq!(compositor.canonical(), expected);
            assert_eq!(compositor.publish(), expected);
        }
    }

    #[test]
    fn test_insert_and_remove_touch_only_own_slot() {
        let (compositor, slots, _) = setup();
        slots.keyboard.insert(ButtonMask::UP);
        slots.virtual_input.insert(ButtonMask::UP);
        slots.keyboard.remove(ButtonMask::UP);

        assert!(compositor.source_mask(Source::Keyboard).is_empty());
        assert_eq!(compositor.source_mask(Source::Virtual), ButtonMask::UP);
        assert_eq!(compositor.canonical(), ButtonMask::UP);
    }

    #[test]
    fn test_publish_writes_sink_only_in_game_mode() {
        let (compositor, slots, sink) = setup();
        slots.gamepad.set(ButtonMask::RIGHT);

        compositor.publish();
        assert_eq!(sink.load().bits(), 0);

        compositor.set_game_mode(true);
        compositor.publish();
        assert_eq!(sink.load().bits(), 2);

        // Redundant publishes are harmless.
        compositor.publish();
        compositor.publish();
        assert_eq!(sink.load().bits(), 2);

        compositor.set_game_mode(false);
        assert_eq!(sink.load().bits(), 0);
    }
}
