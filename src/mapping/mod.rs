//! Mapping from physical inputs to logical buttons and from logical buttons to
//! mode-specific output.
//!
//! ```text
//! Keymap ──► per-source masks ──► Compositor ──► ModeMachine
//!                                     │               │
//!                                  GAME: sink      UI: events
//! ```

pub mod buttons;
pub mod compositor;
pub mod error;
pub mod keymap;
pub mod mode;

pub use buttons::ButtonMask;
pub use compositor::{Compositor, MaskSlot, Source, SourceSlots};
pub use error::MappingError;
pub use keymap::{KeyCode, Keymap};
pub use mode::{Mode, ModeMachine, RepeatTiming, StepOutcome, TickInput};
