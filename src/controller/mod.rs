//! Source collectors for the three input classes
//!
//! Each collector owns exactly one mask slot of the compositor:
//!
//! 1. [`gamepad`] - polls the first connected gamepad once per tick
//! 2. [`keyboard`] - tracks raw key events and the keys currently held
//! 3. [`virtual_input`] - on-screen buttons driven by pointer/touch handlers
//!
//! # Architecture
//!
//! ```text
//! gilrs ──► GamepadPoller ──► GamepadState ──► GamepadCollector ─┐
//! key events ──────────────► KeyboardTracker ────────────────────┼─► mask slots
//! touch events ────────────► VirtualInput ───────────────────────┘
//! ```

pub mod gamepad;
pub mod keyboard;
pub mod virtual_input;

pub use gamepad::{
    GamepadCollector, GamepadPoller, GamepadSource, GamepadState, GilrsSource, NoGamepad, RawPad,
};
pub use keyboard::{KeyDisposition, KeyEvent, KeyEventKind, KeyboardTracker};
pub use virtual_input::{VirtualInput, VirtualKey};

/// Errors raised by the source collectors
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The gamepad backend could not be brought up
    #[error("Failed to initialize gamepad backend: {0}")]
    InitializationError(String),

    /// Name of an on-screen button that does not exist
    #[error("Unknown virtual key: {0}")]
    UnknownVirtualKey(String),
}
