//! Unified control input for a handheld game runtime.
//!
//! Keyboard, gamepad and on-screen buttons are merged into one canonical button
//! state. In GAME mode that state is published as a bitmask the engine reads every
//! frame; in UI mode it becomes a stream of navigation events.
//!
//! ```text
//! keyboard ─┐
//! gamepad  ─┼─► Compositor ─► ModeMachine ─┬─► PublicationSink ─► engine
//! virtual  ─┘                              └─► EventBus ─► FocusNavigator
//! ```

pub mod controller;
pub mod engine;
pub mod events;
pub mod input_system;
pub mod mapping;
pub mod persistence;
pub mod ui;

pub use input_system::InputSystem;
