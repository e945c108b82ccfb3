//! Seam to the external real-time engine.
//!
//! The engine runs on its own schedule. It reads the [`PublicationSink`] once per
//! frame, optionally calls a pre-frame hook right before that read, and accepts
//! synthetic keystrokes (the pause key).

pub mod frame_sync;
pub mod headless;
pub mod sink;

pub use frame_sync::{FrameSync, FrameSyncError, FrameSyncSettings};
pub use headless::HeadlessEngine;
pub use sink::{PublicationSink, PublishedState};

use crate::controller::KeyEvent;
use std::sync::Arc;

/// Called by the engine at the start of every frame, before it reads input.
///
/// Must not block: it runs inside the engine's frame callback.
pub type PreFrameHook = Arc<dyn Fn() + Send + Sync>;

/// Keystroke injected into the engine. Always carries `synthetic == true`.
pub type Keystroke = KeyEvent;

/// Operations the input subsystem needs from the engine
pub trait EngineAdapter: Send + Sync {
    /// Whether the engine finished booting and accepts hooks and keystrokes.
    fn is_ready(&self) -> bool;

    fn register_pre_frame_hook(&self, hook: PreFrameHook) -> Result<(), EngineError>;

    fn dispatch_keystroke(&self, keystroke: Keystroke) -> Result<(), EngineError>;
}

/// Errors reported by an engine adapter
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine is not ready")]
    NotReady,

    #[error("Engine rejected the pre-frame hook: {0}")]
    HookRejected(String),

    #[error("Engine rejected keystroke: {0}")]
    KeystrokeRejected(String),
}
