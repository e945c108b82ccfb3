//! Engine adapter without a real engine behind it.
//!
//! Simulates the parts of the engine the input subsystem talks to: a boot phase,
//! one pre-frame hook slot, a keystroke queue and a frame loop that reads the
//! publication sink. Used by the binary and by tests.

use super::{EngineAdapter, EngineError, Keystroke, PreFrameHook, PublicationSink, PublishedState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

pub struct HeadlessEngine {
    sink: PublicationSink,
    ready: AtomicBool,
    hook: Mutex<Option<PreFrameHook>>,
    keystrokes: Mutex<Vec<Keystroke>>,
    frames: AtomicU64,
}

impl std::fmt::Debug for HeadlessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessEngine")
            .field("ready", &self.is_ready())
            .field("hooked", &self.has_hook())
            .field("frames", &self.frames())
            .finish()
    }
}

impl HeadlessEngine {
    /// Engine that is ready immediately.
    pub fn new(sink: PublicationSink) -> Self {
        let engine = Self::booting(sink);
        engine.set_ready(true);
        engine
    }

    /// Engine that reports not ready until [`set_ready`](Self::set_ready) is called.
    pub fn booting(sink: PublicationSink) -> Self {
        Self {
            sink,
            ready: AtomicBool::new(false),
            hook: Mutex::new(None),
            keystrokes: Mutex::new(Vec::new()),
            frames: AtomicU64::new(0),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        if ready != self.ready.swap(ready, Ordering::AcqRel) {
            info!("Headless engine ready: {}", ready);
        }
    }

    /// Runs one frame: pre-frame hook, then the input read.
    pub fn run_frame(&self) -> PublishedState {
        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.sink.load()
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn has_hook(&self) -> bool {
        self.hook.lock().is_some()
    }

    /// Drains the keystrokes received so far.
    pub fn take_keystrokes(&self) -> Vec<Keystroke> {
        std::mem::take(&mut *self.keystrokes.lock())
    }
}

impl EngineAdapter for HeadlessEngine {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn register_pre_frame_hook(&self, hook: PreFrameHook) -> Result<(), EngineError> {
        if !self.is_ready() {
            return Err(EngineError::NotReady);
        }
        let mut slot = self.hook.lock();
        if slot.is_some() {
            return Err(EngineError::HookRejected("hook already registered".into()));
        }
        *slot = Some(hook);
        debug!("Pre-frame hook registered");
        Ok(())
    }

    fn dispatch_keystroke(&self, keystroke: Keystroke) -> Result<(), EngineError> {
        if !self.is_ready() {
            return Err(EngineError::NotReady);
        }
        if !keystroke.synthetic {
            return Err(EngineError::KeystrokeRejected(format!(
                "'{}' is not marked synthetic",
                keystroke.key
            )));
        }
        debug!("Engine received keystroke {:?} {:?}", keystroke.key, keystroke.kind);
        self.keystrokes.lock().push(keystroke);
        Ok(())
    }
}
