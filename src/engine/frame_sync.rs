//! Keeps the publication sink fresh relative to the engine's frame loop.
//!
//! Three triggers call [`Compositor::publish`]:
//!
//! 1. the engine's pre-frame hook, installed once the engine reports ready
//! 2. a fallback interval running independently of the engine
//! 3. the render loop (`InputSystem::poll`), outside this module
//!
//! Publishing is idempotent, so the triggers may interleave freely.

use super::{EngineAdapter, EngineError, PreFrameHook};
use crate::mapping::Compositor;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSyncSettings {
    pub discovery_attempts: u32,
    pub discovery_interval_ms: u64,
    pub fallback_interval_ms: u64,
}

impl Default for FrameSyncSettings {
    fn default() -> Self {
        Self {
            discovery_attempts: 50,
            discovery_interval_ms: 100,
            fallback_interval_ms: 8,
        }
    }
}

impl FrameSyncSettings {
    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms.max(1))
    }

    pub fn fallback_interval(&self) -> Duration {
        Duration::from_millis(self.fallback_interval_ms.max(1))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameSyncError {
    /// No tokio runtime to drive the fallback timer
    #[error("Fallback timer unavailable: {0}")]
    TimerUnavailable(String),
}

#[derive(Debug)]
pub struct FrameSync {
    cancel: CancellationToken,
    // Hook installed (or being installed) on the engine
    hooked: Arc<AtomicBool>,
    // Cleared on shutdown; the engine may keep calling the hook after that
    armed: Arc<AtomicBool>,
    discovery: JoinHandle<()>,
    fallback: JoinHandle<()>,
}

impl FrameSync {
    /// Starts hook discovery and the fallback timer on the current tokio runtime.
    pub fn start(
        compositor: Arc<Compositor>,
        engine: Arc<dyn EngineAdapter>,
        settings: FrameSyncSettings,
    ) -> Result<Self, FrameSyncError> {
        let runtime =
            Handle::try_current().map_err(|e| FrameSyncError::TimerUnavailable(e.to_string()))?;

        let cancel = CancellationToken::new();
        let hooked = Arc::new(AtomicBool::new(false));
        let armed = Arc::new(AtomicBool::new(true));

        let fallback = runtime.spawn(run_fallback(
            compositor.clone(),
            cancel.clone(),
            settings.fallback_interval(),
        ));

        let discovery = runtime.spawn(run_discovery(
            Hook {
                compositor,
                engine,
                hooked: hooked.clone(),
                armed: armed.clone(),
            },
            cancel.clone(),
            settings,
        ));

        info!(
            "Frame sync started (fallback every {:?}, up to {} hook discovery attempts)",
            settings.fallback_interval(),
            settings.discovery_attempts
        );

        Ok(Self {
            cancel,
            hooked,
            armed,
            discovery,
            fallback,
        })
    }

    /// Pre-frame hook is installed on the engine.
    pub fn is_hooked(&self) -> bool {
        self.hooked.load(Ordering::Acquire)
    }

    pub fn is_discovering(&self) -> bool {
        !self.discovery.is_finished()
    }

    /// Stops both tasks and disarms the hook.
    pub async fn shutdown(self) {
        self.armed.store(false, Ordering::Release);
        self.cancel.cancel();

        if let Err(e) = self.discovery.await {
            warn!("Hook discovery task ended abnormally: {}", e);
        }
        if let Err(e) = self.fallback.await {
            warn!("Fallback publisher ended abnormally: {}", e);
        }
        info!("Frame sync stopped");
    }
}

struct Hook {
    compositor: Arc<Compositor>,
    engine: Arc<dyn EngineAdapter>,
    hooked: Arc<AtomicBool>,
    armed: Arc<AtomicBool>,
}

impl Hook {
    /// Registers the pre-frame hook unless one is already installed.
    fn install(&self) -> Result<bool, EngineError> {
        if self
            .hooked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }

        let compositor = self.compositor.clone();
        let armed = self.armed.clone();
        let hook: PreFrameHook = Arc::new(move || {
            if armed.load(Ordering::Acquire) {
                compositor.publish();
            }
        });

        if let Err(e) = self.engine.register_pre_frame_hook(hook) {
            self.hooked.store(false, Ordering::Release);
            return Err(e);
        }
        Ok(true)
    }
}

async fn run_discovery(hook: Hook, cancel: CancellationToken, settings: FrameSyncSettings) {
    let mut ticker = interval(settings.discovery_interval());

    for attempt in 1..=settings.discovery_attempts {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Hook discovery cancelled");
                return;
            }
            _ = ticker.tick() => {}
        }

        if !hook.engine.is_ready() {
            trace!("Engine not ready (attempt {}/{})", attempt, settings.discovery_attempts);
            continue;
        }

        match hook.install() {
            Ok(true) => {
                info!("Pre-frame hook installed after {} attempts", attempt);
                return;
            }
            Ok(false) => {
                debug!("Pre-frame hook already installed");
                return;
            }
            Err(e) => warn!("Failed to install pre-frame hook: {}", e),
        }
    }

    warn!(
        "Engine not hooked after {} attempts, relying on fallback timer",
        settings.discovery_attempts
    );
}

async fn run_fallback(compositor: Arc<Compositor>, cancel: CancellationToken, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                compositor.publish();
            }
        }
    }
    debug!("Fallback publisher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{HeadlessEngine, Keystroke, PublicationSink};
    use crate::mapping::ButtonMask;
    use std::sync::atomic::AtomicU32;
    use tokio::time::sleep;

    fn settings(attempts: u32) -> FrameSyncSettings {
        FrameSyncSettings {
            discovery_attempts: attempts,
            ..Default::default()
        }
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let (compositor, _slots) = Compositor::new(PublicationSink::new());
        let engine = Arc::new(HeadlessEngine::new(PublicationSink::new()));
        let result = FrameSync::start(compositor, engine, FrameSyncSettings::default());
        assert!(matches!(result, Err(FrameSyncError::TimerUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hook_installed_once_engine_ready() {
        let sink = PublicationSink::new();
        let (compositor, slots) = Compositor::new(sink.clone());
        let engine = Arc::new(HeadlessEngine::booting(sink.clone()));

        let sync = FrameSync::start(compositor.clone(), engine.clone(), settings(50)).unwrap();
        sleep(Duration::from_millis(250)).await;
        assert!(!sync.is_hooked());

        engine.set_ready(true);
        sleep(Duration::from_millis(150)).await;
        assert!(sync.is_hooked());
        assert!(engine.has_hook());
        assert!(!sync.is_discovering());

        compositor.set_game_mode(true);
        slots.keyboard.set(ButtonMask::SECONDARY);
        assert_eq!(engine.run_frame().bits(), 32);

        sync.shutdown().await;
        slots.keyboard.set(ButtonMask::LEFT);
        // Disarmed hook no longer publishes.
        assert_eq!(engine.run_frame().bits(), 32);
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_gives_up_after_attempts() {
        let sink = PublicationSink::new();
        let (compositor, slots) = Compositor::new(sink.clone());
        let engine = Arc::new(HeadlessEngine::booting(sink.clone()));

        let sync = FrameSync::start(compositor.clone(), engine, settings(3)).unwrap();
        sleep(Duration::from_millis(500)).await;
        assert!(!sync.is_discovering());
        assert!(!sync.is_hooked());

        // Fallback keeps publishing.
        compositor.set_game_mode(true);
        slots.gamepad.set(ButtonMask::UP);
        sleep(Duration::from_millis(20)).await;
        assert_eq!(sink.load().bits(), 4);

        sync.shutdown().await;
    }

    struct FlakyEngine {
        rejections: AtomicU32,
        registrations: AtomicU32,
    }

    impl EngineAdapter for FlakyEngine {
        fn is_ready(&self) -> bool {
            true
        }

        fn register_pre_frame_hook(&self, _hook: PreFrameHook) -> Result<(), EngineError> {
            if self.rejections.load(Ordering::SeqCst) > 0 {
                self.rejections.fetch_sub(1, Ordering::SeqCst);
                return Err(EngineError::HookRejected("draw callback missing".into()));
            }
            self.registrations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn dispatch_keystroke(&self, _keystroke: Keystroke) -> Result<(), EngineError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_registration_releases_guard() {
        let (compositor, _slots) = Compositor::new(PublicationSink::new());
        let engine = Arc::new(FlakyEngine {
            rejections: AtomicU32::new(2),
            registrations: AtomicU32::new(0),
        });

        let sync = FrameSync::start(compositor, engine.clone(), settings(10)).unwrap();
        sleep(Duration::from_millis(400)).await;

        assert!(sync.is_hooked());
        assert_eq!(engine.registrations.load(Ordering::SeqCst), 1);
        sync.shutdown().await;
    }
}
