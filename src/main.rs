use color_eyre::{eyre::eyre, Result};
use pocket8_input::controller::{GamepadPoller, GamepadSource, GilrsSource, NoGamepad};
use pocket8_input::engine::{FrameSync, HeadlessEngine, PublicationSink};
use pocket8_input::events::NavEvent;
use pocket8_input::mapping::Mode;
use pocket8_input::persistence::{ConfigPortal, ConfigStore};
use pocket8_input::InputSystem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let store = ConfigStore::default_location();
    let settings = store.load().await;
    let portal = Arc::new(ConfigPortal::new(settings.clone()));

    let cancel = CancellationToken::new();
    let persist_handle = store
        .clone()
        .spawn_persist_task(portal.subscribe(), cancel.clone());

    let sink = PublicationSink::new();
    let engine = Arc::new(HeadlessEngine::new(sink.clone()));
    let system = InputSystem::new(portal.subscribe(), sink.clone(), engine.clone());

    let frame_sync = FrameSync::start(system.compositor(), engine.clone(), settings.frame_sync)
        .map_err(|e| eyre!("Failed to start frame sync: {}", e))?;

    let switcher = system.clone();
    let _mode_listener = system.subscribe(move |event, data| {
        debug!("UI event {} {:?}", event, data);
        match (switcher.mode(), event) {
            (Mode::Ui, NavEvent::Confirm) => switcher.set_mode(Mode::Game),
            (Mode::Game, NavEvent::Menu) => switcher.set_mode(Mode::Ui),
            _ => {}
        }
    });

    let running = Arc::new(AtomicBool::new(true));
    let render_loop = spawn_render_loop(
        system.clone(),
        engine.clone(),
        portal.clone(),
        running.clone(),
    )?;

    info!("Input subsystem running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for Ctrl-C: {}", e))?;
    info!("Shutting down");

    running.store(false, Ordering::Release);
    if render_loop.join().is_err() {
        error!("Render loop panicked");
    }
    system.shutdown();
    frame_sync.shutdown().await;

    cancel.cancel();
    if let Err(e) = persist_handle.await {
        warn!("Persist task ended abnormally: {}", e);
    }
    if let Err(e) = store.save(&portal.snapshot()).await {
        error!("Failed to save input settings: {}", e);
    }

    Ok(())
}

/// Render loop: polls the gamepad, ticks the input system and runs one engine frame.
fn spawn_render_loop(
    system: InputSystem,
    engine: Arc<HeadlessEngine>,
    portal: Arc<ConfigPortal>,
    running: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("render-loop".into())
        .spawn(move || {
            let mut settings = portal.subscribe();
            let current = settings.borrow_and_update().clone();

            // gilrs is created on this thread and never leaves it
            let source: Box<dyn GamepadSource> = match GilrsSource::new() {
                Ok(source) => Box::new(source),
                Err(e) => {
                    warn!("{}, continuing without gamepad", e);
                    Box::new(NoGamepad)
                }
            };
            let mut poller = GamepadPoller::create(source, current.gamepad.deadzone).initialize();
            let mut period = Duration::from_millis(current.poll_interval_ms.max(1));
            let mut last_published = 0u8;

            info!("Render loop started with {:?} period", period);
            while running.load(Ordering::Acquire) {
                if settings.has_changed().unwrap_or(false) {
                    let updated = settings.borrow_and_update().clone();
                    poller.set_deadzone(updated.gamepad.deadzone);
                    period = Duration::from_millis(updated.poll_interval_ms.max(1));
                }

                let pad = *poller.poll();
                system.poll(tokio::time::Instant::now(), &pad);

                let frame = engine.run_frame();
                if frame.bits() != last_published {
                    debug!("Engine frame {} reads {:#04x}", engine.frames(), frame.bits());
                    last_published = frame.bits();
                }
                for keystroke in engine.take_keystrokes() {
                    info!("Engine received {:?} {}", keystroke.kind, keystroke.key);
                }

                thread::sleep(period);
            }
            info!("Render loop stopped");
        })
        .map_err(|e| eyre!("Failed to spawn render loop: {}", e))
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
