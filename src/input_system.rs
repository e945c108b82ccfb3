//! Input system: one tick of the control-input pipeline.
//!
//! ```text
//!            ┌──────────────────── InputCore (Mutex) ────────────────────┐
//! poll ────► │ settings refresh ─► collectors ─► TickInput ─► ModeMachine │
//! handle_key │                        │                           │      │
//! virtual_*  └────────────────────────┼───────────────────────────┼──────┘
//!                                     ▼                           ▼
//!                         Compositor::publish          events / pause edge
//!                           (lock free)                (dispatched unlocked)
//! ```
//!
//! The handle is cheap to clone and can be shared between the render loop, host
//! event handlers and event listeners. Listeners may call back into the system.

use crate::controller::{
    GamepadCollector, GamepadState, KeyDisposition, KeyEvent, KeyEventKind, KeyboardTracker,
    VirtualInput, VirtualKey,
};
use crate::engine::{EngineAdapter, PublicationSink};
use crate::events::{EventBus, EventData, NavEvent, Subscription};
use crate::mapping::keymap::keys;
use crate::mapping::mode::Emitted;
use crate::mapping::{ButtonMask, Compositor, KeyCode, Mode, ModeMachine, TickInput};
use crate::persistence::{InputSettings, UiKeyAliases};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct InputSystem {
    shared: Arc<Shared>,
}

struct Shared {
    core: Mutex<InputCore>,
    compositor: Arc<Compositor>,
    bus: EventBus,
    engine: Arc<dyn EngineAdapter>,
}

struct InputCore {
    gamepad: GamepadCollector,
    keyboard: KeyboardTracker,
    virtual_input: VirtualInput,
    machine: ModeMachine,
    settings: watch::Receiver<InputSettings>,
    swap_buttons: bool,
    ui_keys: UiKeyAliases,
    last_gamepad: GamepadState,
}

impl fmt::Debug for InputSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSystem")
            .field("mode", &self.mode())
            .field("canonical", &self.shared.compositor.canonical())
            .field("bus", &self.shared.bus)
            .finish()
    }
}

impl InputSystem {
    pub fn new(
        settings: watch::Receiver<InputSettings>,
        sink: PublicationSink,
        engine: Arc<dyn EngineAdapter>,
    ) -> Self {
        let (compositor, slots) = Compositor::new(sink);
        let current = settings.borrow().clone();

        let core = InputCore {
            gamepad: GamepadCollector::new(slots.gamepad),
            keyboard: KeyboardTracker::new(slots.keyboard, current.keymap),
            virtual_input: VirtualInput::new(slots.virtual_input),
            machine: ModeMachine::new(current.repeat, current.swap_cooldown_ticks),
            settings,
            swap_buttons: current.swap_buttons,
            ui_keys: current.ui_keys,
            last_gamepad: GamepadState::default(),
        };
        info!("Input system created in {} mode", core.machine.mode());

        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                compositor,
                bus: EventBus::new(),
                engine,
            }),
        }
    }

    /// Render loop callback: runs one tick with the latest gamepad snapshot.
    pub fn poll(&self, now: Instant, gamepad: &GamepadState) {
        let mut events: Vec<Emitted> = Vec::new();
        let outcome = {
            let mut core = self.shared.core.lock();
            core.refresh_settings();

            let swapped = core.swap_buttons;
            core.gamepad.update(gamepad, swapped);
            core.last_gamepad = *gamepad;

            let input = core.tick_input(self.shared.compositor.canonical());
            core.machine.step(&input, now, &mut events)
        };

        self.shared.compositor.publish();

        for (event, data) in events {
            debug!("Emitting {}", event);
            self.shared.bus.emit(event, data);
        }
        if outcome.pause_requested {
            self.dispatch_pause();
        }
    }

    /// Host key event. Synthetic events are ignored.
    pub fn handle_key(&self, event: &KeyEvent) -> KeyDisposition {
        let disposition = {
            let mut core = self.shared.core.lock();
            core.refresh_settings();
            core.keyboard.handle(event)
        };
        if disposition.handled {
            self.shared.compositor.publish();
        }
        disposition
    }

    pub fn virtual_press(&self, key: VirtualKey) {
        let changed = {
            let mut core = self.shared.core.lock();
            let mode = core.machine.mode();
            core.virtual_input.press(key, mode)
        };
        if changed {
            self.shared.compositor.publish();
        }
    }

    pub fn virtual_release(&self, key: VirtualKey) {
        let changed = {
            let mut core = self.shared.core.lock();
            let mode = core.machine.mode();
            core.virtual_input.release(key, mode)
        };
        if changed {
            self.shared.compositor.publish();
        }
    }

    /// Switches between UI and GAME.
    ///
    /// Press history and every virtual button are dropped. A PAUSE already held
    /// when entering GAME does not request a pause until it is pressed again.
    /// Leaving GAME zeroes the publication sink.
    pub fn set_mode(&self, mode: Mode) {
        {
            let mut core = self.shared.core.lock();
            let pause_held = self.shared.compositor.canonical().contains(ButtonMask::PAUSE);
            core.machine.set_mode(mode, pause_held);
            core.virtual_input.release_all();
            self.shared.compositor.set_game_mode(mode == Mode::Game);
        }
        self.shared.compositor.publish();
    }

    pub fn mode(&self) -> Mode {
        self.shared.core.lock().machine.mode()
    }

    pub fn set_text_input_focused(&self, focused: bool) {
        self.shared.core.lock().keyboard.set_text_input_focused(focused);
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(NavEvent, Option<&EventData>) + Send + Sync + 'static,
    {
        self.shared.bus.subscribe(listener)
    }

    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }

    /// Lock-free publish, same as the frame hook and fallback timer.
    pub fn publish(&self) -> ButtonMask {
        self.shared.compositor.publish()
    }

    pub fn compositor(&self) -> Arc<Compositor> {
        self.shared.compositor.clone()
    }

    pub fn canonical(&self) -> ButtonMask {
        self.shared.compositor.canonical()
    }

    /// Releases everything and stops publishing.
    pub fn shutdown(&self) {
        let mut core = self.shared.core.lock();
        core.machine.clear();
        core.keyboard.release_all();
        core.virtual_input.release_all();
        core.gamepad.clear();
        self.shared.compositor.set_game_mode(false);
        info!("Input system shut down");
    }

    fn dispatch_pause(&self) {
        for kind in [KeyEventKind::Down, KeyEventKind::Up] {
            let keystroke = KeyEvent {
                key: KeyCode::new(keys::ENTER),
                kind,
                synthetic: true,
            };
            if let Err(e) = self.shared.engine.dispatch_keystroke(keystroke) {
                warn!("Failed to dispatch pause keystroke: {}", e);
                return;
            }
        }
        debug!("Pause keystroke dispatched");
    }
}

impl InputCore {
    /// Re-caches settings when the portal published a change since the last tick.
    fn refresh_settings(&mut self) {
        if !self.settings.has_changed().unwrap_or(false) {
            return;
        }
        let settings = self.settings.borrow_and_update().clone();
        debug!("Applying updated input settings");

        self.machine.set_timing(settings.repeat);
        self.machine
            .set_swap_cooldown_ticks(settings.swap_cooldown_ticks);
        if settings.swap_buttons != self.swap_buttons {
            self.swap_buttons = settings.swap_buttons;
            self.machine.start_swap_cooldown();
        }
        self.keyboard.set_keymap(settings.keymap);
        self.ui_keys = settings.ui_keys;
    }

    fn held(&self, key: &str) -> bool {
        self.keyboard.is_held(key) || self.virtual_input.is_alias_held(key)
    }

    fn any_held(&self, aliases: &[KeyCode]) -> bool {
        aliases.iter().any(|key| self.held(key.as_str()))
    }

    fn tick_input(&self, canonical: ButtonMask) -> TickInput {
        let pad = &self.last_gamepad;
        let swapped = self.swap_buttons;

        TickInput {
            up: canonical.contains(ButtonMask::UP) || self.held(keys::ARROW_UP),
            down: canonical.contains(ButtonMask::DOWN) || self.held(keys::ARROW_DOWN),
            left: canonical.contains(ButtonMask::LEFT) || self.held(keys::ARROW_LEFT),
            right: canonical.contains(ButtonMask::RIGHT) || self.held(keys::ARROW_RIGHT),
            confirm: pad.confirm(swapped) || self.any_held(&self.ui_keys.confirm),
            back: pad.back(swapped) || self.any_held(&self.ui_keys.back),
            wiggle: pad.y || self.any_held(&self.ui_keys.wiggle),
            menu: pad.menu() || self.any_held(&self.ui_keys.menu),
            pause: canonical.contains(ButtonMask::PAUSE),
            text_input_focused: self.keyboard.text_input_focused(),
        }
    }
}
