//! Mode state machine: turns per-tick input levels into discrete events (UI mode)
//! or a pause edge (GAME mode).
//!
//! ```text
//!            set_mode(Game)
//!   ┌────┐ ─────────────────► ┌──────┐
//!   │ UI │                    │ GAME │
//!   └────┘ ◄───────────────── └──────┘
//!            set_mode(Ui)
//!
//!   UI:   directions ──► nav-* with delay + repeat
//!         face/keys  ──► confirm / back / wiggle (once per press)
//!   GAME: PAUSE bit  ──► rising edge reported to the caller
//!   both: menu       ──► once per press
//! ```
//!
//! Every switch clears the press-state records so a button held across the
//! boundary cannot leave a record behind.

use crate::events::{EventData, NavEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

/// Application input mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Ui,
    Game,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Ui => write!(f, "UI"),
            Mode::Game => write!(f, "GAME"),
        }
    }
}

/// Key repeat timing for held directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatTiming {
    pub initial_delay_ms: u64,
    pub interval_ms: u64,
}

impl Default for RepeatTiming {
    fn default() -> Self {
        Self {
            initial_delay_ms: 400,
            interval_ms: 100,
        }
    }
}

impl RepeatTiming {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// History of one pressed event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressRecord {
    pub pressed: bool,
    pub start: Instant,
    pub last_repeat: Instant,
}

impl PressRecord {
    fn new(now: Instant) -> Self {
        Self {
            pressed: true,
            start: now,
            last_repeat: now,
        }
    }
}

/// Resolved input levels for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub confirm: bool,
    pub back: bool,
    pub wiggle: bool,
    pub menu: bool,
    /// PAUSE bit of the canonical state
    pub pause: bool,
    /// A text entry field currently owns focus
    pub text_input_focused: bool,
}

/// What a tick produced besides events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Rising edge of PAUSE while in GAME mode
    pub pause_requested: bool,
}

/// Emitted event with its optional data
pub type Emitted = (NavEvent, Option<EventData>);

#[derive(Debug)]
pub struct ModeMachine {
    mode: Mode,
    records: [Option<PressRecord>; NavEvent::COUNT],
    timing: RepeatTiming,
    swap_cooldown: u32,
    swap_cooldown_ticks: u32,
    pause_latched: bool,
}

impl ModeMachine {
    pub fn new(timing: RepeatTiming, swap_cooldown_ticks: u32) -> Self {
        Self {
            mode: Mode::Ui,
            records: [None; NavEvent::COUNT],
            timing,
            swap_cooldown: 0,
            swap_cooldown_ticks,
            pause_latched: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches mode and drops all press history.
    ///
    /// `pause_held` is the PAUSE level at the moment of the switch. It seeds the
    /// pause latch so only a press that starts in GAME mode requests a pause.
    pub fn set_mode(&mut self, mode: Mode, pause_held: bool) {
        if self.mode != mode {
            info!("Input mode switched: {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        self.records = [None; NavEvent::COUNT];
        self.pause_latched = pause_held;
    }

    pub fn set_timing(&mut self, timing: RepeatTiming) {
        self.timing = timing;
    }

    pub fn set_swap_cooldown_ticks(&mut self, ticks: u32) {
        self.swap_cooldown_ticks = ticks;
    }

    /// Called when the button swap setting changed under a possibly held button.
    pub fn start_swap_cooldown(&mut self) {
        debug!(
            "Swap toggle changed, absorbing confirm/back for {} ticks",
            self.swap_cooldown_ticks
        );
        self.swap_cooldown = self.swap_cooldown_ticks;
    }

    pub fn swap_cooldown(&self) -> u32 {
        self.swap_cooldown
    }

    pub fn record(&self, event: NavEvent) -> Option<PressRecord> {
        self.records[event.index()]
    }

    pub fn has_active_records(&self) -> bool {
        self.records.iter().any(Option::is_some)
    }

    /// Drops every record, including `menu`.
    pub fn clear(&mut self) {
        self.records = [None; NavEvent::COUNT];
        self.pause_latched = false;
        self.swap_cooldown = 0;
    }

    /// Advances the machine by one tick.
    pub fn step(&mut self, input: &TickInput, now: Instant, out: &mut Vec<Emitted>) -> StepOutcome {
        let mut outcome = StepOutcome::default();

        self.debounce(NavEvent::Menu, input.menu, now, true, out);

        match self.mode {
            Mode::Game => {
                outcome.pause_requested = input.pause && !self.pause_latched;
                self.pause_latched = input.pause;
                if outcome.pause_requested {
                    debug!("Pause edge detected");
                }
            }
            Mode::Ui => {
                let horizontal = !input.text_input_focused;
                self.repeat(NavEvent::NavUp, input.up, now, out);
                self.repeat(NavEvent::NavDown, input.down, now, out);
                self.repeat(NavEvent::NavLeft, input.left && horizontal, now, out);
                self.repeat(NavEvent::NavRight, input.right && horizontal, now, out);

                let emit_face = self.swap_cooldown == 0;
                self.debounce(NavEvent::Confirm, input.confirm, now, emit_face, out);
                self.debounce(NavEvent::Back, input.back, now, emit_face, out);
                self.debounce(NavEvent::Wiggle, input.wiggle, now, true, out);
            }
        }

        self.swap_cooldown = self.swap_cooldown.saturating_sub(1);
        outcome
    }

    /// Emit on press, then after the initial delay once per interval.
    fn repeat(&mut self, event: NavEvent, pressed: bool, now: Instant, out: &mut Vec<Emitted>) {
        let delay = self.timing.initial_delay();
        let interval = self.timing.interval();
        let slot = &mut self.records[event.index()];

        if !pressed {
            *slot = None;
            return;
        }

        match slot {
            None => {
                *slot = Some(PressRecord::new(now));
                out.push((event, None));
            }
            Some(record) => {
                if now.saturating_duration_since(record.start) < delay {
                    return;
                }
                let baseline = record.last_repeat.max(record.start + delay);
                if now.saturating_duration_since(baseline) >= interval {
                    record.last_repeat = now;
                    out.push((event, Some(EventData { repeat: true })));
                }
            }
        }
    }

    /// Emit once per press. With `emit == false` the transition is recorded silently.
    fn debounce(
        &mut self,
        event: NavEvent,
        pressed: bool,
        now: Instant,
        emit: bool,
        out: &mut Vec<Emitted>,
    ) {
        let slot = &mut self.records[event.index()];
        if !pressed {
            *slot = None;
        } else if slot.is_none() {
            *slot = Some(PressRecord::new(now));
            if emit {
                out.push((event, None));
            }
        }
    }
}
