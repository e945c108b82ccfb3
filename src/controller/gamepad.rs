use super::ControllerError;
use crate::mapping::{ButtonMask, MaskSlot};
use gilrs::{Axis, Button, Event, EventType, Gilrs};
use statum::{machine, state};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Standard-layout button indices
pub mod index {
    pub const A: usize = 0;
    pub const B: usize = 1;
    pub const X: usize = 2;
    pub const Y: usize = 3;
    pub const SELECT: usize = 8;
    pub const START: usize = 9;
    pub const DPAD_UP: usize = 12;
    pub const DPAD_DOWN: usize = 13;
    pub const DPAD_LEFT: usize = 14;
    pub const DPAD_RIGHT: usize = 15;
}

pub const BUTTON_COUNT: usize = 16;

/// Raw snapshot of one gamepad in standard layout.
///
/// `axes` holds the left stick in screen convention: negative Y is up.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawPad {
    pub buttons: [bool; BUTTON_COUNT],
    pub axes: [f32; 2],
}

impl RawPad {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Digital view of the first connected gamepad
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GamepadState {
    pub connected: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub select: bool,
    pub start: bool,
}

impl GamepadState {
    /// Digital d-pad OR analog stick past `deadzone`.
    pub fn derive_from(&mut self, pad: &RawPad, deadzone: f32) {
        let [axis_x, axis_y] = pad.axes;
        let pressed = |i: usize| pad.buttons[i];

        self.connected = true;
        self.up = pressed(index::DPAD_UP) || axis_y < -deadzone;
        self.down = pressed(index::DPAD_DOWN) || axis_y > deadzone;
        self.left = pressed(index::DPAD_LEFT) || axis_x < -deadzone;
        self.right = pressed(index::DPAD_RIGHT) || axis_x > deadzone;
        self.a = pressed(index::A);
        self.b = pressed(index::B);
        self.x = pressed(index::X);
        self.y = pressed(index::Y);
        self.select = pressed(index::SELECT);
        self.start = pressed(index::START);
    }

    /// Face buttons that currently mean "confirm".
    pub fn confirm(&self, swapped: bool) -> bool {
        if swapped {
            self.b
        } else {
            self.a
        }
    }

    /// Face buttons that currently mean "back".
    pub fn back(&self, swapped: bool) -> bool {
        if swapped {
            self.a
        } else {
            self.b
        }
    }

    pub fn menu(&self) -> bool {
        self.select || self.start
    }
}

/// Backend the poller reads gamepads from.
pub trait GamepadSource: fmt::Debug {
    /// Drains pending backend events. Called once per poll.
    fn refresh(&mut self);

    /// Fills `pad` from the first connected gamepad. Returns false when none is connected.
    fn read_first(&mut self, pad: &mut RawPad) -> bool;
}

/// Production backend on top of gilrs
#[derive(Debug)]
pub struct GilrsSource {
    gilrs: Gilrs,
}

impl GilrsSource {
    pub fn new() -> Result<Self, ControllerError> {
        info!("Initializing gilrs controller interface");
        match Gilrs::new() {
            Ok(gilrs) => {
                info!("Successfully initialized gilrs");
                Ok(Self { gilrs })
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                Err(ControllerError::InitializationError(e.to_string()))
            }
        }
    }
}

const BUTTON_LAYOUT: [(Button, usize); 10] = [
    (Button::South, index::A),
    (Button::East, index::B),
    (Button::West, index::X),
    (Button::North, index::Y),
    (Button::Select, index::SELECT),
    (Button::Start, index::START),
    (Button::DPadUp, index::DPAD_UP),
    (Button::DPadDown, index::DPAD_DOWN),
    (Button::DPadLeft, index::DPAD_LEFT),
    (Button::DPadRight, index::DPAD_RIGHT),
];

impl GamepadSource for GilrsSource {
    fn refresh(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => info!("Gamepad {} connected", id),
                EventType::Disconnected => warn!("Gamepad {} disconnected", id),
                _ => {}
            }
        }
    }

    fn read_first(&mut self, pad: &mut RawPad) -> bool {
        let Some((_, gamepad)) = self.gilrs.gamepads().find(|(_, g)| g.is_connected()) else {
            return false;
        };

        pad.clear();
        for (button, slot) in BUTTON_LAYOUT {
            pad.buttons[slot] = gamepad.is_pressed(button);
        }
        // gilrs reports stick Y positive up
        pad.axes = [
            gamepad.value(Axis::LeftStickX),
            -gamepad.value(Axis::LeftStickY),
        ];
        true
    }
}

/// Source without any gamepad, used when the backend is unavailable.
#[derive(Debug, Default)]
pub struct NoGamepad;

impl GamepadSource for NoGamepad {
    fn refresh(&mut self) {}

    fn read_first(&mut self, _pad: &mut RawPad) -> bool {
        false
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum PollerState {
    Initializing,
    Polling,
}

#[machine]
#[derive(Debug)]
pub struct GamepadPoller<S: PollerState> {
    source: Box<dyn GamepadSource>,

    // Stick threshold for directional input
    deadzone: f32,

    // Buffers reused across ticks
    raw: RawPad,
    current: GamepadState,
}

impl<S: PollerState> GamepadPoller<S> {
    pub fn set_deadzone(&mut self, deadzone: f32) {
        self.deadzone = deadzone;
    }

    pub fn deadzone(&self) -> f32 {
        self.deadzone
    }
}

impl GamepadPoller<Initializing> {
    pub fn create(source: Box<dyn GamepadSource>, deadzone: f32) -> Self {
        debug!("Creating gamepad poller with deadzone {}", deadzone);
        Self::new(source, deadzone, RawPad::default(), GamepadState::default())
    }

    pub fn initialize(mut self) -> GamepadPoller<Polling> {
        self.source.refresh();
        if self.source.read_first(&mut self.raw) {
            info!("Gamepad found, polling first connected pad");
        } else {
            warn!("No gamepad connected, continuing with keyboard and virtual input");
        }
        self.transition()
    }
}

impl GamepadPoller<Polling> {
    /// Reads the first connected gamepad. A missing pad yields an all-false state.
    pub fn poll(&mut self) -> &GamepadState {
        self.source.refresh();
        let was_connected = self.current.connected;

        if self.source.read_first(&mut self.raw) {
            self.current.derive_from(&self.raw, self.deadzone);
        } else {
            self.current = GamepadState::default();
        }

        if was_connected != self.current.connected {
            info!("Gamepad connected: {}", self.current.connected);
        }
        &self.current
    }

    pub fn state(&self) -> &GamepadState {
        &self.current
    }
}

/// Gamepad mask for the current swap setting.
pub fn gamepad_mask(state: &GamepadState, swapped: bool) -> ButtonMask {
    let mut mask = ButtonMask::empty();
    mask.set(ButtonMask::LEFT, state.left);
    mask.set(ButtonMask::RIGHT, state.right);
    mask.set(ButtonMask::UP, state.up);
    mask.set(ButtonMask::DOWN, state.down);

    let south_west = state.a || state.y;
    let east_north = state.b || state.x;
    let (primary, secondary) = if swapped {
        (east_north, south_west)
    } else {
        (south_west, east_north)
    };
    mask.set(ButtonMask::PRIMARY, primary);
    mask.set(ButtonMask::SECONDARY, secondary);
    mask.set(ButtonMask::PAUSE, state.menu());
    mask
}

/// Sole writer of the gamepad slot
#[derive(Debug)]
pub struct GamepadCollector {
    slot: MaskSlot,
}

impl GamepadCollector {
    pub fn new(slot: MaskSlot) -> Self {
        Self { slot }
    }

    pub fn update(&self, state: &GamepadState, swapped: bool) -> ButtonMask {
        let mask = gamepad_mask(state, swapped);
        self.slot.set(mask);
        mask
    }

    pub fn clear(&self) {
        self.slot.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PublicationSink;
    use crate::mapping::Compositor;
    use std::collections::VecDeque;

    #[derive(Debug, Default)]
    struct ScriptedPad {
        frames: VecDeque<Option<RawPad>>,
    }

    impl GamepadSource for ScriptedPad {
        fn refresh(&mut self) {}

        fn read_first(&mut self, pad: &mut RawPad) -> bool {
            match self.frames.pop_front().flatten() {
                Some(frame) => {
                    *pad = frame;
                    true
                }
                None => false,
            }
        }
    }

    fn pad_with(buttons: &[usize], axes: [f32; 2]) -> RawPad {
        let mut pad = RawPad {
            axes,
            ..Default::default()
        };
        for &b in buttons {
            pad.buttons[b] = true;
        }
        pad
    }

    #[test]
    fn test_missing_gamepad_is_all_false() {
        let mut poller = GamepadPoller::create(Box::new(NoGamepad), 0.3).initialize();
        assert_eq!(*poller.poll(), GamepadState::default());
    }

    #[test]
    fn test_axis_past_deadzone_counts_as_direction() {
        let frames = VecDeque::from([
            None,
            Some(pad_with(&[], [0.0, -0.5])),
            Some(pad_with(&[], [0.29, 0.0])),
            Some(pad_with(&[index::DPAD_LEFT], [0.8, 0.0])),
        ]);
        let mut poller = GamepadPoller::create(Box::new(ScriptedPad { frames }), 0.3).initialize();

        let state = *poller.poll();
        assert!(state.connected && state.up && !state.down);

        let state = *poller.poll();
        assert!(!state.right, "0.29 is inside the deadzone");

        let state = *poller.poll();
        assert!(state.left && state.right);

        assert!(!poller.poll().connected);
    }

    #[test]
    fn test_face_buttons_follow_swap() {
        let state = GamepadState {
            connected: true,
            a: true,
            ..Default::default()
        };
        assert_eq!(gamepad_mask(&state, false), ButtonMask::PRIMARY);
        assert_eq!(gamepad_mask(&state, true), ButtonMask::SECONDARY);
        assert!(state.confirm(false) && state.back(true));

        let state = GamepadState {
            x: true,
            ..Default::default()
        };
        assert_eq!(gamepad_mask(&state, false), ButtonMask::SECONDARY);
    }

    #[test]
    fn test_select_or_start_is_pause() {
        let state = GamepadState {
            start: true,
            down: true,
            ..Default::default()
        };
        assert_eq!(gamepad_mask(&state, false), ButtonMask::PAUSE | ButtonMask::DOWN);
    }

    #[test]
    fn test_collector_writes_only_gamepad_slot() {
        let (compositor, slots) = Compositor::new(PublicationSink::new());
        let collector = GamepadCollector::new(slots.gamepad);
        let state = GamepadState {
            up: true,
            ..Default::default()
        };
        collector.update(&state, false);
        assert_eq!(compositor.canonical(), ButtonMask::UP);
        collector.clear();
        assert!(compositor.canonical().is_empty());
    }
}
