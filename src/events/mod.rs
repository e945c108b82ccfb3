//! Event bus for discrete UI events.
//!
//! Listeners subscribe once and receive every emitted event together with
//! optional event data. The event names form a closed set:
//! `nav-up, nav-down, nav-left, nav-right, confirm, back, menu, wiggle`.
//!
//! # Example
//!
//! ```ignore
//! let bus = EventBus::new();
//! let subscription = bus.subscribe(|event, data| {
//!     println!("{event} {:?}", data);
//! });
//! bus.emit(NavEvent::Confirm, None);
//! subscription.unsubscribe();
//! ```

use crate::mapping::MappingError;
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Discrete UI events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavEvent {
    NavUp,
    NavDown,
    NavLeft,
    NavRight,
    Confirm,
    Back,
    Menu,
    Wiggle,
}

impl NavEvent {
    pub const COUNT: usize = 8;

    pub const ALL: [NavEvent; NavEvent::COUNT] = [
        NavEvent::NavUp,
        NavEvent::NavDown,
        NavEvent::NavLeft,
        NavEvent::NavRight,
        NavEvent::Confirm,
        NavEvent::Back,
        NavEvent::Menu,
        NavEvent::Wiggle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NavEvent::NavUp => "nav-up",
            NavEvent::NavDown => "nav-down",
            NavEvent::NavLeft => "nav-left",
            NavEvent::NavRight => "nav-right",
            NavEvent::Confirm => "confirm",
            NavEvent::Back => "back",
            NavEvent::Menu => "menu",
            NavEvent::Wiggle => "wiggle",
        }
    }

    /// Slot in per-event tables.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_directional(self) -> bool {
        matches!(
            self,
            NavEvent::NavUp | NavEvent::NavDown | NavEvent::NavLeft | NavEvent::NavRight
        )
    }
}

impl fmt::Display for NavEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NavEvent {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NavEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| MappingError::UnknownEvent(s.to_string()))
    }
}

/// Extra information attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventData {
    /// Emitted by key repeat rather than by the initial press.
    pub repeat: bool,
}

/// Listener signature
pub type Listener = Arc<dyn Fn(NavEvent, Option<&EventData>) + Send + Sync>;

#[derive(Default)]
struct Registry {
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

/// Listener registry. Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Keep the returned handle to unsubscribe later.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(NavEvent, Option<&EventData>) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.listeners.lock().push((id, Arc::new(listener)));
        debug!("Listener {} subscribed", id);

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Delivers `event` to every listener registered at the time of the call.
    ///
    /// The registry lock is not held while listeners run, so a listener may
    /// subscribe or unsubscribe from inside its callback.
    pub fn emit(&self, event: NavEvent, data: Option<EventData>) {
        let listeners: Vec<Listener> = self
            .registry
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        trace!("Emitting {} to {} listeners", event, listeners.len());
        for listener in listeners {
            listener(event, data.as_ref());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.listeners.lock().len()
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Removes the listener. A no-op once the bus is gone.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.listeners.lock().retain(|(id, _)| *id != self.id);
            debug!("Listener {} unsubscribed", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &EventBus) -> (Arc<Mutex<Vec<(NavEvent, bool)>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = bus.subscribe(move |event, data| {
            sink.lock().push((event, data.map(|d| d.repeat).unwrap_or(false)));
        });
        (seen, subscription)
    }

    #[test]
    fn test_names_round_trip() {
        for event in NavEvent::ALL {
            assert_eq!(event.as_str().parse::<NavEvent>().unwrap(), event);
        }
        assert!("nav-sideways".parse::<NavEvent>().is_err());
    }

    #[test]
    fn test_index_matches_table_order() {
        for (i, event) in NavEvent::ALL.iter().enumerate() {
            assert_eq!(event.index(), i);
        }
    }

    #[test]
    fn test_emit_reaches_all_listeners() {
        let bus = EventBus::new();
        let (first, _a) = recorder(&bus);
        let (second, _b) = recorder(&bus);

        bus.emit(NavEvent::Confirm, None);
        bus.emit(NavEvent::NavDown, Some(EventData { repeat: true }));

        let expected = vec![(NavEvent::Confirm, false), (NavEvent::NavDown, true)];
        assert_eq!(*first.lock(), expected);
        assert_eq!(*second.lock(), expected);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let (seen, subscription) = recorder(&bus);
        bus.emit(NavEvent::Menu, None);
        subscription.unsubscribe();
        bus.emit(NavEvent::Menu, None);

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_subscribe_during_emit() {
        let bus = EventBus::new();
        let inner_bus = bus.clone();
        let _outer = bus.subscribe(move |_, _| {
            let _ = inner_bus.subscribe(|_, _| {});
        });
        bus.emit(NavEvent::Back, None);
        assert_eq!(bus.listener_count(), 2);
    }
}
