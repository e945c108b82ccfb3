//! Focus navigator.
//!
//! Keeps one focused index over a grid of items laid out row-major with a fixed
//! column count, and moves it in response to bus events. `-1` means nothing is
//! focused yet; the first directional event only establishes focus on item 0.

use super::viewport::{scroll_into_band, Viewport};
use crate::events::{EventBus, NavEvent, Subscription};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Platform feedback played when focus moves.
pub trait Feedback: Send + Sync {
    fn light_impact(&self);
}

/// Feedback sink that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn light_impact(&self) {}
}

type Action = Box<dyn FnMut() + Send>;
type SelectAction<T> = Box<dyn FnMut(&T) + Send>;

pub struct FocusNavigator<T> {
    items: Vec<T>,
    columns: usize,
    focused: isize,
    enabled: bool,
    on_select: Option<SelectAction<T>>,
    on_back: Option<Action>,
    on_menu: Option<Action>,
    on_up_out: Option<Action>,
    on_down_out: Option<Action>,
    feedback: Box<dyn Feedback>,
    viewport: Option<Box<dyn Viewport>>,
}

impl<T> fmt::Debug for FocusNavigator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusNavigator")
            .field("items", &self.items.len())
            .field("columns", &self.columns)
            .field("focused", &self.focused)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl<T> FocusNavigator<T> {
    /// `columns` below 1 is treated as 1.
    pub fn new(items: Vec<T>, columns: usize) -> Self {
        Self {
            items,
            columns: columns.max(1),
            focused: -1,
            enabled: true,
            on_select: None,
            on_back: None,
            on_menu: None,
            on_up_out: None,
            on_down_out: None,
            feedback: Box::new(NoFeedback),
            viewport: None,
        }
    }

    pub fn on_select(mut self, action: impl FnMut(&T) + Send + 'static) -> Self {
        self.on_select = Some(Box::new(action));
        self
    }

    pub fn on_back(mut self, action: impl FnMut() + Send + 'static) -> Self {
        self.on_back = Some(Box::new(action));
        self
    }

    pub fn on_menu(mut self, action: impl FnMut() + Send + 'static) -> Self {
        self.on_menu = Some(Box::new(action));
        self
    }

    pub fn on_up_out(mut self, action: impl FnMut() + Send + 'static) -> Self {
        self.on_up_out = Some(Box::new(action));
        self
    }

    pub fn on_down_out(mut self, action: impl FnMut() + Send + 'static) -> Self {
        self.on_down_out = Some(Box::new(action));
        self
    }

    pub fn with_feedback(mut self, feedback: impl Feedback + 'static) -> Self {
        self.feedback = Box::new(feedback);
        self
    }

    pub fn with_viewport(mut self, viewport: impl Viewport + 'static) -> Self {
        self.viewport = Some(Box::new(viewport));
        self
    }

    pub fn focused(&self) -> Option<usize> {
        usize::try_from(self.focused).ok()
    }

    pub fn focused_item(&self) -> Option<&T> {
        self.focused().and_then(|i| self.items.get(i))
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn set_columns(&mut self, columns: usize) {
        self.columns = columns.max(1);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Replaces the item list; focus past the new end moves to the last item.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        let len = self.items.len() as isize;
        if self.focused >= len {
            self.focused = (len - 1).max(-1);
            debug!("Item list shrank, focus clamped to {}", self.focused);
        }
    }

    /// Applies one bus event. Returns whether it had any effect.
    pub fn handle(&mut self, event: NavEvent) -> bool {
        if !self.enabled || self.items.is_empty() {
            return false;
        }

        if self.focused < 0 {
            if !event.is_directional() {
                return false;
            }
            self.focused = 0;
            self.scroll_to_focused();
            trace!("Focus established on item 0");
            return true;
        }

        let total = self.items.len() as isize;
        let cols = self.columns as isize;
        let current = self.focused;

        match event {
            NavEvent::NavRight => self.move_to(current + 1, total),
            NavEvent::NavLeft => self.move_to(current - 1, total),
            NavEvent::NavDown => {
                self.move_to(current + cols, total) || Self::fire(&mut self.on_down_out)
            }
            NavEvent::NavUp => {
                self.move_to(current - cols, total) || Self::fire(&mut self.on_up_out)
            }
            NavEvent::Confirm => match (self.on_select.as_mut(), self.items.get(current as usize)) {
                (Some(action), Some(item)) => {
                    action(item);
                    true
                }
                _ => false,
            },
            NavEvent::Back => Self::fire(&mut self.on_back),
            NavEvent::Menu => Self::fire(&mut self.on_menu),
            NavEvent::Wiggle => false,
        }
    }

    fn move_to(&mut self, target: isize, total: isize) -> bool {
        if !(0..total).contains(&target) {
            return false;
        }
        self.focused = target;
        self.scroll_to_focused();
        self.feedback.light_impact();
        true
    }

    fn fire(action: &mut Option<Action>) -> bool {
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    fn scroll_to_focused(&mut self) {
        let Some(index) = self.focused() else {
            return;
        };
        if let Some(viewport) = self.viewport.as_deref_mut() {
            if let Some(offset) = scroll_into_band(viewport, index) {
                trace!("Scrolled to {} for item {}", offset, index);
            }
        }
    }
}

impl<T: Send + 'static> FocusNavigator<T> {
    /// Feeds every event on `bus` into the shared navigator.
    pub fn attach(navigator: Arc<Mutex<Self>>, bus: &EventBus) -> Subscription {
        bus.subscribe(move |event, _| {
            navigator.lock().handle(event);
        })
    }
}
