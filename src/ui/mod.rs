//! # UI-side consumers of the input events
//!
//! The input system only emits events; what "moving focus" means is decided here.
//! [`focus::FocusNavigator`] turns `nav-*`, `confirm`, `back` and `menu` into focus
//! moves and callbacks over a grid of items, and keeps the focused item visible
//! through a [`viewport::Viewport`].

pub mod focus;
pub mod viewport;

pub use focus::{Feedback, FocusNavigator, NoFeedback};
pub use viewport::{scroll_into_band, Rect, Viewport};
