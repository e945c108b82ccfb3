//! Scroll collaborator for the focus navigator.

/// Vertical extent of an item, relative to the top of the visible area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }
}

/// Scrollable surface hosting the focusable items.
pub trait Viewport: Send {
    /// Height of the visible area.
    fn height(&self) -> f64;

    /// Current scroll offset from the top of the content.
    fn scroll_offset(&self) -> f64;

    /// On-screen extent of item `index`, if it is laid out.
    fn item_rect(&self, index: usize) -> Option<Rect>;

    fn scroll_to(&mut self, offset: f64);
}

pub const TOP_BAND: f64 = 0.2;
pub const BOTTOM_BAND: f64 = 0.8;

/// Offset that brings `rect` back between 20 % and 80 % of `height`, if it left that band.
pub fn scroll_target(rect: Rect, height: f64, offset: f64) -> Option<f64> {
    let top_threshold = height * TOP_BAND;
    let bottom_threshold = height * BOTTOM_BAND;

    let target = if rect.top < top_threshold {
        offset - (top_threshold - rect.top)
    } else if rect.bottom > bottom_threshold {
        offset + (rect.bottom - bottom_threshold)
    } else {
        return None;
    };
    Some(target.max(0.0))
}

/// Scrolls `viewport` so item `index` sits inside the band. Returns the new offset.
pub fn scroll_into_band(viewport: &mut dyn Viewport, index: usize) -> Option<f64> {
    let rect = viewport.item_rect(index)?;
    let target = scroll_target(rect, viewport.height(), viewport.scroll_offset())?;
    viewport.scroll_to(target);
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_band_does_not_scroll() {
        assert_eq!(scroll_target(Rect::new(200.0, 300.0), 1000.0, 50.0), None);
    }

    #[test]
    fn test_above_band_scrolls_up_by_difference() {
        assert_eq!(scroll_target(Rect::new(150.0, 250.0), 1000.0, 500.0), Some(450.0));
    }

    #[test]
    fn test_below_band_scrolls_down_by_difference() {
        assert_eq!(scroll_target(Rect::new(750.0, 900.0), 1000.0, 0.0), Some(100.0));
    }

    #[test]
    fn test_never_scrolls_negative() {
        assert_eq!(scroll_target(Rect::new(-300.0, -200.0), 1000.0, 100.0), Some(0.0));
    }
}
