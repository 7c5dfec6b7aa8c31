//! Popup placement for editor hosts
//!
//! Hosts that render the explanation next to the selection implement
//! `ViewportLocator`; `place_popup` keeps the popup inside the viewport.

use serde::{Deserialize, Serialize};

/// Gap between the anchor and the popup
pub const ANCHOR_GAP: f64 = 10.0;

/// Minimum distance from the viewport edges
pub const VIEWPORT_MARGIN: f64 = 20.0;

/// Anchor used when the selection cannot be located
pub const FALLBACK_ANCHOR: Point = Point { x: 200.0, y: 200.0 };

/// Approximate popup size
pub const DEFAULT_POPUP_SIZE: Size = Size {
    width: 400.0,
    height: 300.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Default for Size {
    fn default() -> Self {
        DEFAULT_POPUP_SIZE
    }
}

/// Locates the selection on screen
pub trait ViewportLocator {
    /// Screen coordinates of the selection end, if known
    fn selection_anchor(&self) -> Option<Point>;

    /// Visible area
    fn viewport(&self) -> Size;
}

/// Top-left corner for a popup of `popup` size shown at `anchor`.
///
/// The popup goes below the anchor. Horizontally it is pulled back inside
/// the margins; if it would overflow the bottom it flips above the anchor,
/// never higher than the top margin.
pub fn place_popup(anchor: Point, viewport: Size, popup: Size) -> Point {
    let mut left = anchor.x;
    let mut top = anchor.y + ANCHOR_GAP;

    if left + popup.width > viewport.width - VIEWPORT_MARGIN {
        left = viewport.width - popup.width - VIEWPORT_MARGIN;
    }
    if left < VIEWPORT_MARGIN {
        left = VIEWPORT_MARGIN;
    }

    if top + popup.height > viewport.height - VIEWPORT_MARGIN {
        top = (anchor.y - popup.height - ANCHOR_GAP).max(VIEWPORT_MARGIN);
    }

    Point { x: left, y: top }
}

/// Place a default-sized popup using `locator`, falling back to a fixed anchor
pub fn popup_position(locator: &dyn ViewportLocator) -> Point {
    let anchor = locator.selection_anchor().unwrap_or(FALLBACK_ANCHOR);
    place_popup(anchor, locator.viewport(), DEFAULT_POPUP_SIZE)
}
