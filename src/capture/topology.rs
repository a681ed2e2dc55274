//! Display topology queries
//!
//! The engine needs two facts about the monitor layout: the virtual-screen
//! bounding box (for fullscreen capture) and which display, if any, covers a
//! given point or area (for offscreen masking). Both are derived from a
//! fresh display enumeration; the display set can change at any time
//! (hot-plug, resolution change), so nothing here caches.

use tracing::debug;

use crate::model::{DisplayInfo, Point, Rect};

/// Source of the current display set.
///
/// Implementations enumerate the platform's monitors on every call.
/// Results are a point-in-time snapshot used for one capture and then
/// discarded.
pub trait DisplayTopology: Send + Sync {
    /// Returns all attached displays, in enumeration order.
    ///
    /// The returned set always contains at least one display; display
    /// bounds may be adjacent or disjoint (gaps between monitors are
    /// legal and the offscreen mask handles them).
    fn displays(&self) -> Vec<DisplayInfo>;
}

impl<T: DisplayTopology + ?Sized> DisplayTopology for std::sync::Arc<T> {
    fn displays(&self) -> Vec<DisplayInfo> {
        (**self).displays()
    }
}

/// Bounding box of all display bounds.
///
/// This is the "virtual screen": with disjoint monitor layouts it can
/// include desktop areas no display covers. Fullscreen captures use this
/// rectangle and rely on the offscreen mask to blank the uncovered parts.
pub fn virtual_bounds(displays: &[DisplayInfo]) -> Rect {
    let bounds = displays
        .iter()
        .fold(Rect::default(), |acc, d| acc.union(&d.bounds));
    debug!(
        displays = displays.len(),
        x = bounds.x,
        y = bounds.y,
        width = bounds.width,
        height = bounds.height,
        "computed virtual screen bounds"
    );
    bounds
}

/// The display whose bounds contain `point`, if any.
///
/// Points in the gap between disjoint displays belong to no display.
pub fn display_containing(displays: &[DisplayInfo], point: Point) -> Option<&DisplayInfo> {
    displays.iter().find(|d| d.bounds.contains(point))
}
