//! Offscreen masking for capture areas no display covers
//!
//! A requested capture rectangle can extend past every display: the virtual
//! screen of a disjoint monitor layout has gaps, and drag selections can
//! reach beyond the desktop edge. The block copy still produces pixels for
//! those areas (stale or undefined), so the region capturer blanks them to
//! fully transparent instead. This module computes which parts of a capture
//! rectangle are uncovered and applies that mask to a capture buffer.

use tracing::debug;

use crate::model::{Capture, CaptureBounds, DisplayInfo, Rect};

/// The uncovered parts of one capture rectangle, in desktop coordinates.
#[derive(Debug, Clone)]
pub struct OffscreenRegion {
    bounds:    CaptureBounds,
    uncovered: Vec<Rect>,
}

impl OffscreenRegion {
    /// True when some part of the capture rectangle lies outside every
    /// display. Drives the region capturer's format choice: offscreen
    /// content forces an alpha-capable buffer.
    pub fn has_offscreen_content(&self) -> bool {
        !self.uncovered.is_empty()
    }

    /// Uncovered rectangles in desktop coordinates.
    pub fn uncovered(&self) -> &[Rect] {
        &self.uncovered
    }

    /// Blanks every uncovered rectangle in `capture` to fully transparent,
    /// promoting the buffer to an alpha format first.
    ///
    /// Covered pixels stay untouched at their copied positions; this only
    /// clears, it never moves content. No-op when nothing is uncovered.
    pub fn apply(&self, capture: &mut Capture) {
        if self.uncovered.is_empty() {
            return;
        }

        capture.promote_to_alpha();

        let origin = self.bounds.origin();
        for rect in &self.uncovered {
            let local = Rect::new(rect.x - origin.x, rect.y - origin.y, rect.width, rect.height);
            capture.fill_transparent(local);
        }

        debug!(
            rects = self.uncovered.len(),
            "masked offscreen capture areas transparent"
        );
    }
}

/// Computes the parts of `bounds` not covered by any display.
///
/// Works by iterative rectangle subtraction: start with the capture
/// rectangle and carve each display's bounds out of the remaining pieces.
/// The result is a disjoint set of rectangles (possibly empty).
pub fn compute_offscreen_region(
    bounds: &CaptureBounds,
    displays: &[DisplayInfo],
) -> OffscreenRegion {
    let mut uncovered = vec![bounds.rect()];

    for display in displays {
        let mut next = Vec::with_capacity(uncovered.len());
        for rect in &uncovered {
            subtract(rect, &display.bounds, &mut next);
        }
        uncovered = next;
        if uncovered.is_empty() {
            break;
        }
    }

    OffscreenRegion {
        bounds: *bounds,
        uncovered,
    }
}

/// Appends `rect` minus `cover` to `out` as up to four disjoint strips.
fn subtract(rect: &Rect, cover: &Rect, out: &mut Vec<Rect>) {
    let Some(overlap) = rect.intersect(cover) else {
        out.push(*rect);
        return;
    };

    // Strip above the overlap
    if overlap.y > rect.y {
        out.push(Rect::new(rect.x, rect.y, rect.width, overlap.y - rect.y));
    }
    // Strip below the overlap
    if overlap.bottom() < rect.bottom() {
        out.push(Rect::new(
            rect.x,
            overlap.bottom(),
            rect.width,
            rect.bottom() - overlap.bottom(),
        ));
    }
    // Strip left of the overlap, limited to the overlap's rows
    if overlap.x > rect.x {
        out.push(Rect::new(
            rect.x,
            overlap.y,
            overlap.x - rect.x,
            overlap.height,
        ));
    }
    // Strip right of the overlap, limited to the overlap's rows
    if overlap.right() < rect.right() {
        out.push(Rect::new(
            overlap.right(),
            overlap.y,
            rect.right() - overlap.right(),
            overlap.height,
        ));
    }
}
