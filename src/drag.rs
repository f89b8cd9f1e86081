//! Interactive surface repositioning
//!
//! Pointer-down on a caption surface detaches it from the bottom-center
//! anchor into absolute pixels; pointer-move translates it, clamped to the
//! container; release marks the handle moved. Only position is touched,
//! so a drag in progress never interferes with the sync loop's text
//! writes.

use crate::dom::{Anchor, Document};
use crate::registry::{surface_position, OverlayRegistry};

/// The primary pointer button. Everything else is ignored.
pub const PRIMARY_BUTTON: u8 = 0;

/// Pointer event phases the drag cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

/// A pointer event in container-relative coordinates.
#[derive(Debug, Clone, Copy)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub button: u8,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug)]
struct DragOp {
    index: usize,
    /// Pointer offset from the surface's top-left at grab time, so the
    /// surface does not jump under the cursor.
    grab_dx: f32,
    grab_dy: f32,
}

/// Tracks at most one in-flight drag across pointer events.
#[derive(Debug, Default)]
pub struct DragController {
    op: Option<DragOp>,
}

impl DragController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Is a drag currently in progress?
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.op.is_some()
    }

    /// Feed one pointer event targeting the surface of overlay `index`.
    pub fn handle(
        &mut self,
        doc: &mut Document,
        registry: &mut OverlayRegistry,
        index: usize,
        event: PointerEvent,
    ) {
        match event.kind {
            PointerKind::Down => {
                if event.button != PRIMARY_BUTTON {
                    return;
                }
                let Some(handle) = registry.get(index) else {
                    return;
                };
                let (left, top) = surface_position(doc, handle);
                let surface = handle.surface;
                // Freeze the rendered position into absolute pixels before
                // the first move.
                doc.set_anchor(surface, Anchor::Pixels { top, left });
                self.op = Some(DragOp {
                    index,
                    grab_dx: event.x - left,
                    grab_dy: event.y - top,
                });
            }
            PointerKind::Move => {
                let Some(op) = self.op.as_ref().filter(|op| op.index == index) else {
                    return;
                };
                let Some(handle) = registry.get(index) else {
                    return;
                };
                let container = doc.rect(handle.container);
                let surface_rect = doc.rect(handle.surface);
                let max_left = (container.width - surface_rect.width).max(0.0);
                let max_top = (container.height - surface_rect.height).max(0.0);
                let left = (event.x - op.grab_dx).clamp(0.0, max_left);
                let top = (event.y - op.grab_dy).clamp(0.0, max_top);
                let surface = handle.surface;
                doc.set_anchor(surface, Anchor::Pixels { top, left });
            }
            PointerKind::Up => {
                let Some(op) = self.op.take() else {
                    return;
                };
                if let Some(handle) = registry.get_mut(op.index) {
                    handle.is_moved = true;
                }
            }
        }
    }

    /// Restore the default bottom-center anchor and clear the moved flag.
    pub fn reset_position(doc: &mut Document, registry: &mut OverlayRegistry, index: usize) {
        if let Some(handle) = registry.get_mut(index) {
            handle.is_moved = false;
            let surface = handle.surface;
            doc.set_anchor(surface, Anchor::BottomCenter);
        }
    }
}
