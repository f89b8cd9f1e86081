//! Overlay registry
//!
//! Owns the per-feed overlay handles: their attachment points in the host
//! document, the caption surfaces inside them, and the active/selected
//! state. Structure is mutated only by the reconciler, selection only by
//! the selection controller, and the sync loop just writes text.

use thiserror::Error;
use tracing::debug;

use crate::dom::{Anchor, Document, NodeId, Rect};

/// Attribute marking an attachment node as ours. Recognition through this
/// marker is what makes registration idempotent even after the registry
/// array was cleared while the DOM node survived.
pub const ATTACHMENT_ATTR: &str = "data-overcue-overlay";
/// Attribute marking a caption surface as ours.
pub const SURFACE_ATTR: &str = "data-overcue-surface";

/// Fraction of the container height kept clear below the default
/// bottom-center surface position.
pub const BOTTOM_MARGIN_FRACTION: f32 = 0.08;

/// Contract violations on the registry's selection API.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// `set_active` was asked for an index no feed occupies.
    #[error("overlay index {index} out of range ({len} feeds)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// One on-screen caption surface bound to one video feed.
///
/// Identity is positional: a handle's index in the registry is its
/// feed-discovery order, the only identity the host page offers.
#[derive(Debug, Clone)]
pub struct OverlayHandle {
    /// The host's feed container this overlay covers.
    pub container: NodeId,
    /// Exclusively owned full-bleed node appended to the container.
    pub attachment: NodeId,
    /// The caption text element inside the attachment.
    pub surface: NodeId,
    /// Did the user drag the surface away from its default anchor?
    pub is_moved: bool,
}

impl OverlayHandle {
    /// Is the attachment node still part of the live document?
    #[must_use]
    pub fn is_connected(&self, doc: &Document) -> bool {
        doc.is_connected(self.attachment)
    }
}

/// The list of per-feed overlays plus which one (if any) is active.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    handles: Vec<OverlayHandle>,
    active: Option<usize>,
}

impl OverlayRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `container` has an overlay, creating one if needed, and
    /// return its registry index.
    ///
    /// Idempotent: a container already carrying an attachment node keeps
    /// it, and the handle is re-adopted if the registry array was cleared
    /// while the node survived. Reconciliation passes run repeatedly, so
    /// duplicates here would mean duplicate surfaces on screen.
    pub fn register_feed_container(&mut self, doc: &mut Document, container: NodeId) -> usize {
        let container_rect = doc.rect(container);
        let existing = doc
            .children(container)
            .iter()
            .copied()
            .find(|&c| doc.attr(c, ATTACHMENT_ATTR).is_some());

        if let Some(attachment) = existing {
            if let Some(i) = self.handles.iter().position(|h| h.attachment == attachment) {
                return i;
            }
            // Registry was cleared but the DOM node survived: re-adopt it.
            let surface = doc
                .children(attachment)
                .iter()
                .copied()
                .find(|&c| doc.attr(c, SURFACE_ATTR).is_some());
            let surface = match surface {
                Some(s) => s,
                None => create_surface(doc, attachment, container_rect),
            };
            self.handles.push(OverlayHandle {
                container,
                attachment,
                surface,
                is_moved: false,
            });
            debug!(index = self.handles.len() - 1, "re-adopted surviving overlay");
            return self.handles.len() - 1;
        }

        let attachment = doc.create_element("div");
        doc.set_attr(attachment, ATTACHMENT_ATTR, "");
        // Full-bleed over the container, but transparent to pointer events
        // so the container's own controls stay clickable.
        doc.set_rect(
            attachment,
            Rect::new(0.0, 0.0, container_rect.width, container_rect.height),
        );
        doc.set_pointer_transparent(attachment, true);
        doc.append_child(container, attachment);

        let surface = create_surface(doc, attachment, container_rect);

        self.handles.push(OverlayHandle {
            container,
            attachment,
            surface,
            is_moved: false,
        });
        debug!(index = self.handles.len() - 1, "overlay created");
        self.handles.len() - 1
    }

    /// Authoritative selection setter: clears and hides the currently
    /// active surface, then records the new choice. Making the new target
    /// visible is the sync loop's job.
    pub fn set_active(&mut self, doc: &mut Document, next: Option<usize>) -> Result<(), OverlayError> {
        if let Some(index) = next {
            if index >= self.handles.len() {
                return Err(OverlayError::IndexOutOfRange {
                    index,
                    len: self.handles.len(),
                });
            }
        }
        if let Some(prev) = self.active {
            if let Some(handle) = self.handles.get(prev) {
                doc.set_text(handle.surface, "");
                doc.set_visible(handle.surface, false);
            }
        }
        self.active = next;
        Ok(())
    }

    /// Overwrite the active index without touching the document. Used by
    /// the reconciler right after a structural reset, when the previous
    /// surfaces no longer exist to be hidden.
    pub(crate) fn force_active(&mut self, next: Option<usize>) {
        self.active = next;
    }

    /// Drop all handles. Does not touch the document; after a structural
    /// reset the nodes are either gone already or will be rediscovered.
    pub fn reset_all(&mut self) {
        self.handles.clear();
    }

    /// Reorder handles to match `containers` (current document order),
    /// keeping the same handle active across the move. Discovery order is
    /// the only feed identity, so a moved-but-connected container is the
    /// same feed at a new index, not a new feed.
    pub fn sync_order(&mut self, containers: &[NodeId]) {
        let active_attachment = self.active.and_then(|i| self.handles.get(i)).map(|h| h.attachment);
        let mut ordered = Vec::with_capacity(containers.len());
        for &container in containers {
            if let Some(pos) = self.handles.iter().position(|h| h.container == container) {
                ordered.push(self.handles.remove(pos));
            }
        }
        self.handles = ordered;
        if let Some(attachment) = active_attachment {
            self.active = self.handles.iter().position(|h| h.attachment == attachment);
        }
    }

    /// Is `node` one of this system's own injected overlay nodes (or
    /// inside one)? The reconciler's mutation filter depends on this.
    #[must_use]
    pub fn is_own_node(doc: &Document, node: NodeId) -> bool {
        doc.in_subtree_with_attr(node, ATTACHMENT_ATTR)
    }

    /// Currently active overlay index, `None` when captions are off.
    #[must_use]
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Handle at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&OverlayHandle> {
        self.handles.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut OverlayHandle> {
        self.handles.get_mut(index)
    }

    /// All handles, in discovery order.
    #[must_use]
    pub fn handles(&self) -> &[OverlayHandle] {
        &self.handles
    }

    /// Number of registered feeds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Are no feeds registered?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

fn create_surface(doc: &mut Document, attachment: NodeId, container_rect: Rect) -> NodeId {
    let surface = doc.create_element("div");
    doc.set_attr(surface, SURFACE_ATTR, "");
    doc.set_rect(
        surface,
        Rect::new(0.0, 0.0, container_rect.width * 0.5, 40.0),
    );
    doc.set_anchor(surface, Anchor::BottomCenter);
    doc.set_visible(surface, false);
    doc.append_child(attachment, surface);
    surface
}

/// Resolve a surface's current position (left, top) relative to its
/// container, whichever anchor it uses.
#[must_use]
pub fn surface_position(doc: &Document, handle: &OverlayHandle) -> (f32, f32) {
    match doc.anchor(handle.surface) {
        Anchor::Pixels { top, left } => (left, top),
        Anchor::BottomCenter => {
            let container = doc.rect(handle.container);
            let surface = doc.rect(handle.surface);
            let left = (container.width - surface.width) / 2.0;
            let top = container.height - surface.height - container.height * BOTTOM_MARGIN_FRACTION;
            (left, top)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_container() -> (Document, NodeId) {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        doc.set_rect(container, Rect::new(0.0, 0.0, 640.0, 360.0));
        let root = doc.root();
        doc.append_child(root, container);
        (doc, container)
    }

    #[test]
    fn registration_is_idempotent() {
        let (mut doc, container) = doc_with_container();
        let mut registry = OverlayRegistry::new();

        let first = registry.register_feed_container(&mut doc, container);
        let second = registry.register_feed_container(&mut doc, container);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);

        let attachments: Vec<_> = doc
            .children(container)
            .iter()
            .filter(|&&c| doc.attr(c, ATTACHMENT_ATTR).is_some())
            .collect();
        assert_eq!(attachments.len(), 1, "no duplicate attachment nodes");
    }

    #[test]
    fn register_readopts_surviving_node() {
        let (mut doc, container) = doc_with_container();
        let mut registry = OverlayRegistry::new();

        registry.register_feed_container(&mut doc, container);
        let attachment = registry.get(0).unwrap().attachment;

        // Registry array cleared, DOM node survived.
        registry.reset_all();
        assert!(registry.is_empty());

        registry.register_feed_container(&mut doc, container);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0).unwrap().attachment, attachment);
        assert_eq!(
            doc.children(container)
                .iter()
                .filter(|&&c| doc.attr(c, ATTACHMENT_ATTR).is_some())
                .count(),
            1
        );
    }

    #[test]
    fn attachment_is_pointer_transparent_and_full_bleed() {
        let (mut doc, container) = doc_with_container();
        let mut registry = OverlayRegistry::new();
        registry.register_feed_container(&mut doc, container);

        let handle = registry.get(0).unwrap();
        assert!(doc.is_pointer_transparent(handle.attachment));
        assert_eq!(doc.rect(handle.attachment).width, 640.0);
        assert_eq!(doc.rect(handle.attachment).height, 360.0);
        assert_eq!(doc.anchor(handle.surface), Anchor::BottomCenter);
        assert!(!doc.is_visible(handle.surface));
    }

    #[test]
    fn set_active_hides_previous_surface() {
        let (mut doc, container_a) = doc_with_container();
        let container_b = doc.create_element("div");
        doc.set_rect(container_b, Rect::new(0.0, 0.0, 640.0, 360.0));
        let root = doc.root();
        doc.append_child(root, container_b);

        let mut registry = OverlayRegistry::new();
        registry.register_feed_container(&mut doc, container_a);
        registry.register_feed_container(&mut doc, container_b);

        registry.set_active(&mut doc, Some(0)).unwrap();
        let surface_a = registry.get(0).unwrap().surface;
        doc.set_text(surface_a, "lingering caption");
        doc.set_visible(surface_a, true);

        registry.set_active(&mut doc, Some(1)).unwrap();
        assert_eq!(doc.text(surface_a), "");
        assert!(!doc.is_visible(surface_a));
        assert_eq!(registry.active(), Some(1));
    }

    #[test]
    fn set_active_rejects_out_of_range() {
        let (mut doc, container) = doc_with_container();
        let mut registry = OverlayRegistry::new();
        registry.register_feed_container(&mut doc, container);

        assert!(matches!(
            registry.set_active(&mut doc, Some(3)),
            Err(OverlayError::IndexOutOfRange { index: 3, len: 1 })
        ));
        // None (captions off) is always valid.
        registry.set_active(&mut doc, None).unwrap();
    }

    #[test]
    fn sync_order_follows_document_and_keeps_active_handle() {
        let (mut doc, container_a) = doc_with_container();
        let container_b = doc.create_element("div");
        doc.set_rect(container_b, Rect::new(0.0, 0.0, 640.0, 360.0));
        let root = doc.root();
        doc.append_child(root, container_b);

        let mut registry = OverlayRegistry::new();
        registry.register_feed_container(&mut doc, container_a);
        registry.register_feed_container(&mut doc, container_b);
        registry.set_active(&mut doc, Some(1)).unwrap();
        let active_attachment = registry.get(1).unwrap().attachment;

        // Host moved container B before container A.
        registry.sync_order(&[container_b, container_a]);
        assert_eq!(registry.get(0).unwrap().container, container_b);
        assert_eq!(registry.active(), Some(0));
        assert_eq!(registry.get(0).unwrap().attachment, active_attachment);
    }
}
