//! CC control and feed-selection menu
//!
//! A toggle injected beside the host's reference control, cycling
//! captions across feeds, plus a menu with one entry per feed and an Off
//! entry. Injection is gated on the reference control being rendered;
//! until then the session just retries on later reconciliation passes.

use tracing::debug;

use crate::dom::{Document, Marker, NodeId};

/// Attribute marking the injected CC control.
pub const CONTROL_ATTR: &str = "data-overcue-control";
/// Attribute marking the selection menu.
pub const MENU_ATTR: &str = "data-overcue-menu";
/// Attribute carrying a menu entry's choice: a feed index, or `off`.
pub const MENU_ENTRY_ATTR: &str = "data-overcue-entry";

/// Owns the injected control surfaces.
#[derive(Debug, Default)]
pub struct CaptionControls {
    button: Option<NodeId>,
    menu: Option<NodeId>,
}

impl CaptionControls {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the CC control exists next to the reference control.
    ///
    /// Returns whether the control is present afterwards; `false` means
    /// the reference control has not rendered yet and injection should be
    /// retried on a later pass.
    pub fn ensure_injected(&mut self, doc: &mut Document, reference_marker: &Marker) -> bool {
        if let Some(button) = self.button {
            if doc.is_connected(button) {
                return true;
            }
            // The host replaced the toolbar subtree; our node went with it.
            self.button = None;
            self.menu = None;
        }

        let Some(reference) = doc.query_first(reference_marker) else {
            return false;
        };
        let Some(parent) = doc.parent(reference) else {
            return false;
        };

        let button = doc.create_element("button");
        doc.set_attr(button, CONTROL_ATTR, "");
        doc.set_attr(button, "type", "button");
        doc.set_attr(button, "title", "Toggle Captions");
        doc.set_attr(button, "aria-pressed", "true");
        doc.set_text(button, "CC");
        doc.insert_before(parent, button, reference);
        self.button = Some(button);
        debug!("CC control injected");
        true
    }

    /// Refresh the control's visual state from the current feed count and
    /// selection.
    pub fn refresh(&self, doc: &mut Document, feed_count: usize, active: Option<usize>) {
        let Some(button) = self.button else {
            return;
        };
        doc.set_attr(button, "aria-pressed", if active.is_some() { "true" } else { "false" });
        let label = match active {
            Some(i) if feed_count > 1 => format!("CC {}", i + 1),
            _ => "CC".to_string(),
        };
        doc.set_text(button, &label);
    }

    /// Open the selection menu: one entry per feed plus Off. Replaces any
    /// menu already open.
    pub fn open_menu(&mut self, doc: &mut Document, feed_count: usize) {
        self.close_menu(doc);
        let Some(button) = self.button else {
            return;
        };
        let Some(parent) = doc.parent(button) else {
            return;
        };

        let menu = doc.create_element("div");
        doc.set_attr(menu, MENU_ATTR, "");
        for i in 0..feed_count {
            let entry = doc.create_element("div");
            doc.set_attr(entry, MENU_ENTRY_ATTR, &i.to_string());
            doc.set_text(entry, &format!("Feed {}", i + 1));
            doc.append_child(menu, entry);
        }
        let off = doc.create_element("div");
        doc.set_attr(off, MENU_ENTRY_ATTR, "off");
        doc.set_text(off, "Off");
        doc.append_child(menu, off);

        doc.append_child(parent, menu);
        self.menu = Some(menu);
    }

    /// Close the selection menu if open.
    pub fn close_menu(&mut self, doc: &mut Document) {
        if let Some(menu) = self.menu.take() {
            doc.detach(menu);
        }
    }

    /// Is the selection menu open?
    #[must_use]
    pub fn menu_open(&self) -> bool {
        self.menu.is_some()
    }

    /// The menu node, while open.
    #[must_use]
    pub fn menu(&self) -> Option<NodeId> {
        self.menu
    }

    /// The injected CC control, once present.
    #[must_use]
    pub fn button(&self) -> Option<NodeId> {
        self.button
    }

    /// Decode a menu entry node into a selection: `Some(None)` for Off,
    /// `Some(Some(i))` for feed `i`, `None` for anything else.
    #[must_use]
    pub fn entry_choice(doc: &Document, entry: NodeId) -> Option<Option<usize>> {
        match doc.attr(entry, MENU_ENTRY_ATTR)? {
            "off" => Some(None),
            value => value.parse::<usize>().ok().map(Some),
        }
    }

    /// Is `node` one of this system's control surfaces (or inside one)?
    #[must_use]
    pub fn is_own_node(doc: &Document, node: NodeId) -> bool {
        doc.in_subtree_with_attr(node, CONTROL_ATTR) || doc.in_subtree_with_attr(node, MENU_ATTR)
    }

    /// The CC control's click behavior: cycle feed 0, 1, ..., N-1, Off,
    /// and back to feed 0.
    #[must_use]
    pub fn cycle(active: Option<usize>, feed_count: usize) -> Option<usize> {
        match active {
            None => Some(0),
            Some(i) if i + 1 < feed_count => Some(i + 1),
            Some(_) => None,
        }
    }

    /// Remove every injected control surface from the document.
    pub fn dispose(&mut self, doc: &mut Document) {
        self.close_menu(doc);
        if let Some(button) = self.button.take() {
            doc.detach(button);
        }
    }
}
