//! In-memory live document
//!
//! The engine runs against a host page it does not control. This module
//! models that page: an arena of element nodes with parent/child links,
//! attributes, per-node layout rects, a playback clock on video elements,
//! and a mutation journal equivalent to `MutationObserver` records.
//!
//! A document can be seeded from an HTML snapshot (parsed with `scraper`);
//! the driver then plays the host framework's role by mutating the tree
//! between frames. Text, attribute, and child-list changes are journaled;
//! layout and clock changes are not, matching what a real observer reports.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

/// Handle to a node in a [`Document`] arena.
///
/// Ids stay valid after the node is detached from the tree; a detached
/// node simply reports `connected == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Axis-aligned layout rectangle, in pixels, relative to the node's parent.
///
/// The document has no layout engine; rects are supplied by the driver
/// (or via `data-rect` attributes in an HTML snapshot) and read by the
/// overlay positioning code.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a rect from origin and size.
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// Playback state carried by `<video>` elements.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaState {
    /// Current playback position in seconds.
    pub current_time_s: f64,
}

/// How a node is positioned inside its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    /// Centered horizontally, a small margin above the bottom edge.
    /// The default caption surface position.
    BottomCenter,
    /// Absolute pixel offset from the parent's top-left corner.
    Pixels { top: f32, left: f32 },
}

/// What kind of change a [`MutationRecord`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Children added to or removed from the target.
    ChildList,
    /// The target's text content changed.
    CharacterData,
    /// An attribute, visibility, or anchor change on the target.
    Attributes,
}

/// One journaled mutation, analogous to a `MutationObserver` record.
#[derive(Debug, Clone, Copy)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

/// Attribute-based node selector, e.g. `[data-test-component="VideoWrapper"]`.
///
/// The host page offers no semantic ids; stable data attributes are the
/// only reliable way to find its structures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Attribute name to match.
    pub attribute: String,
    /// Required attribute value; `None` matches mere presence.
    pub value: Option<String>,
}

impl Marker {
    /// Match any element carrying `attribute` with exactly `value`.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: Some(value.into()),
        }
    }

    /// Match any element carrying `attribute`, regardless of value.
    #[must_use]
    pub fn presence(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: None,
        }
    }

    fn matches(&self, attrs: &HashMap<String, String>) -> bool {
        match (attrs.get(&self.attribute), self.value.as_deref()) {
            (Some(v), Some(want)) => v == want,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: HashMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    text: String,
    visible: bool,
    anchor: Anchor,
    pointer_transparent: bool,
    rect: Rect,
    media: Option<MediaState>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: HashMap::new(),
            parent: None,
            children: Vec::new(),
            text: String::new(),
            visible: true,
            anchor: Anchor::Pixels { top: 0.0, left: 0.0 },
            pointer_transparent: false,
            rect: Rect::default(),
            media: if tag == "video" {
                Some(MediaState::default())
            } else {
                None
            },
        }
    }
}

/// The live document: node arena, root, and mutation journal.
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    journal: Vec<MutationRecord>,
}

impl Document {
    /// Create an empty document with a `body` root.
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            journal: Vec::new(),
        };
        let root = doc.alloc(Node::new("body"));
        doc.root = root;
        doc
    }

    /// Parse an HTML snapshot into a live document.
    ///
    /// Element tags and attributes are imported as-is; text content is
    /// folded into the owning element. A `data-rect="x y w h"` attribute
    /// seeds the element's layout rect, since snapshots carry no layout.
    /// The journal starts empty: loading a snapshot is the initial render,
    /// not a host mutation.
    pub fn from_html(html: &str) -> Result<Self> {
        let parsed = Html::parse_document(html);
        let mut doc = Self::new();
        let root = doc.root;
        for child in parsed.root_element().children() {
            if let Some(el) = ElementRef::wrap(child) {
                doc.import_element(root, el)?;
            }
        }
        doc.journal.clear();
        Ok(doc)
    }

    fn import_element(&mut self, parent: NodeId, el: ElementRef) -> Result<NodeId> {
        let id = self.create_element(el.value().name());
        for (name, value) in el.value().attrs() {
            self.set_attr(id, name, value);
            if name == "data-rect" {
                self.node_mut(id).rect = parse_rect(value)?;
            }
        }
        self.append_child(parent, id);
        for child in el.children() {
            if let Some(child_el) = ElementRef::wrap(child) {
                self.import_element(id, child_el)?;
            } else if let Some(text) = child.value().as_text() {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    let node = self.node_mut(id);
                    if !node.text.is_empty() {
                        node.text.push(' ');
                    }
                    node.text.push_str(trimmed);
                }
            }
        }
        Ok(id)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        self.journal.push(MutationRecord { target, kind });
    }

    /// The document root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(Node::new(tag))
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// A child that already has a parent is detached first, so appending
    /// an attached node moves it (DOM `appendChild` semantics).
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
        self.record(parent, MutationKind::ChildList);
    }

    /// Insert `child` into `parent` immediately before `reference`.
    ///
    /// Falls back to appending when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|&c| c == reference);
        match pos {
            Some(i) => self.node_mut(parent).children.insert(i, child),
            None => self.node_mut(parent).children.push(child),
        }
        self.node_mut(child).parent = Some(parent);
        self.record(parent, MutationKind::ChildList);
    }

    /// Remove `node` from its parent. The node and its subtree survive in
    /// the arena but report `connected() == false`.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.node(node).parent {
            self.node_mut(parent).children.retain(|&c| c != node);
            self.node_mut(node).parent = None;
            self.record(parent, MutationKind::ChildList);
        }
    }

    /// Is `node` still reachable from the root?
    #[must_use]
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.node(current).parent {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    /// Does `node` equal `ancestor` or sit anywhere below it?
    #[must_use]
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == ancestor {
                return true;
            }
            match self.node(current).parent {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    /// Does `node` or any of its ancestors carry `attribute`?
    #[must_use]
    pub fn in_subtree_with_attr(&self, node: NodeId, attribute: &str) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.node(id).attrs.contains_key(attribute) {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    /// Parent of `node`, if attached.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    /// Children of `node`, in order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    /// Tag name of `node`.
    #[must_use]
    pub fn tag(&self, node: NodeId) -> &str {
        &self.node(node).tag
    }

    /// Attribute value, if set.
    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node).attrs.get(name).map(String::as_str)
    }

    /// Set an attribute. Journaled.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        self.node_mut(node)
            .attrs
            .insert(name.to_string(), value.to_string());
        self.record(node, MutationKind::Attributes);
    }

    /// Remove an attribute if present. Journaled when something changed.
    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if self.node_mut(node).attrs.remove(name).is_some() {
            self.record(node, MutationKind::Attributes);
        }
    }

    /// Text content of `node`.
    #[must_use]
    pub fn text(&self, node: NodeId) -> &str {
        &self.node(node).text
    }

    /// Replace the text content of `node`. Journaled.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        let n = self.node_mut(node);
        if n.text != text {
            n.text = text.to_string();
            self.record(node, MutationKind::CharacterData);
        }
    }

    /// Is `node` visible?
    #[must_use]
    pub fn is_visible(&self, node: NodeId) -> bool {
        self.node(node).visible
    }

    /// Show or hide `node`. Journaled (a style change on a real page).
    pub fn set_visible(&mut self, node: NodeId, visible: bool) {
        let n = self.node_mut(node);
        if n.visible != visible {
            n.visible = visible;
            self.record(node, MutationKind::Attributes);
        }
    }

    /// Current anchor of `node`.
    #[must_use]
    pub fn anchor(&self, node: NodeId) -> Anchor {
        self.node(node).anchor
    }

    /// Re-anchor `node`. Journaled (a style change on a real page).
    pub fn set_anchor(&mut self, node: NodeId, anchor: Anchor) {
        self.node_mut(node).anchor = anchor;
        self.record(node, MutationKind::Attributes);
    }

    /// Does `node` pass pointer events through to the nodes beneath it?
    #[must_use]
    pub fn is_pointer_transparent(&self, node: NodeId) -> bool {
        self.node(node).pointer_transparent
    }

    /// Make `node` transparent (or opaque) to pointer events.
    pub fn set_pointer_transparent(&mut self, node: NodeId, transparent: bool) {
        self.node_mut(node).pointer_transparent = transparent;
    }

    /// Layout rect of `node`. Not journaled; layout is not a DOM mutation.
    #[must_use]
    pub fn rect(&self, node: NodeId) -> Rect {
        self.node(node).rect
    }

    /// Set the layout rect of `node`.
    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        self.node_mut(node).rect = rect;
    }

    /// Playback state, for video elements.
    #[must_use]
    pub fn media(&self, node: NodeId) -> Option<MediaState> {
        self.node(node).media
    }

    /// Advance a video element's playback clock. Not journaled; the real
    /// observer does not report `currentTime` changes either.
    pub fn set_media_time(&mut self, node: NodeId, seconds: f64) {
        if let Some(media) = &mut self.node_mut(node).media {
            media.current_time_s = seconds;
        }
    }

    /// All connected elements matching `marker`, in document order.
    #[must_use]
    pub fn query_all(&self, marker: &Marker) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(self.root, marker, &mut found);
        found
    }

    /// First connected element matching `marker`, in document order.
    #[must_use]
    pub fn query_first(&self, marker: &Marker) -> Option<NodeId> {
        self.query_all(marker).into_iter().next()
    }

    fn walk(&self, node: NodeId, marker: &Marker, found: &mut Vec<NodeId>) {
        if marker.matches(&self.node(node).attrs) {
            found.push(node);
        }
        for &child in &self.node(node).children {
            self.walk(child, marker, found);
        }
    }

    /// Drain the mutation journal, yielding every record since the last
    /// drain. The observer callback consumes these in one batch.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.journal)
    }

    /// Number of pending journal records (diagnostics and tests).
    #[must_use]
    pub fn pending_mutations(&self) -> usize {
        self.journal.len()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a `data-rect` attribute: four numbers separated by spaces or commas.
fn parse_rect(value: &str) -> Result<Rect> {
    let parts: Vec<f32> = value
        .split([',', ' '])
        .filter(|p| !p.is_empty())
        .map(|p| p.trim().parse::<f32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| anyhow!("invalid data-rect {value:?}: {e}"))?;
    if parts.len() != 4 {
        return Err(anyhow!("invalid data-rect {value:?}: expected 4 numbers"));
    }
    Ok(Rect::new(parts[0], parts[1], parts[2], parts[3]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_connectedness() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        assert!(!doc.is_connected(a));

        doc.append_child(doc.root(), a);
        doc.append_child(a, b);
        assert!(doc.is_connected(a));
        assert!(doc.is_connected(b));

        doc.detach(a);
        assert!(!doc.is_connected(a));
        assert!(!doc.is_connected(b), "detaching a subtree disconnects descendants");
    }

    #[test]
    fn append_moves_attached_nodes() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let c = doc.create_element("span");
        doc.append_child(doc.root(), a);
        doc.append_child(doc.root(), b);
        doc.append_child(a, c);

        doc.append_child(b, c);
        assert_eq!(doc.children(a).len(), 0);
        assert_eq!(doc.children(b), &[c]);
        assert!(doc.is_connected(c));
    }

    #[test]
    fn query_in_document_order() {
        let mut doc = Document::new();
        let marker = Marker::new("data-kind", "feed");
        let first = doc.create_element("div");
        let second = doc.create_element("div");
        doc.append_child(doc.root(), first);
        doc.append_child(doc.root(), second);
        doc.set_attr(first, "data-kind", "feed");
        doc.set_attr(second, "data-kind", "feed");

        assert_eq!(doc.query_all(&marker), vec![first, second]);

        // Moving the first node to the end changes document order.
        doc.append_child(doc.root(), first);
        assert_eq!(doc.query_all(&marker), vec![second, first]);
    }

    #[test]
    fn journal_records_and_drains() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        doc.append_child(doc.root(), a);
        doc.set_text(a, "hi");
        let records = doc.take_mutations();
        assert!(records.len() >= 2);
        assert!(doc.take_mutations().is_empty());

        // Unchanged text does not journal.
        doc.set_text(a, "hi");
        assert_eq!(doc.pending_mutations(), 0);
    }

    #[test]
    fn from_html_imports_tree_and_rects() {
        let html = r#"
            <div data-test-component="VideoWrapper" data-rect="0 0 640 360">
                <video data-test="leader"></video>
            </div>
            <button data-testid="transcript-button">Transcript</button>
        "#;
        let doc = Document::from_html(html).unwrap();

        let wrapper = doc
            .query_first(&Marker::new("data-test-component", "VideoWrapper"))
            .unwrap();
        assert_eq!(doc.rect(wrapper).width, 640.0);

        let video = doc.query_first(&Marker::new("data-test", "leader")).unwrap();
        assert_eq!(doc.tag(video), "video");
        assert!(doc.media(video).is_some());

        let button = doc
            .query_first(&Marker::presence("data-testid"))
            .unwrap();
        assert_eq!(doc.text(button), "Transcript");

        // A snapshot load is the initial render, not host mutation.
        assert_eq!(doc.pending_mutations(), 0);
    }

    #[test]
    fn marker_presence_matches_any_value() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        doc.append_child(doc.root(), a);
        doc.set_attr(a, "data-spotlight", "true");
        assert_eq!(doc.query_first(&Marker::presence("data-spotlight")), Some(a));
        assert_eq!(doc.query_first(&Marker::new("data-spotlight", "false")), None);
    }
}
