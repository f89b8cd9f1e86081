//! DOM reconciliation
//!
//! Runs on every host-page mutation batch and decides whether the feed
//! topology changed. The host's rendering framework replaces whole
//! subtrees on layout switches instead of mutating in place, so a
//! disconnected attachment node means the topology is unknown and must be
//! rediscovered from scratch.

use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::controls::CaptionControls;
use crate::dom::{Document, Marker, MutationRecord, NodeId};
use crate::registry::OverlayRegistry;
use crate::selection::SelectionController;

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOutcome {
    /// The whole batch originated from our own injected nodes, so no
    /// reconciliation work ran.
    pub skipped: bool,
    /// A structural reset was detected and applied.
    pub structural_reset: bool,
    /// The number of feeds differs from before the pass.
    pub feed_count_changed: bool,
    /// Feed count after the pass.
    pub feed_count: usize,
}

/// Reacts to host-page mutations by re-synchronizing the overlay registry.
#[derive(Debug)]
pub struct Reconciler {
    feed_marker: Marker,
    reference_control_marker: Marker,
    spotlight_attribute: String,
}

impl Reconciler {
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            feed_marker: config.feed_marker.clone(),
            reference_control_marker: config.reference_control_marker.clone(),
            spotlight_attribute: config.spotlight_attribute.clone(),
        }
    }

    /// One reconciliation pass over a drained mutation batch.
    ///
    /// An empty batch is treated as an explicit request (the initial scan,
    /// before any observer fires). A non-empty batch whose every record
    /// targets our own injected nodes is discarded outright: the sync
    /// loop's text writes land in the journal too, and reconciling on
    /// them would loop the observer against ourselves at frame rate.
    ///
    /// Safe with no feeds present; never panics.
    pub fn run(
        &self,
        doc: &mut Document,
        registry: &mut OverlayRegistry,
        selection: &mut SelectionController,
        controls: &mut CaptionControls,
        records: &[MutationRecord],
    ) -> ReconcileOutcome {
        if !records.is_empty() && records.iter().all(|r| Self::is_own(doc, r.target)) {
            return ReconcileOutcome {
                skipped: true,
                feed_count: registry.len(),
                ..ReconcileOutcome::default()
            };
        }

        let feeds_before = registry.len();

        let structural_reset = registry.handles().iter().any(|h| !h.is_connected(doc));
        if structural_reset {
            self.apply_reset(doc, registry, selection, controls);
        }

        let containers = self.scan_feeds(doc);
        for &container in &containers {
            registry.register_feed_container(doc, container);
        }
        registry.sync_order(&containers);

        let had_control = controls.button().is_some();
        let control_present = controls.ensure_injected(doc, &self.reference_control_marker);

        let spotlight = containers
            .iter()
            .position(|&c| doc.attr(c, &self.spotlight_attribute).is_some());
        selection.sync_spotlight(doc, registry, spotlight);

        let feed_count_changed = registry.len() != feeds_before;
        if feed_count_changed || structural_reset || (control_present && !had_control) {
            controls.refresh(doc, registry.len(), registry.active());
        }
        if feed_count_changed {
            debug!(feeds = registry.len(), "feed count changed");
        }

        ReconcileOutcome {
            skipped: false,
            structural_reset,
            feed_count_changed,
            feed_count: registry.len(),
        }
    }

    /// Structural reset: drop every handle, fall back to feed 0 pending
    /// rediscovery, re-enable auto-follow, and close the menu. The
    /// document itself is left alone; surviving nodes are rediscovered by
    /// the rescan and gone ones are gone.
    pub fn apply_reset(
        &self,
        doc: &mut Document,
        registry: &mut OverlayRegistry,
        selection: &mut SelectionController,
        controls: &mut CaptionControls,
    ) {
        info!("overlay attachment lost; resetting feed topology");
        registry.reset_all();
        registry.force_active(Some(0));
        selection.on_structural_reset();
        controls.close_menu(doc);
    }

    /// Current feed containers, in document order. Document order is the
    /// only identity feeds have.
    #[must_use]
    pub fn scan_feeds(&self, doc: &Document) -> Vec<NodeId> {
        doc.query_all(&self.feed_marker)
    }

    fn is_own(doc: &Document, node: NodeId) -> bool {
        OverlayRegistry::is_own_node(doc, node) || CaptionControls::is_own_node(doc, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Rect;

    struct Fixture {
        doc: Document,
        registry: OverlayRegistry,
        selection: SelectionController,
        controls: CaptionControls,
        reconciler: Reconciler,
    }

    fn fixture(feeds: usize) -> Fixture {
        let mut doc = Document::new();
        for i in 0..feeds {
            add_feed(&mut doc, i == 0);
        }
        let toolbar = doc.create_element("div");
        let reference = doc.create_element("button");
        doc.set_attr(reference, "data-testid", "transcript-button");
        doc.append_child(toolbar, reference);
        let root = doc.root();
        doc.append_child(root, toolbar);
        doc.take_mutations();

        Fixture {
            doc,
            registry: OverlayRegistry::new(),
            selection: SelectionController::new(),
            controls: CaptionControls::new(),
            reconciler: Reconciler::new(&SessionConfig::default()),
        }
    }

    fn add_feed(doc: &mut Document, spotlight: bool) -> crate::dom::NodeId {
        let container = doc.create_element("div");
        doc.set_attr(container, "data-test-component", "VideoWrapper");
        doc.set_rect(container, Rect::new(0.0, 0.0, 640.0, 360.0));
        if spotlight {
            doc.set_attr(container, "data-spotlight", "true");
        }
        let root = doc.root();
        doc.append_child(root, container);
        container
    }

    fn run(f: &mut Fixture) -> ReconcileOutcome {
        let records = f.doc.take_mutations();
        f.reconciler.run(
            &mut f.doc,
            &mut f.registry,
            &mut f.selection,
            &mut f.controls,
            &records,
        )
    }

    #[test]
    fn initial_pass_discovers_feeds_and_injects_control() {
        let mut f = fixture(2);
        let outcome = run(&mut f);
        assert!(!outcome.skipped);
        assert!(outcome.feed_count_changed);
        assert_eq!(outcome.feed_count, 2);
        assert_eq!(f.registry.active(), Some(0));
        assert!(f.controls.button().is_some());
    }

    #[test]
    fn own_mutations_are_filtered() {
        let mut f = fixture(1);
        run(&mut f);
        f.doc.take_mutations();

        // A frame's worth of caption writes: text + visibility on our surface.
        let surface = f.registry.get(0).unwrap().surface;
        f.doc.set_text(surface, "Hello");
        f.doc.set_visible(surface, true);

        let outcome = run(&mut f);
        assert!(outcome.skipped, "self-originated batch must not reconcile");
    }

    #[test]
    fn host_mutations_still_reconcile() {
        let mut f = fixture(1);
        run(&mut f);
        f.doc.take_mutations();

        add_feed(&mut f.doc, false);
        let outcome = run(&mut f);
        assert!(!outcome.skipped);
        assert_eq!(outcome.feed_count, 2);
    }

    #[test]
    fn safe_with_no_feeds_present() {
        let mut f = fixture(0);
        let outcome = run(&mut f);
        assert_eq!(outcome.feed_count, 0);
        assert_eq!(f.registry.active(), None);
        // Repeated passes stay harmless.
        let outcome = run(&mut f);
        assert!(!outcome.structural_reset);
        assert_eq!(outcome.feed_count, 0);
    }

    #[test]
    fn disconnected_attachment_triggers_reset() {
        let mut f = fixture(2);
        run(&mut f);
        f.selection
            .select_manual(&mut f.doc, &mut f.registry, Some(1))
            .unwrap();
        f.controls.open_menu(&mut f.doc, 2);
        f.doc.take_mutations();

        // Host replaces the whole player subtree.
        let container = f.registry.get(0).unwrap().container;
        f.doc.detach(container);
        let outcome = run(&mut f);

        assert!(outcome.structural_reset);
        assert!(!f.selection.user_chose());
        assert!(!f.controls.menu_open());
        // The surviving feed was rediscovered.
        assert_eq!(outcome.feed_count, 1);
        assert_eq!(f.registry.active(), Some(0));
    }

    #[test]
    fn reset_invariant_holds_before_rescan() {
        let mut f = fixture(2);
        run(&mut f);
        f.selection
            .select_manual(&mut f.doc, &mut f.registry, Some(1))
            .unwrap();

        f.reconciler
            .apply_reset(&mut f.doc, &mut f.registry, &mut f.selection, &mut f.controls);
        assert_eq!(f.registry.len(), 0, "registry empty until the next pass repopulates it");
        assert_eq!(f.registry.active(), Some(0));
        assert!(!f.selection.user_chose());
    }

    #[test]
    fn moved_container_is_resync_not_new_feed() {
        let mut f = fixture(2);
        run(&mut f);
        let feed0 = f.registry.get(0).unwrap().container;
        let feed1 = f.registry.get(1).unwrap().container;
        let attachment1 = f.registry.get(1).unwrap().attachment;
        f.selection
            .select_manual(&mut f.doc, &mut f.registry, Some(1))
            .unwrap();
        f.doc.take_mutations();

        // Host reorders: feed 1 moved before feed 0 (moved, not remounted).
        let root = f.doc.root();
        f.doc.insert_before(root, feed1, feed0);
        let outcome = run(&mut f);

        assert!(!outcome.structural_reset);
        assert_eq!(outcome.feed_count, 2);
        // Same handle, new index; the manual choice follows the handle.
        assert_eq!(f.registry.get(0).unwrap().attachment, attachment1);
        assert_eq!(f.registry.active(), Some(0));
        assert!(f.selection.user_chose());
    }

    #[test]
    fn spotlight_follow_happens_on_reconcile() {
        let mut f = fixture(2);
        run(&mut f);
        assert_eq!(f.registry.active(), Some(0));
        f.doc.take_mutations();

        // Host moves the spotlight to the second feed.
        let feed0 = f.registry.get(0).unwrap().container;
        let feed1 = f.registry.get(1).unwrap().container;
        f.doc.remove_attr(feed0, "data-spotlight");
        f.doc.set_attr(feed1, "data-spotlight", "true");
        run(&mut f);
        assert_eq!(f.registry.active(), Some(1));
    }
}
