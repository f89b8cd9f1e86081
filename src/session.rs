//! Caption session
//!
//! One owned object holding the cue table, overlay registry, selection
//! flags, and loop state, with an explicit lifecycle: `new`,
//! `on_transcript`, `on_mutation`, `tick`, `dispose`. The driver calls
//! `on_mutation` from its observer callback and `tick` from its frame
//! task; both communicate only through this object, so clear-then-rebuild
//! during a reset is atomic as far as the frame task can observe.

use std::time::{Duration, Instant};

use tracing::info;

use crate::config::SessionConfig;
use crate::controls::CaptionControls;
use crate::cue::CueIndex;
use crate::dom::{Document, NodeId};
use crate::drag::{DragController, PointerEvent};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::registry::{OverlayError, OverlayRegistry};
use crate::selection::{SelectionController, SelectionState};
use crate::sync::PlaybackSync;
use crate::transcript::RawCue;

/// A running caption session over one host document.
pub struct Session {
    config: SessionConfig,
    cues: CueIndex,
    registry: OverlayRegistry,
    selection: SelectionController,
    controls: CaptionControls,
    reconciler: Reconciler,
    sync: PlaybackSync,
    drag: DragController,
    created_at: Instant,
    transcript_received: bool,
    notice_logged: bool,
    disposed: bool,
}

impl Session {
    /// Create an idle session. Nothing touches the document until the
    /// first `on_mutation` or `tick`.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            reconciler: Reconciler::new(&config),
            sync: PlaybackSync::new(&config),
            config,
            cues: CueIndex::default(),
            registry: OverlayRegistry::new(),
            selection: SelectionController::new(),
            controls: CaptionControls::new(),
            drag: DragController::new(),
            created_at: Instant::now(),
            transcript_received: false,
            notice_logged: false,
            disposed: false,
        }
    }

    /// Receive a transcript message. Replaces the cue table wholesale;
    /// malformed entries are dropped and out-of-order ones sorted by the
    /// index build.
    pub fn on_transcript(&mut self, raw: Vec<RawCue>) {
        let received = raw.len();
        self.cues = CueIndex::build(raw);
        self.transcript_received = true;
        info!(
            received,
            kept = self.cues.len(),
            "transcript received"
        );
    }

    /// The observer callback: drain the document's mutation journal and
    /// run one reconciliation pass over it.
    pub fn on_mutation(&mut self, doc: &mut Document) -> ReconcileOutcome {
        if self.disposed {
            return ReconcileOutcome::default();
        }
        let records = doc.take_mutations();
        let outcome = self.reconciler.run(
            doc,
            &mut self.registry,
            &mut self.selection,
            &mut self.controls,
            &records,
        );
        if outcome.structural_reset {
            // The rebuilt surfaces start blank; the frame loop's cached
            // text would otherwise suppress the rewrite.
            self.sync.invalidate();
        }
        outcome
    }

    /// One frame of the sync loop. Returns the delay until the next tick;
    /// the driver sleeps that long and calls again.
    pub fn tick(&mut self, doc: &mut Document) -> Duration {
        if self.disposed {
            return self.config.frame_interval();
        }
        if !self.transcript_received
            && !self.notice_logged
            && self.created_at.elapsed() >= self.config.transcript_wait()
        {
            // Non-fatal: the control and overlays keep working, captions
            // just stay inert.
            info!("no transcript received; lecture may not have one");
            self.notice_logged = true;
        }
        self.sync.tick(doc, &self.cues, &self.registry)
    }

    /// Manual selection of a feed (or `None` for Off), e.g. from a menu
    /// entry. Sticks until the next structural reset.
    pub fn select_feed(
        &mut self,
        doc: &mut Document,
        choice: Option<usize>,
    ) -> Result<(), OverlayError> {
        self.selection.select_manual(doc, &mut self.registry, choice)?;
        self.controls.close_menu(doc);
        self.controls
            .refresh(doc, self.registry.len(), self.registry.active());
        Ok(())
    }

    /// The CC control's click behavior: cycle through the feeds and Off.
    /// A deliberate user action, so it counts as a manual choice.
    pub fn cycle_captions(&mut self, doc: &mut Document) {
        if self.registry.is_empty() {
            return;
        }
        let next = CaptionControls::cycle(self.registry.active(), self.registry.len());
        // In range by construction.
        let _ = self.selection.select_manual(doc, &mut self.registry, next);
        self.controls
            .refresh(doc, self.registry.len(), self.registry.active());
    }

    /// Open the feed-selection menu under the CC control.
    pub fn open_menu(&mut self, doc: &mut Document) {
        let feed_count = self.registry.len();
        self.controls.open_menu(doc, feed_count);
    }

    /// Close the feed-selection menu.
    pub fn close_menu(&mut self, doc: &mut Document) {
        self.controls.close_menu(doc);
    }

    /// A click on a menu entry node.
    pub fn choose_menu_entry(
        &mut self,
        doc: &mut Document,
        entry: NodeId,
    ) -> Result<(), OverlayError> {
        match CaptionControls::entry_choice(doc, entry) {
            Some(choice) => self.select_feed(doc, choice),
            None => Ok(()),
        }
    }

    /// Route a pointer event targeting overlay `index`'s surface into the
    /// drag controller.
    pub fn pointer_event(&mut self, doc: &mut Document, index: usize, event: PointerEvent) {
        self.drag.handle(doc, &mut self.registry, index, event);
    }

    /// Restore overlay `index`'s surface to its default anchor.
    pub fn reset_overlay_position(&mut self, doc: &mut Document, index: usize) {
        DragController::reset_position(doc, &mut self.registry, index);
    }

    /// Current selection snapshot.
    #[must_use]
    pub fn selection(&self) -> SelectionState {
        SelectionState {
            active: self.registry.active(),
            user_chose: self.selection.user_chose(),
        }
    }

    /// Number of discovered feeds.
    #[must_use]
    pub fn overlay_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of cues in the current table.
    #[must_use]
    pub fn cue_count(&self) -> usize {
        self.cues.len()
    }

    /// How many times the display-text write path has run.
    #[must_use]
    pub fn surface_writes(&self) -> u64 {
        self.sync.surface_writes()
    }

    /// The overlay registry, for inspection.
    #[must_use]
    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    /// The injected controls, for inspection.
    #[must_use]
    pub fn controls(&self) -> &CaptionControls {
        &self.controls
    }

    /// Text currently shown on the active surface, if visible.
    #[must_use]
    pub fn displayed_text<'d>(&self, doc: &'d Document) -> Option<&'d str> {
        let handle = self.registry.active().and_then(|i| self.registry.get(i))?;
        if doc.is_visible(handle.surface) {
            Some(doc.text(handle.surface))
        } else {
            None
        }
    }

    /// Tear the session down: remove every injected node and stop
    /// reacting to further calls. Normally the page unload does this
    /// implicitly; tests and embedders can do it explicitly.
    pub fn dispose(&mut self, doc: &mut Document) {
        if self.disposed {
            return;
        }
        for handle in self.registry.handles().to_vec() {
            doc.detach(handle.attachment);
        }
        self.controls.dispose(doc);
        self.registry.reset_all();
        self.registry.force_active(None);
        self.disposed = true;
        info!("session disposed");
    }
}
