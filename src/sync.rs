//! Playback sync loop
//!
//! The per-frame task: read the leading video's clock, look up the active
//! cue, and update the active overlay's text. Modeled as `tick()` calls
//! that return the delay until the next iteration, so the driver
//! reschedules only after one iteration completes -- the loop never
//! overlaps itself and always observes the latest selection.

use std::time::Duration;

use tracing::debug;

use crate::config::SessionConfig;
use crate::cue::CueIndex;
use crate::dom::{Document, Marker, NodeId};
use crate::registry::OverlayRegistry;

/// Per-frame caption update state.
#[derive(Debug)]
pub struct PlaybackSync {
    leader_marker: Marker,
    frame_interval: Duration,
    poll_interval: Duration,
    leader: Option<NodeId>,
    /// Text most recently written to a surface. `None` forces the next
    /// lookup to write, used after leader or selection changes.
    last_text: Option<String>,
    /// Locally cached copy of the active index, compared each frame to
    /// catch selection changes.
    last_active: Option<usize>,
    surface_writes: u64,
}

impl PlaybackSync {
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            leader_marker: config.leader_marker.clone(),
            frame_interval: config.frame_interval(),
            poll_interval: config.leader_poll(),
            leader: None,
            last_text: None,
            last_active: None,
            surface_writes: 0,
        }
    }

    /// One loop iteration. Returns the delay before the next one: the
    /// frame interval normally, or the coarser poll interval while the
    /// leader video is missing (no busy-spinning through a host page
    /// transition).
    pub fn tick(
        &mut self,
        doc: &mut Document,
        cues: &CueIndex,
        registry: &OverlayRegistry,
    ) -> Duration {
        let leader = match self.leader.filter(|&l| doc.is_connected(l)) {
            Some(l) => l,
            None => match doc.query_first(&self.leader_marker) {
                Some(l) => {
                    // A replacement element's clock is unrelated to the old
                    // one's; force the next lookup to rewrite.
                    self.last_text = None;
                    self.leader = Some(l);
                    debug!("leader video acquired");
                    l
                }
                None => {
                    self.leader = None;
                    return self.poll_interval;
                }
            },
        };

        let active = registry.active();
        if active != self.last_active {
            // Clear the previous surface so no stale caption lingers on a
            // feed that is no longer selected.
            if let Some(handle) = self.last_active.and_then(|i| registry.get(i)) {
                let surface = handle.surface;
                doc.set_text(surface, "");
                doc.set_visible(surface, false);
            }
            self.last_text = None;
            self.last_active = active;
        }

        if cues.is_empty() {
            return self.frame_interval;
        }
        let Some(handle) = active.and_then(|i| registry.get(i)) else {
            return self.frame_interval;
        };
        let Some(media) = doc.media(leader) else {
            return self.frame_interval;
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let time_ms = (media.current_time_s * 1000.0) as u64;
        let text = cues
            .lookup(time_ms)
            .map(|c| c.content.clone())
            .unwrap_or_default();

        // Touch the surface only when the text differs. Unconditional
        // writes would land in the journal every frame and retrigger the
        // reconciler's mutation filtering for nothing.
        if self.last_text.as_deref() != Some(text.as_str()) {
            let surface = handle.surface;
            self.write_surface(doc, surface, &text);
            self.last_text = Some(text);
        }

        self.frame_interval
    }

    /// Forget the cached text and active index, forcing the next tick to
    /// rewrite. Runs after a structural reset: the surface the cache
    /// described was rebuilt blank, so a matching lookup must still write
    /// even when the leader video itself survived the rebuild.
    pub fn invalidate(&mut self) {
        self.last_text = None;
        self.last_active = None;
    }

    fn write_surface(&mut self, doc: &mut Document, surface: NodeId, text: &str) {
        self.surface_writes += 1;
        doc.set_text(surface, text);
        doc.set_visible(surface, !text.is_empty());
    }

    /// How many times the display-text write path has run. The no-flicker
    /// invariant is checked against this counter.
    #[must_use]
    pub fn surface_writes(&self) -> u64 {
        self.surface_writes
    }

    /// The leader video currently driving caption timing.
    #[must_use]
    pub fn leader(&self) -> Option<NodeId> {
        self.leader
    }
}
