//! Selection state machine
//!
//! Decides which overlay is active: a deliberate manual pick sticks until
//! the next structural reset; otherwise the selection follows the host
//! page's spotlight feed automatically.

use tracing::debug;

use crate::dom::Document;
use crate::registry::{OverlayError, OverlayRegistry};

/// Snapshot of the selection: which overlay is active (`None` = captions
/// off) and whether the user picked it manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionState {
    pub active: Option<usize>,
    pub user_chose: bool,
}

/// Policy layer over [`OverlayRegistry::set_active`].
#[derive(Debug, Default)]
pub struct SelectionController {
    user_chose: bool,
}

impl SelectionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Did the user make a manual pick since the last structural reset?
    #[must_use]
    pub fn user_chose(&self) -> bool {
        self.user_chose
    }

    /// Manual selection of feed `choice` (or `None` for "Off"). Persists
    /// across reconciliation passes until the next structural reset.
    pub fn select_manual(
        &mut self,
        doc: &mut Document,
        registry: &mut OverlayRegistry,
        choice: Option<usize>,
    ) -> Result<(), OverlayError> {
        registry.set_active(doc, choice)?;
        self.user_chose = true;
        debug!(?choice, "manual selection");
        Ok(())
    }

    /// Follow the host's spotlight feed, unless a manual pick is in force.
    ///
    /// `spotlight` is the registry index of the feed the host currently
    /// presents as primary; with no identifiable spotlight, feed 0 is the
    /// default. Runs on every reconciliation pass.
    pub fn sync_spotlight(
        &mut self,
        doc: &mut Document,
        registry: &mut OverlayRegistry,
        spotlight: Option<usize>,
    ) {
        if registry.is_empty() {
            if registry.active().is_some() {
                let _ = registry.set_active(doc, None);
            }
            return;
        }
        if self.user_chose {
            return;
        }
        let target = spotlight.unwrap_or(0);
        if registry.active() != Some(target) {
            debug!(target, "spotlight follow");
            // Target comes from the registry's own scan, so it is in range.
            let _ = registry.set_active(doc, Some(target));
        }
    }

    /// A structural reset invalidates any manual pick: the chosen feed no
    /// longer has a known target, so auto-follow re-enables.
    pub fn on_structural_reset(&mut self) {
        self.user_chose = false;
    }
}
