//! Session configuration
//!
//! The host page's stable markers plus the engine's timing constants.
//! Defaults match the lecture player this was built against; a TOML file
//! can override any field.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dom::Marker;

/// Configuration for one caption session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Marker identifying one video feed container.
    pub feed_marker: Marker,
    /// Marker identifying the leading video element, whose playback clock
    /// drives caption timing.
    pub leader_marker: Marker,
    /// Marker for the host control next to which the CC control is
    /// injected; its absence gates injection.
    pub reference_control_marker: Marker,
    /// Attribute the host sets on the feed container it currently
    /// presents as primary. Presence is enough; the value is ignored.
    pub spotlight_attribute: String,
    /// Target interval between sync-loop iterations, in milliseconds.
    pub frame_interval_ms: u64,
    /// Poll interval while the leader video is missing, in milliseconds.
    /// Deliberately coarse so the loop does not busy-spin through a host
    /// page transition.
    pub leader_poll_ms: u64,
    /// How long to wait for a transcript before logging the one
    /// informational "no transcript" notice, in milliseconds.
    pub transcript_wait_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            feed_marker: Marker::new("data-test-component", "VideoWrapper"),
            leader_marker: Marker::new("data-test", "leader"),
            reference_control_marker: Marker::new("data-testid", "transcript-button"),
            spotlight_attribute: "data-spotlight".to_string(),
            frame_interval_ms: 16,
            leader_poll_ms: 200,
            transcript_wait_ms: 10_000,
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from TOML text. Missing fields take their
    /// defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid session config")
    }

    /// Frame interval as a [`Duration`].
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Leader poll interval as a [`Duration`].
    #[must_use]
    pub fn leader_poll(&self) -> Duration {
        Duration::from_millis(self.leader_poll_ms)
    }

    /// Transcript wait window as a [`Duration`].
    #[must_use]
    pub fn transcript_wait(&self) -> Duration {
        Duration::from_millis(self.transcript_wait_ms)
    }
}
