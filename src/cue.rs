//! Time-indexed cue table
//!
//! Holds the sorted caption cues and answers "what text is active at time
//! T" once per frame, so lookup is a binary search over inclusive
//! `[start_ms, end_ms]` intervals.

use serde::{Deserialize, Serialize};

use crate::transcript::RawCue;

/// One caption cue: text plus the interval during which it displays.
///
/// Immutable after [`CueIndex::build`]; a fresh transcript replaces the
/// whole table rather than patching entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    /// Display start, in milliseconds. Always `<= end_ms`.
    pub start_ms: u64,
    /// Display end, in milliseconds, inclusive.
    pub end_ms: u64,
    /// Caption text.
    pub content: String,
}

/// Sorted cue table with interval lookup.
#[derive(Debug, Clone, Default)]
pub struct CueIndex {
    cues: Vec<Cue>,
    /// `max_end[i]` is the largest `end_ms` among `cues[..=i]`. Sorting by
    /// start alone cannot answer containment queries once a long cue
    /// encloses shorter ones; this non-decreasing column restores a binary
    /// search over ends.
    max_end: Vec<u64>,
}

impl CueIndex {
    /// Build an index from raw transcript entries.
    ///
    /// This is the only mutation point: entries missing a start time, end
    /// time, or content are dropped, as are entries whose interval is
    /// inverted, and the survivors are sorted ascending by start time.
    #[must_use]
    pub fn build(raw: Vec<RawCue>) -> Self {
        let mut cues: Vec<Cue> = raw.into_iter().filter_map(RawCue::into_cue).collect();
        cues.sort_by_key(|c| c.start_ms);
        let mut max_end = Vec::with_capacity(cues.len());
        let mut running = 0u64;
        for cue in &cues {
            running = running.max(cue.end_ms);
            max_end.push(running);
        }
        Self { cues, max_end }
    }

    /// The cue active at `time_ms`, or `None` when no interval contains it.
    ///
    /// Two binary searches, O(log n); boundaries are inclusive at both
    /// ends. When overlapping cues both contain `time_ms`, the
    /// earliest-starting one wins -- an explicit tie-break, so callers see
    /// deterministic behavior rather than a search-path artifact. Overlap
    /// itself is tolerated but carries no further guarantees.
    #[must_use]
    pub fn lookup(&self, time_ms: u64) -> Option<&Cue> {
        // Cues in ..started have begun by time_ms; within them, the first
        // index whose running max end reaches time_ms is the
        // earliest-starting containing cue (the max-end column steps up
        // exactly at that cue, so its own end covers time_ms).
        let started = self.cues.partition_point(|c| c.start_ms <= time_ms);
        let i = self.max_end[..started].partition_point(|&end| end < time_ms);
        if i < started {
            Some(&self.cues[i])
        } else {
            None
        }
    }

    /// Number of cues in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Is the table empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// The sorted cues, for inspection.
    #[must_use]
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }
}
