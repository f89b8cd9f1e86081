//! Transcript ingestion
//!
//! The transcript arrives once, from an external interception layer, as an
//! array of raw cue objects with possibly missing fields. This module
//! defines that wire shape and parsers for the two formats the driver
//! feeds in: the raw JSON array and plain SRT text.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::cue::Cue;

/// A cue as delivered over the wire, before validation.
///
/// Every field is optional; [`crate::cue::CueIndex::build`] drops entries
/// with anything missing instead of aborting the whole transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCue {
    pub start_ms: Option<u64>,
    pub end_ms: Option<u64>,
    pub content: Option<String>,
}

impl RawCue {
    /// Validate into a [`Cue`]; `None` when a field is missing, the
    /// content is empty, or the interval is inverted.
    #[must_use]
    pub fn into_cue(self) -> Option<Cue> {
        let start_ms = self.start_ms?;
        let end_ms = self.end_ms?;
        let content = self.content?;
        if content.is_empty() || start_ms > end_ms {
            return None;
        }
        Some(Cue {
            start_ms,
            end_ms,
            content,
        })
    }
}

/// Parse a transcript message: a JSON array of raw cue objects.
pub fn parse_json(json: &str) -> Result<Vec<RawCue>> {
    serde_json::from_str(json).context("transcript message is not a raw cue array")
}

/// Parse SRT text into raw cues.
///
/// Malformed blocks are skipped rather than failing the whole file; only
/// an unparseable timestamp line aborts, since that usually means the
/// input is not SRT at all.
pub fn parse_srt(content: &str) -> Result<Vec<RawCue>> {
    let mut entries = Vec::new();
    let mut lines = content.lines().peekable();

    while lines.peek().is_some() {
        while lines.peek().is_some_and(|l| l.trim().is_empty()) {
            lines.next();
        }

        let seq_line = match lines.next() {
            Some(l) => l,
            None => break,
        };
        if seq_line.trim().parse::<u32>().is_err() {
            continue;
        }

        let time_line = match lines.next() {
            Some(l) => l,
            None => break,
        };
        let (start_ms, end_ms) = parse_timestamp_line(time_line)?;

        let mut text_lines = Vec::new();
        while lines.peek().is_some_and(|l| !l.trim().is_empty()) {
            if let Some(line) = lines.next() {
                text_lines.push(line);
            }
        }

        entries.push(RawCue {
            start_ms: Some(start_ms),
            end_ms: Some(end_ms),
            content: Some(text_lines.join("\n")),
        });
    }

    Ok(entries)
}

/// Parse "HH:MM:SS,mmm --> HH:MM:SS,mmm".
fn parse_timestamp_line(line: &str) -> Result<(u64, u64)> {
    let parts: Vec<&str> = line.split("-->").collect();
    if parts.len() != 2 {
        return Err(anyhow!("invalid timestamp line: {line}"));
    }
    Ok((
        parse_timestamp(parts[0].trim())?,
        parse_timestamp(parts[1].trim())?,
    ))
}

/// Parse "HH:MM:SS,mmm" to milliseconds.
fn parse_timestamp(ts: &str) -> Result<u64> {
    let parts: Vec<&str> = ts.split([',', ':']).collect();
    if parts.len() != 4 {
        return Err(anyhow!("invalid timestamp: {ts}"));
    }
    let hours: u64 = parts[0].parse()?;
    let minutes: u64 = parts[1].parse()?;
    let seconds: u64 = parts[2].parse()?;
    let millis: u64 = parts[3].parse()?;
    Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + millis)
}
