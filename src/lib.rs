//! `overcue` - Caption synchronization and overlay engine
//!
//! Overlays synchronized captions on a multi-feed lecture player living
//! in a host page this crate does not control.
//!
//! # Features
//!
//! - **Cue index**: sorted time-interval table, binary-search lookup per frame
//! - **Overlay lifecycle**: one surface per feed, tracked across host re-renders
//! - **Reconciliation**: structural-reset detection and rediscovery, with
//!   self-mutation filtering so the engine never loops against its own writes
//! - **Selection**: manual pick vs automatic spotlight-following
//! - **Drag repositioning**: surfaces may be dragged, clamped to their container
//!
//! # Example
//!
//! ```rust
//! use overcue::{Document, RawCue, Session, SessionConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut doc = Document::from_html(
//!     r#"<div data-test-component="VideoWrapper" data-rect="0 0 640 360">
//!            <video data-test="leader"></video>
//!        </div>"#,
//! )?;
//! let mut session = Session::new(SessionConfig::default());
//! session.on_mutation(&mut doc);
//! session.on_transcript(vec![RawCue {
//!     start_ms: Some(0),
//!     end_ms: Some(2000),
//!     content: Some("Hello".into()),
//! }]);
//! session.tick(&mut doc);
//! assert_eq!(session.displayed_text(&doc), Some("Hello"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controls;
pub mod cue;
pub mod dom;
pub mod drag;
pub mod reconcile;
pub mod registry;
pub mod selection;
pub mod session;
pub mod sync;
pub mod transcript;

pub use config::SessionConfig;
pub use controls::CaptionControls;
pub use cue::{Cue, CueIndex};
pub use dom::{Anchor, Document, Marker, MutationKind, MutationRecord, NodeId, Rect};
pub use drag::{DragController, PointerEvent, PointerKind};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use registry::{OverlayError, OverlayHandle, OverlayRegistry};
pub use selection::{SelectionController, SelectionState};
pub use session::Session;
pub use sync::PlaybackSync;
pub use transcript::{parse_json, parse_srt, RawCue};

/// Version of overcue
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
