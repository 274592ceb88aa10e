//! # pensum
//!
//! An obligation tracker built around a temporal classification and lifecycle
//! engine: free-text tasks with optional due instants, resolved against the
//! caller's local civil calendar and bucketed into display horizons.
//!
//! ## Architecture
//!
//! - **Calendar resolver** (`calendar`): pure civil-date arithmetic — weekday
//!   resolution, local-date formatting/parsing, timezone snapshots, relative
//!   phrase grounding. The evaluation instant is always an explicit parameter.
//! - **Obligation store** (`obligation`, `store`): the pending → done/missed
//!   state machine over a `load_all`/`save_all` persistence capability, with
//!   the read-time missed-sweep persisted before any listing returns.
//! - **Horizon classifier** (`horizon`): the single bucketing implementation
//!   (Missed / Now / Today / This Week / Later) shared by every surface.
//! - **Extraction boundary** (`extract`): the external text-understanding
//!   service behind a trait, plus a deterministic offline fallback.
//! - **Tracker facade** (`tracker`): composes the above for the CLI and the
//!   `pensumd` daemon.
//!
//! ## Library usage
//!
//! ```no_run
//! use chrono::Local;
//! use pensum::obligation::ObligationDraft;
//! use pensum::tracker::{Tracker, TrackerConfig};
//!
//! let now = Local::now().fixed_offset();
//! let mut tracker = Tracker::new(TrackerConfig::default()).unwrap();
//! tracker.add(ObligationDraft::titled("water the plants"), now).unwrap();
//! let view = tracker.horizon(now).unwrap();
//! assert_eq!(view.later.len(), 1);
//! ```

pub mod calendar;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod horizon;
pub mod obligation;
pub mod paths;
pub mod store;
pub mod tracker;
