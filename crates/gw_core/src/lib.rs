//! # gw_core - Demo Griefing Analysis Engine
//!
//! Post-parse analysis over a normalized demo timeline: detects griefing
//! behavior (AFK, team kills and team damage, team flashes, disconnects)
//! plus an experimental set of heuristic detectors (body blocking,
//! mid-round inactivity, objective sabotage, economy griefing).
//!
//! ## Design
//! - The decoding layer is external; input is a [`models::Timeline`] of
//!   sparse frames, rounds and game events, plus loose raw event streams
//!   normalized once at ingestion ([`models::raw_events`]).
//! - Every detector is a pure function with its thresholds in an
//!   `Options` struct; output is deterministic for identical input.
//! - Experimental detector findings always carry a confidence in [0, 1],
//!   a human-readable reason and a numeric feature summary.

pub mod analysis;
pub mod error;
pub mod models;

pub use analysis::{
    run_analysis, AnalysisOptions, AnalysisResults, NoProgress, ProgressSink, ProgressUpdate,
};
pub use error::{AnalysisError, Result};
pub use models::{timeline_from_json, timeline_from_value, GameEvent, Team, Timeline};

/// Engine version, from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
