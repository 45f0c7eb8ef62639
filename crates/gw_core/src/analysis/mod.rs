//! # Analysis Module
//!
//! The griefing detector family and the orchestrator that runs it.
//!
//! ## Submodules
//!
//! - `afk` - Round-start immobility detection
//! - `friendly_fire` - Team kills and grouped team damage
//! - `team_flash` - Friendly flashbang classification
//! - `disconnect` - Disconnect/reconnect tracking with rounds-missed math
//! - `blocking` - Intentional teammate obstruction (experimental)
//! - `inactivity` - Mid-round inactivity segments (experimental)
//! - `objective` - Bomb-objective sabotage (experimental)
//! - `economy` - Buy-pattern sabotage and match flags (experimental)
//! - `orchestrator` - Fixed-order run with progress reporting
//!
//! Each detector is a pure function over a [`crate::models::Timeline`]
//! with its thresholds in an `Options` struct; output ordering is always
//! deterministic.

pub mod afk;
pub mod blocking;
pub mod common;
pub mod disconnect;
pub mod economy;
pub mod friendly_fire;
pub mod inactivity;
pub mod objective;
pub mod orchestrator;
pub mod team_flash;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use afk::{detect_afk, AfkDetection, AfkOptions, AfkReason};
pub use blocking::{detect_blocking, BlockEvent, BlockFeatureSummary, BlockingOptions};
pub use disconnect::{
    detect_disconnects, DisconnectOptions, DisconnectReconnect, DisconnectSource,
};
pub use economy::{
    build_match_flags, detect_economy_events, EconomyEvent, EconomyEventCounts, EconomyEventKind,
    EconomyFeatureSummary, EconomyMatchFlag, EconomyOptions, TeamBuyState,
};
pub use friendly_fire::{
    detect_team_damage, detect_team_kills, FriendlyFireOptions, TeamDamage, TeamKill,
};
pub use inactivity::{
    detect_inactivity, InactiveSegment, InactivityFeatureSummary, InactivityOptions,
};
pub use objective::{
    detect_objective_sabotage, ObjectiveEvent, ObjectiveEventKind, ObjectiveFeatureSummary,
    ObjectiveOptions,
};
pub use orchestrator::{
    run_analysis, AnalysisOptions, AnalysisResults, NoProgress, ProgressSink, ProgressUpdate,
};
pub use team_flash::{detect_team_flashes, TeamFlash, TeamFlashOptions};
