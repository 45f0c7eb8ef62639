//! # Models
//!
//! The normalized timeline data model consumed by every detector, plus the
//! alias-probing normalization layer for the loose raw event streams.

pub mod raw_events;
pub mod timeline;

pub use raw_events::{
    normalize_blind_events, normalize_connection_events, normalize_grenades, timeline_from_json,
    timeline_from_value, BlindEvent, ConnectionEvent, GrenadeThrow,
};
pub use timeline::{GameEvent, MatchFrame, PlayerState, Round, Team, Timeline, Vec3};
