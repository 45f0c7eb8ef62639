//! # AFK Detector
//!
//! Flags players who never move through a grace window after round
//! freeze-end. A player who moves during the grace window is not AFK for
//! that round no matter how still they go later; mid-round stillness is the
//! separate inactivity detector's job.
//!
//! ## Algorithm
//! 1. For each round with a freeze-end tick, collect non-spectator players
//!    alive at freeze-end.
//! 2. Track 2D displacement between consecutive sampled frames.
//! 3. Movement beyond the jitter epsilon inside the grace window clears the
//!    player for that round.
//! 4. Otherwise the AFK interval runs from freeze-end to first movement,
//!    death, or round end, and is emitted when it lasts long enough.

use serde::{Deserialize, Serialize};

use crate::models::timeline::{Team, Timeline};

/// Grace window after freeze-end in which any movement clears the player.
pub const GRACE_PERIOD_SECS: f64 = 5.0;

/// Minimum AFK interval worth reporting.
pub const MIN_AFK_DURATION_SECS: f64 = 5.0;

/// 2D displacement below this is position jitter, not movement (game units).
pub const MOVEMENT_EPSILON_UNITS: f64 = 5.0;

/// Why a player was judged AFK. Only `NoMovement` is currently produced;
/// action-based detection is a known gap kept for forward compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfkReason {
    NoMovement,
    NoActions,
    Both,
}

/// Tunable thresholds for [`detect_afk`].
#[derive(Debug, Clone)]
pub struct AfkOptions {
    pub grace_period_secs: f64,
    pub min_afk_duration_secs: f64,
    pub movement_epsilon_units: f64,
}

impl Default for AfkOptions {
    fn default() -> Self {
        Self {
            grace_period_secs: GRACE_PERIOD_SECS,
            min_afk_duration_secs: MIN_AFK_DURATION_SECS,
            movement_epsilon_units: MOVEMENT_EPSILON_UNITS,
        }
    }
}

/// One (player, round) AFK finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfkDetection {
    pub player_id: u64,
    pub player_name: String,
    pub team: Team,
    /// 1-based round number.
    pub round: u32,
    pub start_tick: u64,
    pub end_tick: u64,
    /// Seconds from freeze-end to the interval's end.
    pub afk_duration: f64,
    /// The interval ended with the player's death.
    pub died_while_afk: bool,
    /// Seconds from freeze-end to first movement, when movement ended the
    /// interval. Unset when the player stayed still to round end or died.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_first_movement: Option<f64>,
    pub reason: AfkReason,
}

/// Per-candidate scan state while walking one round's frames.
struct CandidateTrack {
    player_id: u64,
    player_name: String,
    team: Team,
    last_pos: (f64, f64),
    first_movement_tick: Option<u64>,
    death_tick: Option<u64>,
}

/// Detect players motionless through the post-freeze grace window.
pub fn detect_afk(timeline: &Timeline, opts: &AfkOptions) -> Vec<AfkDetection> {
    let mut detections = Vec::new();

    for round in &timeline.rounds {
        let (freeze_end, round_end) = match round.live_window() {
            Some(w) => w,
            None => continue,
        };
        let frames = timeline.frames_in_range(freeze_end, round_end);
        if frames.is_empty() {
            continue;
        }

        // Candidates: playing and alive in the first live frame.
        let mut tracks: Vec<CandidateTrack> = frames[0]
            .players
            .iter()
            .filter(|p| p.team.is_playing() && p.is_alive)
            .map(|p| CandidateTrack {
                player_id: p.id,
                player_name: p.name.clone(),
                team: p.team,
                last_pos: (p.position.x, p.position.y),
                first_movement_tick: None,
                death_tick: None,
            })
            .collect();
        tracks.sort_by_key(|t| t.player_id);

        for frame in &frames[1..] {
            for track in tracks.iter_mut() {
                if track.first_movement_tick.is_some() || track.death_tick.is_some() {
                    continue;
                }
                let state = match frame.player(track.player_id) {
                    Some(s) => s,
                    None => continue,
                };
                if !state.is_alive {
                    track.death_tick = Some(frame.tick);
                    continue;
                }
                let dx = state.position.x - track.last_pos.0;
                let dy = state.position.y - track.last_pos.1;
                if (dx * dx + dy * dy).sqrt() > opts.movement_epsilon_units {
                    track.first_movement_tick = Some(frame.tick);
                }
                track.last_pos = (state.position.x, state.position.y);
            }
        }

        let grace_ticks = (opts.grace_period_secs * timeline.tick_rate) as u64;
        let grace_end = freeze_end + grace_ticks;

        for track in tracks {
            // Any movement inside the grace window clears the round.
            if matches!(track.first_movement_tick, Some(t) if t <= grace_end) {
                continue;
            }

            let (end_tick, died, moved) = match (track.first_movement_tick, track.death_tick) {
                (Some(m), Some(d)) if d < m => (d, true, false),
                (Some(m), _) => (m, false, true),
                (None, Some(d)) => (d, true, false),
                (None, None) => (round_end, false, false),
            };

            let afk_duration = timeline.ticks_to_seconds(end_tick.saturating_sub(freeze_end));
            if afk_duration < opts.min_afk_duration_secs {
                continue;
            }

            detections.push(AfkDetection {
                player_id: track.player_id,
                player_name: track.player_name,
                team: track.team,
                round: round.number,
                start_tick: freeze_end,
                end_tick,
                afk_duration,
                died_while_afk: died,
                time_to_first_movement: moved
                    .then(|| timeline.ticks_to_seconds(end_tick.saturating_sub(freeze_end))),
                reason: AfkReason::NoMovement,
            });
        }
    }

    detections
}
