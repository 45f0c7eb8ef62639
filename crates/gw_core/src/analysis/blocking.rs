//! # Body-Blocking Detector (experimental)
//!
//! Kinematic sliding-window analysis flagging intentional teammate
//! obstruction. Each ordered (victim, blocker) teammate pair runs a small
//! state machine over a fixed-rate sample grid: idle until the blocking
//! predicate holds, accumulating while it keeps holding (short gaps
//! tolerated), closed into an episode when it stops. Episodes convert to
//! events through a weighted score with rush and crowding penalties.
//!
//! Heuristic thresholds here are hand-tuned starting points, expected to
//! be recalibrated against labeled data.

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::common::{angle_delta_deg, clamp_confidence, direction_2d, dot_2d, sample_ticks};
use crate::models::timeline::{Team, Timeline, Vec3};

/// Pair evaluation rate.
pub const SAMPLE_HZ: f64 = 10.0;

/// Pair distance at or under which blocking is geometrically possible.
pub const CLOSE_DISTANCE_UNITS: f64 = 60.0;

/// Minimum dot product of victim heading with the direction to the
/// blocker: the blocker must be ahead of where the victim is trying to go.
pub const FRONTNESS_MIN: f64 = 0.6;

/// Post-freeze window in which packed spawns are normal, not blocking.
pub const SPAWN_IGNORE_SECS: f64 = 3.0;

/// Victim speed showing movement intent (game units/s).
pub const INTENT_SPEED_UNITS: f64 = 10.0;

/// Victim speed under which they count as near-stationary.
pub const STUCK_SPEED_UNITS: f64 = 60.0;

/// Acceleration magnitude treated as a failed-pass attempt (units/s^2).
pub const ACCEL_SPIKE_UNITS: f64 = 400.0;

/// Heading change treated as a failed-pass attempt (degrees per sample).
pub const HEADING_SPIKE_DEG: f32 = 60.0;

/// Both players at or above this speed on a shared heading is a rush.
pub const RUSH_SPEED_UNITS: f64 = 150.0;
pub const RUSH_HEADING_DEG: f32 = 30.0;

/// Teammates (beyond the pair) within this radius of the victim crowd the
/// scene and weaken the single-blocker read.
pub const CROWD_RADIUS_UNITS: f64 = 120.0;

/// Non-blocking gap tolerated inside one episode.
pub const GAP_TOLERANCE_SECS: f64 = 0.5;

/// Episodes shorter than this are contact noise.
pub const MIN_EPISODE_SECS: f64 = 1.2;

/// Minimum score to emit an event.
pub const MIN_CONFIDENCE: f64 = 0.25;

/// Tunable thresholds and score weights for [`detect_blocking`].
#[derive(Debug, Clone)]
pub struct BlockingOptions {
    pub sample_hz: f64,
    pub close_distance_units: f64,
    pub frontness_min: f64,
    pub spawn_ignore_secs: f64,
    pub intent_speed_units: f64,
    pub stuck_speed_units: f64,
    pub accel_spike_units: f64,
    pub heading_spike_deg: f32,
    pub rush_speed_units: f64,
    pub rush_heading_deg: f32,
    pub crowd_radius_units: f64,
    pub gap_tolerance_secs: f64,
    pub min_episode_secs: f64,
    pub min_confidence: f64,
    pub weight_duration: f64,
    pub weight_progress_lack: f64,
    pub weight_stationary: f64,
    pub weight_failed_pass: f64,
    pub weight_reblock: f64,
    pub penalty_rush: f64,
    pub penalty_crowding: f64,
}

impl Default for BlockingOptions {
    fn default() -> Self {
        Self {
            sample_hz: SAMPLE_HZ,
            close_distance_units: CLOSE_DISTANCE_UNITS,
            frontness_min: FRONTNESS_MIN,
            spawn_ignore_secs: SPAWN_IGNORE_SECS,
            intent_speed_units: INTENT_SPEED_UNITS,
            stuck_speed_units: STUCK_SPEED_UNITS,
            accel_spike_units: ACCEL_SPIKE_UNITS,
            heading_spike_deg: HEADING_SPIKE_DEG,
            rush_speed_units: RUSH_SPEED_UNITS,
            rush_heading_deg: RUSH_HEADING_DEG,
            crowd_radius_units: CROWD_RADIUS_UNITS,
            gap_tolerance_secs: GAP_TOLERANCE_SECS,
            min_episode_secs: MIN_EPISODE_SECS,
            min_confidence: MIN_CONFIDENCE,
            weight_duration: 0.30,
            weight_progress_lack: 0.25,
            weight_stationary: 0.15,
            weight_failed_pass: 0.15,
            weight_reblock: 0.15,
            penalty_rush: 0.30,
            penalty_crowding: 0.20,
        }
    }
}

/// Raw signals behind one block event; every finding is traceable to
/// concrete numeric evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockFeatureSummary {
    pub samples: u32,
    pub mean_distance: f64,
    pub mean_frontness: f64,
    pub victim_net_displacement: f64,
    pub blocker_stationary_fraction: f64,
    pub failed_pass_signals: u32,
    pub reblock_cycles: u32,
    pub rush_fraction: f64,
    pub crowding_fraction: f64,
}

/// One flagged obstruction episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockEvent {
    pub round: u32,
    pub victim_id: u64,
    pub victim_name: String,
    pub blocker_id: u64,
    pub blocker_name: String,
    pub team: Team,
    pub start_tick: u64,
    pub end_tick: u64,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub confidence: f64,
    pub reason: String,
    pub features: BlockFeatureSummary,
}

/// Per-player kinematics at one sample.
#[derive(Debug, Clone)]
struct Kin {
    name: String,
    team: Team,
    pos: (f64, f64),
    vel: (f64, f64),
    speed: f64,
    accel: f64,
    heading_change_deg: f32,
    /// Last heading while actually moving; carried through stationary
    /// samples so frontness stays defined for a stuck victim.
    heading: Option<(f64, f64)>,
}

/// Pair state machine: idle (absent from the map) -> accumulating -> closed.
///
/// Carries the pair's identity so an episode can close after either
/// member left the sample.
struct EpisodeState {
    victim_name: String,
    blocker_name: String,
    team: Team,
    start_tick: u64,
    start_time: f64,
    last_block_tick: u64,
    last_block_time: f64,
    victim_start: (f64, f64),
    victim_last: (f64, f64),
    samples: u32,
    span_samples: u32,
    sum_distance: f64,
    sum_frontness: f64,
    blocker_stationary: u32,
    failed_pass: u32,
    reblock_cycles: u32,
    rush_samples: u32,
    crowd_samples: u32,
    in_gap: bool,
}

impl EpisodeState {
    fn new(tick: u64, time: f64, victim: &Kin, blocker: &Kin) -> Self {
        Self {
            victim_name: victim.name.clone(),
            blocker_name: blocker.name.clone(),
            team: victim.team,
            start_tick: tick,
            start_time: time,
            last_block_tick: tick,
            last_block_time: time,
            victim_start: victim.pos,
            victim_last: victim.pos,
            samples: 1,
            span_samples: 1,
            sum_distance: 0.0,
            sum_frontness: 0.0,
            blocker_stationary: 0,
            failed_pass: 0,
            reblock_cycles: 0,
            rush_samples: 0,
            crowd_samples: 0,
            in_gap: false,
        }
    }

    fn duration(&self) -> f64 {
        self.last_block_time - self.start_time
    }
}

struct EpisodeContext {
    round: u32,
    victim_id: u64,
    blocker_id: u64,
}

fn close_episode(
    state: EpisodeState,
    ctx: &EpisodeContext,
    opts: &BlockingOptions,
) -> Option<BlockEvent> {
    let duration = state.duration();
    if duration < opts.min_episode_secs || state.samples == 0 {
        return None;
    }

    let samples = state.samples as f64;
    let span = state.span_samples.max(1) as f64;
    let dx = state.victim_last.0 - state.victim_start.0;
    let dy = state.victim_last.1 - state.victim_start.1;
    let net_displacement = (dx * dx + dy * dy).sqrt();

    // A victim with real freedom covers ground; 100 units/s of net
    // progress fully discounts the episode.
    let progress_lack = 1.0 - (net_displacement / (duration * 100.0)).min(1.0);
    let duration_score = (duration / 6.0).min(1.0);
    let stationary_frac = state.blocker_stationary as f64 / samples;
    let failed_pass_score = (state.failed_pass as f64 / 4.0).min(1.0);
    let reblock_score = (state.reblock_cycles as f64 / 2.0).min(1.0);
    let rush_frac = state.rush_samples as f64 / span;
    let crowd_frac = state.crowd_samples as f64 / span;

    let score = opts.weight_duration * duration_score
        + opts.weight_progress_lack * progress_lack
        + opts.weight_stationary * stationary_frac
        + opts.weight_failed_pass * failed_pass_score
        + opts.weight_reblock * reblock_score
        - opts.penalty_rush * rush_frac
        - opts.penalty_crowding * crowd_frac;
    let confidence = clamp_confidence(score);
    if confidence < opts.min_confidence {
        return None;
    }

    let mut reasons = vec![format!(
        "{} stood in {}'s path for {:.1}s",
        state.blocker_name, state.victim_name, duration
    )];
    if progress_lack > 0.7 {
        reasons.push(format!("victim advanced only {:.0} units", net_displacement));
    }
    if stationary_frac > 0.6 {
        reasons.push(format!("blocker stationary {:.0}% of the time", stationary_frac * 100.0));
    }
    if state.failed_pass > 0 {
        reasons.push(format!("{} failed pass attempts", state.failed_pass));
    }
    if state.reblock_cycles > 0 {
        reasons.push(format!("re-blocked {} times after yielding", state.reblock_cycles));
    }
    if rush_frac > 0.2 {
        reasons.push("partially overlapped a team rush".to_string());
    }
    if crowd_frac > 0.3 {
        reasons.push("scene was crowded with other teammates".to_string());
    }

    Some(BlockEvent {
        round: ctx.round,
        victim_id: ctx.victim_id,
        victim_name: state.victim_name.clone(),
        blocker_id: ctx.blocker_id,
        blocker_name: state.blocker_name.clone(),
        team: state.team,
        start_tick: state.start_tick,
        end_tick: state.last_block_tick,
        start_time: state.start_time,
        end_time: state.last_block_time,
        duration,
        confidence,
        reason: reasons.join("; "),
        features: BlockFeatureSummary {
            samples: state.samples,
            mean_distance: state.sum_distance / samples,
            mean_frontness: state.sum_frontness / samples,
            victim_net_displacement: net_displacement,
            blocker_stationary_fraction: stationary_frac,
            failed_pass_signals: state.failed_pass,
            reblock_cycles: state.reblock_cycles,
            rush_fraction: rush_frac,
            crowding_fraction: crowd_frac,
        },
    })
}

/// Detect intentional teammate obstruction episodes.
pub fn detect_blocking(timeline: &Timeline, opts: &BlockingOptions) -> Vec<BlockEvent> {
    let spt = timeline.seconds_per_tick();
    let mut events = Vec::new();

    for round in &timeline.rounds {
        let (freeze_end, round_end) = match round.live_window() {
            Some(w) => w,
            None => continue,
        };
        let freeze_end_time = freeze_end as f64 * spt;
        let ticks = sample_ticks(freeze_end, round_end, timeline.tick_rate, opts.sample_hz);
        if ticks.len() < 2 {
            continue;
        }

        let mut prev_kin: FxHashMap<u64, Kin> = FxHashMap::default();
        let mut open: FxHashMap<(u64, u64), EpisodeState> = FxHashMap::default();
        let mut prev_time = freeze_end_time;

        for (i, &tick) in ticks.iter().enumerate() {
            let time = tick as f64 * spt;
            let dt = (time - prev_time).max(1e-6);
            let frame = match timeline.frame_at_or_before(tick) {
                Some(f) => f,
                None => continue,
            };

            // Kinematics for every live, playing player at this sample.
            let mut kins: Vec<(u64, Kin)> = Vec::new();
            for p in &frame.players {
                if !p.team.is_playing() || !p.is_alive {
                    continue;
                }
                let pos = (p.position.x, p.position.y);
                let (vel, speed, accel, heading_change, heading) = match prev_kin.get(&p.id) {
                    Some(prev) if i > 0 => {
                        let vel = ((pos.0 - prev.pos.0) / dt, (pos.1 - prev.pos.1) / dt);
                        let speed = (vel.0 * vel.0 + vel.1 * vel.1).sqrt();
                        let dvx = vel.0 - prev.vel.0;
                        let dvy = vel.1 - prev.vel.1;
                        let accel = (dvx * dvx + dvy * dvy).sqrt() / dt;
                        let heading = if speed > 5.0 {
                            Some((vel.0 / speed, vel.1 / speed))
                        } else {
                            prev.heading
                        };
                        let heading_change = match (prev.heading, heading) {
                            (Some(a), Some(b)) => {
                                let da = (a.1.atan2(a.0).to_degrees()) as f32;
                                let db = (b.1.atan2(b.0).to_degrees()) as f32;
                                angle_delta_deg(da.rem_euclid(360.0), db.rem_euclid(360.0))
                            }
                            _ => 0.0,
                        };
                        (vel, speed, accel, heading_change, heading)
                    }
                    _ => ((0.0, 0.0), 0.0, 0.0, 0.0, None),
                };
                kins.push((
                    p.id,
                    Kin {
                        name: p.name.clone(),
                        team: p.team,
                        pos,
                        vel,
                        speed,
                        accel,
                        heading_change_deg: heading_change,
                        heading,
                    },
                ));
            }
            kins.sort_by_key(|(id, _)| *id);

            // A pair member leaving the sample (death or dropped frames)
            // ends the episode on the spot; the pair stops being iterated
            // below, so it would otherwise never close.
            let mut departed: Vec<(u64, u64)> = open
                .keys()
                .filter(|(v, b)| {
                    !kins.iter().any(|(id, _)| id == v)
                        || !kins.iter().any(|(id, _)| id == b)
                })
                .copied()
                .collect();
            departed.sort_unstable();
            for key in departed {
                if let Some(state) = open.remove(&key) {
                    let ctx = EpisodeContext {
                        round: round.number,
                        victim_id: key.0,
                        blocker_id: key.1,
                    };
                    if let Some(event) = close_episode(state, &ctx, opts) {
                        events.push(event);
                    }
                }
            }

            let past_spawn = time - freeze_end_time >= opts.spawn_ignore_secs;

            for (victim_id, victim) in &kins {
                for (blocker_id, blocker) in &kins {
                    if victim_id == blocker_id || victim.team != blocker.team {
                        continue;
                    }
                    let key = (*victim_id, *blocker_id);

                    let dx = blocker.pos.0 - victim.pos.0;
                    let dy = blocker.pos.1 - victim.pos.1;
                    let distance = (dx * dx + dy * dy).sqrt();

                    let to_blocker = direction_2d(
                        &Vec3::new(victim.pos.0, victim.pos.1),
                        &Vec3::new(blocker.pos.0, blocker.pos.1),
                    );
                    let frontness = match (victim.heading, to_blocker) {
                        (Some(h), Some(d)) => dot_2d(h, d),
                        _ => 0.0,
                    };
                    // Closing speed along the victim->blocker axis.
                    let rel_forward = match to_blocker {
                        Some(d) => dot_2d(victim.vel, d) - dot_2d(blocker.vel, d),
                        None => 0.0,
                    };

                    let heading_diff = match (victim.heading, blocker.heading) {
                        (Some(a), Some(b)) => {
                            let da = (a.1.atan2(a.0).to_degrees()) as f32;
                            let db = (b.1.atan2(b.0).to_degrees()) as f32;
                            angle_delta_deg(da.rem_euclid(360.0), db.rem_euclid(360.0))
                        }
                        _ => 180.0,
                    };
                    let rush = victim.speed >= opts.rush_speed_units
                        && blocker.speed >= opts.rush_speed_units
                        && heading_diff <= opts.rush_heading_deg;

                    let intent = victim.speed >= opts.intent_speed_units
                        || victim.accel >= opts.accel_spike_units
                        || rel_forward >= opts.intent_speed_units;
                    let stuck = victim.speed <= opts.stuck_speed_units
                        || (blocker.speed >= victim.speed
                            && distance <= opts.close_distance_units * 0.7);

                    let blocking = distance <= opts.close_distance_units
                        && frontness >= opts.frontness_min
                        && past_spawn
                        && intent
                        && stuck
                        && !rush;

                    let crowding = kins
                        .iter()
                        .filter(|(id, other)| {
                            id != victim_id
                                && id != blocker_id
                                && other.team == victim.team
                                && {
                                    let cx = other.pos.0 - victim.pos.0;
                                    let cy = other.pos.1 - victim.pos.1;
                                    (cx * cx + cy * cy).sqrt() <= opts.crowd_radius_units
                                }
                        })
                        .count()
                        >= 2;

                    let gap_expired = match open.get_mut(&key) {
                        Some(state) => {
                            state.span_samples += 1;
                            if rush {
                                state.rush_samples += 1;
                            }
                            if crowding {
                                state.crowd_samples += 1;
                            }
                            if blocking {
                                if state.in_gap {
                                    state.reblock_cycles += 1;
                                    state.in_gap = false;
                                }
                                state.samples += 1;
                                state.last_block_tick = tick;
                                state.last_block_time = time;
                                state.victim_last = victim.pos;
                                state.sum_distance += distance;
                                state.sum_frontness += frontness;
                                if blocker.speed <= opts.intent_speed_units {
                                    state.blocker_stationary += 1;
                                }
                                if victim.accel >= opts.accel_spike_units
                                    || victim.heading_change_deg >= opts.heading_spike_deg
                                {
                                    state.failed_pass += 1;
                                }
                                false
                            } else if time - state.last_block_time > opts.gap_tolerance_secs {
                                true
                            } else {
                                state.in_gap = true;
                                false
                            }
                        }
                        None => {
                            if blocking {
                                let mut state = EpisodeState::new(tick, time, victim, blocker);
                                state.sum_distance = distance;
                                state.sum_frontness = frontness;
                                if blocker.speed <= opts.intent_speed_units {
                                    state.blocker_stationary = 1;
                                }
                                open.insert(key, state);
                            }
                            false
                        }
                    };
                    if gap_expired {
                        if let Some(state) = open.remove(&key) {
                            let ctx = EpisodeContext {
                                round: round.number,
                                victim_id: *victim_id,
                                blocker_id: *blocker_id,
                            };
                            if let Some(event) = close_episode(state, &ctx, opts) {
                                events.push(event);
                            }
                        }
                    }
                }
            }

            prev_kin = kins.into_iter().collect();
            prev_time = time;
        }

        // Round end closes every open episode.
        let mut leftover: Vec<((u64, u64), EpisodeState)> = open.into_iter().collect();
        leftover.sort_by_key(|(k, _)| *k);
        for ((victim_id, blocker_id), state) in leftover {
            let ctx = EpisodeContext { round: round.number, victim_id, blocker_id };
            if let Some(event) = close_episode(state, &ctx, opts) {
                events.push(event);
            }
        }
    }

    events.sort_by(|a, b| {
        a.start_tick
            .cmp(&b.start_tick)
            .then(a.victim_id.cmp(&b.victim_id))
            .then(a.blocker_id.cmp(&b.blocker_id))
    });
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::timeline::{MatchFrame, PlayerState, Round, Timeline, Vec3};

    fn player(id: u64, name: &str, team: Team, x: f64, y: f64) -> PlayerState {
        PlayerState {
            id,
            name: name.to_string(),
            team,
            hp: 100,
            is_alive: true,
            position: Vec3::new(x, y),
            view_angle: 0.0,
            has_bomb: false,
            flash_duration: 0.0,
            shots_fired: 0,
            equipment: vec!["knife".to_string()],
        }
    }

    /// Frames every 6 ticks (one per 10 Hz sample at 64/s) from
    /// freeze-end 640 to tick 2000, built from a position script.
    fn scripted_timeline(
        script: impl Fn(u64) -> Vec<PlayerState>,
    ) -> Timeline {
        let mut frames = Vec::new();
        let mut tick = 0u64;
        while tick <= 2000 {
            frames.push(MatchFrame {
                tick,
                time: tick as f64 / 64.0,
                players: script(tick),
                events: Vec::new(),
            });
            tick += 6;
        }
        Timeline {
            tick_rate: 64.0,
            duration: 2000.0 / 64.0 + 30.0,
            rounds: vec![Round {
                number: 1,
                start_tick: 0,
                freeze_end_tick: Some(640),
                end_tick: Some(2000),
                winner: None,
            }],
            frames,
            ..Default::default()
        }
    }

    #[test]
    fn test_stuck_victim_against_stationary_blocker() {
        // After the spawn window the victim shoves into a stationary
        // blocker 30 units ahead, oscillating ~1.5 units per sample.
        let tl = scripted_timeline(|tick| {
            let phase = (tick / 6) % 2;
            let vx = if tick >= 900 { 10.0 + phase as f64 * 1.5 } else { 10.0 };
            vec![
                player(1, "victim", Team::Ct, vx, 0.0),
                player(2, "blocker", Team::Ct, 40.0, 0.0),
            ]
        });

        let events = detect_blocking(&tl, &BlockingOptions::default());
        assert!(!events.is_empty(), "sustained shoving must produce an episode");
        let ev = &events[0];
        assert_eq!(ev.victim_id, 1);
        assert_eq!(ev.blocker_id, 2);
        assert!(ev.duration >= MIN_EPISODE_SECS);
        assert!(ev.confidence > 0.3, "confidence was {}", ev.confidence);
        assert!(ev.features.blocker_stationary_fraction > 0.9);
        assert!(!ev.reason.is_empty());
    }

    #[test]
    fn test_blocker_death_closes_open_episode() {
        // The blocker falls at tick 1400 while the shoving episode is
        // still open; the episode must close with what it accumulated
        // instead of being silently dropped at round end.
        let tl = scripted_timeline(|tick| {
            let phase = (tick / 6) % 2;
            let mut players =
                vec![player(1, "victim", Team::Ct, 10.0 + phase as f64 * 1.5, 0.0)];
            if tick < 1400 {
                players.push(player(2, "blocker", Team::Ct, 40.0, 0.0));
            }
            players
        });

        let events = detect_blocking(&tl, &BlockingOptions::default());
        assert_eq!(events.len(), 1, "episode must survive the blocker leaving");
        let ev = &events[0];
        assert_eq!(ev.blocker_name, "blocker");
        assert_eq!(ev.victim_name, "victim");
        assert!(ev.end_tick < 1400);
        assert!(ev.duration >= MIN_EPISODE_SECS);
    }

    #[test]
    fn test_team_rush_not_blocking() {
        // Both players sprint the same heading at 250 units/s, blocker ahead.
        let tl = scripted_timeline(|tick| {
            let t = tick as f64 / 64.0;
            vec![
                player(1, "victim", Team::Ct, 250.0 * t, 0.0),
                player(2, "blocker", Team::Ct, 250.0 * t + 40.0, 0.0),
            ]
        });

        assert!(
            detect_blocking(&tl, &BlockingOptions::default()).is_empty(),
            "stack running is a legitimate rush"
        );
    }

    #[test]
    fn test_spawn_window_ignored() {
        // Shoving only during the first 2s after freeze-end (640..768),
        // inside the 3s spawn-ignore window; free movement afterwards.
        let tl = scripted_timeline(|tick| {
            let t = tick as f64 / 64.0;
            if tick < 768 {
                let phase = (tick / 6) % 2;
                vec![
                    player(1, "victim", Team::Ct, 10.0 + phase as f64 * 1.5, 0.0),
                    player(2, "blocker", Team::Ct, 40.0, 0.0),
                ]
            } else {
                vec![
                    player(1, "victim", Team::Ct, 200.0 * t, 0.0),
                    player(2, "blocker", Team::Ct, 40.0, 500.0),
                ]
            }
        });

        assert!(detect_blocking(&tl, &BlockingOptions::default()).is_empty());
    }

    #[test]
    fn test_opponents_never_pair() {
        let tl = scripted_timeline(|tick| {
            let phase = (tick / 6) % 2;
            vec![
                player(1, "victim", Team::Ct, 10.0 + phase as f64 * 1.5, 0.0),
                player(2, "blocker", Team::T, 40.0, 0.0),
            ]
        });

        assert!(detect_blocking(&tl, &BlockingOptions::default()).is_empty());
    }

    #[test]
    fn test_features_always_populated() {
        let tl = scripted_timeline(|tick| {
            let phase = (tick / 6) % 2;
            vec![
                player(1, "victim", Team::Ct, 10.0 + phase as f64 * 1.5, 0.0),
                player(2, "blocker", Team::Ct, 40.0, 0.0),
            ]
        });

        for ev in detect_blocking(&tl, &BlockingOptions::default()) {
            assert!(ev.features.samples > 0);
            assert!(ev.features.mean_distance > 0.0);
            assert!((0.0..=1.0).contains(&ev.confidence));
        }
    }
}
