//! # Mid-Round Inactivity Detector (experimental)
//!
//! Flags players who are alive mid-round but doing nothing: no meaningful
//! movement over a trailing displacement window, no aim activity over a
//! longer context window, no combat or utility actions. Legitimate idle
//! play (holding an angle on a sniper, sitting out a decided round, being
//! fully flash-blinded) is discounted through mitigation multipliers rather
//! than hard exclusions, so the evidence stays visible in the features.

use serde::{Deserialize, Serialize};

use crate::analysis::common::{angle_delta_deg, clamp_confidence};
use crate::models::timeline::{GameEvent, Team, Timeline};

/// Trailing window for the movement check.
pub const MOVEMENT_WINDOW_SECS: f64 = 5.0;

/// Trailing window for the aim-activity check.
pub const CONTEXT_WINDOW_SECS: f64 = 10.0;

/// Net displacement over the movement window under which the player
/// counts as not moving (game units).
pub const MOVEMENT_EPSILON_UNITS: f64 = 20.0;

/// Accumulated view-angle change over the context window at or above
/// which the player counts as actively aiming (degrees).
pub const AIM_ACTIVE_DEG: f32 = 30.0;

/// Aim churn at or above this (but under [`AIM_ACTIVE_DEG`]) reads as
/// micro-adjustments while holding an angle.
pub const HOLDING_ANGLE_MIN_DEG: f32 = 5.0;

/// Shortest segment worth reporting.
pub const MIN_INACTIVE_SECS: f64 = 15.0;

/// Segment length at which the base confidence reaches 1.0.
pub const FULL_CONFIDENCE_SECS: f64 = 25.0;

/// Inactivity ending inside the final stretch of a round is often just
/// waiting out a decided round.
pub const ROUND_TAIL_SECS: f64 = 10.0;

/// Remaining flash-blind above which the player could not act anyway.
pub const FLASH_BLIND_MIN_SECS: f32 = 1.0;

/// Confidence floor for emission after mitigations.
pub const MIN_CONFIDENCE: f64 = 0.2;

/// Equipment names treated as sniper rifles for the holding mitigation.
pub const SNIPER_WEAPONS: [&str; 4] = ["awp", "ssg08", "scar20", "g3sg1"];

pub const HOLDING_ANGLE_MULTIPLIER: f64 = 0.5;
pub const SCOPED_MULTIPLIER: f64 = 0.6;
pub const ROUND_TAIL_MULTIPLIER: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct InactivityOptions {
    pub movement_window_secs: f64,
    pub context_window_secs: f64,
    pub movement_epsilon_units: f64,
    pub aim_active_deg: f32,
    pub holding_angle_min_deg: f32,
    pub min_inactive_secs: f64,
    pub full_confidence_secs: f64,
    pub round_tail_secs: f64,
    pub flash_blind_min_secs: f32,
    pub min_confidence: f64,
}

impl Default for InactivityOptions {
    fn default() -> Self {
        Self {
            movement_window_secs: MOVEMENT_WINDOW_SECS,
            context_window_secs: CONTEXT_WINDOW_SECS,
            movement_epsilon_units: MOVEMENT_EPSILON_UNITS,
            aim_active_deg: AIM_ACTIVE_DEG,
            holding_angle_min_deg: HOLDING_ANGLE_MIN_DEG,
            min_inactive_secs: MIN_INACTIVE_SECS,
            full_confidence_secs: FULL_CONFIDENCE_SECS,
            round_tail_secs: ROUND_TAIL_SECS,
            flash_blind_min_secs: FLASH_BLIND_MIN_SECS,
            min_confidence: MIN_CONFIDENCE,
        }
    }
}

/// Numeric evidence behind one inactivity finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InactivityFeatureSummary {
    pub samples: u32,
    pub net_displacement: f64,
    pub total_aim_delta_deg: f32,
    pub holding_angle: bool,
    pub scoped: bool,
    pub near_round_end: bool,
    pub blinded_fraction: f64,
}

/// One flagged stretch of mid-round inactivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InactiveSegment {
    pub player_id: u64,
    pub player_name: String,
    pub team: Team,
    pub round: u32,
    pub start_tick: u64,
    pub end_tick: u64,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub confidence: f64,
    pub reason: String,
    pub features: InactivityFeatureSummary,
}

#[derive(Debug, Clone)]
struct Sample {
    tick: u64,
    time: f64,
    pos: (f64, f64),
    view_angle: f32,
    flash_blinded: bool,
    holds_sniper: bool,
}

/// Detect mid-round inactivity segments for all players across all rounds.
pub fn detect_inactivity(timeline: &Timeline, opts: &InactivityOptions) -> Vec<InactiveSegment> {
    let mut segments = Vec::new();

    for round in &timeline.rounds {
        let (live_start, round_end) = match round.live_window() {
            Some(w) => w,
            None => continue,
        };
        let frames = timeline.frames_in_range(live_start, round_end);
        if frames.len() < 2 {
            continue;
        }
        let round_end_time = frames.last().map(|f| f.time).unwrap_or(0.0);

        // Every id that is alive and on a playing team at the start of
        // the live phase is a candidate.
        let candidates: Vec<(u64, String, Team)> = frames[0]
            .players
            .iter()
            .filter(|p| p.team.is_playing() && p.is_alive)
            .map(|p| (p.id, p.name.clone(), p.team))
            .collect();

        for (player_id, player_name, team) in candidates {
            // Contiguous presence runs; absence or death ends a run.
            let mut runs: Vec<(Vec<Sample>, Vec<f64>)> = Vec::new();
            let mut samples: Vec<Sample> = Vec::new();
            let mut actions: Vec<f64> = Vec::new();
            let mut prev_shots: Option<u32> = None;
            let mut prev_hp: Option<i32> = None;

            for frame in frames {
                for event in &frame.events {
                    let involves = event.actor() == Some(player_name.as_str())
                        || matches!(event, GameEvent::Damage { victim, .. } if victim == &player_name);
                    if involves {
                        actions.push(frame.time);
                    }
                }
                match frame.player(player_id) {
                    Some(p) if p.is_alive => {
                        if let Some(prev) = prev_shots {
                            if p.shots_fired > prev {
                                actions.push(frame.time);
                            }
                        }
                        if let Some(prev) = prev_hp {
                            if p.hp < prev {
                                actions.push(frame.time);
                            }
                        }
                        prev_shots = Some(p.shots_fired);
                        prev_hp = Some(p.hp);
                        samples.push(Sample {
                            tick: frame.tick,
                            time: frame.time,
                            pos: (p.position.x, p.position.y),
                            view_angle: p.view_angle.rem_euclid(360.0),
                            flash_blinded: p.flash_duration >= opts.flash_blind_min_secs,
                            holds_sniper: p
                                .equipment
                                .iter()
                                .any(|e| SNIPER_WEAPONS.contains(&e.as_str())),
                        });
                    }
                    _ => {
                        if !samples.is_empty() {
                            runs.push((std::mem::take(&mut samples), actions.clone()));
                        }
                        prev_shots = None;
                        prev_hp = None;
                    }
                }
            }
            if !samples.is_empty() {
                runs.push((samples, actions.clone()));
            }

            for (run, actions) in &runs {
                collect_run_segments(
                    run,
                    actions,
                    round.number,
                    player_id,
                    &player_name,
                    team,
                    round_end_time,
                    opts,
                    &mut segments,
                );
            }
        }
    }

    segments.sort_by(|a, b| {
        a.start_tick
            .cmp(&b.start_tick)
            .then(a.player_id.cmp(&b.player_id))
            .then(a.round.cmp(&b.round))
    });
    segments
}

#[allow(clippy::too_many_arguments)]
fn collect_run_segments(
    run: &[Sample],
    actions: &[f64],
    round: u32,
    player_id: u64,
    player_name: &str,
    team: Team,
    round_end_time: f64,
    opts: &InactivityOptions,
    out: &mut Vec<InactiveSegment>,
) {
    if run.len() < 2 {
        return;
    }
    let run_start = run[0].time;

    // Trailing-window inactivity flag per sample.
    let mut inactive = vec![false; run.len()];
    for i in 0..run.len() {
        let t = run[i].time;
        if t - run_start < opts.movement_window_secs {
            continue; // window not yet filled
        }
        let j5 = run.partition_point(|s| s.time < t - opts.movement_window_secs);
        let j10 = run.partition_point(|s| s.time < t - opts.context_window_secs);

        // Max displacement from the current position to any position in
        // the window; endpoint-only deltas miss oscillating movement.
        let moved = run[j5..i].iter().any(|s| {
            let dx = run[i].pos.0 - s.pos.0;
            let dy = run[i].pos.1 - s.pos.1;
            (dx * dx + dy * dy).sqrt() > opts.movement_epsilon_units
        });

        let mut aim_total = 0.0f32;
        for k in (j10 + 1)..=i {
            aim_total += angle_delta_deg(run[k - 1].view_angle, run[k].view_angle);
        }
        let aiming = aim_total >= opts.aim_active_deg;

        let action_recent = actions
            .iter()
            .any(|&a| a > t - opts.movement_window_secs && a <= t);

        inactive[i] = !moved && !aiming && !action_recent;
    }

    // Maximal inactive runs become candidate segments. The segment starts
    // at the beginning of the trailing window of its first flagged sample,
    // since the player was already idle through that window.
    let mut i = 0;
    while i < run.len() {
        if !inactive[i] {
            i += 1;
            continue;
        }
        let mut j = i;
        while j + 1 < run.len() && inactive[j + 1] {
            j += 1;
        }
        let window_start = run[i].time - opts.movement_window_secs;
        let start_idx = run.partition_point(|s| s.time < window_start);
        let start = &run[start_idx];
        let end = &run[j];
        let duration = end.time - start.time;

        if duration >= opts.min_inactive_secs {
            let seg = &run[start_idx..=j];
            let samples = seg.len() as u32;
            let dx = end.pos.0 - start.pos.0;
            let dy = end.pos.1 - start.pos.1;
            let net_displacement = (dx * dx + dy * dy).sqrt();
            let mut total_aim = 0.0f32;
            for k in 1..seg.len() {
                total_aim += angle_delta_deg(seg[k - 1].view_angle, seg[k].view_angle);
            }
            // Churn normalized to the context window length.
            let aim_per_window =
                total_aim as f64 * opts.context_window_secs / duration.max(1e-6);
            let holding_angle = aim_per_window >= opts.holding_angle_min_deg as f64
                && aim_per_window < opts.aim_active_deg as f64;
            let scoped_count = seg.iter().filter(|s| s.holds_sniper).count();
            let scoped = scoped_count * 2 > seg.len();
            // Fraction of the segment falling in the round's final stretch.
            let tail_overlap = (end.time - (round_end_time - opts.round_tail_secs))
                .clamp(0.0, duration);
            let tail_fraction = tail_overlap / duration.max(1e-6);
            let near_round_end = tail_fraction > 0.3;
            let blinded = seg.iter().filter(|s| s.flash_blinded).count();
            let blinded_fraction = blinded as f64 / samples as f64;

            let ramp = (duration - opts.min_inactive_secs)
                / (opts.full_confidence_secs - opts.min_inactive_secs).max(1e-6);
            let mut score = 0.5 + 0.5 * ramp.clamp(0.0, 1.0);
            let mut mitigations: Vec<&str> = Vec::new();
            if holding_angle {
                score *= HOLDING_ANGLE_MULTIPLIER;
                mitigations.push("aim micro-adjustments suggest holding an angle");
            }
            if scoped {
                score *= SCOPED_MULTIPLIER;
                mitigations.push("holding a sniper rifle");
            }
            score *= 1.0 - (1.0 - ROUND_TAIL_MULTIPLIER) * tail_fraction;
            if near_round_end {
                mitigations.push("round was nearly over");
            }
            score *= 1.0 - blinded_fraction;
            let confidence = clamp_confidence(score);

            if confidence >= opts.min_confidence {
                let mut reason = format!(
                    "{} showed no movement, aim or combat activity for {:.1}s",
                    player_name, duration
                );
                if !mitigations.is_empty() {
                    reason.push_str(" (mitigated: ");
                    reason.push_str(&mitigations.join(", "));
                    reason.push(')');
                }
                out.push(InactiveSegment {
                    player_id,
                    player_name: player_name.to_string(),
                    team,
                    round,
                    start_tick: start.tick,
                    end_tick: end.tick,
                    start_time: start.time,
                    end_time: end.time,
                    duration,
                    confidence,
                    reason,
                    features: InactivityFeatureSummary {
                        samples,
                        net_displacement,
                        total_aim_delta_deg: total_aim,
                        holding_angle,
                        scoped,
                        near_round_end,
                        blinded_fraction,
                    },
                });
            }
        }
        i = j + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_fixtures::{insert_event, round_timeline, FramePlan};

    fn long_round(plans: Vec<FramePlan>) -> Timeline {
        // Live window 640..8000 ticks = 10s..125s at 64 tick/s.
        round_timeline(64.0, 640, 8000, plans)
    }

    #[test]
    fn test_fully_idle_player_flagged() {
        let tl = long_round(vec![FramePlan::stationary(1, "idler", Team::Ct, (0.0, 0.0))]);

        let segs = detect_inactivity(&tl, &InactivityOptions::default());
        assert_eq!(segs.len(), 1, "one full-round segment expected");
        let seg = &segs[0];
        assert_eq!(seg.player_name, "idler");
        assert!(seg.duration > 100.0, "duration was {}", seg.duration);
        assert!(
            seg.confidence > 0.9,
            "long unmitigated idleness should score near 1.0, got {}",
            seg.confidence
        );
        assert!(seg.features.net_displacement < 1.0);
        assert!(!seg.reason.is_empty());
    }

    #[test]
    fn test_jittering_player_not_flagged() {
        // 30-unit oscillation every frame keeps displacement above epsilon.
        let mut plan = FramePlan::stationary(1, "mover", Team::Ct, (0.0, 0.0));
        plan.jitter = 30.0;
        let tl = long_round(vec![plan]);

        assert!(detect_inactivity(&tl, &InactivityOptions::default()).is_empty());
    }

    #[test]
    fn test_weapon_fire_resets_segments() {
        let mut tl = long_round(vec![FramePlan::stationary(1, "shooter", Team::Ct, (0.0, 0.0))]);
        // A shot every ~4 seconds keeps the action window warm.
        let mut tick = 700u64;
        while tick < 8000 {
            insert_event(
                &mut tl,
                GameEvent::WeaponFire { tick, player: "shooter".to_string(), weapon: None },
            );
            tick += 256;
        }

        assert!(detect_inactivity(&tl, &InactivityOptions::default()).is_empty());
    }

    #[test]
    fn test_short_idle_not_emitted() {
        // Idle only 12s (player moves at tick 1500 = 23.4s, well before
        // the 15s minimum elapses from the live start).
        let tl = round_timeline(
            64.0,
            640,
            2400,
            vec![FramePlan::moves_once(1, "briefly", Team::Ct, (0.0, 0.0), 1500, 500.0)],
        );

        assert!(detect_inactivity(&tl, &InactivityOptions::default()).is_empty());
    }

    #[test]
    fn test_sniper_mitigation_lowers_confidence() {
        let mut plan = FramePlan::stationary(1, "lurker", Team::Ct, (0.0, 0.0));
        plan.equipment = vec!["awp".to_string()];
        let tl = long_round(vec![plan]);

        let segs = detect_inactivity(&tl, &InactivityOptions::default());
        assert_eq!(segs.len(), 1);
        assert!(segs[0].features.scoped);
        assert!(
            segs[0].confidence > 0.5 && segs[0].confidence < 0.65,
            "confidence {} should carry the sniper multiplier",
            segs[0].confidence
        );
        assert!(segs[0].reason.contains("sniper"));
    }

    #[test]
    fn test_dead_player_not_flagged() {
        let tl = long_round(vec![FramePlan::dies_at(1, "gone", Team::Ct, (0.0, 0.0), 800)]);

        // Alive 10s..12.5s only; the run is far too short.
        assert!(detect_inactivity(&tl, &InactivityOptions::default()).is_empty());
    }
}
