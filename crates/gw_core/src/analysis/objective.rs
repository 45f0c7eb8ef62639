//! # Objective Sabotage Detector (experimental)
//!
//! Map-agnostic read of bomb-objective neglect. Bomb possession comes from
//! the per-frame `has_bomb` flag; plant, defuse and drop state from the
//! embedded game events. Five sub-detectors share two context scores:
//!
//! - `pressure_score` — how contested the player's situation is (recent
//!   team damage, teammate deaths, firefight volume). High pressure means
//!   the neglect was likely forced.
//! - `hopelessness_score` — whether pursuing the objective was still
//!   realistic (alive-count lopsidedness, remaining round time).
//!
//! Both suppress findings multiplicatively instead of gating them, so the
//! emitted features always show what the suppression saw.

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::common::clamp_confidence;
use crate::analysis::friendly_fire::parse_kill_description;
use crate::models::timeline::{GameEvent, MatchFrame, Team, Timeline};

/// Trailing window for the pressure components.
pub const PRESSURE_WINDOW_SECS: f64 = 10.0;

/// Carrier displacement under this over the stall window reads as camping
/// with the bomb.
pub const STALL_EPSILON_UNITS: f64 = 60.0;
pub const STALL_WINDOW_SECS: f64 = 15.0;

/// Shortest carrier stall worth reporting, and the stall length at which
/// its base score saturates.
pub const MIN_STALL_SECS: f64 = 30.0;
pub const FULL_STALL_SECS: f64 = 60.0;

/// Teammate distance counting as clustered with the carrier.
pub const CLUSTER_RADIUS_UNITS: f64 = 300.0;
pub const MIN_CLUSTER_TEAMMATES: usize = 2;
pub const MIN_CLUSTER_SECS: f64 = 20.0;
pub const FULL_CLUSTER_SECS: f64 = 40.0;

/// CT distance to the plant spot counting as "in defuse range".
pub const DEFUSE_RANGE_UNITS: f64 = 200.0;
pub const MIN_LINGER_SECS: f64 = 10.0;
pub const FULL_LINGER_SECS: f64 = 20.0;

/// A defuse attempt this short that is never retried is an abort finding.
pub const EARLY_ABORT_SECS: f64 = 3.0;
pub const REATTEMPT_WINDOW_SECS: f64 = 10.0;

/// Pressure above this at drop time makes a bomb drop forced.
pub const FORCED_DROP_PRESSURE: f64 = 0.3;

/// Remaining round time under which a plant is no longer realistic.
pub const PLANT_TIME_FLOOR_SECS: f64 = 15.0;

pub const MIN_CONFIDENCE: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct ObjectiveOptions {
    pub pressure_window_secs: f64,
    pub stall_epsilon_units: f64,
    pub stall_window_secs: f64,
    pub min_stall_secs: f64,
    pub cluster_radius_units: f64,
    pub min_cluster_teammates: usize,
    pub min_cluster_secs: f64,
    pub defuse_range_units: f64,
    pub min_linger_secs: f64,
    pub early_abort_secs: f64,
    pub reattempt_window_secs: f64,
    pub forced_drop_pressure: f64,
    pub min_confidence: f64,
}

impl Default for ObjectiveOptions {
    fn default() -> Self {
        Self {
            pressure_window_secs: PRESSURE_WINDOW_SECS,
            stall_epsilon_units: STALL_EPSILON_UNITS,
            stall_window_secs: STALL_WINDOW_SECS,
            min_stall_secs: MIN_STALL_SECS,
            cluster_radius_units: CLUSTER_RADIUS_UNITS,
            min_cluster_teammates: MIN_CLUSTER_TEAMMATES,
            min_cluster_secs: MIN_CLUSTER_SECS,
            defuse_range_units: DEFUSE_RANGE_UNITS,
            min_linger_secs: MIN_LINGER_SECS,
            early_abort_secs: EARLY_ABORT_SECS,
            reattempt_window_secs: REATTEMPT_WINDOW_SECS,
            forced_drop_pressure: FORCED_DROP_PRESSURE,
            min_confidence: MIN_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveEventKind {
    CarrierStall,
    ClusterNoPlant,
    UnforcedBombDrop,
    NoDefuseAttempt,
    EarlyDefuseAbort,
}

/// Numeric evidence behind one objective finding. Fields not applicable
/// to the sub-detector are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveFeatureSummary {
    pub pressure_score: f64,
    pub hopelessness_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stall_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clustered_teammates: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teammates_nearby: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enemy_recovered_bomb: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linger_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defuse_held_secs: Option<f64>,
}

impl ObjectiveFeatureSummary {
    fn context(pressure: f64, hopelessness: f64) -> Self {
        Self {
            pressure_score: pressure,
            hopelessness_score: hopelessness,
            stall_secs: None,
            clustered_teammates: None,
            teammates_nearby: None,
            enemy_recovered_bomb: None,
            linger_secs: None,
            defuse_held_secs: None,
        }
    }
}

/// One flagged objective-neglect episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveEvent {
    pub kind: ObjectiveEventKind,
    pub round: u32,
    pub player_id: u64,
    pub player_name: String,
    pub team: Team,
    pub tick: u64,
    pub time: f64,
    pub confidence: f64,
    pub reason: String,
    pub features: ObjectiveFeatureSummary,
}

/// Round-scoped event index shared by the sub-detectors.
struct RoundContext<'a> {
    timeline: &'a Timeline,
    round_number: u32,
    live_start_time: f64,
    round_end_time: f64,
    /// (time, victim_team) for deaths resolvable to a team.
    deaths: Vec<(f64, Team)>,
    /// (time, victim_team) for damage events resolvable to a team.
    damage_taken: Vec<(f64, Team)>,
    /// Times of weapon-fire and damage events, any team.
    fire_volume: Vec<f64>,
    plants: Vec<(u64, f64, String)>,
    defuse_starts: Vec<(u64, f64, String)>,
    defuse_aborts: Vec<(u64, f64, String)>,
    defuses: Vec<(u64, f64, String)>,
    drops: Vec<(u64, f64, String)>,
    pickups: Vec<(u64, f64, String)>,
}

impl<'a> RoundContext<'a> {
    fn build(
        timeline: &'a Timeline,
        round_number: u32,
        live_start: u64,
        round_end: u64,
        lookback: u64,
    ) -> Self {
        let frames = timeline.frames_in_range(live_start, round_end);
        let live_start_time = frames.first().map(|f| f.time).unwrap_or(0.0);
        let round_end_time = frames.last().map(|f| f.time).unwrap_or(0.0);

        let mut ctx = Self {
            timeline,
            round_number,
            live_start_time,
            round_end_time,
            deaths: Vec::new(),
            damage_taken: Vec::new(),
            fire_volume: Vec::new(),
            plants: Vec::new(),
            defuse_starts: Vec::new(),
            defuse_aborts: Vec::new(),
            defuses: Vec::new(),
            drops: Vec::new(),
            pickups: Vec::new(),
        };

        for frame in frames {
            for event in &frame.events {
                match event {
                    GameEvent::Kill { tick, description } => {
                        if let Some(kill) = parse_kill_description(description) {
                            if let Some(victim) =
                                timeline.player_by_name_near(*tick, kill.victim, lookback)
                            {
                                ctx.deaths.push((frame.time, victim.team));
                            }
                        }
                        ctx.fire_volume.push(frame.time);
                    }
                    GameEvent::Damage { tick, victim, .. } => {
                        if let Some(v) = timeline.player_by_name_near(*tick, victim, lookback) {
                            ctx.damage_taken.push((frame.time, v.team));
                        }
                        ctx.fire_volume.push(frame.time);
                    }
                    GameEvent::WeaponFire { .. } => ctx.fire_volume.push(frame.time),
                    GameEvent::BombPlant { tick, player } => {
                        ctx.plants.push((*tick, frame.time, player.clone()))
                    }
                    GameEvent::DefuseStart { tick, player } => {
                        ctx.defuse_starts.push((*tick, frame.time, player.clone()))
                    }
                    GameEvent::DefuseAbort { tick, player } => {
                        ctx.defuse_aborts.push((*tick, frame.time, player.clone()))
                    }
                    GameEvent::BombDefuse { tick, player } => {
                        ctx.defuses.push((*tick, frame.time, player.clone()))
                    }
                    GameEvent::BombDrop { tick, player } => {
                        ctx.drops.push((*tick, frame.time, player.clone()))
                    }
                    GameEvent::BombPickup { tick, player } => {
                        ctx.pickups.push((*tick, frame.time, player.clone()))
                    }
                    _ => {}
                }
            }
        }
        ctx
    }

    /// Contested-ness of `team`'s situation at `time`, in [0, 1].
    fn pressure_at(&self, team: Team, time: f64, opts: &ObjectiveOptions) -> f64 {
        let from = time - opts.pressure_window_secs;
        let dmg = self
            .damage_taken
            .iter()
            .filter(|(t, tm)| *t > from && *t <= time && *tm == team)
            .count() as f64;
        let deaths = self
            .deaths
            .iter()
            .filter(|(t, tm)| *t > from && *t <= time && *tm == team)
            .count() as f64;
        let volume = self
            .fire_volume
            .iter()
            .filter(|t| **t > from && **t <= time)
            .count() as f64;
        clamp_confidence(0.25 * dmg + 0.4 * deaths + 0.05 * volume)
    }

    /// How unrealistic continuing the objective is for `team` at `tick`.
    fn hopelessness_at(&self, team: Team, tick: u64, time: f64) -> f64 {
        let mut score = 0.0;
        if let Some(frame) = self.timeline.frame_at_or_before(tick) {
            let own = frame
                .players
                .iter()
                .filter(|p| p.team == team && p.is_alive)
                .count() as f64;
            let enemy = frame
                .players
                .iter()
                .filter(|p| p.team.is_playing() && p.team != team && p.is_alive)
                .count() as f64;
            if enemy > own {
                score += 0.15 * (enemy - own);
            }
        }
        let remaining = self.round_end_time - time;
        if remaining < PLANT_TIME_FLOOR_SECS {
            score += 0.4 * (1.0 - remaining.max(0.0) / PLANT_TIME_FLOOR_SECS);
        }
        clamp_confidence(score)
    }
}

/// Detect objective-sabotage findings across all rounds.
pub fn detect_objective_sabotage(
    timeline: &Timeline,
    opts: &ObjectiveOptions,
) -> Vec<ObjectiveEvent> {
    let lookback = (opts.pressure_window_secs * timeline.tick_rate) as u64;
    let mut events = Vec::new();

    for round in &timeline.rounds {
        let (live_start, round_end) = match round.live_window() {
            Some(w) => w,
            None => continue,
        };
        let ctx = RoundContext::build(timeline, round.number, live_start, round_end, lookback);
        let frames = timeline.frames_in_range(live_start, round_end);
        if frames.len() < 2 {
            continue;
        }

        detect_carrier_stall(&ctx, &frames, opts, &mut events);
        detect_cluster_no_plant(&ctx, &frames, opts, &mut events);
        detect_unforced_drops(&ctx, opts, &mut events);
        detect_no_defuse_attempt(&ctx, &frames, opts, &mut events);
        detect_early_aborts(&ctx, opts, &mut events);
    }

    events.sort_by(|a, b| {
        a.tick
            .cmp(&b.tick)
            .then(a.player_id.cmp(&b.player_id))
            .then(a.kind.cmp(&b.kind))
    });
    events
}

/// Carrier camping with the bomb while a plant was still realistic.
fn detect_carrier_stall(
    ctx: &RoundContext<'_>,
    frames: &[MatchFrame],
    opts: &ObjectiveOptions,
    out: &mut Vec<ObjectiveEvent>,
) {
    if !ctx.plants.is_empty() {
        return;
    }

    // Positions of whoever holds the bomb, per frame.
    let mut carrier_track: Vec<(u64, f64, u64, String, Team, (f64, f64))> = Vec::new();
    for frame in frames {
        if let Some(p) = frame.players.iter().find(|p| p.has_bomb && p.is_alive) {
            carrier_track.push((
                frame.tick,
                frame.time,
                p.id,
                p.name.clone(),
                p.team,
                (p.position.x, p.position.y),
            ));
        }
    }
    if carrier_track.is_empty() {
        return;
    }

    // Longest contiguous stretch (same carrier) where displacement over the
    // trailing stall window stays under epsilon.
    let mut best: Option<(usize, usize)> = None; // [start, end] indexes
    let mut run_start: Option<usize> = None;
    for i in 0..carrier_track.len() {
        let (_, t_i, id_i, _, _, pos_i) = &carrier_track[i];
        let from = t_i - opts.stall_window_secs;
        let stalled = if *t_i - ctx.live_start_time < opts.stall_window_secs {
            false
        } else {
            !carrier_track[..i].iter().any(|(_, t, id, _, _, pos)| {
                *t > from && id == id_i && {
                    let dx = pos_i.0 - pos.0;
                    let dy = pos_i.1 - pos.1;
                    (dx * dx + dy * dy).sqrt() > opts.stall_epsilon_units
                }
            })
        };
        let same_carrier = run_start
            .map(|s| carrier_track[s].2 == *id_i)
            .unwrap_or(true);
        if stalled && same_carrier {
            if run_start.is_none() {
                run_start = Some(i);
            }
            let s = run_start.unwrap();
            let better = match best {
                Some((bs, be)) => {
                    carrier_track[i].1 - carrier_track[s].1
                        > carrier_track[be].1 - carrier_track[bs].1
                }
                None => true,
            };
            if better {
                best = Some((s, i));
            }
        } else {
            run_start = None;
        }
    }

    let Some((s, e)) = best else { return };
    let stall_secs = carrier_track[e].1 - carrier_track[s].1;
    if stall_secs < opts.min_stall_secs {
        return;
    }

    let (tick, time, id, name, team, _) = carrier_track[e].clone();
    let pressure = ctx.pressure_at(team, time, opts);
    let hopelessness = ctx.hopelessness_at(team, tick, time);
    let base = (stall_secs / FULL_STALL_SECS).min(1.0);
    let confidence = clamp_confidence(base * (1.0 - pressure) * (1.0 - hopelessness));
    if confidence < opts.min_confidence {
        return;
    }

    let mut features = ObjectiveFeatureSummary::context(pressure, hopelessness);
    features.stall_secs = Some(stall_secs);
    out.push(ObjectiveEvent {
        kind: ObjectiveEventKind::CarrierStall,
        round: ctx.round_number,
        player_id: id,
        player_name: name.clone(),
        team,
        tick,
        time,
        confidence,
        reason: format!(
            "{} held the bomb without moving or planting for {:.1}s",
            name, stall_secs
        ),
        features,
    });
}

/// Squad parked on the carrier for a sustained window without a plant.
fn detect_cluster_no_plant(
    ctx: &RoundContext<'_>,
    frames: &[MatchFrame],
    opts: &ObjectiveOptions,
    out: &mut Vec<ObjectiveEvent>,
) {
    if !ctx.plants.is_empty() {
        return;
    }

    // Open run: (start time, carrier id/name/team, max clustered count).
    let mut run: Option<(f64, u64, String, Team, u32)> = None;
    let mut last: Option<(u64, f64)> = None;

    for frame in frames {
        let clustered = frame
            .players
            .iter()
            .find(|p| p.has_bomb && p.is_alive)
            .and_then(|c| {
                let near = frame
                    .players
                    .iter()
                    .filter(|p| {
                        p.id != c.id
                            && p.team == c.team
                            && p.is_alive
                            && p.position.dist_2d(&c.position) <= opts.cluster_radius_units
                    })
                    .count();
                (near >= opts.min_cluster_teammates)
                    .then(|| (c.id, c.name.clone(), c.team, near as u32))
            });

        match clustered {
            Some((id, name, team, near)) => {
                match run.as_mut() {
                    Some(r) if r.1 == id => r.4 = r.4.max(near),
                    _ => {
                        flush_cluster(ctx, run.take(), last, opts, out);
                        run = Some((frame.time, id, name, team, near));
                    }
                }
                last = Some((frame.tick, frame.time));
            }
            None => {
                flush_cluster(ctx, run.take(), last, opts, out);
                last = None;
            }
        }
    }
    flush_cluster(ctx, run.take(), last, opts, out);
}

fn flush_cluster(
    ctx: &RoundContext<'_>,
    run: Option<(f64, u64, String, Team, u32)>,
    last: Option<(u64, f64)>,
    opts: &ObjectiveOptions,
    out: &mut Vec<ObjectiveEvent>,
) {
    let (Some((start_time, id, name, team, max_near)), Some((end_tick, end_time))) = (run, last)
    else {
        return;
    };
    let cluster_secs = end_time - start_time;
    if cluster_secs < opts.min_cluster_secs {
        return;
    }

    let pressure = ctx.pressure_at(team, end_time, opts);
    let hopelessness = ctx.hopelessness_at(team, end_tick, end_time);
    let base = (cluster_secs / FULL_CLUSTER_SECS).min(1.0);
    let confidence = clamp_confidence(base * (1.0 - pressure) * (1.0 - hopelessness));
    if confidence < opts.min_confidence {
        return;
    }

    let mut features = ObjectiveFeatureSummary::context(pressure, hopelessness);
    features.stall_secs = Some(cluster_secs);
    features.clustered_teammates = Some(max_near);
    out.push(ObjectiveEvent {
        kind: ObjectiveEventKind::ClusterNoPlant,
        round: ctx.round_number,
        player_id: id,
        player_name: name.clone(),
        team,
        tick: end_tick,
        time: end_time,
        confidence,
        reason: format!(
            "{} and {} teammates sat together with the bomb for {:.1}s without a plant attempt",
            name, max_near, cluster_secs
        ),
        features,
    });
}

/// Bomb dropped with no pressure, especially when the enemy recovers it.
fn detect_unforced_drops(
    ctx: &RoundContext<'_>,
    opts: &ObjectiveOptions,
    out: &mut Vec<ObjectiveEvent>,
) {
    let lookback = (opts.pressure_window_secs * ctx.timeline.tick_rate) as u64;
    for (tick, time, player) in &ctx.drops {
        let Some(dropper) = ctx.timeline.player_by_name_near(*tick, player, lookback) else {
            continue;
        };
        let (id, name, team) = (dropper.id, dropper.name.clone(), dropper.team);
        let drop_pos = dropper.position;

        let pressure = ctx.pressure_at(team, *time, opts);
        if pressure >= opts.forced_drop_pressure {
            continue;
        }

        let teammates_nearby = ctx
            .timeline
            .frame_at_or_before(*tick)
            .map(|f| {
                f.players
                    .iter()
                    .filter(|p| {
                        p.id != id
                            && p.team == team
                            && p.is_alive
                            && p.position.dist_2d(&drop_pos) <= opts.cluster_radius_units
                    })
                    .count() as u32
            })
            .unwrap_or(0);

        let enemy_recovered = ctx
            .pickups
            .iter()
            .filter(|(pt, _, _)| pt > tick)
            .find_map(|(pt, _, picker)| {
                ctx.timeline
                    .player_by_name_near(*pt, picker, lookback)
                    .map(|p| p.team != team)
            })
            .unwrap_or(false);

        let hopelessness = ctx.hopelessness_at(team, *tick, *time);
        let mut base = 0.4;
        if enemy_recovered {
            base += 0.3;
        }
        if teammates_nearby > 0 {
            base += 0.2;
        }
        let confidence = clamp_confidence(base * (1.0 - pressure) * (1.0 - hopelessness));
        if confidence < opts.min_confidence {
            continue;
        }

        let mut features = ObjectiveFeatureSummary::context(pressure, hopelessness);
        features.teammates_nearby = Some(teammates_nearby);
        features.enemy_recovered_bomb = Some(enemy_recovered);
        let mut reason = format!("{} dropped the bomb under no pressure", name);
        if enemy_recovered {
            reason.push_str("; the enemy team recovered it");
        }
        out.push(ObjectiveEvent {
            kind: ObjectiveEventKind::UnforcedBombDrop,
            round: ctx.round_number,
            player_id: id,
            player_name: name,
            team,
            tick: *tick,
            time: *time,
            confidence,
            reason,
            features,
        });
    }
}

/// CT lingering in defuse range of the planted bomb without ever starting
/// a defuse. The planter's position at plant time stands in for the bomb
/// spot, since the model carries no bomb entity.
fn detect_no_defuse_attempt(
    ctx: &RoundContext<'_>,
    frames: &[MatchFrame],
    opts: &ObjectiveOptions,
    out: &mut Vec<ObjectiveEvent>,
) {
    let lookback = (opts.pressure_window_secs * ctx.timeline.tick_rate) as u64;
    let Some((plant_tick, _, planter)) = ctx.plants.first() else {
        return;
    };
    let Some(bomb_pos) = ctx
        .timeline
        .player_by_name_near(*plant_tick, planter, lookback)
        .map(|p| p.position)
    else {
        return;
    };

    // Per CT: longest contiguous in-range stretch after the plant.
    let mut lingers: Vec<(u64, String, u64, f64, f64)> = Vec::new(); // id, name, end tick, end time, secs
    let mut open: FxHashMap<u64, (String, f64, u64, f64)> = FxHashMap::default();
    for frame in frames.iter().filter(|f| f.tick > *plant_tick) {
        let mut seen: Vec<u64> = Vec::new();
        for p in &frame.players {
            if p.team != Team::Ct || !p.is_alive {
                continue;
            }
            if p.position.dist_2d(&bomb_pos) <= opts.defuse_range_units {
                seen.push(p.id);
                let entry = open
                    .entry(p.id)
                    .or_insert_with(|| (p.name.clone(), frame.time, frame.tick, frame.time));
                entry.2 = frame.tick;
                entry.3 = frame.time;
            }
        }
        let closed: Vec<u64> = open.keys().filter(|id| !seen.contains(id)).copied().collect();
        for id in closed {
            if let Some((name, start, end_tick, end_time)) = open.remove(&id) {
                lingers.push((id, name, end_tick, end_time, end_time - start));
            }
        }
    }
    for (id, (name, start, end_tick, end_time)) in open {
        lingers.push((id, name, end_tick, end_time, end_time - start));
    }
    lingers.sort_by_key(|(id, _, _, _, _)| *id);

    for (id, name, end_tick, end_time, linger_secs) in lingers {
        if linger_secs < opts.min_linger_secs {
            continue;
        }
        if ctx.defuse_starts.iter().any(|(_, _, p)| p == &name)
            || ctx.defuses.iter().any(|(_, _, p)| p == &name)
        {
            continue;
        }
        let pressure = ctx.pressure_at(Team::Ct, end_time, opts);
        let hopelessness = ctx.hopelessness_at(Team::Ct, end_tick, end_time);
        let base = (linger_secs / FULL_LINGER_SECS).min(1.0);
        let confidence = clamp_confidence(base * (1.0 - pressure) * (1.0 - hopelessness));
        if confidence < opts.min_confidence {
            continue;
        }

        let mut features = ObjectiveFeatureSummary::context(pressure, hopelessness);
        features.linger_secs = Some(linger_secs);
        out.push(ObjectiveEvent {
            kind: ObjectiveEventKind::NoDefuseAttempt,
            round: ctx.round_number,
            player_id: id,
            player_name: name.clone(),
            team: Team::Ct,
            tick: end_tick,
            time: end_time,
            confidence,
            reason: format!(
                "{} stayed within defuse range of the bomb for {:.1}s without attempting a defuse",
                name, linger_secs
            ),
            features,
        });
    }
}

/// Defuse started, abandoned almost immediately, never retried.
fn detect_early_aborts(
    ctx: &RoundContext<'_>,
    opts: &ObjectiveOptions,
    out: &mut Vec<ObjectiveEvent>,
) {
    let lookback = (opts.pressure_window_secs * ctx.timeline.tick_rate) as u64;
    for (abort_tick, abort_time, player) in &ctx.defuse_aborts {
        let Some((_, start_time, _)) = ctx
            .defuse_starts
            .iter()
            .filter(|(t, _, p)| t <= abort_tick && p == player)
            .last()
        else {
            continue;
        };
        let held = abort_time - start_time;
        if held > opts.early_abort_secs {
            continue;
        }
        let retried = ctx.defuse_starts.iter().any(|(t, tt, p)| {
            p == player && t > abort_tick && *tt <= abort_time + opts.reattempt_window_secs
        });
        if retried || ctx.defuses.iter().any(|(_, _, p)| p == player) {
            continue;
        }
        let Some(ct) = ctx.timeline.player_by_name_near(*abort_tick, player, lookback) else {
            continue;
        };

        let pressure = ctx.pressure_at(ct.team, *abort_time, opts);
        let hopelessness = ctx.hopelessness_at(ct.team, *abort_tick, *abort_time);
        let confidence = clamp_confidence(0.6 * (1.0 - pressure) * (1.0 - hopelessness));
        if confidence < opts.min_confidence {
            continue;
        }

        let mut features = ObjectiveFeatureSummary::context(pressure, hopelessness);
        features.defuse_held_secs = Some(held);
        out.push(ObjectiveEvent {
            kind: ObjectiveEventKind::EarlyDefuseAbort,
            round: ctx.round_number,
            player_id: ct.id,
            player_name: ct.name.clone(),
            team: ct.team,
            tick: *abort_tick,
            time: *abort_time,
            confidence,
            reason: format!(
                "{} abandoned the defuse after {:.1}s and never retried",
                ct.name, held
            ),
            features,
        });
    }
}
