//! # Disconnect/Reconnect Detector
//!
//! Tracks player presence gaps into disconnect records with rounds-missed
//! accounting. Two complementary signal sources are reconciled without
//! double counting: explicit connect/disconnect events are authoritative
//! when present; frame-presence gaps synthesize disconnects for players
//! the event stream missed.

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::models::timeline::{Team, Timeline};

/// A player absent from frames for at least this long is treated as
/// disconnected on the fallback path.
pub const PRESENCE_GAP_SECS: f64 = 2.0;

/// Disconnects in the final round shorter than this are end-of-match
/// network blips, not meaningful absences.
pub const LAST_ROUND_BLIP_SECS: f64 = 10.0;

/// Lookback for resolving team/alive state at the disconnect tick.
pub const STATE_LOOKUP_WINDOW_SECS: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct DisconnectOptions {
    pub presence_gap_secs: f64,
    pub last_round_blip_secs: f64,
    pub state_lookup_window_secs: f64,
}

impl Default for DisconnectOptions {
    fn default() -> Self {
        Self {
            presence_gap_secs: PRESENCE_GAP_SECS,
            last_round_blip_secs: LAST_ROUND_BLIP_SECS,
            state_lookup_window_secs: STATE_LOOKUP_WINDOW_SECS,
        }
    }
}

/// Which signal produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectSource {
    Explicit,
    FramePresence,
}

/// One observed presence gap, optionally paired with a reconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectReconnect {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<u64>,
    pub player_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    pub disconnect_tick: u64,
    pub disconnect_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disconnect_round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect_tick: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect_round: Option<u32>,
    /// Gap length in seconds; for permanent disconnects, to demo end.
    pub duration: f64,
    /// No reconnect observed by demo end.
    pub permanent: bool,
    /// Player already died in the disconnect round, so that round does not
    /// count as missed.
    pub died_before_disconnect: bool,
    /// Reconnect landed before freeze-end of its round, so that round is
    /// being played and does not count as missed.
    pub reconnected_before_freeze_end: bool,
    pub rounds_missed: u32,
    pub source: DisconnectSource,
}

/// An open disconnect awaiting a matching reconnect.
struct OpenDisconnect {
    tick: u64,
    player_name: String,
    player_id: Option<u64>,
    source: DisconnectSource,
}

fn finalize(
    timeline: &Timeline,
    open: OpenDisconnect,
    reconnect_tick: Option<u64>,
    opts: &DisconnectOptions,
) -> DisconnectReconnect {
    let spt = timeline.seconds_per_tick();
    let lookback = (opts.state_lookup_window_secs * timeline.tick_rate) as u64;

    // Resolve identity and state at the disconnect tick.
    let state = match open.player_id {
        Some(id) => timeline.player_state_near(open.tick, id, lookback),
        None => timeline.player_by_name_near(open.tick, &open.player_name, lookback),
    };
    let player_id = open.player_id.or(state.map(|s| s.id));
    let team = state.map(|s| s.team);

    let disconnect_round = timeline.round_at_tick(open.tick);
    // Only a death inside the disconnect round counts; a stale dead
    // snapshot from an earlier round would misattribute, so the lookback
    // is floored at the round's start tick.
    let died_before_disconnect = disconnect_round
        .map(|r| {
            let floor = r.start_tick.max(open.tick.saturating_sub(lookback));
            timeline
                .frames_in_range(floor, open.tick)
                .iter()
                .rev()
                .find_map(|f| match open.player_id {
                    Some(id) => f.player(id),
                    None => f.player_by_name(&open.player_name),
                })
                .map(|s| !s.is_alive)
                .unwrap_or(false)
        })
        .unwrap_or(false);

    let last_round_number = timeline.rounds.last().map(|r| r.number).unwrap_or(0);
    let (reconnect_round, reconnected_before_freeze_end) = match reconnect_tick {
        Some(t) => {
            let round = timeline.round_at_tick(t);
            let before_freeze = round
                .and_then(|r| r.freeze_end_tick)
                .map(|f| t < f)
                .unwrap_or(false);
            (round.map(|r| r.number), before_freeze)
        }
        None => (
            // Permanent disconnect misses through the final round.
            (last_round_number > 0).then_some(last_round_number),
            false,
        ),
    };

    let duration = match reconnect_tick {
        Some(t) => t.saturating_sub(open.tick) as f64 * spt,
        None => (timeline.duration - open.tick as f64 * spt).max(0.0),
    };

    let mut rounds_missed: i64 = match (disconnect_round.map(|r| r.number), reconnect_round) {
        (Some(d), Some(r)) if r >= d => (r - d + 1) as i64,
        (Some(_), _) => 1,
        _ => 0,
    };
    if died_before_disconnect {
        rounds_missed -= 1;
    }
    if reconnected_before_freeze_end {
        rounds_missed -= 1;
    }

    DisconnectReconnect {
        player_id,
        player_name: open.player_name,
        team,
        disconnect_tick: open.tick,
        disconnect_time: open.tick as f64 * spt,
        disconnect_round: disconnect_round.map(|r| r.number),
        reconnect_tick,
        reconnect_time: reconnect_tick.map(|t| t as f64 * spt),
        reconnect_round,
        duration,
        permanent: reconnect_tick.is_none(),
        died_before_disconnect,
        reconnected_before_freeze_end,
        rounds_missed: rounds_missed.max(0) as u32,
        source: open.source,
    }
}

/// Detect disconnect/reconnect pairs from both signal sources.
pub fn detect_disconnects(
    timeline: &Timeline,
    opts: &DisconnectOptions,
) -> Vec<DisconnectReconnect> {
    let mut records: Vec<DisconnectReconnect> = Vec::new();

    // --- Pass 1: explicit events, matched per player name. -------------
    let mut open_by_name: FxHashMap<&str, Vec<OpenDisconnect>> = FxHashMap::default();
    for ev in &timeline.disconnect_events {
        open_by_name.entry(ev.player_name.as_str()).or_default().push(OpenDisconnect {
            tick: ev.tick,
            player_name: ev.player_name.clone(),
            player_id: ev.player_id,
            source: DisconnectSource::Explicit,
        });
    }
    for connect in &timeline.connect_events {
        let Some(opens) = open_by_name.get_mut(connect.player_name.as_str()) else { continue };
        // Most recent still-open disconnect preceding the connect tick.
        let candidate = opens
            .iter()
            .enumerate()
            .filter(|(_, o)| o.tick < connect.tick)
            .max_by_key(|(_, o)| o.tick)
            .map(|(i, _)| i);
        if let Some(i) = candidate {
            let open = opens.remove(i);
            records.push(finalize(timeline, open, Some(connect.tick), opts));
        }
    }
    let explicit_names: Vec<String> =
        timeline.disconnect_events.iter().map(|e| e.player_name.clone()).collect();
    let mut leftovers: Vec<OpenDisconnect> =
        open_by_name.into_values().flatten().collect();
    leftovers.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.player_name.cmp(&b.player_name)));
    for open in leftovers {
        records.push(finalize(timeline, open, None, opts));
    }

    // --- Pass 2: frame-presence fallback. -------------------------------
    let gap_ticks = (opts.presence_gap_secs * timeline.tick_rate) as u64;
    let mut presence: FxHashMap<u64, (String, Vec<u64>)> = FxHashMap::default();
    for frame in &timeline.frames {
        for p in &frame.players {
            presence
                .entry(p.id)
                .or_insert_with(|| (p.name.clone(), Vec::new()))
                .1
                .push(frame.tick);
        }
    }

    let mut ids: Vec<u64> = presence.keys().copied().collect();
    ids.sort_unstable();
    let demo_end = timeline.last_tick();
    for id in ids {
        let (name, ticks) = &presence[&id];
        if explicit_names.iter().any(|n| n == name) {
            continue; // explicit events own this player
        }
        for window in ticks.windows(2) {
            if window[1].saturating_sub(window[0]) >= gap_ticks {
                let open = OpenDisconnect {
                    tick: window[0],
                    player_name: name.clone(),
                    player_id: Some(id),
                    source: DisconnectSource::FramePresence,
                };
                records.push(finalize(timeline, open, Some(window[1]), opts));
            }
        }
        if let Some(&last_seen) = ticks.last() {
            if demo_end.saturating_sub(last_seen) >= gap_ticks {
                let open = OpenDisconnect {
                    tick: last_seen,
                    player_name: name.clone(),
                    player_id: Some(id),
                    source: DisconnectSource::FramePresence,
                };
                records.push(finalize(timeline, open, None, opts));
            }
        }
    }

    // --- Final filter: last-round blips. --------------------------------
    let last_round_number = timeline.rounds.last().map(|r| r.number);
    records.retain(|r| {
        if r.disconnect_round.is_some() && r.disconnect_round == last_round_number {
            r.duration >= opts.last_round_blip_secs
        } else {
            true
        }
    });

    records.sort_by(|a, b| {
        a.disconnect_tick.cmp(&b.disconnect_tick).then(a.player_name.cmp(&b.player_name))
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_fixtures::{multi_round_timeline, FramePlan};
    use crate::models::raw_events::ConnectionEvent;

    /// Eight contiguous rounds of 2000 ticks, freeze-end 320 ticks in.
    fn eight_round_windows() -> Vec<(u64, u64, u64)> {
        (0..8u64).map(|i| (i * 2000, i * 2000 + 320, (i + 1) * 2000 - 1)).collect()
    }

    fn conn(tick: u64, name: &str) -> ConnectionEvent {
        ConnectionEvent { tick, player_name: name.into(), player_id: None }
    }

    #[test]
    fn test_rounds_missed_alive_reconnect_after_freeze() {
        // Disconnect alive in round 5 (ticks 8000..9999), reconnect after
        // freeze-end of round 8 (freeze-end 14320) -> misses 5,6,7,8 = 4.
        let windows = eight_round_windows();
        let tl = {
            let mut tl = multi_round_timeline(
                64.0,
                &windows,
                vec![FramePlan::stationary(1, "ghost", Team::Ct, (0.0, 0.0))],
            );
            tl.disconnect_events = vec![conn(8500, "ghost")];
            tl.connect_events = vec![conn(15000, "ghost")];
            tl
        };

        let records = detect_disconnects(&tl, &DisconnectOptions::default());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.disconnect_round, Some(5));
        assert_eq!(r.reconnect_round, Some(8));
        assert!(!r.died_before_disconnect);
        assert!(!r.reconnected_before_freeze_end);
        assert_eq!(r.rounds_missed, 4);
        assert_eq!(r.source, DisconnectSource::Explicit);
    }

    #[test]
    fn test_rounds_missed_death_discount() {
        let windows = eight_round_windows();
        // Dies at tick 8200 in round 5, disconnects at 8500.
        let mut tl = multi_round_timeline(
            64.0,
            &windows,
            vec![FramePlan::dies_at(1, "ghost", Team::Ct, (0.0, 0.0), 8200)],
        );
        tl.disconnect_events = vec![conn(8500, "ghost")];
        tl.connect_events = vec![conn(15000, "ghost")];

        let records = detect_disconnects(&tl, &DisconnectOptions::default());
        assert_eq!(records.len(), 1);
        assert!(records[0].died_before_disconnect);
        assert_eq!(records[0].rounds_missed, 3, "rounds 6,7,8");
    }

    #[test]
    fn test_stale_death_from_previous_round_not_discounted() {
        let windows = eight_round_windows();
        // Dies late in round 4 (tick 7800), never appears in round 5's
        // frames, disconnects at 8500 in round 5. The dead snapshot from
        // round 4 must not discount round 5.
        let mut plan = FramePlan::dies_at(1, "ghost", Team::Ct, (0.0, 0.0), 7800);
        plan.absent_between = Some((8000, 15000));
        let mut tl = multi_round_timeline(64.0, &windows, vec![plan]);
        tl.disconnect_events = vec![conn(8500, "ghost")];
        tl.connect_events = vec![conn(15000, "ghost")];

        let records = detect_disconnects(&tl, &DisconnectOptions::default());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.disconnect_round, Some(5));
        assert!(!r.died_before_disconnect, "death was in round 4, not round 5");
        assert_eq!(r.rounds_missed, 4, "rounds 5,6,7,8");
    }

    #[test]
    fn test_rounds_missed_reconnect_before_freeze_end() {
        let windows = eight_round_windows();
        let mut tl = multi_round_timeline(
            64.0,
            &windows,
            vec![FramePlan::stationary(1, "ghost", Team::Ct, (0.0, 0.0))],
        );
        tl.disconnect_events = vec![conn(8500, "ghost")];
        // Round 8 starts at 14000, freeze-end 14320; reconnect at 14100.
        tl.connect_events = vec![conn(14100, "ghost")];

        let records = detect_disconnects(&tl, &DisconnectOptions::default());
        assert_eq!(records.len(), 1);
        assert!(records[0].reconnected_before_freeze_end);
        assert_eq!(records[0].rounds_missed, 3, "rounds 5,6,7 only");
    }

    #[test]
    fn test_permanent_disconnect_runs_to_demo_end() {
        let windows = eight_round_windows();
        let mut tl = multi_round_timeline(
            64.0,
            &windows,
            vec![FramePlan::stationary(1, "ghost", Team::Ct, (0.0, 0.0))],
        );
        tl.disconnect_events = vec![conn(8500, "ghost")];

        let records = detect_disconnects(&tl, &DisconnectOptions::default());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert!(r.permanent);
        assert_eq!(r.reconnect_round, Some(8), "missed through the final round");
        assert_eq!(r.rounds_missed, 4);
        assert!(r.duration > 0.0);
    }

    #[test]
    fn test_frame_presence_fallback() {
        let windows = eight_round_windows();
        let mut plan = FramePlan::stationary(2, "flaky", Team::T, (10.0, 10.0));
        plan.absent_between = Some((4000, 4500)); // ~7.8s gap at 64/s
        let tl = multi_round_timeline(64.0, &windows, vec![plan]);

        let records = detect_disconnects(&tl, &DisconnectOptions::default());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.source, DisconnectSource::FramePresence);
        assert_eq!(r.player_id, Some(2));
        assert!(r.reconnect_tick.unwrap() >= 4500);
        assert!(!r.permanent);
    }

    #[test]
    fn test_short_presence_gap_ignored() {
        let windows = eight_round_windows();
        let mut plan = FramePlan::stationary(2, "steady", Team::T, (10.0, 10.0));
        plan.absent_between = Some((4000, 4064)); // 1s gap, under threshold
        let tl = multi_round_timeline(64.0, &windows, vec![plan]);

        assert!(detect_disconnects(&tl, &DisconnectOptions::default()).is_empty());
    }

    #[test]
    fn test_explicit_player_excluded_from_fallback() {
        let windows = eight_round_windows();
        let mut plan = FramePlan::stationary(1, "ghost", Team::Ct, (0.0, 0.0));
        plan.absent_between = Some((8500, 15000));
        let mut tl = multi_round_timeline(64.0, &windows, vec![plan]);
        tl.disconnect_events = vec![conn(8500, "ghost")];
        tl.connect_events = vec![conn(15000, "ghost")];

        let records = detect_disconnects(&tl, &DisconnectOptions::default());
        assert_eq!(records.len(), 1, "no double counting across sources");
        assert_eq!(records[0].source, DisconnectSource::Explicit);
    }

    #[test]
    fn test_last_round_blip_suppressed() {
        let windows = eight_round_windows();
        // Round 8 spans 14000..15999; 5s gap inside it.
        let mut plan = FramePlan::stationary(3, "blip", Team::Ct, (0.0, 0.0));
        plan.absent_between = Some((15000, 15320));
        let tl = multi_round_timeline(64.0, &windows, vec![plan]);

        assert!(
            detect_disconnects(&tl, &DisconnectOptions::default()).is_empty(),
            "sub-10s final-round gap is a network blip"
        );
    }

    #[test]
    fn test_mid_round_short_disconnect_kept() {
        let windows = eight_round_windows();
        // Same 5s gap, but in round 3: kept regardless of duration.
        let mut plan = FramePlan::stationary(3, "blip", Team::Ct, (0.0, 0.0));
        plan.absent_between = Some((5000, 5320));
        let tl = multi_round_timeline(64.0, &windows, vec![plan]);

        let records = detect_disconnects(&tl, &DisconnectOptions::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].disconnect_round, Some(3));
    }
}
