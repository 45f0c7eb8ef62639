//! # Team Flash Detector
//!
//! Classifies `player_blind` reports as friendly flashes. The blind stream
//! is the richest single source because it carries both thrower and victim.
//! Near-simultaneous duplicate reports of the same real flash are
//! deduplicated, keeping the report with the larger duration.

use serde::{Deserialize, Serialize};

use crate::models::timeline::{Team, Timeline};

/// Flashes shorter than this are gameplay-insignificant.
pub const MIN_FLASH_DURATION_SECS: f64 = 1.0;

/// Reports of the same (thrower, victim, round) within this window are
/// duplicates of one real event.
pub const DEDUP_WINDOW_SECS: f64 = 1.0;

/// Blind events can arrive a few ticks before the frame snapshot that
/// reflects them; team lookup searches back this far.
pub const TEAM_LOOKUP_WINDOW_SECS: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct TeamFlashOptions {
    pub min_flash_duration_secs: f64,
    pub dedup_window_secs: f64,
    pub team_lookup_window_secs: f64,
}

impl Default for TeamFlashOptions {
    fn default() -> Self {
        Self {
            min_flash_duration_secs: MIN_FLASH_DURATION_SECS,
            dedup_window_secs: DEDUP_WINDOW_SECS,
            team_lookup_window_secs: TEAM_LOOKUP_WINDOW_SECS,
        }
    }
}

/// One friendly flash exceeding the minimum duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamFlash {
    pub tick: u64,
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    pub attacker_id: u64,
    pub attacker_name: String,
    pub victim_id: u64,
    pub victim_name: String,
    pub team: Team,
    /// Blind duration in seconds.
    pub flash_duration: f64,
}

/// Detect friendly flashes from the normalized blind-event stream.
pub fn detect_team_flashes(timeline: &Timeline, opts: &TeamFlashOptions) -> Vec<TeamFlash> {
    let lookback = (opts.team_lookup_window_secs * timeline.tick_rate) as u64;

    let mut candidates: Vec<TeamFlash> = Vec::new();
    for blind in &timeline.blind_events {
        if blind.duration < opts.min_flash_duration_secs {
            continue;
        }
        if blind.attacker_name == blind.victim_name {
            continue; // self-flash
        }
        let Some(attacker) =
            timeline.player_by_name_near(blind.tick, &blind.attacker_name, lookback)
        else {
            continue;
        };
        let Some(victim) = timeline.player_by_name_near(blind.tick, &blind.victim_name, lookback)
        else {
            continue;
        };
        if !attacker.team.is_playing() || attacker.team != victim.team || attacker.id == victim.id
        {
            continue;
        }
        candidates.push(TeamFlash {
            tick: blind.tick,
            time: blind.time,
            round: timeline.round_at_tick(blind.tick).map(|r| r.number),
            attacker_id: attacker.id,
            attacker_name: attacker.name.clone(),
            victim_id: victim.id,
            victim_name: victim.name.clone(),
            team: attacker.team,
            flash_duration: blind.duration,
        });
    }

    // Dedup: chain same-triple reports within the window, keep the most
    // informative (longest) one per chain.
    candidates.sort_by(|a, b| {
        (a.attacker_id, a.victim_id, a.round)
            .cmp(&(b.attacker_id, b.victim_id, b.round))
            .then(a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut deduped: Vec<TeamFlash> = Vec::new();
    let mut chain: Option<(TeamFlash, f64)> = None; // (best so far, last time)
    for flash in candidates {
        match chain.take() {
            Some((best, last_time))
                if best.attacker_id == flash.attacker_id
                    && best.victim_id == flash.victim_id
                    && best.round == flash.round
                    && flash.time - last_time <= opts.dedup_window_secs =>
            {
                let last = flash.time;
                let best = if flash.flash_duration > best.flash_duration { flash } else { best };
                chain = Some((best, last));
            }
            Some((best, _)) => {
                deduped.push(best);
                let last = flash.time;
                chain = Some((flash, last));
            }
            None => {
                let last = flash.time;
                chain = Some((flash, last));
            }
        }
    }
    if let Some((best, _)) = chain {
        deduped.push(best);
    }

    deduped.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.victim_id.cmp(&b.victim_id)));
    deduped
}
