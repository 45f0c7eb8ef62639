//! # Economy Griefing Detector (experimental)
//!
//! Reconstructs per-player buy value from item pickup/equip events inside
//! each round's buy window, classifies the team's buy state from the
//! median teammate value, and flags economic sabotage patterns:
//!
//! - **Underbuy** — saving while the team commits to a buy.
//! - **Overbuy** — breaking a team eco with an expensive solo buy, waived
//!   when the buy had combat impact.
//! - **No defuse kit** — CT full-buy without a kit.
//! - **Wasted buy** — expensive loadout thrown away in the opening of the
//!   round with zero contribution.
//!
//! Single events are weak evidence; the match-level aggregation applies a
//! repetition multiplier per kind and only raises a flag on a pattern.

use fxhash::FxHashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::analysis::common::clamp_confidence;
use crate::analysis::friendly_fire::parse_kill_description;
use crate::models::timeline::{GameEvent, Team, Timeline};

/// Store prices in game currency. Unknown items price at zero.
pub static WEAPON_PRICES: Lazy<FxHashMap<&'static str, u32>> = Lazy::new(|| {
    let mut m = FxHashMap::default();
    for (item, price) in [
        ("glock", 200),
        ("usp_silencer", 200),
        ("hkp2000", 200),
        ("p250", 300),
        ("dualberettas", 400),
        ("elite", 400),
        ("fiveseven", 500),
        ("tec9", 500),
        ("cz75a", 500),
        ("deagle", 700),
        ("revolver", 600),
        ("nova", 1050),
        ("sawedoff", 1100),
        ("mag7", 1300),
        ("xm1014", 2000),
        ("mac10", 1050),
        ("mp9", 1250),
        ("ump45", 1200),
        ("mp7", 1500),
        ("mp5sd", 1500),
        ("p90", 2350),
        ("bizon", 1400),
        ("galilar", 1800),
        ("famas", 2050),
        ("ak47", 2700),
        ("m4a1_silencer", 2900),
        ("m4a4", 3100),
        ("sg556", 3000),
        ("aug", 3300),
        ("ssg08", 1700),
        ("awp", 4750),
        ("scar20", 5000),
        ("g3sg1", 5000),
        ("negev", 1700),
        ("m249", 5200),
        ("kevlar", 650),
        ("assaultsuit", 1000),
        ("kevlar_helmet", 1000),
        ("defuser", 400),
        ("defuse_kit", 400),
        ("taser", 200),
        ("hegrenade", 300),
        ("flashbang", 200),
        ("smokegrenade", 300),
        ("molotov", 400),
        ("incgrenade", 600),
        ("decoy", 50),
    ] {
        m.insert(item, price);
    }
    m
});

/// Buy window fallback when the demo carries no `buytime_ended` event.
pub const BUY_WINDOW_FALLBACK_SECS: f64 = 20.0;

/// Team medians under this are an eco; at or above [`FULL_BUY_MEDIAN`] a
/// full buy; between them a force.
pub const ECO_MEDIAN_MAX: f64 = 2000.0;
pub const FULL_BUY_MEDIAN: f64 = 4000.0;

/// Underbuy: value below this fraction of the team median.
pub const UNDERBUY_RATIO: f64 = 0.4;

/// Overbuy: solo spend at or above this during a team eco.
pub const OVERBUY_VALUE_MIN: u32 = 3500;

/// Wasted buy: loadout at or above this thrown away early.
pub const WASTED_VALUE_MIN: u32 = 3500;
pub const EARLY_DEATH_SECS: f64 = 20.0;

/// Damage dealt in the round at or above this counts as combat impact.
pub const COMBAT_IMPACT_DAMAGE: i32 = 50;

/// A pickup of the same item by a teammate within this window, after the
/// buyer stopped holding it, marks a drop transfer.
pub const DROP_TRANSFER_SECS: f64 = 5.0;

/// Event-strength thresholds for match-level aggregation.
pub const STRONG_CONFIDENCE: f64 = 0.6;
pub const MEDIUM_CONFIDENCE: f64 = 0.35;

/// Match flag trips on ≥2 strong events, ≥4 medium events, or this
/// aggregate confidence.
pub const AGGREGATE_FLAG_THRESHOLD: f64 = 1.5;

/// Repetition multiplier growth per repeated kind, capped.
pub const REPETITION_STEP: f64 = 0.25;
pub const REPETITION_CAP: f64 = 2.0;

pub const MIN_CONFIDENCE: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct EconomyOptions {
    pub buy_window_fallback_secs: f64,
    pub eco_median_max: f64,
    pub full_buy_median: f64,
    pub underbuy_ratio: f64,
    pub overbuy_value_min: u32,
    pub wasted_value_min: u32,
    pub early_death_secs: f64,
    pub combat_impact_damage: i32,
    pub drop_transfer_secs: f64,
    pub aggregate_flag_threshold: f64,
    pub min_confidence: f64,
}

impl Default for EconomyOptions {
    fn default() -> Self {
        Self {
            buy_window_fallback_secs: BUY_WINDOW_FALLBACK_SECS,
            eco_median_max: ECO_MEDIAN_MAX,
            full_buy_median: FULL_BUY_MEDIAN,
            underbuy_ratio: UNDERBUY_RATIO,
            overbuy_value_min: OVERBUY_VALUE_MIN,
            wasted_value_min: WASTED_VALUE_MIN,
            early_death_secs: EARLY_DEATH_SECS,
            combat_impact_damage: COMBAT_IMPACT_DAMAGE,
            drop_transfer_secs: DROP_TRANSFER_SECS,
            aggregate_flag_threshold: AGGREGATE_FLAG_THRESHOLD,
            min_confidence: MIN_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EconomyEventKind {
    Underbuy,
    Overbuy,
    NoDefuseKit,
    WastedBuy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamBuyState {
    Eco,
    Force,
    Full,
}

/// Classify a team's buy from its median member value.
pub fn classify_buy_state(median_value: f64, opts: &EconomyOptions) -> TeamBuyState {
    if median_value < opts.eco_median_max {
        TeamBuyState::Eco
    } else if median_value >= opts.full_buy_median {
        TeamBuyState::Full
    } else {
        TeamBuyState::Force
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomyFeatureSummary {
    pub player_value: u32,
    pub team_median_value: f64,
    pub team_buy_state: TeamBuyState,
    pub item_count: u32,
    pub combat_impact: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub died_after_secs: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomyEvent {
    pub kind: EconomyEventKind,
    pub round: u32,
    pub player_id: u64,
    pub player_name: String,
    pub team: Team,
    pub confidence: f64,
    pub reason: String,
    pub features: EconomyFeatureSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomyEventCounts {
    pub underbuy: u32,
    pub overbuy: u32,
    pub no_defuse_kit: u32,
    pub wasted_buy: u32,
}

/// Match-level verdict per player with at least one economy event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomyMatchFlag {
    pub player_id: u64,
    pub player_name: String,
    pub flagged: bool,
    pub aggregate_confidence: f64,
    pub strong_events: u32,
    pub medium_events: u32,
    pub event_counts: EconomyEventCounts,
}

/// One player's reconstructed buy for one round.
#[derive(Debug, Clone)]
struct PlayerBuy {
    id: u64,
    name: String,
    team: Team,
    value: u32,
    items: Vec<String>,
    /// An item this player bought ended up held by a teammate shortly
    /// after; the spend stays here but the underbuy read is waived.
    transferred_out: bool,
}

/// Detect per-round economy events across the match.
pub fn detect_economy_events(timeline: &Timeline, opts: &EconomyOptions) -> Vec<EconomyEvent> {
    let mut events = Vec::new();

    for round in &timeline.rounds {
        let Some((live_start, round_end)) = round.live_window() else {
            continue;
        };
        let frames = timeline.frames_in_range(round.start_tick, round_end);
        if frames.is_empty() {
            continue;
        }
        let live_start_time = timeline.ticks_to_seconds(live_start);

        // Buy window: round start until the buytime_ended event, falling
        // back to a fixed stretch past freeze end.
        let fallback_end =
            live_start + (opts.buy_window_fallback_secs * timeline.tick_rate) as u64;
        let buy_end = frames
            .iter()
            .flat_map(|f| f.events.iter())
            .find_map(|e| match e {
                GameEvent::BuytimeEnded { tick } => Some(*tick),
                _ => None,
            })
            .unwrap_or(fallback_end);

        // Chronological pickups inside the buy window, deduped per
        // (player, item).
        let mut pickups: Vec<(u64, f64, String, String)> = Vec::new();
        for frame in frames {
            if frame.tick > buy_end {
                break;
            }
            for event in &frame.events {
                let (player, item) = match event {
                    GameEvent::ItemPickup { player, item, .. }
                    | GameEvent::ItemEquip { player, item, .. } => (player, item),
                    _ => continue,
                };
                let dup = pickups.iter().any(|(_, _, p, i)| p == player && i == item);
                if !dup {
                    pickups.push((frame.tick, frame.time, player.clone(), item.clone()));
                }
            }
        }

        // Roster at the start of the live phase.
        let Some(roster_frame) = timeline.frame_at_or_before(live_start) else {
            continue;
        };
        let mut buys: Vec<PlayerBuy> = roster_frame
            .players
            .iter()
            .filter(|p| p.team.is_playing())
            .map(|p| PlayerBuy {
                id: p.id,
                name: p.name.clone(),
                team: p.team,
                value: 0,
                items: Vec::new(),
                transferred_out: false,
            })
            .collect();
        buys.sort_by_key(|b| b.id);
        if buys.is_empty() {
            continue;
        }

        // Drop transfers: a teammate re-picking the same item shortly
        // after, while the original buyer demonstrably no longer holds it.
        // Teammates buying the same item independently is the normal team
        // buy and must not register. A transfer waives the buyer's
        // underbuy; it does not move the spend.
        for (i, (_, t1, p1, item)) in pickups.iter().enumerate() {
            let Some(donor_idx) = buys.iter().position(|b| &b.name == p1) else {
                continue;
            };
            if buys[donor_idx].transferred_out {
                continue;
            }
            let donor_id = buys[donor_idx].id;
            let donor_team = buys[donor_idx].team;
            for (tick2, t2, p2, item2) in pickups.iter().skip(i + 1) {
                if item2 != item || p2 == p1 || t2 - t1 > opts.drop_transfer_secs {
                    continue;
                }
                if !buys.iter().any(|b| &b.name == p2 && b.team == donor_team) {
                    continue;
                }
                let released = timeline
                    .frames_in_range(*tick2, round_end)
                    .iter()
                    .find_map(|f| f.player(donor_id))
                    .map(|p| !p.equipment.iter().any(|e| e == item))
                    .unwrap_or(false);
                if released {
                    buys[donor_idx].transferred_out = true;
                    break;
                }
            }
        }
        for (_, _, player, item) in &pickups {
            if let Some(b) = buys.iter_mut().find(|b| &b.name == player) {
                b.value += WEAPON_PRICES.get(item.as_str()).copied().unwrap_or(0);
                b.items.push(item.clone());
            }
        }

        // Combat impact and death timing from the round's events/frames.
        let mut damage_dealt: FxHashMap<String, i32> = FxHashMap::default();
        let mut killers: Vec<String> = Vec::new();
        for frame in timeline.frames_in_range(live_start, round_end) {
            for event in &frame.events {
                match event {
                    GameEvent::Damage { attacker, damage, .. } => {
                        *damage_dealt.entry(attacker.clone()).or_insert(0) += damage.max(&0);
                    }
                    GameEvent::Kill { description, .. } => {
                        if let Some(kill) = parse_kill_description(description) {
                            killers.push(kill.attacker.to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
        let death_time = |id: u64| -> Option<f64> {
            timeline
                .frames_in_range(live_start, round_end)
                .iter()
                .find(|f| f.player(id).map(|p| !p.is_alive).unwrap_or(false))
                .map(|f| f.time)
        };

        // Median value per team.
        let mut medians: FxHashMap<Team, f64> = FxHashMap::default();
        for team in [Team::Ct, Team::T] {
            let mut values: Vec<u32> =
                buys.iter().filter(|b| b.team == team).map(|b| b.value).collect();
            if values.is_empty() {
                continue;
            }
            values.sort_unstable();
            let mid = values.len() / 2;
            let median = if values.len() % 2 == 1 {
                values[mid] as f64
            } else {
                (values[mid - 1] as f64 + values[mid] as f64) / 2.0
            };
            medians.insert(team, median);
        }

        for buy in &buys {
            let Some(&median) = medians.get(&buy.team) else { continue };
            let state = classify_buy_state(median, opts);
            let impact = killers.iter().any(|k| k == &buy.name)
                || damage_dealt.get(&buy.name).copied().unwrap_or(0)
                    >= opts.combat_impact_damage;
            let features = |died: Option<f64>| EconomyFeatureSummary {
                player_value: buy.value,
                team_median_value: median,
                team_buy_state: state,
                item_count: buy.items.len() as u32,
                combat_impact: impact,
                died_after_secs: died,
            };

            // Underbuy while the team commits.
            if state != TeamBuyState::Eco
                && (buy.value as f64) < opts.underbuy_ratio * median
                && !buy.transferred_out
            {
                let confidence =
                    clamp_confidence(0.25 + 0.5 * (1.0 - buy.value as f64 / median.max(1.0)));
                if confidence >= opts.min_confidence {
                    events.push(EconomyEvent {
                        kind: EconomyEventKind::Underbuy,
                        round: round.number,
                        player_id: buy.id,
                        player_name: buy.name.clone(),
                        team: buy.team,
                        confidence,
                        reason: format!(
                            "{} spent {} while the team buy median was {:.0}",
                            buy.name, buy.value, median
                        ),
                        features: features(None),
                    });
                }
            }

            // Overbuy breaking a team eco, waived on combat impact.
            if state == TeamBuyState::Eco && buy.value >= opts.overbuy_value_min && !impact {
                let confidence = clamp_confidence(
                    0.3 + 0.3 * (buy.value - opts.overbuy_value_min) as f64 / 3000.0,
                );
                if confidence >= opts.min_confidence {
                    events.push(EconomyEvent {
                        kind: EconomyEventKind::Overbuy,
                        round: round.number,
                        player_id: buy.id,
                        player_name: buy.name.clone(),
                        team: buy.team,
                        confidence,
                        reason: format!(
                            "{} spent {} during a team eco without impact",
                            buy.name, buy.value
                        ),
                        features: features(None),
                    });
                }
            }

            // CT full buy without a defuse kit.
            if buy.team == Team::Ct
                && state == TeamBuyState::Full
                && buy.value >= opts.eco_median_max as u32
                && !buy.items.iter().any(|i| i == "defuser" || i == "defuse_kit")
            {
                events.push(EconomyEvent {
                    kind: EconomyEventKind::NoDefuseKit,
                    round: round.number,
                    player_id: buy.id,
                    player_name: buy.name.clone(),
                    team: buy.team,
                    confidence: 0.3,
                    reason: format!("{} full-bought without a defuse kit", buy.name),
                    features: features(None),
                });
            }

            // Expensive loadout thrown away early with zero contribution.
            if buy.value >= opts.wasted_value_min && !impact {
                if let Some(died_at) = death_time(buy.id) {
                    let after = died_at - live_start_time;
                    if after <= opts.early_death_secs {
                        let confidence =
                            clamp_confidence(0.4 + 0.2 * buy.value as f64 / 4750.0);
                        events.push(EconomyEvent {
                            kind: EconomyEventKind::WastedBuy,
                            round: round.number,
                            player_id: buy.id,
                            player_name: buy.name.clone(),
                            team: buy.team,
                            confidence,
                            reason: format!(
                                "{} lost a {} loadout {:.1}s into the round with no contribution",
                                buy.name, buy.value, after
                            ),
                            features: features(Some(after)),
                        });
                    }
                }
            }
        }
    }

    events.sort_by(|a, b| {
        a.round
            .cmp(&b.round)
            .then(a.player_id.cmp(&b.player_id))
            .then(a.kind.cmp(&b.kind))
    });
    events
}

/// Aggregate per-round events into per-player match flags.
pub fn build_match_flags(
    events: &[EconomyEvent],
    opts: &EconomyOptions,
) -> Vec<EconomyMatchFlag> {
    let mut by_player: FxHashMap<u64, Vec<&EconomyEvent>> = FxHashMap::default();
    for event in events {
        by_player.entry(event.player_id).or_default().push(event);
    }

    let mut flags: Vec<EconomyMatchFlag> = Vec::new();
    for (player_id, mut player_events) in by_player {
        player_events.sort_by_key(|e| (e.round, e.kind));

        let mut counts = EconomyEventCounts::default();
        let mut kind_seen: FxHashMap<EconomyEventKind, u32> = FxHashMap::default();
        let mut aggregate = 0.0;
        let mut strong = 0u32;
        let mut medium = 0u32;
        for event in &player_events {
            let seen = kind_seen.entry(event.kind).or_insert(0);
            *seen += 1;
            let multiplier =
                (1.0 + REPETITION_STEP * (*seen as f64 - 1.0)).min(REPETITION_CAP);
            aggregate += event.confidence * multiplier;
            if event.confidence >= STRONG_CONFIDENCE {
                strong += 1;
            } else if event.confidence >= MEDIUM_CONFIDENCE {
                medium += 1;
            }
            match event.kind {
                EconomyEventKind::Underbuy => counts.underbuy += 1,
                EconomyEventKind::Overbuy => counts.overbuy += 1,
                EconomyEventKind::NoDefuseKit => counts.no_defuse_kit += 1,
                EconomyEventKind::WastedBuy => counts.wasted_buy += 1,
            }
        }

        let flagged = strong >= 2
            || strong + medium >= 4
            || aggregate >= opts.aggregate_flag_threshold;
        flags.push(EconomyMatchFlag {
            player_id,
            player_name: player_events[0].player_name.clone(),
            flagged,
            aggregate_confidence: aggregate,
            strong_events: strong,
            medium_events: medium,
            event_counts: counts,
        });
    }

    flags.sort_by_key(|f| f.player_id);
    flags
}
