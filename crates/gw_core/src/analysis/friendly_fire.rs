//! # Friendly Fire Detectors
//!
//! Classifies kill and damage events as friendly fire. Kill events arrive
//! as free text in a fixed shape and are parsed; damage events are
//! structured. Raw team-damage ticks from one burst (shotgun pellets,
//! rapid fire) are merged into a single record using the HP delta across
//! the group boundary, never the sum of per-tick deltas, so overlapping
//! reports cannot double count.

use fxhash::FxHashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::timeline::{GameEvent, Team, Timeline};

/// Events inside the final seconds of the demo are server-shutdown
/// artifacts and are excluded.
pub const END_OF_DEMO_EXCLUSION_SECS: f64 = 10.0;

/// Same-pair damage events merge when within this many seconds ...
pub const GROUP_WINDOW_SECS: f64 = 5.0;

/// ... or within this many ticks of each other.
pub const GROUP_WINDOW_TICKS: u64 = 64;

/// HP values implying resurrection are round-boundary reset artifacts.
pub const MAX_INITIAL_HP: i32 = 100;

/// How far back to search frames when resolving a player's team at an
/// event tick.
pub const TEAM_LOOKUP_WINDOW_SECS: f64 = 5.0;

/// Attacker names used for world/environment attribution.
const WORLD_ATTACKERS: &[&str] = &["world", "environment"];

/// Tunable thresholds for the friendly-fire detectors.
#[derive(Debug, Clone)]
pub struct FriendlyFireOptions {
    pub end_of_demo_exclusion_secs: f64,
    pub group_window_secs: f64,
    pub group_window_ticks: u64,
    pub team_lookup_window_secs: f64,
}

impl Default for FriendlyFireOptions {
    fn default() -> Self {
        Self {
            end_of_demo_exclusion_secs: END_OF_DEMO_EXCLUSION_SECS,
            group_window_secs: GROUP_WINDOW_SECS,
            group_window_ticks: GROUP_WINDOW_TICKS,
            team_lookup_window_secs: TEAM_LOOKUP_WINDOW_SECS,
        }
    }
}

/// A kill where attacker and victim shared a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamKill {
    pub tick: u64,
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    pub attacker_id: u64,
    pub attacker_name: String,
    pub victim_id: u64,
    pub victim_name: String,
    pub team: Team,
    pub weapon: String,
    pub headshot: bool,
}

/// One merged friendly-damage burst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDamage {
    pub start_tick: u64,
    pub end_tick: u64,
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    pub attacker_id: u64,
    pub attacker_name: String,
    pub victim_id: u64,
    pub victim_name: String,
    pub team: Team,
    /// HP delta across the merged burst (initial HP of the first event
    /// minus final HP of the last).
    pub damage: i32,
    /// Deduplicated weapons seen across the burst.
    pub weapons: Vec<String>,
    /// Raw damage ticks merged into this record.
    pub event_count: u32,
}

/// Result of parsing the fixed kill-description pattern
/// `"<attacker> killed <victim> with <weapon>[ (headshot)]"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKill<'a> {
    pub attacker: &'a str,
    pub victim: &'a str,
    pub weapon: &'a str,
    pub headshot: bool,
}

/// Parse the fixed kill pattern. The `" killed "` anchor is matched at its
/// first occurrence and `" with "` at its last, so victim names containing
/// `" with "` still parse. Returns `None` for anything off-pattern.
pub fn parse_kill_description(description: &str) -> Option<ParsedKill<'_>> {
    let (body, headshot) = match description.strip_suffix(" (headshot)") {
        Some(stripped) => (stripped, true),
        None => (description, false),
    };
    let killed_idx = body.find(" killed ")?;
    let attacker = &body[..killed_idx];
    let tail = &body[killed_idx + " killed ".len()..];
    let with_idx = tail.rfind(" with ")?;
    let victim = &tail[..with_idx];
    let weapon = &tail[with_idx + " with ".len()..];
    if attacker.is_empty() || victim.is_empty() || weapon.is_empty() {
        return None;
    }
    Some(ParsedKill { attacker, victim, weapon, headshot })
}

fn is_world_attacker(name: &str) -> bool {
    WORLD_ATTACKERS.iter().any(|w| name.eq_ignore_ascii_case(w))
}

/// Attacker and victim resolved onto the same playing team, or `None`.
fn resolve_friendly_pair<'a>(
    timeline: &'a Timeline,
    tick: u64,
    attacker: &str,
    victim: &str,
    lookback_ticks: u64,
) -> Option<(
    &'a crate::models::timeline::PlayerState,
    &'a crate::models::timeline::PlayerState,
)> {
    let attacker_state = timeline.player_by_name_near(tick, attacker, lookback_ticks)?;
    let victim_state = timeline.player_by_name_near(tick, victim, lookback_ticks)?;
    if !attacker_state.team.is_playing() || attacker_state.team != victim_state.team {
        return None;
    }
    if attacker_state.id == victim_state.id {
        return None;
    }
    Some((attacker_state, victim_state))
}

/// Scan kill events for friendly-fire kills.
pub fn detect_team_kills(timeline: &Timeline, opts: &FriendlyFireOptions) -> Vec<TeamKill> {
    let spt = timeline.seconds_per_tick();
    let cutoff = timeline.duration - opts.end_of_demo_exclusion_secs;
    let lookback = (opts.team_lookup_window_secs * timeline.tick_rate) as u64;

    let mut kills = Vec::new();
    for frame in &timeline.frames {
        for event in &frame.events {
            let GameEvent::Kill { tick, description } = event else { continue };
            let Some(parsed) = parse_kill_description(description) else {
                debug!("unparseable kill description: {:?}", description);
                continue;
            };
            if is_world_attacker(parsed.attacker) {
                continue;
            }
            let time = *tick as f64 * spt;
            if time > cutoff {
                continue;
            }
            let Some((attacker, victim)) =
                resolve_friendly_pair(timeline, *tick, parsed.attacker, parsed.victim, lookback)
            else {
                continue;
            };
            kills.push(TeamKill {
                tick: *tick,
                time,
                round: timeline.round_at_tick(*tick).map(|r| r.number),
                attacker_id: attacker.id,
                attacker_name: attacker.name.clone(),
                victim_id: victim.id,
                victim_name: victim.name.clone(),
                team: attacker.team,
                weapon: parsed.weapon.to_string(),
                headshot: parsed.headshot,
            });
        }
    }
    kills.sort_by(|a, b| {
        a.tick.cmp(&b.tick).then(a.attacker_id.cmp(&b.attacker_id))
    });
    kills
}

/// One qualifying raw damage tick, before grouping.
#[derive(Debug, Clone)]
struct RawTeamDamage {
    tick: u64,
    time: f64,
    attacker_id: u64,
    attacker_name: String,
    victim_id: u64,
    victim_name: String,
    team: Team,
    initial_hp: i32,
    final_hp: i32,
    weapon: Option<String>,
}

/// Open merge group for one attacker-victim pair.
struct DamageGroup {
    first: RawTeamDamage,
    last_tick: u64,
    last_time: f64,
    final_hp: i32,
    weapons: Vec<String>,
    event_count: u32,
}

impl DamageGroup {
    fn new(raw: RawTeamDamage) -> Self {
        let mut weapons = Vec::new();
        if let Some(w) = raw.weapon.clone() {
            weapons.push(w);
        }
        Self {
            last_tick: raw.tick,
            last_time: raw.time,
            final_hp: raw.final_hp,
            weapons,
            event_count: 1,
            first: raw,
        }
    }

    fn absorb(&mut self, raw: &RawTeamDamage) {
        self.last_tick = raw.tick;
        self.last_time = raw.time;
        self.final_hp = raw.final_hp;
        self.event_count += 1;
        if let Some(w) = &raw.weapon {
            if !self.weapons.iter().any(|x| x == w) {
                self.weapons.push(w.clone());
            }
        }
    }

    fn finish(self, timeline: &Timeline) -> Option<TeamDamage> {
        // HP delta across the boundary samples. A non-positive delta means
        // the group was measurement noise around a round reset.
        let damage = self.first.initial_hp - self.final_hp;
        if damage <= 0 || self.first.initial_hp > MAX_INITIAL_HP {
            return None;
        }
        Some(TeamDamage {
            start_tick: self.first.tick,
            end_tick: self.last_tick,
            time: self.first.time,
            round: timeline.round_at_tick(self.first.tick).map(|r| r.number),
            attacker_id: self.first.attacker_id,
            attacker_name: self.first.attacker_name,
            victim_id: self.first.victim_id,
            victim_name: self.first.victim_name,
            team: self.first.team,
            damage,
            weapons: self.weapons,
            event_count: self.event_count,
        })
    }
}

/// Scan damage events for friendly fire and merge causally-linked bursts.
pub fn detect_team_damage(timeline: &Timeline, opts: &FriendlyFireOptions) -> Vec<TeamDamage> {
    let spt = timeline.seconds_per_tick();
    let cutoff = timeline.duration - opts.end_of_demo_exclusion_secs;
    let lookback = (opts.team_lookup_window_secs * timeline.tick_rate) as u64;

    let mut raw: Vec<RawTeamDamage> = Vec::new();
    for frame in &timeline.frames {
        for event in &frame.events {
            let GameEvent::Damage { tick, attacker, victim, damage, health_remaining, weapon } =
                event
            else {
                continue;
            };
            if *damage <= 0 || is_world_attacker(attacker) {
                continue;
            }
            let time = *tick as f64 * spt;
            if time > cutoff {
                continue;
            }
            let initial_hp = health_remaining + damage;
            if initial_hp > MAX_INITIAL_HP || *health_remaining < 0 {
                // Implies resurrection or negative HP: round-boundary reset.
                continue;
            }
            let Some((attacker_state, victim_state)) =
                resolve_friendly_pair(timeline, *tick, attacker, victim, lookback)
            else {
                continue;
            };
            raw.push(RawTeamDamage {
                tick: *tick,
                time,
                attacker_id: attacker_state.id,
                attacker_name: attacker_state.name.clone(),
                victim_id: victim_state.id,
                victim_name: victim_state.name.clone(),
                team: attacker_state.team,
                initial_hp,
                final_hp: *health_remaining,
                weapon: weapon.clone(),
            });
        }
    }

    raw.sort_by(|a, b| {
        a.time
            .partial_cmp(&b.time)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.tick.cmp(&b.tick))
            .then(a.attacker_id.cmp(&b.attacker_id))
            .then(a.victim_id.cmp(&b.victim_id))
    });

    let mut open: FxHashMap<(u64, u64), DamageGroup> = FxHashMap::default();
    let mut merged = Vec::new();
    for event in &raw {
        let key = (event.attacker_id, event.victim_id);
        match open.remove(&key) {
            Some(mut group) => {
                let within_time = event.time - group.last_time <= opts.group_window_secs;
                let within_ticks =
                    event.tick.saturating_sub(group.last_tick) <= opts.group_window_ticks;
                if within_time || within_ticks {
                    group.absorb(event);
                    open.insert(key, group);
                } else {
                    if let Some(done) = group.finish(timeline) {
                        merged.push(done);
                    }
                    open.insert(key, DamageGroup::new(event.clone()));
                }
            }
            None => {
                open.insert(key, DamageGroup::new(event.clone()));
            }
        }
    }
    for (_, group) in open.drain() {
        if let Some(done) = group.finish(timeline) {
            merged.push(done);
        }
    }

    merged.sort_by(|a, b| {
        a.start_tick
            .cmp(&b.start_tick)
            .then(a.attacker_id.cmp(&b.attacker_id))
            .then(a.victim_id.cmp(&b.victim_id))
    });
    merged
}
