//! # Timeline Model
//!
//! Normalized in-memory representation of a parsed demo: sparse per-tick
//! frames, round boundaries, and the embedded per-frame game events.
//! Produced by the external decoding layer; read-only input to every
//! detector.
//!
//! Frames are sparse: only ticks with observed data are present. Consumers
//! must search for the nearest preceding frame instead of indexing by tick.

use serde::{Deserialize, Serialize};

use crate::models::raw_events::{BlindEvent, ConnectionEvent, GrenadeThrow};

/// Team affiliation at a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Team {
    Ct,
    T,
    Spectator,
}

impl Team {
    /// Whether this team participates in play (not a spectator slot).
    pub fn is_playing(self) -> bool {
        !matches!(self, Team::Spectator)
    }
}

/// World position in game units. `z` is absent for decoders that only
/// expose 2D coordinates; all movement thresholds in the detectors are 2D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Vec3 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// 2D distance to another position.
    pub fn dist_2d(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Snapshot of one player within one frame. Identity is stable across
/// frames by `id`; `name` is display-only and may collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: u64,
    pub name: String,
    pub team: Team,
    #[serde(default)]
    pub hp: i32,
    #[serde(default)]
    pub is_alive: bool,
    pub position: Vec3,
    /// Horizontal view angle in degrees, 0..360.
    #[serde(default)]
    pub view_angle: f32,
    #[serde(default)]
    pub has_bomb: bool,
    /// Remaining flash-blind duration in seconds (0 when not blinded).
    #[serde(default)]
    pub flash_duration: f32,
    /// Cumulative shots fired up to this frame.
    #[serde(default)]
    pub shots_fired: u32,
    /// Held equipment item names (decoder vocabulary, e.g. "ak47", "kevlar").
    #[serde(default)]
    pub equipment: Vec<String>,
}

/// A discrete game event embedded in the frame at the tick it occurred.
///
/// Kill events arrive with a free-text description (the decoder does not
/// resolve attacker/victim fields for them); damage events are structured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum GameEvent {
    Kill {
        tick: u64,
        /// `"<attacker> killed <victim> with <weapon>[ (headshot)]"`
        description: String,
    },
    Damage {
        tick: u64,
        attacker: String,
        victim: String,
        damage: i32,
        /// Victim HP after the damage was applied.
        health_remaining: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        weapon: Option<String>,
    },
    WeaponFire {
        tick: u64,
        player: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        weapon: Option<String>,
    },
    BombPlant {
        tick: u64,
        player: String,
    },
    BombDefuse {
        tick: u64,
        player: String,
    },
    DefuseStart {
        tick: u64,
        player: String,
    },
    DefuseAbort {
        tick: u64,
        player: String,
    },
    BombDrop {
        tick: u64,
        player: String,
    },
    BombPickup {
        tick: u64,
        player: String,
    },
    Throw {
        tick: u64,
        player: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        grenade: Option<String>,
    },
    Chat {
        tick: u64,
        player: String,
        message: String,
    },
    ItemPickup {
        tick: u64,
        player: String,
        item: String,
    },
    ItemEquip {
        tick: u64,
        player: String,
        item: String,
    },
    BuytimeEnded {
        tick: u64,
    },
    Other {
        tick: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl GameEvent {
    /// Tick at which the event occurred.
    pub fn tick(&self) -> u64 {
        match self {
            GameEvent::Kill { tick, .. }
            | GameEvent::Damage { tick, .. }
            | GameEvent::WeaponFire { tick, .. }
            | GameEvent::BombPlant { tick, .. }
            | GameEvent::BombDefuse { tick, .. }
            | GameEvent::DefuseStart { tick, .. }
            | GameEvent::DefuseAbort { tick, .. }
            | GameEvent::BombDrop { tick, .. }
            | GameEvent::BombPickup { tick, .. }
            | GameEvent::Throw { tick, .. }
            | GameEvent::Chat { tick, .. }
            | GameEvent::ItemPickup { tick, .. }
            | GameEvent::ItemEquip { tick, .. }
            | GameEvent::BuytimeEnded { tick }
            | GameEvent::Other { tick, .. } => *tick,
        }
    }

    /// Acting player name, when the event type has one.
    pub fn actor(&self) -> Option<&str> {
        match self {
            GameEvent::Damage { attacker, .. } => Some(attacker),
            GameEvent::WeaponFire { player, .. }
            | GameEvent::BombPlant { player, .. }
            | GameEvent::BombDefuse { player, .. }
            | GameEvent::DefuseStart { player, .. }
            | GameEvent::DefuseAbort { player, .. }
            | GameEvent::BombDrop { player, .. }
            | GameEvent::BombPickup { player, .. }
            | GameEvent::Throw { player, .. }
            | GameEvent::Chat { player, .. }
            | GameEvent::ItemPickup { player, .. }
            | GameEvent::ItemEquip { player, .. } => Some(player),
            _ => None,
        }
    }
}

/// One sampled tick of the match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFrame {
    pub tick: u64,
    /// Elapsed seconds since demo start.
    pub time: f64,
    #[serde(default)]
    pub players: Vec<PlayerState>,
    #[serde(default)]
    pub events: Vec<GameEvent>,
}

impl MatchFrame {
    pub fn player(&self, player_id: u64) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.name == name)
    }
}

/// Round boundaries. Rounds are contiguous and non-overlapping;
/// `freeze_end_tick` marks when players become controllable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// 1-based round number.
    pub number: u32,
    pub start_tick: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeze_end_tick: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_tick: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Team>,
}

impl Round {
    /// The in-round analysis window: freeze-end through round end.
    /// `None` when the round never went live.
    pub fn live_window(&self) -> Option<(u64, u64)> {
        let start = self.freeze_end_tick?;
        let end = self.end_tick?;
        if end <= start {
            return None;
        }
        Some((start, end))
    }
}

/// Normalized representation of a parsed match. Read-only input to all
/// detectors; no detector mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    /// Ticks per second, typically ~64-128.
    pub tick_rate: f64,
    /// Total demo length in seconds.
    pub duration: f64,
    #[serde(default)]
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub frames: Vec<MatchFrame>,
    /// Auxiliary raw streams, already normalized at ingestion
    /// (see `models::raw_events`).
    #[serde(default)]
    pub blind_events: Vec<BlindEvent>,
    #[serde(default)]
    pub disconnect_events: Vec<ConnectionEvent>,
    #[serde(default)]
    pub connect_events: Vec<ConnectionEvent>,
    #[serde(default)]
    pub grenades: Vec<GrenadeThrow>,
}

impl Timeline {
    /// Seconds represented by one tick. Falls back to 64 ticks/s on a
    /// degenerate tick rate so time math never divides by zero.
    pub fn seconds_per_tick(&self) -> f64 {
        if self.tick_rate > 0.0 {
            1.0 / self.tick_rate
        } else {
            1.0 / 64.0
        }
    }

    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        ticks as f64 * self.seconds_per_tick()
    }

    /// Index of the nearest frame at or before `tick`.
    pub fn frame_index_at_or_before(&self, tick: u64) -> Option<usize> {
        let idx = self.frames.partition_point(|f| f.tick <= tick);
        idx.checked_sub(1)
    }

    /// Nearest frame at or before `tick` (frames are sparse).
    pub fn frame_at_or_before(&self, tick: u64) -> Option<&MatchFrame> {
        self.frame_index_at_or_before(tick).map(|i| &self.frames[i])
    }

    /// Frames whose tick falls in `[start_tick, end_tick]`.
    pub fn frames_in_range(&self, start_tick: u64, end_tick: u64) -> &[MatchFrame] {
        let lo = self.frames.partition_point(|f| f.tick < start_tick);
        let hi = self.frames.partition_point(|f| f.tick <= end_tick);
        &self.frames[lo..hi.max(lo)]
    }

    /// The round containing `tick`, by start-tick ordering.
    pub fn round_at_tick(&self, tick: u64) -> Option<&Round> {
        let idx = self.rounds.partition_point(|r| r.start_tick <= tick);
        idx.checked_sub(1).map(|i| &self.rounds[i])
    }

    /// Player snapshot at or shortly before `tick`, searching back at most
    /// `lookback_ticks`. Blind and kill events may arrive a few ticks
    /// before the frame that reflects them, so a small window is needed.
    pub fn player_state_near(
        &self,
        tick: u64,
        player_id: u64,
        lookback_ticks: u64,
    ) -> Option<&PlayerState> {
        let mut idx = self.frame_index_at_or_before(tick)?;
        let floor = tick.saturating_sub(lookback_ticks);
        loop {
            let frame = &self.frames[idx];
            if frame.tick < floor {
                return None;
            }
            if let Some(state) = frame.player(player_id) {
                return Some(state);
            }
            if idx == 0 {
                return None;
            }
            idx -= 1;
        }
    }

    /// Like [`player_state_near`](Self::player_state_near) but joined on
    /// display name, for raw event streams that only carry names.
    pub fn player_by_name_near(
        &self,
        tick: u64,
        name: &str,
        lookback_ticks: u64,
    ) -> Option<&PlayerState> {
        let mut idx = self.frame_index_at_or_before(tick)?;
        let floor = tick.saturating_sub(lookback_ticks);
        loop {
            let frame = &self.frames[idx];
            if frame.tick < floor {
                return None;
            }
            if let Some(state) = frame.player_by_name(name) {
                return Some(state);
            }
            if idx == 0 {
                return None;
            }
            idx -= 1;
        }
    }

    /// Last observed tick, or 0 for an empty timeline.
    pub fn last_tick(&self) -> u64 {
        self.frames.last().map(|f| f.tick).unwrap_or(0)
    }

    /// All player ids ever observed, sorted for deterministic iteration.
    pub fn known_player_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = Vec::new();
        for frame in &self.frames {
            for p in &frame.players {
                if !ids.contains(&p.id) {
                    ids.push(p.id);
                }
            }
        }
        ids.sort_unstable();
        ids
    }
}
