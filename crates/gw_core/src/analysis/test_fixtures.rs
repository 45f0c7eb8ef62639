//! Test-only timeline builders shared by the detector test modules.

use crate::models::timeline::{
    GameEvent, MatchFrame, PlayerState, Round, Team, Timeline, Vec3,
};

/// Frame spacing used by the generated timelines (0.5s at 64 ticks/s).
pub const FRAME_STEP_TICKS: u64 = 32;

pub fn make_player_at(id: u64, name: &str, team: Team, pos: (f64, f64)) -> PlayerState {
    PlayerState {
        id,
        name: name.to_string(),
        team,
        hp: 100,
        is_alive: true,
        position: Vec3::new(pos.0, pos.1),
        view_angle: 0.0,
        has_bomb: false,
        flash_duration: 0.0,
        shots_fired: 0,
        equipment: vec!["knife".to_string()],
    }
}

/// Scripted behavior of one player across a generated round.
#[derive(Debug, Clone)]
pub struct FramePlan {
    pub id: u64,
    pub name: String,
    pub team: Team,
    pub start_pos: (f64, f64),
    /// Tick at which the player makes a single move of `move_dist` units.
    pub move_at: Option<u64>,
    pub move_dist: f64,
    /// Tick from which the player is dead.
    pub die_at: Option<u64>,
    /// Per-frame oscillation amplitude on x, to model position noise.
    pub jitter: f64,
    /// Half-open tick range in which the player is absent from frames.
    pub absent_between: Option<(u64, u64)>,
    pub has_bomb: bool,
    pub equipment: Vec<String>,
}

impl FramePlan {
    pub fn stationary(id: u64, name: &str, team: Team, pos: (f64, f64)) -> Self {
        Self {
            id,
            name: name.to_string(),
            team,
            start_pos: pos,
            move_at: None,
            move_dist: 0.0,
            die_at: None,
            jitter: 0.0,
            absent_between: None,
            has_bomb: false,
            equipment: vec!["knife".to_string()],
        }
    }

    pub fn moves_once(
        id: u64,
        name: &str,
        team: Team,
        pos: (f64, f64),
        move_at: u64,
        move_dist: f64,
    ) -> Self {
        let mut plan = Self::stationary(id, name, team, pos);
        plan.move_at = Some(move_at);
        plan.move_dist = move_dist;
        plan
    }

    pub fn dies_at(id: u64, name: &str, team: Team, pos: (f64, f64), die_at: u64) -> Self {
        let mut plan = Self::stationary(id, name, team, pos);
        plan.die_at = Some(die_at);
        plan
    }

    fn state_at(&self, tick: u64, frame_index: u64) -> Option<PlayerState> {
        if let Some((from, to)) = self.absent_between {
            if tick >= from && tick < to {
                return None;
            }
        }
        let mut pos = self.start_pos;
        if matches!(self.move_at, Some(m) if tick >= m) {
            pos.0 += self.move_dist;
        }
        if self.jitter > 0.0 && frame_index % 2 == 1 {
            pos.0 += self.jitter;
        }
        let dead = matches!(self.die_at, Some(d) if tick >= d);
        let mut player = make_player_at(self.id, &self.name, self.team, pos);
        player.is_alive = !dead;
        player.hp = if dead { 0 } else { 100 };
        player.has_bomb = self.has_bomb && !dead;
        player.equipment = self.equipment.clone();
        Some(player)
    }
}

/// Single-round timeline: round 1 starts at tick 0, goes live at
/// `freeze_end`, ends at `end_tick`. Frames every [`FRAME_STEP_TICKS`].
pub fn round_timeline(
    tick_rate: f64,
    freeze_end: u64,
    end_tick: u64,
    plans: Vec<FramePlan>,
) -> Timeline {
    multi_round_timeline(tick_rate, &[(0, freeze_end, end_tick)], plans)
}

/// Multi-round timeline from `(start, freeze_end, end)` windows.
pub fn multi_round_timeline(
    tick_rate: f64,
    windows: &[(u64, u64, u64)],
    plans: Vec<FramePlan>,
) -> Timeline {
    let rounds: Vec<Round> = windows
        .iter()
        .enumerate()
        .map(|(i, (start, freeze, end))| Round {
            number: (i + 1) as u32,
            start_tick: *start,
            freeze_end_tick: Some(*freeze),
            end_tick: Some(*end),
            winner: None,
        })
        .collect();

    let last_tick = windows.last().map(|w| w.2).unwrap_or(0);
    let mut frames = Vec::new();
    let mut tick = 0u64;
    let mut index = 0u64;
    while tick <= last_tick {
        let players: Vec<PlayerState> =
            plans.iter().filter_map(|p| p.state_at(tick, index)).collect();
        frames.push(MatchFrame {
            tick,
            time: tick as f64 / tick_rate,
            players,
            events: Vec::new(),
        });
        tick += FRAME_STEP_TICKS;
        index += 1;
    }

    Timeline {
        tick_rate,
        // Headroom past the last round so the end-of-demo artifact filter
        // does not clip events under test.
        duration: last_tick as f64 / tick_rate + 30.0,
        rounds,
        frames,
        ..Default::default()
    }
}

/// Attach an event to the nearest frame at or before its tick.
pub fn insert_event(timeline: &mut Timeline, event: GameEvent) {
    let tick = event.tick();
    if let Some(idx) = timeline.frame_index_at_or_before(tick) {
        timeline.frames[idx].events.push(event);
    }
}
