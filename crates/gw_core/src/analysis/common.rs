//! Shared sampling and kinematics helpers for the detector family.

use crate::models::timeline::Vec3;

/// Defensive cap on sample rows processed by any single sliding-window
/// detector. Degenerate inputs (absurd tick counts) terminate with partial
/// coverage instead of exhausting memory.
pub const MAX_SAMPLE_ROWS: usize = 200_000;

/// Smallest absolute angular difference in degrees, handling 0-360
/// wraparound (e.g. 359 -> 1 is a 2 degree turn, not 358).
pub fn angle_delta_deg(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// Unit 2D direction from `from` to `to`, or `None` when the points are
/// too close to define one.
pub fn direction_2d(from: &Vec3, to: &Vec3) -> Option<(f64, f64)> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-6 {
        return None;
    }
    Some((dx / len, dy / len))
}

pub fn dot_2d(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.0 + a.1 * b.1
}

/// Evenly spaced sample ticks across `[start_tick, end_tick]` at `hz`
/// samples per second, bounded by [`MAX_SAMPLE_ROWS`].
pub fn sample_ticks(start_tick: u64, end_tick: u64, tick_rate: f64, hz: f64) -> Vec<u64> {
    if end_tick <= start_tick || tick_rate <= 0.0 || hz <= 0.0 {
        return Vec::new();
    }
    let step = (tick_rate / hz).max(1.0) as u64;
    let mut ticks = Vec::new();
    let mut t = start_tick;
    while t <= end_tick && ticks.len() < MAX_SAMPLE_ROWS {
        ticks.push(t);
        t += step;
    }
    ticks
}

/// Clamp a heuristic score into the `[0, 1]` confidence range.
pub fn clamp_confidence(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}
