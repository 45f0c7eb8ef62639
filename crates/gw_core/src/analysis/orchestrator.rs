//! # Analysis Orchestrator
//!
//! Runs the detector family over one timeline in a fixed order and
//! aggregates the findings. The core detectors always run; the
//! experimental set (blocking, inactivity, objective, economy) is opt-in
//! and isolation-wrapped, so a heuristic blowing up on a pathological
//! demo degrades to an empty result list instead of failing the run.
//!
//! The only fatal condition is a timeline with no frames.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::analysis::afk::{detect_afk, AfkDetection, AfkOptions};
use crate::analysis::blocking::{detect_blocking, BlockEvent, BlockingOptions};
use crate::analysis::disconnect::{detect_disconnects, DisconnectOptions, DisconnectReconnect};
use crate::analysis::economy::{
    build_match_flags, detect_economy_events, EconomyEvent, EconomyMatchFlag, EconomyOptions,
};
use crate::analysis::friendly_fire::{
    detect_team_damage, detect_team_kills, FriendlyFireOptions, TeamDamage, TeamKill,
};
use crate::analysis::inactivity::{detect_inactivity, InactiveSegment, InactivityOptions};
use crate::analysis::objective::{detect_objective_sabotage, ObjectiveEvent, ObjectiveOptions};
use crate::analysis::team_flash::{detect_team_flashes, TeamFlash, TeamFlashOptions};
use crate::error::{AnalysisError, Result};
use crate::models::timeline::Timeline;

/// Minimum interval between progress updates, except the final one.
pub const PROGRESS_THROTTLE_MS: u128 = 100;

/// Full configuration for one analysis run. Experimental detectors are
/// off by default; their heuristics are tuned for recall and belong
/// behind an explicit opt-in.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub afk: AfkOptions,
    pub friendly_fire: FriendlyFireOptions,
    pub team_flash: TeamFlashOptions,
    pub disconnect: DisconnectOptions,
    pub blocking: BlockingOptions,
    pub inactivity: InactivityOptions,
    pub objective: ObjectiveOptions,
    pub economy: EconomyOptions,
    pub enable_blocking: bool,
    pub enable_inactivity: bool,
    pub enable_objective: bool,
    pub enable_economy: bool,
}

impl AnalysisOptions {
    /// Default options with every experimental detector enabled.
    pub fn with_experimental() -> Self {
        Self {
            enable_blocking: true,
            enable_inactivity: true,
            enable_objective: true,
            enable_economy: true,
            ..Self::default()
        }
    }
}

/// One progress report. Percentages are monotonic and finish at 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub percentage: f64,
    pub current_step: String,
    /// Seconds, extrapolated from elapsed time. 0 when unknown.
    pub estimated_time_remaining: f64,
}

/// Receiver for progress updates during a run.
pub trait ProgressSink {
    fn report(&mut self, update: ProgressUpdate);
}

impl<F: FnMut(ProgressUpdate)> ProgressSink for F {
    fn report(&mut self, update: ProgressUpdate) {
        self(update)
    }
}

/// Sink that drops every update.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _update: ProgressUpdate) {}
}

/// Aggregated findings of one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResults {
    pub afk_detections: Vec<AfkDetection>,
    pub team_kills: Vec<TeamKill>,
    pub team_damage: Vec<TeamDamage>,
    pub disconnects: Vec<DisconnectReconnect>,
    pub team_flashes: Vec<TeamFlash>,
    pub body_blocking: Vec<BlockEvent>,
    pub mid_round_inactivity: Vec<InactiveSegment>,
    pub objective_sabotage: Vec<ObjectiveEvent>,
    pub economy_griefing: Vec<EconomyEvent>,
    pub economy_match_flags: Vec<EconomyMatchFlag>,
}

struct ProgressReporter<'a> {
    sink: &'a mut dyn ProgressSink,
    started: Instant,
    last_emit: Option<Instant>,
    total_steps: usize,
}

impl<'a> ProgressReporter<'a> {
    fn new(sink: &'a mut dyn ProgressSink, total_steps: usize) -> Self {
        Self { sink, started: Instant::now(), last_emit: None, total_steps }
    }

    fn step(&mut self, index: usize, name: &str) {
        let percentage = index as f64 * 100.0 / self.total_steps as f64;
        let is_final = index >= self.total_steps;
        if !is_final {
            if let Some(last) = self.last_emit {
                if last.elapsed().as_millis() < PROGRESS_THROTTLE_MS {
                    return;
                }
            }
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let remaining = if percentage > 0.0 {
            elapsed * (100.0 - percentage) / percentage
        } else {
            0.0
        };
        self.sink.report(ProgressUpdate {
            percentage,
            current_step: name.to_string(),
            estimated_time_remaining: remaining,
        });
        self.last_emit = Some(Instant::now());
    }
}

/// Run an isolated experimental detector, degrading a panic to an empty
/// result set.
fn run_guarded<T>(name: &str, f: impl FnOnce() -> Vec<T>) -> Vec<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(findings) => findings,
        Err(_) => {
            tracing::warn!(detector = name, "experimental detector panicked, skipping");
            Vec::new()
        }
    }
}

/// Run the full detector family over a timeline.
pub fn run_analysis(
    timeline: &Timeline,
    opts: &AnalysisOptions,
    sink: &mut dyn ProgressSink,
) -> Result<AnalysisResults> {
    if timeline.frames.is_empty() {
        return Err(AnalysisError::EmptyTimeline);
    }
    tracing::debug!(
        frames = timeline.frames.len(),
        rounds = timeline.rounds.len(),
        "starting analysis"
    );

    let total_steps = 9;
    let mut progress = ProgressReporter::new(sink, total_steps);
    let mut results = AnalysisResults::default();

    progress.step(0, "afk");
    results.afk_detections = detect_afk(timeline, &opts.afk);

    progress.step(1, "team_kills");
    results.team_kills = detect_team_kills(timeline, &opts.friendly_fire);

    progress.step(2, "team_damage");
    results.team_damage = detect_team_damage(timeline, &opts.friendly_fire);

    progress.step(3, "disconnects");
    results.disconnects = detect_disconnects(timeline, &opts.disconnect);

    progress.step(4, "team_flashes");
    results.team_flashes = detect_team_flashes(timeline, &opts.team_flash);

    progress.step(5, "body_blocking");
    if opts.enable_blocking {
        results.body_blocking =
            run_guarded("body_blocking", || detect_blocking(timeline, &opts.blocking));
    }

    progress.step(6, "mid_round_inactivity");
    if opts.enable_inactivity {
        results.mid_round_inactivity = run_guarded("mid_round_inactivity", || {
            detect_inactivity(timeline, &opts.inactivity)
        });
    }

    progress.step(7, "objective_sabotage");
    if opts.enable_objective {
        results.objective_sabotage = run_guarded("objective_sabotage", || {
            detect_objective_sabotage(timeline, &opts.objective)
        });
    }

    progress.step(8, "economy_griefing");
    if opts.enable_economy {
        results.economy_griefing = run_guarded("economy_griefing", || {
            detect_economy_events(timeline, &opts.economy)
        });
        results.economy_match_flags =
            build_match_flags(&results.economy_griefing, &opts.economy);
    }

    progress.step(total_steps, "done");
    tracing::debug!(
        afk = results.afk_detections.len(),
        team_kills = results.team_kills.len(),
        team_damage = results.team_damage.len(),
        disconnects = results.disconnects.len(),
        team_flashes = results.team_flashes.len(),
        "analysis finished"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_fixtures::{round_timeline, FramePlan};
    use crate::models::timeline::Team;

    fn small_timeline() -> Timeline {
        round_timeline(
            64.0,
            640,
            8000,
            vec![
                FramePlan::stationary(1, "alpha", Team::Ct, (0.0, 0.0)),
                FramePlan::moves_once(2, "bravo", Team::Ct, (500.0, 0.0), 700, 300.0),
                FramePlan::stationary(3, "hostile", Team::T, (5000.0, 0.0)),
            ],
        )
    }

    #[test]
    fn test_empty_timeline_is_fatal() {
        let tl = Timeline::default();
        let err = run_analysis(&tl, &AnalysisOptions::default(), &mut NoProgress)
            .expect_err("no frames must be fatal");
        assert!(matches!(err, AnalysisError::EmptyTimeline));
    }

    #[test]
    fn test_experimental_detectors_default_off() {
        let tl = small_timeline();
        let results =
            run_analysis(&tl, &AnalysisOptions::default(), &mut NoProgress).unwrap();
        assert!(results.body_blocking.is_empty());
        assert!(results.mid_round_inactivity.is_empty());
        assert!(results.objective_sabotage.is_empty());
        assert!(results.economy_griefing.is_empty());
        // Core detectors still ran: the stationary player is an AFK hit.
        assert!(!results.afk_detections.is_empty());
    }

    #[test]
    fn test_experimental_opt_in_runs() {
        let tl = small_timeline();
        let results =
            run_analysis(&tl, &AnalysisOptions::with_experimental(), &mut NoProgress).unwrap();
        // The idle stationary player shows up in the inactivity findings.
        assert!(!results.mid_round_inactivity.is_empty());
    }

    #[test]
    fn test_progress_monotonic_and_complete() {
        let tl = small_timeline();
        let mut updates: Vec<ProgressUpdate> = Vec::new();
        let mut sink = |u: ProgressUpdate| updates.push(u);
        run_analysis(&tl, &AnalysisOptions::default(), &mut sink).unwrap();

        assert!(!updates.is_empty());
        for pair in updates.windows(2) {
            assert!(
                pair[1].percentage >= pair[0].percentage,
                "progress must be monotonic"
            );
        }
        let last = updates.last().unwrap();
        assert!((last.percentage - 100.0).abs() < 1e-9, "run must end at 100%");
        assert_eq!(last.current_step, "done");
    }

    #[test]
    fn test_results_serialize() {
        let tl = small_timeline();
        let results =
            run_analysis(&tl, &AnalysisOptions::with_experimental(), &mut NoProgress).unwrap();
        let json = serde_json::to_value(&results).unwrap();
        assert!(json.get("afkDetections").is_some());
        assert!(json.get("economyMatchFlags").is_some());
    }
}
