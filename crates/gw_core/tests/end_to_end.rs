//! End-to-end pipeline tests: JSON document in, analysis report out.

use proptest::prelude::*;
use serde_json::{json, Value};

use gw_core::analysis::{run_analysis, AnalysisOptions, NoProgress};
use gw_core::models::timeline::{MatchFrame, PlayerState, Round, Team, Timeline, Vec3};
use gw_core::timeline_from_value;

fn player_json(id: u64, name: &str, team: &str, x: f64, alive: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "team": team,
        "hp": if alive { 100 } else { 0 },
        "isAlive": alive,
        "position": {"x": x, "y": 0.0},
        "viewAngle": 90.0,
        "hasBomb": false,
        "flashDuration": 0.0,
        "shotsFired": 0,
        "equipment": ["knife"]
    })
}

/// One round, 64 tick/s, frames every 32 ticks. `alpha` never moves,
/// `bravo` relocates at tick 800, `tango` is on the other team. A team
/// kill, a team damage event, a friendly flash and a mid-round
/// disconnect/reconnect are embedded.
fn scenario_document() -> Value {
    let mut frames = Vec::new();
    let mut tick = 0u64;
    while tick <= 8000 {
        let bravo_x = if tick >= 800 { 800.0 } else { 500.0 };
        let bravo_alive = tick < 2000;
        let tango_present = !(3000..5000).contains(&tick);
        let mut players = vec![
            player_json(1, "alpha", "CT", 0.0, true),
            player_json(2, "bravo", "CT", bravo_x, bravo_alive),
        ];
        if tango_present {
            players.push(player_json(3, "tango", "T", 5000.0, true));
        }

        let mut events = Vec::new();
        if tick == 1984 {
            events.push(json!({
                "kind": "damage",
                "tick": 2000u64,
                "attacker": "alpha",
                "victim": "bravo",
                "damage": 25,
                "healthRemaining": 75
            }));
            events.push(json!({
                "kind": "kill",
                "tick": 2000u64,
                "description": "alpha killed bravo with m4a4 (headshot)"
            }));
        }

        frames.push(json!({
            "tick": tick,
            "time": tick as f64 / 64.0,
            "players": players,
            "events": events
        }));
        tick += 32;
    }

    json!({
        "tickRate": 64.0,
        "duration": 8000.0 / 64.0 + 30.0,
        "rounds": [
            {"number": 1, "startTick": 0, "freezeEndTick": 640, "endTick": 8000}
        ],
        "frames": frames,
        "playerBlindEvents": [
            {"tick_num": 1500, "flasher": "alpha", "victim": "bravo", "duration": 2.5}
        ],
        "disconnectEvents": [
            {"tick": 3000, "player": "tango", "userid": 3}
        ],
        "connectEvents": [
            {"tick": 5000, "player": "tango", "userid": 3}
        ]
    })
}

#[test]
fn test_full_pipeline_from_json() {
    let doc = scenario_document();
    let timeline = timeline_from_value(&doc).expect("valid document");
    let results =
        run_analysis(&timeline, &AnalysisOptions::with_experimental(), &mut NoProgress)
            .expect("analysis runs");

    // The stationary player is an AFK hit for the whole live phase.
    assert!(
        results.afk_detections.iter().any(|d| d.player_name == "alpha"),
        "alpha never moved"
    );

    let kill = results.team_kills.first().expect("one team kill");
    assert_eq!(kill.attacker_name, "alpha");
    assert_eq!(kill.victim_name, "bravo");
    assert_eq!(kill.weapon, "m4a4");
    assert!(kill.headshot);

    let dmg = results.team_damage.first().expect("one team damage group");
    assert_eq!(dmg.damage, 25);
    assert_eq!(dmg.attacker_name, "alpha");

    let flash = results.team_flashes.first().expect("one team flash");
    assert_eq!(flash.attacker_name, "alpha");
    assert!((flash.flash_duration - 2.5).abs() < 1e-9);

    let disc = results
        .disconnects
        .iter()
        .find(|d| d.player_name == "tango")
        .expect("tango's disconnect");
    assert!(!disc.permanent);
    assert!(disc.reconnect_tick.is_some());
}

#[test]
fn test_report_json_shape() {
    let doc = scenario_document();
    let timeline = timeline_from_value(&doc).unwrap();
    let results =
        run_analysis(&timeline, &AnalysisOptions::default(), &mut NoProgress).unwrap();

    let report = serde_json::to_value(&results).unwrap();
    for key in [
        "afkDetections",
        "teamKills",
        "teamDamage",
        "disconnects",
        "teamFlashes",
        "bodyBlocking",
        "midRoundInactivity",
        "objectiveSabotage",
        "economyGriefing",
        "economyMatchFlags",
    ] {
        assert!(report.get(key).is_some(), "report is missing {key}");
    }
}

fn build_timeline(player_count: usize, deltas: Vec<Vec<(f64, f64)>>) -> Timeline {
    let mut positions: Vec<(f64, f64)> =
        (0..player_count).map(|i| (i as f64 * 200.0, 0.0)).collect();
    let mut frames = Vec::new();
    for (fi, frame_deltas) in deltas.iter().enumerate() {
        let tick = fi as u64 * 32;
        let players = (0..player_count)
            .map(|pi| {
                let (dx, dy) = frame_deltas[pi];
                positions[pi].0 += dx;
                positions[pi].1 += dy;
                PlayerState {
                    id: pi as u64 + 1,
                    name: format!("p{}", pi + 1),
                    team: if pi % 2 == 0 { Team::Ct } else { Team::T },
                    hp: 100,
                    is_alive: true,
                    position: Vec3::new(positions[pi].0, positions[pi].1),
                    view_angle: 0.0,
                    has_bomb: pi == 1,
                    flash_duration: 0.0,
                    shots_fired: 0,
                    equipment: vec!["knife".to_string()],
                }
            })
            .collect();
        frames.push(MatchFrame {
            tick,
            time: tick as f64 / 64.0,
            players,
            events: Vec::new(),
        });
    }
    let last_tick = frames.last().map(|f| f.tick).unwrap_or(0);
    Timeline {
        tick_rate: 64.0,
        duration: last_tick as f64 / 64.0 + 30.0,
        rounds: vec![Round {
            number: 1,
            start_tick: 0,
            freeze_end_tick: Some(320),
            end_tick: Some(last_tick.max(321)),
            winner: None,
        }],
        frames,
        ..Default::default()
    }
}

fn arb_timeline() -> impl Strategy<Value = Timeline> {
    (2usize..=6, 8usize..=40).prop_flat_map(|(players, frame_count)| {
        proptest::collection::vec(
            proptest::collection::vec((-80.0f64..80.0, -80.0f64..80.0), players),
            frame_count,
        )
        .prop_map(move |deltas| build_timeline(players, deltas))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Analyzing the same timeline twice yields byte-identical results;
    /// no detector may leak map iteration order into its output.
    #[test]
    fn test_analysis_is_deterministic(timeline in arb_timeline()) {
        let opts = AnalysisOptions::with_experimental();
        let first = run_analysis(&timeline, &opts, &mut NoProgress).unwrap();
        let second = run_analysis(&timeline, &opts, &mut NoProgress).unwrap();
        prop_assert_eq!(&first, &second);

        // And a serde round trip of the input changes nothing.
        let doc = serde_json::to_value(&timeline).unwrap();
        let reparsed = timeline_from_value(&doc).unwrap();
        let third = run_analysis(&reparsed, &opts, &mut NoProgress).unwrap();
        prop_assert_eq!(&first, &third);
    }
}
