//! Black-box test of the analyze subcommand.

use std::process::Command;

use serde_json::json;

#[test]
fn test_analyze_writes_report() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("timeline.json");
    let output = dir.path().join("report.json");

    let mut frames = Vec::new();
    let mut tick = 0u64;
    while tick <= 2000 {
        frames.push(json!({
            "tick": tick,
            "time": tick as f64 / 64.0,
            "players": [{
                "id": 1,
                "name": "alpha",
                "team": "CT",
                "hp": 100,
                "isAlive": true,
                "position": {"x": 0.0, "y": 0.0},
                "equipment": ["knife"]
            }],
            "events": []
        }));
        tick += 32;
    }
    let doc = json!({
        "tickRate": 64.0,
        "duration": 2000.0 / 64.0 + 30.0,
        "rounds": [{"number": 1, "startTick": 0, "freezeEndTick": 640, "endTick": 2000}],
        "frames": frames
    });
    std::fs::write(&input, serde_json::to_string(&doc).unwrap()).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_gw_cli"))
        .args([
            "analyze",
            "--in",
            input.to_str().unwrap(),
            "--out",
            output.to_str().unwrap(),
            "--pretty",
        ])
        .status()
        .expect("binary runs");
    assert!(status.success());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert!(report.get("afkDetections").is_some());
    assert!(
        !report["afkDetections"].as_array().unwrap().is_empty(),
        "the stationary player must be flagged"
    );
}

#[test]
fn test_analyze_fails_on_empty_timeline() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("empty.json");
    let output = dir.path().join("report.json");
    std::fs::write(&input, r#"{"tickRate": 64.0, "duration": 0.0, "frames": []}"#).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_gw_cli"))
        .args([
            "analyze",
            "--in",
            input.to_str().unwrap(),
            "--out",
            output.to_str().unwrap(),
        ])
        .status()
        .expect("binary runs");
    assert!(!status.success(), "no frames is a fatal analysis error");
}
