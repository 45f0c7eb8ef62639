//! # Raw Event Normalization
//!
//! The decoding boundary is inconsistent about field names: the same
//! logical field arrives as `tick`, `tick_num` or `t` depending on event
//! type and decoder version. Rather than probing aliases at every call
//! site, the loose `serde_json::Value` records are normalized into typed
//! records exactly once, at ingestion. A record missing its tick or
//! identity fields is skipped, never fatal.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AnalysisError, Result};
use crate::models::timeline::Timeline;

/// Alias lists per logical field. Order matters: first hit wins.
const TICK_ALIASES: &[&str] = &["tick", "tick_num", "t"];
const TIME_ALIASES: &[&str] = &["time", "seconds", "ts"];
const ATTACKER_ALIASES: &[&str] = &["attacker", "flasher", "thrower", "attacker_name"];
const VICTIM_ALIASES: &[&str] = &["victim", "player", "blinded", "victim_name"];
const DURATION_ALIASES: &[&str] = &["duration", "flash_duration", "blind_duration"];
const PLAYER_ALIASES: &[&str] = &["player", "name", "player_name"];
const PLAYER_ID_ALIASES: &[&str] = &["userid", "user_id", "id"];
const GRENADE_ALIASES: &[&str] = &["grenade", "grenade_type", "weapon"];

/// A `player_blind` report: who flashed whom, for how long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlindEvent {
    pub tick: u64,
    pub time: f64,
    pub attacker_name: String,
    pub victim_name: String,
    /// Blind duration in seconds.
    pub duration: f64,
}

/// A `player_connect` / `player_disconnect` report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEvent {
    pub tick: u64,
    pub player_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<u64>,
}

/// A grenade throw from the raw grenade stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrenadeThrow {
    pub tick: u64,
    pub thrower_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grenade_type: Option<String>,
}

/// Probe `aliases` in order and return the first numeric value found.
/// Numeric strings are accepted; some decoders stringify everything.
pub fn value_f64(map: &Value, aliases: &[&str]) -> Option<f64> {
    for key in aliases {
        match map.get(key) {
            Some(Value::Number(n)) => return n.as_f64(),
            Some(Value::String(s)) => {
                if let Ok(v) = s.trim().parse::<f64>() {
                    return Some(v);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn value_u64(map: &Value, aliases: &[&str]) -> Option<u64> {
    value_f64(map, aliases).filter(|v| *v >= 0.0 && v.is_finite()).map(|v| v as u64)
}

/// Probe `aliases` in order and return the first non-empty string.
pub fn value_str<'a>(map: &'a Value, aliases: &[&str]) -> Option<&'a str> {
    for key in aliases {
        if let Some(Value::String(s)) = map.get(key) {
            if !s.is_empty() {
                return Some(s.as_str());
            }
        }
    }
    None
}

/// Normalize a loose blind-event stream. Records without a tick, victim,
/// or attacker are skipped.
pub fn normalize_blind_events(raw: &[Value], tick_rate: f64) -> Vec<BlindEvent> {
    let mut out: Vec<BlindEvent> = raw
        .iter()
        .filter_map(|v| {
            let tick = value_u64(v, TICK_ALIASES)?;
            let attacker_name = value_str(v, ATTACKER_ALIASES)?.to_string();
            let victim_name = value_str(v, VICTIM_ALIASES)?.to_string();
            let duration = value_f64(v, DURATION_ALIASES).unwrap_or(0.0);
            let time = value_f64(v, TIME_ALIASES)
                .unwrap_or_else(|| tick as f64 / tick_rate.max(1.0));
            Some(BlindEvent { tick, time, attacker_name, victim_name, duration })
        })
        .collect();
    let skipped = raw.len() - out.len();
    if skipped > 0 {
        debug!("skipped {} malformed blind events", skipped);
    }
    out.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.victim_name.cmp(&b.victim_name)));
    out
}

/// Normalize a loose connect/disconnect stream.
pub fn normalize_connection_events(raw: &[Value]) -> Vec<ConnectionEvent> {
    let mut out: Vec<ConnectionEvent> = raw
        .iter()
        .filter_map(|v| {
            let tick = value_u64(v, TICK_ALIASES)?;
            let player_name = value_str(v, PLAYER_ALIASES)?.to_string();
            let player_id = value_u64(v, PLAYER_ID_ALIASES);
            Some(ConnectionEvent { tick, player_name, player_id })
        })
        .collect();
    let skipped = raw.len() - out.len();
    if skipped > 0 {
        debug!("skipped {} malformed connection events", skipped);
    }
    out.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.player_name.cmp(&b.player_name)));
    out
}

/// Normalize a loose grenade stream.
pub fn normalize_grenades(raw: &[Value]) -> Vec<GrenadeThrow> {
    let mut out: Vec<GrenadeThrow> = raw
        .iter()
        .filter_map(|v| {
            let tick = value_u64(v, TICK_ALIASES)?;
            let thrower_name = value_str(v, ATTACKER_ALIASES)
                .or_else(|| value_str(v, PLAYER_ALIASES))?
                .to_string();
            let grenade_type = value_str(v, GRENADE_ALIASES).map(str::to_string);
            Some(GrenadeThrow { tick, thrower_name, grenade_type })
        })
        .collect();
    out.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.thrower_name.cmp(&b.thrower_name)));
    out
}

fn raw_stream<'a>(root: &'a Value, aliases: &[&str]) -> &'a [Value] {
    for key in aliases {
        if let Some(Value::Array(items)) = root.get(key) {
            return items.as_slice();
        }
    }
    &[]
}

/// Ingest a decoded timeline document. The structured parts (frames,
/// rounds) deserialize through serde; the auxiliary raw streams are
/// normalized through the alias probes above.
pub fn timeline_from_json(input: &str) -> Result<Timeline> {
    let root: Value = serde_json::from_str(input)?;
    timeline_from_value(&root)
}

pub fn timeline_from_value(root: &Value) -> Result<Timeline> {
    let mut timeline: Timeline = serde_json::from_value(Value::Object(
        root.as_object()
            .ok_or_else(|| AnalysisError::Validation("timeline document must be an object".into()))?
            .iter()
            .filter(|(k, _)| {
                matches!(k.as_str(), "tickRate" | "duration" | "rounds" | "frames")
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    ))?;

    timeline.blind_events = normalize_blind_events(
        raw_stream(root, &["playerBlindEvents", "blindEvents", "blind_events"]),
        timeline.tick_rate,
    );
    timeline.disconnect_events = normalize_connection_events(raw_stream(
        root,
        &["disconnectEvents", "disconnect_events"],
    ));
    timeline.connect_events =
        normalize_connection_events(raw_stream(root, &["connectEvents", "connect_events"]));
    timeline.grenades =
        normalize_grenades(raw_stream(root, &["grenades", "grenadeEvents", "grenade_events"]));

    Ok(timeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alias_probing_tick_variants() {
        let a = json!({"tick": 100, "attacker": "x", "victim": "y", "duration": 2.0});
        let b = json!({"tick_num": 200, "flasher": "x", "player": "y", "flash_duration": 1.5});
        let c = json!({"t": "300", "thrower": "x", "blinded": "y", "blind_duration": "0.8"});

        let events = normalize_blind_events(&[a, b, c], 64.0);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].tick, 100);
        assert_eq!(events[1].tick, 200);
        assert!((events[1].duration - 1.5).abs() < 1e-9);
        assert_eq!(events[2].tick, 300);
        assert!((events[2].duration - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_records_skipped_not_fatal() {
        let good = json!({"tick": 10, "player": "alice"});
        let no_tick = json!({"player": "bob"});
        let no_name = json!({"tick": 20});
        let not_object = json!(42);

        let events = normalize_connection_events(&[good, no_tick, no_name, not_object]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].player_name, "alice");
    }

    #[test]
    fn test_timeline_ingestion_with_loose_streams() {
        let doc = json!({
            "tickRate": 64.0,
            "duration": 120.0,
            "rounds": [
                {"number": 1, "startTick": 0, "freezeEndTick": 640, "endTick": 7000}
            ],
            "frames": [
                {"tick": 0, "time": 0.0, "players": [], "events": []}
            ],
            "playerBlindEvents": [
                {"tick_num": 700, "flasher": "a", "victim": "b", "duration": 2.5}
            ],
            "disconnectEvents": [
                {"t": 900, "player_name": "c", "userid": 7}
            ]
        });

        let tl = timeline_from_value(&doc).unwrap();
        assert_eq!(tl.rounds.len(), 1);
        assert_eq!(tl.blind_events.len(), 1);
        assert_eq!(tl.blind_events[0].attacker_name, "a");
        assert_eq!(tl.disconnect_events[0].player_id, Some(7));
        assert!(tl.connect_events.is_empty());
    }
}
