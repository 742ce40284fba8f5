// tests/normalize_frames.rs
mod common;

use chrono::{Local, TimeZone};
use hazard_alert_relay::ingest::{HeartbeatKind, NormalizedResult, Normalizer};
use hazard_alert_relay::{AlertKind, AlertPayload, CanonicalAlert};
use serde_json::json;
use std::sync::Arc;

fn normalizer() -> Normalizer {
    Normalizer::new(Arc::new(common::test_config()))
}

fn alerts(res: NormalizedResult) -> Vec<CanonicalAlert> {
    match res {
        NormalizedResult::Alerts(v) => v,
        other => panic!("expected alerts, got {other:?}"),
    }
}

fn now() -> chrono::DateTime<Local> {
    Local.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
}

#[test]
fn update_frame_with_aliased_earthquake_fields() {
    let frame = json!({
        "type": "update",
        "source": "cenc",
        "Data": {
            "Magnitude": 5.8,
            "placeName": "四川甘孜州泸定县",
            "eventTime": "2025-03-01 09:55:00",
            "depth": 16,
            "latitude": 29.59,
            "longitude": 102.08,
            "EventId": "CC20250301"
        }
    });
    let out = alerts(normalizer().normalize_at(frame.to_string().as_bytes(), now()).unwrap());
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].source, "cenc");
    match &out[0].payload {
        AlertPayload::Earthquake(q) => {
            assert_eq!(q.magnitude, 5.8);
            assert_eq!(q.address, "四川甘孜州泸定县");
            assert_eq!(q.id, "CC20250301");
            assert_eq!(q.depth, "16");
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn earthquake_missing_magnitude_or_address_yields_nothing() {
    let n = normalizer();
    let without_mag = [json!({"address": "四川"}), json!({"place": "四川", "mag": null})];
    let without_addr = [json!({"mag": 5.0}), json!({"magnitude": 5.0, "location": ""})];
    for data in without_mag.iter().chain(without_addr.iter()) {
        let frame = json!({"type": "update", "source": "cenc", "Data": data});
        assert_eq!(
            n.normalize_at(frame.to_string().as_bytes(), now()).unwrap(),
            NormalizedResult::Ignored,
            "payload {data} should not normalize"
        );
    }
}

#[test]
fn initial_all_normalizes_each_source_independently() {
    let frame = json!({
        "type": "initial_all",
        "cenc": {"Data": {"mag": 4.6, "address": "云南大理州"}},
        "usgs": {"Data": {"mag": "bad"}},
        "cma": {"Data": {"headline": "北京市暴雨红色预警", "description": "...", "effective": "2025-07-30 08:00"}},
        "jma": {"Data": {"warningInfo": {"title": "大津波警報", "subtitle": "宮城県"}, "timeInfo": {"alarmDate": "2025-03-01 10:01"}}},
        "unknown_feed": {"Data": {"mag": 6.0, "address": "x"}},
        "no_data": {"foo": 1}
    });
    let mut out = alerts(normalizer().normalize_at(frame.to_string().as_bytes(), now()).unwrap());
    out.sort_by(|a, b| a.source.cmp(&b.source));

    let kinds: Vec<(&str, AlertKind)> = out.iter().map(|a| (a.source.as_str(), a.kind())).collect();
    assert_eq!(
        kinds,
        vec![
            ("cenc", AlertKind::Earthquake),
            ("cma", AlertKind::WeatherAlarm),
            ("jma", AlertKind::Tsunami),
        ]
    );
    match &out[2].payload {
        AlertPayload::Tsunami(t) => {
            assert_eq!(t.title, "大津波警報");
            assert_eq!(t.subtitle.as_deref(), Some("宮城県"));
            assert_eq!(t.alarm_time.as_deref(), Some("2025-03-01 10:01"));
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn initial_all_without_qualifying_items_is_ignored() {
    let frame = json!({"type": "initial_all", "cenc": {"Data": {"mag": 1.0}}});
    assert_eq!(
        normalizer().normalize_at(frame.to_string().as_bytes(), now()).unwrap(),
        NormalizedResult::Ignored
    );
}

#[test]
fn weather_without_headline_is_dropped() {
    let frame = json!({"type": "update", "source": "cma", "Data": {"description": "x"}});
    assert_eq!(
        normalizer().normalize_at(frame.to_string().as_bytes(), now()).unwrap(),
        NormalizedResult::Ignored
    );
}

#[test]
fn other_sources_use_earthquake_shaped_extraction() {
    let n = normalizer();
    let ok = json!({"type": "update", "source": "misc", "Data": {"magnitude": 3.2, "place": "Reykjanes"}});
    let out = alerts(n.normalize_at(ok.to_string().as_bytes(), now()).unwrap());
    assert_eq!(out[0].kind(), AlertKind::Other);
    match &out[0].payload {
        AlertPayload::Other(v) => assert_eq!(v["address"], "Reykjanes"),
        other => panic!("unexpected payload {other:?}"),
    }

    let bad = json!({"type": "update", "source": "misc", "Data": {"text": "hello"}});
    assert_eq!(
        n.normalize_at(bad.to_string().as_bytes(), now()).unwrap(),
        NormalizedResult::Ignored
    );
}

#[test]
fn liveness_and_unknown_frames() {
    let n = normalizer();
    assert_eq!(
        n.normalize_at(br#"{"type":"pong"}"#, now()).unwrap(),
        NormalizedResult::Heartbeat(HeartbeatKind::Pong)
    );
    assert_eq!(
        n.normalize_at(br#"{"type":"stats","clients":3}"#, now()).unwrap(),
        NormalizedResult::Ignored
    );
    assert_eq!(
        n.normalize_at(br#"{"type":"update","source":"cenc"}"#, now()).unwrap(),
        NormalizedResult::Ignored
    );
    assert!(n.normalize_at(b"not json at all", now()).is_err());
}

#[test]
fn initial_all_alerts_are_ordered_by_source_key() {
    let frame = json!({
        "type": "initial_all",
        "usgs": {"Data": {"mag": 6.0, "place": "Fiji region"}},
        "cenc": {"Data": {"mag": 4.6, "address": "云南大理州"}},
        "jma": {"Data": {"warningInfo": {"title": "津波注意報"}}}
    });
    let out = alerts(normalizer().normalize_at(frame.to_string().as_bytes(), now()).unwrap());
    let sources: Vec<&str> = out.iter().map(|a| a.source.as_str()).collect();
    assert_eq!(sources, vec!["cenc", "jma", "usgs"]);
}
