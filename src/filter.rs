// src/filter.rs
//! # Filter / priority engine
//! Pure per-source policy evaluation: `(alert, config)` → `NotifyDecision`.
//! No I/O, no clock. Matching is case-sensitive substring containment on the
//! raw text fields; nothing is tokenized or case-folded.

use crate::alert::{AlertPayload, CanonicalAlert, Earthquake, NotifyDecision, Priority, Tsunami, WeatherAlarm};
use crate::config::{Config, EarthquakePolicy, TsunamiPolicy, WeatherPolicy};
use crate::error::RelayError;

pub fn evaluate(alert: &CanonicalAlert, config: &Config) -> NotifyDecision {
    let Some(src) = config.source(&alert.source) else {
        let err = RelayError::config_mismatch(&alert.source, "unknown source key");
        tracing::debug!(target: "filter", error = %err);
        return NotifyDecision::SKIP;
    };
    if !src.enabled || !config.kind_enabled(src.kind) {
        return NotifyDecision::SKIP;
    }

    let decision = match &alert.payload {
        AlertPayload::Earthquake(q) => src
            .earthquake
            .as_ref()
            .map(|p| earthquake(q, p)),
        AlertPayload::WeatherAlarm(w) => src.weatheralarm.as_ref().map(|p| weather(w, p)),
        AlertPayload::Tsunami(t) => src.tsunami.as_ref().map(|p| tsunami(t, p)),
        AlertPayload::Other(_) => Some(NotifyDecision::SKIP),
    };

    decision.unwrap_or_else(|| {
        let err = RelayError::config_mismatch(&alert.source, "missing policy block");
        tracing::debug!(target: "filter", error = %err);
        NotifyDecision::SKIP
    })
}

fn any_in(keywords: &[String], fields: &[&str]) -> bool {
    keywords
        .iter()
        .any(|k| fields.iter().any(|f| f.contains(k.as_str())))
}

fn earthquake(q: &Earthquake, policy: &EarthquakePolicy) -> NotifyDecision {
    if q.magnitude < policy.min_magnitude {
        return NotifyDecision::SKIP;
    }
    if policy.areas.is_empty() {
        return NotifyDecision::notify(Priority::Normal);
    }
    if any_in(&policy.areas, &[q.address.as_str()]) {
        NotifyDecision::notify(Priority::High)
    } else {
        NotifyDecision::SKIP
    }
}

// Area match is required to pass, so a passing weather alert is always High.
fn weather(w: &WeatherAlarm, policy: &WeatherPolicy) -> NotifyDecision {
    let fields = [w.headline.as_str(), w.description.as_str()];
    if !any_in(&policy.levels, &fields) || !any_in(&policy.alert_types, &fields) {
        return NotifyDecision::SKIP;
    }
    area_gate(any_in(&policy.areas, &fields))
}

fn tsunami(t: &Tsunami, policy: &TsunamiPolicy) -> NotifyDecision {
    let fields = [t.title.as_str(), t.subtitle.as_deref().unwrap_or_default()];
    if !any_in(&policy.levels, &fields) {
        return NotifyDecision::SKIP;
    }
    area_gate(any_in(&policy.areas, &fields))
}

fn area_gate(area_match: bool) -> NotifyDecision {
    if area_match {
        NotifyDecision::notify(Priority::High)
    } else {
        NotifyDecision::SKIP
    }
}
