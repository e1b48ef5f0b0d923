// ── Snapshot reconciliation ──
//
// Folds one tick's fetch results into the next operational snapshot.
// All-or-nothing: a single failed source rejects the whole tick and the
// caller keeps the previous snapshot untouched.

use serde::Serialize;

use damwatch_api::{Reading, ValveStatus, VibrationLog, Weather};

use crate::error::{FetchError, ReconcileError};

/// Readings kept for the chart when nothing else is configured.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// The reconciled view of the installation at one poll instant.
///
/// Published as a single `Arc`; consumers never see half of one poll
/// and half of another.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationalSnapshot {
    /// Successful reconciliations so far; 0 means no data yet.
    pub generation: u64,
    /// Newest reading.
    pub latest: Option<Reading>,
    /// Up to `history_capacity` readings, oldest first.
    pub history: Vec<Reading>,
    pub actuator: Option<ValveStatus>,
    pub weather: Option<Weather>,
    /// Most recent vibration event seen in any poll.
    pub last_vibration: Option<VibrationLog>,
}

impl OperationalSnapshot {
    /// True until the first poll has been reconciled.
    pub fn is_empty(&self) -> bool {
        self.generation == 0
    }
}

/// Raw per-source outcomes of one poll tick.
#[derive(Debug)]
pub struct PollResults {
    pub readings: Result<Vec<Reading>, FetchError>,
    pub actuator: Result<ValveStatus, FetchError>,
    pub weather: Result<Weather, FetchError>,
    pub vibration_log: Result<Vec<VibrationLog>, FetchError>,
}

/// Merge `results` on top of `previous`.
///
/// Readings and the vibration log arrive newest first. An empty
/// sequence from either keeps what `previous` knew rather than erasing
/// it. `capacity` below 1 is treated as 1.
pub fn reconcile(
    previous: &OperationalSnapshot,
    results: PollResults,
    capacity: usize,
) -> Result<OperationalSnapshot, ReconcileError> {
    let PollResults {
        readings,
        actuator,
        weather,
        vibration_log,
    } = results;

    let (readings, actuator, weather, vibration_log) =
        match (readings, actuator, weather, vibration_log) {
            (Ok(r), Ok(a), Ok(w), Ok(v)) => (r, a, w, v),
            (r, a, w, v) => {
                let failures = [r.err(), a.err(), w.err(), v.err()]
                    .into_iter()
                    .flatten()
                    .collect();
                return Err(ReconcileError { failures });
            }
        };

    let (latest, history) = if readings.is_empty() {
        (previous.latest.clone(), previous.history.clone())
    } else {
        let mut history: Vec<Reading> = readings.iter().take(capacity.max(1)).cloned().collect();
        history.reverse();
        (readings.into_iter().next(), history)
    };

    let last_vibration = vibration_log
        .into_iter()
        .next()
        .or_else(|| previous.last_vibration.clone());

    Ok(OperationalSnapshot {
        generation: previous.generation + 1,
        latest,
        history,
        actuator: Some(actuator),
        weather: Some(weather),
        last_vibration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Source;
    use damwatch_api::{FetchFailure, ValveState};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn reading(value: serde_json::Value) -> Reading {
        serde_json::from_value(value).unwrap()
    }

    fn valve() -> ValveStatus {
        serde_json::from_value(json!({ "state": "CLOSED", "reason": "SAFE_LEVEL", "mode": "AUTO" }))
            .unwrap()
    }

    fn weather() -> Weather {
        serde_json::from_value(json!({ "locationName": "Site A", "weathercode": 3 })).unwrap()
    }

    fn vib(ts: &str) -> VibrationLog {
        serde_json::from_value(json!({ "timestamp": ts, "level": "HIGH", "nodeId": "n1" })).unwrap()
    }

    fn ok_results(readings: Vec<Reading>, vibration: Vec<VibrationLog>) -> PollResults {
        PollResults {
            readings: Ok(readings),
            actuator: Ok(valve()),
            weather: Ok(weather()),
            vibration_log: Ok(vibration),
        }
    }

    fn failed(endpoint: Source) -> FetchError {
        FetchError {
            endpoint,
            kind: FetchFailure::Transport,
            message: "connection refused".into(),
        }
    }

    #[test]
    fn first_poll_builds_snapshot() {
        let readings = vec![
            reading(json!({ "timestamp": "t2", "percent": 55, "vibration": false })),
            reading(json!({ "timestamp": "t1", "percent": 50 })),
        ];

        let snap = reconcile(
            &OperationalSnapshot::default(),
            ok_results(readings, vec![]),
            DEFAULT_HISTORY_CAPACITY,
        )
        .unwrap();

        assert_eq!(snap.generation, 1);
        let latest = snap.latest.as_ref().unwrap();
        assert_eq!(latest.percent, Some(55.0));
        assert_eq!(latest.vibration, Some(false));
        let order: Vec<&str> = snap.history.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(order, vec!["t1", "t2"]);
        assert_eq!(snap.last_vibration, None);
        assert_eq!(snap.actuator.as_ref().unwrap().state, ValveState::Closed);
    }

    #[test]
    fn history_is_bounded_and_chronological() {
        let readings: Vec<Reading> = (0..30)
            .rev()
            .map(|i| reading(json!({ "timestamp": format!("t{i:02}") })))
            .collect();

        let snap = reconcile(
            &OperationalSnapshot::default(),
            ok_results(readings, vec![]),
            20,
        )
        .unwrap();

        assert_eq!(snap.history.len(), 20);
        assert_eq!(snap.history.first().unwrap().timestamp, "t10");
        assert_eq!(snap.history.last().unwrap().timestamp, "t29");
        assert_eq!(snap.latest.unwrap().timestamp, "t29");
    }

    #[test]
    fn any_failure_rejects_the_whole_tick() {
        let previous = reconcile(
            &OperationalSnapshot::default(),
            ok_results(vec![reading(json!({ "timestamp": "t1" }))], vec![vib("v1")]),
            20,
        )
        .unwrap();

        let mut results = ok_results(vec![reading(json!({ "timestamp": "t2" }))], vec![]);
        results.vibration_log = Err(failed(Source::VibrationLog));

        let err = reconcile(&previous, results, 20).unwrap_err();
        assert_eq!(err.sources(), vec![Source::VibrationLog]);
        // caller keeps `previous`; nothing here could have touched it
        assert_eq!(previous.generation, 1);
        assert_eq!(previous.latest.unwrap().timestamp, "t1");
    }

    #[test]
    fn failures_are_reported_in_source_order() {
        let results = PollResults {
            readings: Err(failed(Source::Readings)),
            actuator: Ok(valve()),
            weather: Err(failed(Source::Weather)),
            vibration_log: Err(failed(Source::VibrationLog)),
        };
        let err = reconcile(&OperationalSnapshot::default(), results, 20).unwrap_err();
        assert_eq!(
            err.sources(),
            vec![Source::Readings, Source::Weather, Source::VibrationLog]
        );
    }

    #[test]
    fn empty_sources_retain_previous_state() {
        let previous = reconcile(
            &OperationalSnapshot::default(),
            ok_results(
                vec![
                    reading(json!({ "timestamp": "t2" })),
                    reading(json!({ "timestamp": "t1" })),
                ],
                vec![vib("v1")],
            ),
            20,
        )
        .unwrap();

        let next = reconcile(&previous, ok_results(vec![], vec![]), 20).unwrap();

        assert_eq!(next.generation, 2);
        assert_eq!(next.latest, previous.latest);
        assert_eq!(next.history, previous.history);
        assert_eq!(next.last_vibration.unwrap().timestamp, "v1");
    }

    #[test]
    fn newest_vibration_event_replaces_retained_one() {
        let previous = OperationalSnapshot {
            generation: 4,
            last_vibration: Some(vib("old")),
            ..OperationalSnapshot::default()
        };
        let next = reconcile(
            &previous,
            ok_results(vec![], vec![vib("new"), vib("older")]),
            20,
        )
        .unwrap();
        assert_eq!(next.generation, 5);
        assert_eq!(next.last_vibration.unwrap().timestamp, "new");
    }

    #[test]
    fn zero_capacity_keeps_one_reading() {
        let snap = reconcile(
            &OperationalSnapshot::default(),
            ok_results(
                vec![
                    reading(json!({ "timestamp": "t2" })),
                    reading(json!({ "timestamp": "t1" })),
                ],
                vec![],
            ),
            0,
        )
        .unwrap();
        assert_eq!(snap.history.len(), 1);
        assert_eq!(snap.history[0].timestamp, "t2");
    }
}
