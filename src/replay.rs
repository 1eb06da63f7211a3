//! Offline replay
//!
//! Drives a `MotionEngine` from a recorded event log instead of wall-clock
//! timers. Refresh and cadence ticks are placed on the recording's own
//! timeline, so a seeded replay is fully deterministic.
//!
//! Input is newline-delimited JSON, one event per line:
//! - `{"timestamp_ms": 0, "x": 0.1, "y": 0.2, "z": 9.8}` (accelerometer)
//! - `{"timestamp_ms": 0, "step_count": 1234}` (hardware step counter)

use crate::config::MotionConfig;
use crate::engine::MotionEngine;
use crate::error::MotionError;
use crate::types::{AccelSample, HealthMetricsSnapshot, StepMode};
use serde::{Deserialize, Serialize};

/// One recorded input event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplayEvent {
    Accelerometer(AccelSample),
    StepCount { timestamp_ms: u64, step_count: u64 },
}

impl ReplayEvent {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            ReplayEvent::Accelerometer(sample) => sample.timestamp_ms,
            ReplayEvent::StepCount { timestamp_ms, .. } => *timestamp_ms,
        }
    }
}

/// A snapshot published at a point on the recording's timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// Milliseconds since the first event
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub snapshot: HealthMetricsSnapshot,
}

/// Parse newline-delimited events, skipping blank lines
pub fn parse_ndjson(input: &str) -> Result<Vec<ReplayEvent>, MotionError> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(MotionError::from))
        .collect()
}

/// Incremental replay over a single recording
pub struct ReplaySession {
    engine: MotionEngine,
    refresh_interval_ms: u64,
    cadence_interval_ms: u64,
    origin_ms: Option<u64>,
    next_refresh_ms: u64,
    next_cadence_ms: u64,
}

impl ReplaySession {
    pub fn new(config: &MotionConfig) -> Result<Self, MotionError> {
        Ok(Self {
            engine: MotionEngine::new(config)?,
            refresh_interval_ms: config.refresh_interval_ms,
            cadence_interval_ms: config.cadence_interval_ms,
            origin_ms: None,
            next_refresh_ms: 0,
            next_cadence_ms: 0,
        })
    }

    pub fn engine(&self) -> &MotionEngine {
        &self.engine
    }

    /// Apply one event, returning the snapshots published up to its timestamp
    pub fn push(&mut self, event: &ReplayEvent) -> Result<Vec<ReplayRecord>, MotionError> {
        let origin = match self.origin_ms {
            Some(origin) => origin,
            None => {
                let origin = event.timestamp_ms();
                // Refresh fires immediately, cadence after one period
                self.origin_ms = Some(origin);
                self.next_refresh_ms = origin;
                self.next_cadence_ms = origin + self.cadence_interval_ms;
                origin
            }
        };

        let records = self.advance_to(event.timestamp_ms(), origin)?;

        match event {
            ReplayEvent::Accelerometer(sample) => {
                self.engine.ingest_sample(*sample)?;
            }
            ReplayEvent::StepCount { step_count, .. } => {
                self.engine.ingest_hardware_count(*step_count)?;
            }
        }

        Ok(records)
    }

    /// Run any ticks due up to `timestamp_ms` and publish a closing snapshot there
    pub fn finish(&mut self, timestamp_ms: u64) -> Result<Vec<ReplayRecord>, MotionError> {
        let origin = self.origin_ms.unwrap_or(timestamp_ms);
        let mut records = self.advance_to(timestamp_ms, origin)?;
        let elapsed_ms = timestamp_ms.saturating_sub(origin);

        if records.last().map(|r| r.elapsed_ms) != Some(elapsed_ms) {
            records.push(ReplayRecord {
                elapsed_ms,
                snapshot: self.engine.compute_metrics(),
            });
        }
        Ok(records)
    }

    fn advance_to(&mut self, now_ms: u64, origin: u64) -> Result<Vec<ReplayRecord>, MotionError> {
        let mut records = Vec::new();
        let simulated = self.engine.step_mode() == StepMode::Simulation;

        loop {
            let due_cadence = simulated && self.next_cadence_ms <= now_ms;
            let due_refresh = self.next_refresh_ms <= now_ms;

            if due_cadence && self.next_cadence_ms <= self.next_refresh_ms {
                self.engine.cadence_tick()?;
                self.next_cadence_ms += self.cadence_interval_ms;
            } else if due_refresh {
                records.push(ReplayRecord {
                    elapsed_ms: self.next_refresh_ms - origin,
                    snapshot: self.engine.compute_metrics(),
                });
                self.next_refresh_ms += self.refresh_interval_ms;
            } else if due_cadence {
                self.engine.cadence_tick()?;
                self.next_cadence_ms += self.cadence_interval_ms;
            } else {
                break;
            }
        }

        Ok(records)
    }
}

/// Replay a whole recording, publishing a final snapshot at the last event
pub fn replay(
    config: &MotionConfig,
    events: &[ReplayEvent],
) -> Result<Vec<ReplayRecord>, MotionError> {
    let mut session = ReplaySession::new(config)?;
    let mut records = Vec::new();

    for event in events {
        records.extend(session.push(event)?);
    }
    if let Some(last) = events.last() {
        let closing = session.finish(last.timestamp_ms())?;
        // A tick landing on the last event is superseded by the post-ingest snapshot
        if records.last().map(|r| r.elapsed_ms) == closing.first().map(|r| r.elapsed_ms) {
            records.pop();
        }
        records.extend(closing);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityState;
    use pretty_assertions::assert_eq;

    fn seeded(has_hardware: bool) -> MotionConfig {
        MotionConfig {
            random_seed: Some(21),
            ..MotionConfig::for_hardware(has_hardware)
        }
    }

    #[test]
    fn test_parse_mixed_events() {
        let input = r#"
            {"timestamp_ms": 0, "x": 0.0, "y": 0.0, "z": 9.8}

            {"timestamp_ms": 20, "step_count": 1500}
        "#;
        let events = parse_ndjson(input).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            ReplayEvent::Accelerometer(AccelSample::new(0.0, 0.0, 9.8, 0))
        );
        assert_eq!(
            events[1],
            ReplayEvent::StepCount {
                timestamp_ms: 20,
                step_count: 1500
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_ndjson("{\"timestamp_ms\": 1}").is_err());
        assert!(parse_ndjson("nope").is_err());
    }

    #[test]
    fn test_hardware_replay_timeline() {
        let events: Vec<ReplayEvent> = (0..5u64)
            .map(|i| ReplayEvent::StepCount {
                timestamp_ms: 10_000 + i * 600,
                step_count: 900 + i * 2,
            })
            .collect();

        let records = replay(&seeded(true), &events).unwrap();
        let elapsed: Vec<u64> = records.iter().map(|r| r.elapsed_ms).collect();
        let steps: Vec<u64> = records.iter().map(|r| r.snapshot.total_steps).collect();

        // Ticks at 0, 1000, 2000 plus the closing snapshot at 2400
        assert_eq!(elapsed, vec![0, 1000, 2000, 2400]);
        assert_eq!(steps, vec![0, 2, 6, 8]);
    }

    #[test]
    fn test_simulation_replay_is_deterministic_and_monotonic() {
        let events: Vec<ReplayEvent> = (0..20u64)
            .map(|i| ReplayEvent::Accelerometer(AccelSample::new(3.0, 4.0, 12.0, i * 250)))
            .collect();

        let first = replay(&seeded(false), &events).unwrap();
        let second = replay(&seeded(false), &events).unwrap();

        let steps = |records: &[ReplayRecord]| -> Vec<u64> {
            records.iter().map(|r| r.snapshot.total_steps).collect()
        };
        assert_eq!(steps(&first), steps(&second));
        assert!(steps(&first).windows(2).all(|w| w[0] <= w[1]));

        let last = first.last().unwrap();
        assert_eq!(last.snapshot.current_activity, ActivityState::Running);
        assert!(last.snapshot.total_steps > 0);
    }

    #[test]
    fn test_step_count_in_simulation_is_rejected() {
        let events = vec![ReplayEvent::StepCount {
            timestamp_ms: 0,
            step_count: 10,
        }];
        assert!(matches!(
            replay(&seeded(false), &events),
            Err(MotionError::ConfigurationMismatch { .. })
        ));
    }

    #[test]
    fn test_record_json_is_flat() {
        let events = vec![ReplayEvent::Accelerometer(AccelSample::new(0.0, 0.0, 9.8, 5))];
        let records = replay(&seeded(false), &events).unwrap();
        let value = serde_json::to_value(&records[0]).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(value["elapsed_ms"], 0);
        assert_eq!(value["total_steps"], 0);
        assert_eq!(value["current_activity"], "stationary");
    }
}
