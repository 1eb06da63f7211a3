//! Core types for the Synheart Motion core
//!
//! This module defines the values that flow through the core: raw accelerometer
//! samples, activity labels, step bookkeeping and the published snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single triaxial accelerometer reading (m/s², gravity included)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    /// Monotonic timestamp in milliseconds
    pub timestamp_ms: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AccelSample {
    pub fn new(x: f32, y: f32, z: f32, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            x,
            y,
            z,
        }
    }

    /// Euclidean norm of the acceleration vector
    pub fn magnitude(&self) -> f64 {
        let (x, y, z) = (self.x as f64, self.y as f64, self.z as f64);
        (x * x + y * y + z * z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Raw per-sample activity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLabel {
    Stationary,
    Walking,
    Running,
}

impl ActivityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLabel::Stationary => "Stationary",
            ActivityLabel::Walking => "Walking",
            ActivityLabel::Running => "Running",
        }
    }
}

impl fmt::Display for ActivityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Smoothed activity as reported to callers.
///
/// `Unknown` is reported until at least one sample has been classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    #[default]
    Unknown,
    Stationary,
    Walking,
    Running,
}

impl ActivityState {
    /// The underlying label, if the state is determinate
    pub fn label(&self) -> Option<ActivityLabel> {
        match self {
            ActivityState::Unknown => None,
            ActivityState::Stationary => Some(ActivityLabel::Stationary),
            ActivityState::Walking => Some(ActivityLabel::Walking),
            ActivityState::Running => Some(ActivityLabel::Running),
        }
    }

    /// True for Walking and Running
    pub fn is_moving(&self) -> bool {
        matches!(self, ActivityState::Walking | ActivityState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityState::Unknown => "Unknown",
            ActivityState::Stationary => "Stationary",
            ActivityState::Walking => "Walking",
            ActivityState::Running => "Running",
        }
    }
}

impl From<ActivityLabel> for ActivityState {
    fn from(label: ActivityLabel) -> Self {
        match label {
            ActivityLabel::Stationary => ActivityState::Stationary,
            ActivityLabel::Walking => ActivityState::Walking,
            ActivityLabel::Running => ActivityState::Running,
        }
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step counting strategy, fixed at initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// Steps come from a cumulative hardware step counter
    Hardware,
    /// Steps are simulated from the classified activity
    Simulation,
}

impl StepMode {
    pub fn from_hardware_flag(has_hardware_step_counter: bool) -> Self {
        if has_hardware_step_counter {
            StepMode::Hardware
        } else {
            StepMode::Simulation
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepMode::Hardware => "hardware",
            StepMode::Simulation => "simulation",
        }
    }
}

impl fmt::Display for StepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step bookkeeping owned by the step engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepState {
    /// Displayed step total; never decreases between resets
    pub total_steps: u64,
    /// First raw hardware reading since the last (re-)baseline
    pub hardware_baseline: Option<u64>,
    /// Total carried over from before the latest hardware re-baseline
    pub carried_steps: u64,
    /// Previous raw hardware reading, used to detect counter resets
    pub last_raw: Option<u64>,
    pub using_simulation: bool,
}

impl StepState {
    pub fn new(mode: StepMode) -> Self {
        Self {
            total_steps: 0,
            hardware_baseline: None,
            carried_steps: 0,
            last_raw: None,
            using_simulation: mode == StepMode::Simulation,
        }
    }
}

/// Immutable result of one aggregation tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetricsSnapshot {
    pub total_steps: u64,
    /// Kilocalories burned
    pub total_calories: f64,
    pub total_distance_km: f64,
    /// Simulated heart rate; absent while stationary or unknown
    pub avg_heart_rate_bpm: Option<f32>,
    pub current_activity: ActivityState,
    pub computed_at: DateTime<Utc>,
}

impl HealthMetricsSnapshot {
    /// Snapshot for a freshly initialized or reset core
    pub fn empty() -> Self {
        Self {
            total_steps: 0,
            total_calories: 0.0,
            total_distance_km: 0.0,
            avg_heart_rate_bpm: None,
            current_activity: ActivityState::Unknown,
            computed_at: Utc::now(),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Per-tick sensor view combining the latest metrics with the last raw sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    pub steps: u64,
    pub calories: f64,
    /// Distance in meters
    pub distance_m: f64,
    pub heart_rate_bpm: Option<f32>,
    pub accelerometer_x: f32,
    pub accelerometer_y: f32,
    pub accelerometer_z: f32,
    pub activity: ActivityState,
}

impl SensorReading {
    pub fn from_snapshot(
        snapshot: &HealthMetricsSnapshot,
        last_sample: Option<&AccelSample>,
    ) -> Self {
        let (x, y, z) = last_sample.map_or((0.0, 0.0, 0.0), |s| (s.x, s.y, s.z));
        Self {
            timestamp: snapshot.computed_at,
            steps: snapshot.total_steps,
            calories: snapshot.total_calories,
            distance_m: snapshot.total_distance_km * 1000.0,
            heart_rate_bpm: snapshot.avg_heart_rate_bpm,
            accelerometer_x: x,
            accelerometer_y: y,
            accelerometer_z: z,
            activity: snapshot.current_activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude() {
        let sample = AccelSample::new(3.0, 4.0, 12.0, 0);
        assert!((sample.magnitude() - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_sample() {
        assert!(!AccelSample::new(f32::NAN, 0.0, 9.8, 0).is_finite());
        assert!(!AccelSample::new(0.0, f32::INFINITY, 9.8, 0).is_finite());
        assert!(AccelSample::new(0.0, 0.0, 9.8, 0).is_finite());
    }

    #[test]
    fn test_activity_state_from_label() {
        assert_eq!(ActivityState::from(ActivityLabel::Walking), ActivityState::Walking);
        assert_eq!(ActivityState::Unknown.label(), None);
        assert!(ActivityState::Running.is_moving());
        assert!(!ActivityState::Stationary.is_moving());
        assert!(!ActivityState::Unknown.is_moving());
    }

    #[test]
    fn test_snapshot_json_fields() {
        let snapshot = HealthMetricsSnapshot::empty();
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(value["total_steps"], 0);
        assert_eq!(value["current_activity"], "unknown");
        assert!(value["avg_heart_rate_bpm"].is_null());
    }

    #[test]
    fn test_sensor_reading_distance_in_meters() {
        let mut snapshot = HealthMetricsSnapshot::empty();
        snapshot.total_steps = 1000;
        snapshot.total_distance_km = 0.762;
        let sample = AccelSample::new(0.1, 0.2, 9.8, 5);

        let reading = SensorReading::from_snapshot(&snapshot, Some(&sample));
        assert!((reading.distance_m - 762.0).abs() < 1e-9);
        assert_eq!(reading.accelerometer_z, 9.8);
    }
}
