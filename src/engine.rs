//! Single-owner motion state
//!
//! `MotionEngine` owns every piece of mutable core state: the activity
//! classifier, the step engine, the metrics aggregator, the random source and
//! the last raw sample. It is synchronous and deterministic for a fixed seed;
//! `MotionCore` wraps it in one lock for concurrent producers.

use crate::classifier::ActivityClassifier;
use crate::config::MotionConfig;
use crate::error::MotionError;
use crate::metrics::MetricsAggregator;
use crate::steps::StepEngine;
use crate::types::{
    AccelSample, ActivityLabel, ActivityState, HealthMetricsSnapshot, SensorReading, StepMode,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::warn;

#[derive(Debug)]
pub struct MotionEngine {
    classifier: ActivityClassifier,
    steps: StepEngine,
    aggregator: MetricsAggregator,
    rng: StdRng,
    last_sample: Option<AccelSample>,
}

impl MotionEngine {
    /// Build an engine from a validated configuration
    pub fn new(config: &MotionConfig) -> Result<Self, MotionError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    /// Build an engine from a configuration already known to be valid
    pub(crate) fn from_valid_config(config: &MotionConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            classifier: ActivityClassifier::from_config(config),
            steps: StepEngine::with_cooldown(config.step_mode(), config.burst_cooldown_ms),
            aggregator: MetricsAggregator::from_config(config),
            rng,
            last_sample: None,
        }
    }

    pub fn step_mode(&self) -> StepMode {
        self.steps.mode()
    }

    /// Classify a sample and, in simulation mode, run the movement burst.
    ///
    /// Non-finite samples are rejected without touching any state.
    pub fn ingest_sample(&mut self, sample: AccelSample) -> Result<ActivityLabel, MotionError> {
        if !sample.is_finite() {
            warn!(
                target: "synheart_motion",
                x = sample.x,
                y = sample.y,
                z = sample.z,
                "rejected non-finite accelerometer sample"
            );
            return Err(MotionError::InvalidSample(format!(
                "non-finite component in ({}, {}, {})",
                sample.x, sample.y, sample.z
            )));
        }

        let label = self.classifier.classify(&sample);
        self.last_sample = Some(sample);

        if self.steps.mode() == StepMode::Simulation {
            let activity = self.classifier.smoothed_activity();
            self.steps.movement_burst(
                activity,
                sample.timestamp_ms,
                self.classifier.last_transition_ms(),
                &mut self.rng,
            )?;
        }

        Ok(label)
    }

    /// Ingest a raw hardware step counter reading
    pub fn ingest_hardware_count(&mut self, raw: u64) -> Result<u64, MotionError> {
        self.steps.ingest_hardware_count(raw)
    }

    /// Background cadence tick of the step simulation
    pub fn cadence_tick(&mut self) -> Result<u64, MotionError> {
        let activity = self.classifier.smoothed_activity();
        self.steps.cadence_tick(activity, &mut self.rng)
    }

    /// Aggregate the current state into a fresh snapshot
    pub fn compute_metrics(&mut self) -> HealthMetricsSnapshot {
        let activity = self.classifier.smoothed_activity();
        self.aggregator
            .compute(self.steps.total_steps(), activity, &mut self.rng)
    }

    pub fn current_activity(&self) -> ActivityState {
        self.classifier.smoothed_activity()
    }

    pub fn total_steps(&self) -> u64 {
        self.steps.total_steps()
    }

    pub fn last_sample(&self) -> Option<&AccelSample> {
        self.last_sample.as_ref()
    }

    /// Sensor view built from a fresh snapshot
    pub fn sensor_reading(&mut self) -> SensorReading {
        let snapshot = self.compute_metrics();
        SensorReading::from_snapshot(&snapshot, self.last_sample.as_ref())
    }

    pub fn classifier(&self) -> &ActivityClassifier {
        &self.classifier
    }

    /// Zero steps and clear activity state; configuration and mode are kept
    pub fn reset(&mut self) {
        self.steps.reset();
        self.classifier.reset();
        self.aggregator.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seeded(has_hardware: bool) -> MotionEngine {
        let config = MotionConfig {
            random_seed: Some(11),
            ..MotionConfig::for_hardware(has_hardware)
        };
        MotionEngine::new(&config).unwrap()
    }

    fn running_sample(timestamp_ms: u64) -> AccelSample {
        // magnitude 13.0
        AccelSample::new(3.0, 4.0, 12.0, timestamp_ms)
    }

    #[test]
    fn test_running_scenario() {
        let mut engine = seeded(false);
        let mut previous = 0;

        for i in 0..3u64 {
            let label = engine.ingest_sample(running_sample(i * 1500)).unwrap();
            assert_eq!(label, ActivityLabel::Running);
            assert!(engine.total_steps() >= previous);
            previous = engine.total_steps();
        }

        // First sample is the transition; the next two are past the cooldown
        assert!((4..=6).contains(&engine.total_steps()));

        let snapshot = engine.compute_metrics();
        assert_eq!(snapshot.current_activity, ActivityState::Running);
        assert!(
            (snapshot.total_calories - snapshot.total_steps as f64 * 0.072).abs() < 1e-9
        );
    }

    #[test]
    fn test_no_burst_within_cooldown() {
        let mut engine = seeded(false);
        engine.ingest_sample(running_sample(0)).unwrap();
        engine.ingest_sample(running_sample(500)).unwrap();
        engine.ingest_sample(running_sample(999)).unwrap();
        assert_eq!(engine.total_steps(), 0);
    }

    #[test]
    fn test_cadence_tick_uses_smoothed_activity() {
        let mut engine = seeded(false);
        assert_eq!(engine.cadence_tick().unwrap(), 0);

        engine.ingest_sample(AccelSample::new(0.0, 0.0, 11.0, 0)).unwrap();
        let added = engine.cadence_tick().unwrap();
        assert!((1..=2).contains(&added));
    }

    #[test]
    fn test_rejects_non_finite_sample() {
        let mut engine = seeded(false);
        let err = engine
            .ingest_sample(AccelSample::new(f32::NAN, 0.0, 9.8, 0))
            .unwrap_err();

        assert!(matches!(err, MotionError::InvalidSample(_)));
        assert_eq!(engine.current_activity(), ActivityState::Unknown);
        assert!(engine.last_sample().is_none());
    }

    #[test]
    fn test_hardware_mode_ignores_bursts() {
        let mut engine = seeded(true);
        for i in 0..5u64 {
            engine.ingest_sample(running_sample(i * 2000)).unwrap();
        }
        assert_eq!(engine.total_steps(), 0);
        assert!(engine.cadence_tick().is_err());

        engine.ingest_hardware_count(800).unwrap();
        assert_eq!(engine.ingest_hardware_count(830).unwrap(), 30);
    }

    #[test]
    fn test_reset_then_compute() {
        let mut engine = seeded(false);
        for i in 0..4u64 {
            engine.ingest_sample(running_sample(i * 1500)).unwrap();
        }
        engine.cadence_tick().unwrap();
        assert!(engine.total_steps() > 0);

        engine.reset();
        let snapshot = engine.compute_metrics();

        assert_eq!(snapshot.total_steps, 0);
        assert_eq!(snapshot.total_calories, 0.0);
        assert_eq!(snapshot.total_distance_km, 0.0);
        assert_eq!(snapshot.avg_heart_rate_bpm, None);
        assert_eq!(snapshot.current_activity, ActivityState::Unknown);
        assert_eq!(engine.step_mode(), StepMode::Simulation);
    }

    #[test]
    fn test_sensor_reading_tracks_last_sample() {
        let mut engine = seeded(false);
        engine.ingest_sample(AccelSample::new(0.5, -0.25, 9.75, 10)).unwrap();

        let reading = engine.sensor_reading();
        assert_eq!(reading.accelerometer_x, 0.5);
        assert_eq!(reading.accelerometer_y, -0.25);
        assert_eq!(reading.accelerometer_z, 9.75);
        assert_eq!(reading.activity, ActivityState::Stationary);
    }
}
