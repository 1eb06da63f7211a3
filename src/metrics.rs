//! Metrics aggregation
//!
//! Derives calories, distance and a simulated heart rate from the step total
//! and the current smoothed activity:
//! - calories = steps × calories-per-step × activity multiplier
//! - distance = steps × step length / 1000
//! - heart rate is drawn per tick from an activity-specific band

use crate::config::{HeartRateMode, MotionConfig, DEFAULT_CALORIES_PER_STEP, DEFAULT_STEP_LENGTH_M};
use crate::types::{ActivityState, HealthMetricsSnapshot};
use chrono::Utc;
use rand::Rng;

/// Walking heart-rate band, lower bound inclusive
pub const WALKING_HEART_RATE_BPM: (u32, u32) = (70, 90);

/// Running heart-rate band, lower bound inclusive
pub const RUNNING_HEART_RATE_BPM: (u32, u32) = (100, 140);

/// Calorie multiplier for the given activity
pub fn activity_multiplier(activity: ActivityState) -> f64 {
    match activity {
        ActivityState::Walking => 1.2,
        ActivityState::Running => 1.8,
        ActivityState::Stationary | ActivityState::Unknown => 1.0,
    }
}

/// Aggregator producing one snapshot per call
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    calories_per_step: f64,
    step_length_m: f64,
    heart_rate_mode: HeartRateMode,
    /// Last published heart rate and the activity it was drawn for, only
    /// tracked in smoothed mode
    smoothed_heart_rate: Option<(ActivityState, f32)>,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(
            DEFAULT_CALORIES_PER_STEP,
            DEFAULT_STEP_LENGTH_M,
            HeartRateMode::Independent,
        )
    }
}

impl MetricsAggregator {
    pub fn new(calories_per_step: f64, step_length_m: f64, heart_rate_mode: HeartRateMode) -> Self {
        Self {
            calories_per_step,
            step_length_m,
            heart_rate_mode,
            smoothed_heart_rate: None,
        }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(
            config.calories_per_step,
            config.step_length_m,
            config.heart_rate,
        )
    }

    pub fn calories(&self, total_steps: u64, activity: ActivityState) -> f64 {
        total_steps as f64 * self.calories_per_step * activity_multiplier(activity)
    }

    pub fn distance_km(&self, total_steps: u64) -> f64 {
        (total_steps as f64 * self.step_length_m) / 1000.0
    }

    /// Build a snapshot for the given step total and activity
    pub fn compute<R: Rng + ?Sized>(
        &mut self,
        total_steps: u64,
        activity: ActivityState,
        rng: &mut R,
    ) -> HealthMetricsSnapshot {
        HealthMetricsSnapshot {
            total_steps,
            total_calories: self.calories(total_steps, activity),
            total_distance_km: self.distance_km(total_steps),
            avg_heart_rate_bpm: self.heart_rate(activity, rng),
            current_activity: activity,
            computed_at: Utc::now(),
        }
    }

    /// Forget any smoothed heart rate
    pub fn reset(&mut self) {
        self.smoothed_heart_rate = None;
    }

    fn heart_rate<R: Rng + ?Sized>(&mut self, activity: ActivityState, rng: &mut R) -> Option<f32> {
        let draw = draw_heart_rate(activity, rng);

        match self.heart_rate_mode {
            HeartRateMode::Independent => draw,
            HeartRateMode::Smoothed { alpha } => {
                // Blending only happens within one band; a band change starts over
                let smoothed = match (draw, self.smoothed_heart_rate) {
                    (Some(current), Some((band, previous))) if band == activity => {
                        Some(previous + alpha * (current - previous))
                    }
                    (draw, _) => draw,
                };
                self.smoothed_heart_rate = smoothed.map(|bpm| (activity, bpm));
                smoothed
            }
        }
    }
}

/// Independent heart-rate draw; integer-valued within the activity band
pub fn draw_heart_rate<R: Rng + ?Sized>(activity: ActivityState, rng: &mut R) -> Option<f32> {
    let (low, high) = match activity {
        ActivityState::Walking => WALKING_HEART_RATE_BPM,
        ActivityState::Running => RUNNING_HEART_RATE_BPM,
        ActivityState::Stationary | ActivityState::Unknown => return None,
    };
    Some(rng.gen_range(low..high) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_walking_formulas_exact() {
        let mut aggregator = MetricsAggregator::default();
        let mut rng = rng();

        for n in [0u64, 1, 7, 100, 12_345, 1_000_000] {
            let snapshot = aggregator.compute(n, ActivityState::Walking, &mut rng);
            assert_eq!(snapshot.total_calories, n as f64 * 0.04 * 1.2);
            assert!((snapshot.total_calories - n as f64 * 0.048).abs() < 1e-9 * (n as f64 + 1.0));
            assert_eq!(snapshot.total_distance_km, n as f64 * 0.762 / 1000.0);
            assert_eq!(snapshot.total_steps, n);
        }
    }

    #[test]
    fn test_multipliers() {
        let aggregator = MetricsAggregator::default();

        assert_eq!(aggregator.calories(100, ActivityState::Unknown), 100.0 * 0.04);
        assert_eq!(aggregator.calories(100, ActivityState::Stationary), 100.0 * 0.04);
        assert_eq!(aggregator.calories(100, ActivityState::Running), 100.0 * 0.04 * 1.8);
    }

    #[test]
    fn test_zero_steps() {
        let mut aggregator = MetricsAggregator::default();
        let snapshot = aggregator.compute(0, ActivityState::Unknown, &mut rng());

        assert_eq!(snapshot.total_calories, 0.0);
        assert_eq!(snapshot.total_distance_km, 0.0);
        assert_eq!(snapshot.avg_heart_rate_bpm, None);
        assert_eq!(snapshot.current_activity, ActivityState::Unknown);
    }

    #[test]
    fn test_heart_rate_bands() {
        let mut rng = rng();

        for _ in 0..500 {
            let walking = draw_heart_rate(ActivityState::Walking, &mut rng).unwrap();
            assert!((70.0..90.0).contains(&walking));
            assert_eq!(walking.fract(), 0.0);

            let running = draw_heart_rate(ActivityState::Running, &mut rng).unwrap();
            assert!((100.0..140.0).contains(&running));
            assert_eq!(running.fract(), 0.0);
        }

        assert_eq!(draw_heart_rate(ActivityState::Stationary, &mut rng), None);
        assert_eq!(draw_heart_rate(ActivityState::Unknown, &mut rng), None);
    }

    #[test]
    fn test_smoothed_heart_rate_stays_in_band() {
        let mut aggregator = MetricsAggregator::new(
            DEFAULT_CALORIES_PER_STEP,
            DEFAULT_STEP_LENGTH_M,
            HeartRateMode::Smoothed { alpha: 0.2 },
        );
        let mut rng = rng();

        let first = aggregator
            .compute(10, ActivityState::Running, &mut rng)
            .avg_heart_rate_bpm
            .unwrap();
        let mut previous = first;
        for _ in 0..50 {
            let hr = aggregator
                .compute(10, ActivityState::Running, &mut rng)
                .avg_heart_rate_bpm
                .unwrap();
            assert!((100.0..140.0).contains(&hr));
            // A fifth of the band at most
            assert!((hr - previous).abs() <= 0.2 * 40.0);
            previous = hr;
        }

        // Changing band starts from a fresh integer draw in the new band
        let walking = aggregator
            .compute(10, ActivityState::Walking, &mut rng)
            .avg_heart_rate_bpm
            .unwrap();
        assert!((70.0..90.0).contains(&walking));
        assert_eq!(walking.fract(), 0.0);

        // Stopping clears the smoothed value
        let stationary = aggregator.compute(10, ActivityState::Stationary, &mut rng);
        assert_eq!(stationary.avg_heart_rate_bpm, None);
        let restarted = aggregator
            .compute(10, ActivityState::Walking, &mut rng)
            .avg_heart_rate_bpm
            .unwrap();
        assert!((70.0..90.0).contains(&restarted));
    }

    #[test]
    fn test_smoothing_restarts_when_band_changes() {
        let mut aggregator = MetricsAggregator::new(
            DEFAULT_CALORIES_PER_STEP,
            DEFAULT_STEP_LENGTH_M,
            HeartRateMode::Smoothed { alpha: 0.2 },
        );
        let mut rng = rng();

        for _ in 0..5 {
            aggregator.compute(10, ActivityState::Walking, &mut rng);
        }
        let running = aggregator
            .compute(10, ActivityState::Running, &mut rng)
            .avg_heart_rate_bpm
            .unwrap();

        assert!((100.0..140.0).contains(&running));
        assert_eq!(running.fract(), 0.0);
    }
}
