//! Core configuration
//!
//! All tunables of the motion core live here. Defaults reproduce the fixed
//! constants of the activity classifier, step simulation and metric formulas.

use crate::error::MotionError;
use crate::types::StepMode;
use serde::{Deserialize, Serialize};

/// Refresh scheduler period
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1000;

/// Simulated cadence tick period
pub const DEFAULT_CADENCE_INTERVAL_MS: u64 = 1000;

/// Minimum time after an activity transition before a movement burst adds steps
pub const DEFAULT_BURST_COOLDOWN_MS: u64 = 1000;

/// Number of raw labels kept for majority voting
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Magnitude (m/s²) at which a sample counts as walking
pub const DEFAULT_WALKING_THRESHOLD: f64 = 10.0;

/// Magnitude (m/s²) at which a sample counts as running
pub const DEFAULT_RUNNING_THRESHOLD: f64 = 12.5;

/// Kilocalories per step before the activity multiplier
pub const DEFAULT_CALORIES_PER_STEP: f64 = 0.04;

/// Average stride length in meters
pub const DEFAULT_STEP_LENGTH_M: f64 = 0.762;

/// How the simulated heart rate evolves between ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HeartRateMode {
    /// Every tick draws a fresh value
    #[default]
    Independent,
    /// Each fresh draw is blended into the previous value: `prev + alpha * (draw - prev)`.
    ///
    /// Blended values are not integer-valued. A change of activity band, or an
    /// absent heart rate, restarts from a fresh draw.
    Smoothed { alpha: f32 },
}

/// Configuration for a motion core instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Whether the caller has a hardware step counter (selects the step mode)
    pub has_hardware_step_counter: bool,
    pub refresh_interval_ms: u64,
    pub cadence_interval_ms: u64,
    pub burst_cooldown_ms: u64,
    pub history_capacity: usize,
    pub walking_threshold: f64,
    pub running_threshold: f64,
    pub calories_per_step: f64,
    pub step_length_m: f64,
    pub heart_rate: HeartRateMode,
    /// Fixed seed for the random source; entropy-seeded when absent
    pub random_seed: Option<u64>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            has_hardware_step_counter: false,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            cadence_interval_ms: DEFAULT_CADENCE_INTERVAL_MS,
            burst_cooldown_ms: DEFAULT_BURST_COOLDOWN_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            walking_threshold: DEFAULT_WALKING_THRESHOLD,
            running_threshold: DEFAULT_RUNNING_THRESHOLD,
            calories_per_step: DEFAULT_CALORIES_PER_STEP,
            step_length_m: DEFAULT_STEP_LENGTH_M,
            heart_rate: HeartRateMode::Independent,
            random_seed: None,
        }
    }
}

impl MotionConfig {
    /// Default configuration for the given hardware availability
    pub fn for_hardware(has_hardware_step_counter: bool) -> Self {
        Self {
            has_hardware_step_counter,
            ..Default::default()
        }
    }

    pub fn step_mode(&self) -> StepMode {
        StepMode::from_hardware_flag(self.has_hardware_step_counter)
    }

    /// Check that the configuration describes a usable core
    pub fn validate(&self) -> Result<(), MotionError> {
        if self.refresh_interval_ms == 0 {
            return Err(MotionError::InvalidConfig(
                "refresh_interval_ms must be positive".to_string(),
            ));
        }
        if self.cadence_interval_ms == 0 {
            return Err(MotionError::InvalidConfig(
                "cadence_interval_ms must be positive".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(MotionError::InvalidConfig(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if !self.walking_threshold.is_finite()
            || !self.running_threshold.is_finite()
            || self.walking_threshold >= self.running_threshold
        {
            return Err(MotionError::InvalidConfig(format!(
                "walking_threshold ({}) must be below running_threshold ({})",
                self.walking_threshold, self.running_threshold
            )));
        }
        let non_negative = |v: f64| v.is_finite() && v >= 0.0;
        if !non_negative(self.calories_per_step) || !non_negative(self.step_length_m) {
            return Err(MotionError::InvalidConfig(
                "calories_per_step and step_length_m must be non-negative".to_string(),
            ));
        }
        if let HeartRateMode::Smoothed { alpha } = self.heart_rate {
            if alpha.is_nan() || alpha <= 0.0 || alpha > 1.0 {
                return Err(MotionError::InvalidConfig(format!(
                    "heart rate smoothing alpha must be in (0, 1], got {alpha}"
                )));
            }
        }
        Ok(())
    }

    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, MotionError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = MotionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.step_mode(), StepMode::Simulation);
        assert_eq!(MotionConfig::for_hardware(true).step_mode(), StepMode::Hardware);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            MotionConfig::from_json(r#"{"has_hardware_step_counter": true, "random_seed": 7}"#)
                .unwrap();

        assert_eq!(
            config,
            MotionConfig {
                has_hardware_step_counter: true,
                random_seed: Some(7),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_heart_rate_mode_json() {
        let config =
            MotionConfig::from_json(r#"{"heart_rate": {"mode": "smoothed", "alpha": 0.25}}"#)
                .unwrap();
        assert_eq!(config.heart_rate, HeartRateMode::Smoothed { alpha: 0.25 });

        let json = config.to_json().unwrap();
        let reloaded = MotionConfig::from_json(&json).unwrap();
        assert_eq!(reloaded.heart_rate, config.heart_rate);
        assert_eq!(reloaded.history_capacity, config.history_capacity);
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let config = MotionConfig {
            walking_threshold: 13.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MotionError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_intervals_and_capacity() {
        for config in [
            MotionConfig {
                refresh_interval_ms: 0,
                ..Default::default()
            },
            MotionConfig {
                cadence_interval_ms: 0,
                ..Default::default()
            },
            MotionConfig {
                history_capacity: 0,
                ..Default::default()
            },
            MotionConfig {
                heart_rate: HeartRateMode::Smoothed { alpha: 0.0 },
                ..Default::default()
            },
        ] {
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            MotionConfig::from_json("not json"),
            Err(MotionError::JsonError(_))
        ));
    }
}
