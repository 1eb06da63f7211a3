//! Step counting
//!
//! The step engine keeps a monotonically non-decreasing step total, fed either
//! by a cumulative hardware step counter or by a simulation driven from the
//! smoothed activity.
//!
//! Simulation runs two processes into the same total:
//! - movement bursts, evaluated on every accelerometer sample after a cooldown
//!   following the last activity transition
//! - a fixed-cadence background tick, independent of sample arrival

use crate::config::DEFAULT_BURST_COOLDOWN_MS;
use crate::error::MotionError;
use crate::types::{ActivityState, StepMode, StepState};
use rand::Rng;
use tracing::debug;

/// Probability that a walking burst yields a step
pub const WALKING_BURST_PROBABILITY: f64 = 0.7;

/// Step engine for one session
#[derive(Debug, Clone)]
pub struct StepEngine {
    mode: StepMode,
    state: StepState,
    burst_cooldown_ms: u64,
}

impl StepEngine {
    pub fn new(mode: StepMode) -> Self {
        Self::with_cooldown(mode, DEFAULT_BURST_COOLDOWN_MS)
    }

    pub fn with_cooldown(mode: StepMode, burst_cooldown_ms: u64) -> Self {
        Self {
            mode,
            state: StepState::new(mode),
            burst_cooldown_ms,
        }
    }

    pub fn mode(&self) -> StepMode {
        self.mode
    }

    pub fn total_steps(&self) -> u64 {
        self.state.total_steps
    }

    pub fn state(&self) -> &StepState {
        &self.state
    }

    /// Ingest a cumulative hardware step counter reading.
    ///
    /// The first reading establishes the baseline. A reading below the previous
    /// one is treated as a counter reset: the current total is carried over and
    /// the counter is re-baselined, adding no steps for that call.
    pub fn ingest_hardware_count(&mut self, raw: u64) -> Result<u64, MotionError> {
        self.require_mode(StepMode::Hardware, "hardware step ingestion")?;

        let state = &mut self.state;
        let baseline = match (state.hardware_baseline, state.last_raw) {
            (Some(baseline), Some(last)) if raw >= last => baseline,
            (Some(_), Some(last)) => {
                debug!(
                    target: "synheart_motion",
                    previous_raw = last,
                    raw,
                    carried = state.total_steps,
                    "hardware step counter went backwards, re-baselining"
                );
                state.carried_steps = state.total_steps;
                state.hardware_baseline = Some(raw);
                raw
            }
            _ => {
                state.carried_steps = state.total_steps;
                state.hardware_baseline = Some(raw);
                raw
            }
        };
        state.last_raw = Some(raw);

        let candidate = state.carried_steps.saturating_add(raw - baseline);
        state.total_steps = state.total_steps.max(candidate);
        Ok(state.total_steps)
    }

    /// Movement-triggered burst, evaluated on every accelerometer sample.
    ///
    /// Adds steps only while moving and once the cooldown since the last
    /// activity transition has elapsed. Returns the number of steps added.
    pub fn movement_burst<R: Rng + ?Sized>(
        &mut self,
        activity: ActivityState,
        now_ms: u64,
        last_transition_ms: Option<u64>,
        rng: &mut R,
    ) -> Result<u64, MotionError> {
        self.require_mode(StepMode::Simulation, "simulated movement burst")?;

        let cooled_down = match last_transition_ms {
            Some(transition) => now_ms.saturating_sub(transition) >= self.burst_cooldown_ms,
            None => true,
        };
        if !cooled_down {
            return Ok(0);
        }

        let steps = match activity {
            ActivityState::Walking => u64::from(rng.gen_bool(WALKING_BURST_PROBABILITY)),
            ActivityState::Running => rng.gen_range(2..=3),
            ActivityState::Stationary | ActivityState::Unknown => 0,
        };
        self.add_steps(steps);
        if steps > 0 {
            debug!(target: "synheart_motion", steps, activity = %activity, "movement burst");
        }
        Ok(steps)
    }

    /// Fixed-cadence background tick. Returns the number of steps added.
    pub fn cadence_tick<R: Rng + ?Sized>(
        &mut self,
        activity: ActivityState,
        rng: &mut R,
    ) -> Result<u64, MotionError> {
        self.require_mode(StepMode::Simulation, "simulated cadence tick")?;

        let steps = match activity {
            ActivityState::Walking => rng.gen_range(1..=2),
            ActivityState::Running => rng.gen_range(2..=4),
            ActivityState::Stationary | ActivityState::Unknown => 0,
        };
        self.add_steps(steps);
        Ok(steps)
    }

    /// Zero the total and the hardware baseline; the mode is kept
    pub fn reset(&mut self) {
        self.state = StepState::new(self.mode);
    }

    fn add_steps(&mut self, steps: u64) {
        self.state.total_steps = self.state.total_steps.saturating_add(steps);
    }

    fn require_mode(&self, expected: StepMode, operation: &'static str) -> Result<(), MotionError> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(MotionError::ConfigurationMismatch {
                operation,
                mode: self.mode,
            })
        }
    }
}
