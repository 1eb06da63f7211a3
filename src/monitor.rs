//! Thread-safe motion monitor
//!
//! `MotionCore` is the handle a presentation layer holds. It wraps the
//! `MotionEngine` in a single lock shared by every producer (accelerometer
//! callback, hardware step callback, refresh tick, cadence tick), owns the
//! refresh scheduler and the simulated cadence scheduler, and publishes
//! snapshots to subscribers once per refresh tick and on reset.

use crate::config::MotionConfig;
use crate::engine::MotionEngine;
use crate::error::MotionError;
use crate::scheduler::{FirstTick, PeriodicTask};
use crate::types::{
    AccelSample, ActivityLabel, ActivityState, HealthMetricsSnapshot, SensorReading, StepMode,
};
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

type Callback = Arc<dyn Fn(&HealthMetricsSnapshot) + Send + Sync>;

/// Handle returned by [`MotionCore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(Uuid);

impl SubscriptionHandle {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

#[derive(Default)]
struct Subscribers {
    entries: Vec<(SubscriptionHandle, Callback)>,
}

/// Most recently published snapshot and its publication counter
struct Latest {
    generation: u64,
    snapshot: HealthMetricsSnapshot,
}

/// State shared with the refresh worker
///
/// Lock order is `publish` → `engine` → `latest`. Subscriber callbacks run
/// with only `publish` held, so they may call back into the core.
struct Shared {
    engine: Mutex<MotionEngine>,
    subscribers: Mutex<Subscribers>,
    latest: Mutex<Latest>,
    publish: ReentrantMutex<()>,
    last_error: Mutex<Option<String>>,
}

impl Shared {
    /// Store a snapshot as the latest one; the caller holds the engine guard
    fn store(&self, snapshot: &HealthMetricsSnapshot) -> u64 {
        let mut latest = self.latest.lock();
        latest.generation += 1;
        latest.snapshot = snapshot.clone();
        latest.generation
    }

    fn compute_and_store(&self) -> (HealthMetricsSnapshot, u64) {
        let mut engine = self.engine.lock();
        let snapshot = engine.compute_metrics();
        let generation = self.store(&snapshot);
        (snapshot, generation)
    }

    /// Compute, store and publish a snapshot, waiting for any publication in flight
    fn refresh(&self) -> HealthMetricsSnapshot {
        let _publishing = self.publish.lock();
        let (snapshot, generation) = self.compute_and_store();
        self.notify(&snapshot, generation);
        snapshot
    }

    /// Timer tick. A tick that finds another publication in progress is
    /// skipped, so the worker never waits on a caller's subscribers.
    fn tick(&self) {
        let Some(_publishing) = self.publish.try_lock() else {
            debug!(target: "synheart_motion", "publication in progress, tick skipped");
            return;
        };
        let (snapshot, generation) = self.compute_and_store();
        self.notify(&snapshot, generation);
    }

    /// Reset the engine and publish the zeroed snapshot
    fn reset(&self) -> HealthMetricsSnapshot {
        let _publishing = self.publish.lock();
        let (snapshot, generation) = {
            let mut engine = self.engine.lock();
            engine.reset();
            let snapshot = engine.compute_metrics();
            let generation = self.store(&snapshot);
            (snapshot, generation)
        };
        self.notify(&snapshot, generation);
        snapshot
    }

    /// Deliver a snapshot, stopping early once a newer one has been stored
    fn notify(&self, snapshot: &HealthMetricsSnapshot, generation: u64) {
        let callbacks: Vec<Callback> = self
            .subscribers
            .lock()
            .entries
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            if self.latest.lock().generation != generation {
                break;
            }
            callback(snapshot);
        }
    }

    fn record_error(&self, err: &MotionError) {
        *self.last_error.lock() = Some(err.to_string());
    }
}

/// Activity, step and metrics core for one session
pub struct MotionCore {
    instance_id: Uuid,
    config: MotionConfig,
    shared: Arc<Shared>,
    refresh: Mutex<PeriodicTask>,
    cadence: Mutex<PeriodicTask>,
}

impl MotionCore {
    /// Create a core with default settings for the given hardware availability
    pub fn initialize(has_hardware_step_counter: bool) -> Self {
        let config = MotionConfig::for_hardware(has_hardware_step_counter);
        let engine = MotionEngine::from_valid_config(&config);
        Self::from_parts(config, engine)
    }

    /// Create a core from an explicit configuration
    pub fn with_config(config: MotionConfig) -> Result<Self, MotionError> {
        let engine = MotionEngine::new(&config)?;
        Ok(Self::from_parts(config, engine))
    }

    fn from_parts(config: MotionConfig, engine: MotionEngine) -> Self {
        let instance_id = Uuid::new_v4();
        let mode = engine.step_mode();
        let shared = Arc::new(Shared {
            engine: Mutex::new(engine),
            subscribers: Mutex::new(Subscribers::default()),
            latest: Mutex::new(Latest {
                generation: 0,
                snapshot: HealthMetricsSnapshot::empty(),
            }),
            publish: ReentrantMutex::new(()),
            last_error: Mutex::new(None),
        });

        let refresh = PeriodicTask::new(
            "refresh",
            Duration::from_millis(config.refresh_interval_ms),
            FirstTick::Immediate,
        );
        let mut cadence = PeriodicTask::new(
            "cadence",
            Duration::from_millis(config.cadence_interval_ms),
            FirstTick::AfterPeriod,
        );

        if mode == StepMode::Simulation {
            let worker_shared = Arc::clone(&shared);
            cadence.start(move || {
                if let Err(err) = worker_shared.engine.lock().cadence_tick() {
                    warn!(target: "synheart_motion", error = %err, "cadence tick failed");
                }
            });
        }

        info!(
            target: "synheart_motion",
            instance_id = %instance_id,
            mode = %mode,
            refresh_interval_ms = config.refresh_interval_ms,
            "motion core initialized"
        );

        Self {
            instance_id,
            config,
            shared,
            refresh: Mutex::new(refresh),
            cadence: Mutex::new(cadence),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn step_mode(&self) -> StepMode {
        self.config.step_mode()
    }

    /// Feed one accelerometer sample; returns its raw classification
    pub fn on_accelerometer_sample(
        &self,
        x: f32,
        y: f32,
        z: f32,
        timestamp_ms: u64,
    ) -> Result<ActivityLabel, MotionError> {
        let sample = AccelSample::new(x, y, z, timestamp_ms);
        let result = self.shared.engine.lock().ingest_sample(sample);
        if let Err(err) = &result {
            self.shared.record_error(err);
        }
        result
    }

    /// Feed a raw hardware step counter reading; returns the step total
    pub fn on_hardware_step_count(&self, raw: u64) -> Result<u64, MotionError> {
        let result = self.shared.engine.lock().ingest_hardware_count(raw);
        if let Err(err) = &result {
            warn!(target: "synheart_motion", error = %err, raw, "hardware step count rejected");
            self.shared.record_error(err);
        }
        result
    }

    /// Activate the refresh scheduler; restarts it if already active
    pub fn start(&self) {
        let shared = Arc::clone(&self.shared);
        let replaced = self.refresh.lock().start(move || shared.tick());
        // Joined outside the lock, like stop
        if let Some(replaced) = replaced {
            replaced.join();
        }
        info!(target: "synheart_motion", instance_id = %self.instance_id, "monitoring started");
    }

    /// Deactivate the refresh scheduler. The last snapshot stays published.
    pub fn stop(&self) {
        // Joined outside the lock: subscribers may call stop from the worker thread
        let stopping = self.refresh.lock().signal_stop();
        if let Some(stopping) = stopping {
            stopping.join();
            info!(target: "synheart_motion", instance_id = %self.instance_id, "monitoring stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.refresh.lock().is_running()
    }

    /// Zero steps and clear activity history, then publish and return the
    /// zeroed snapshot
    pub fn reset(&self) -> HealthMetricsSnapshot {
        let snapshot = self.shared.reset();
        info!(target: "synheart_motion", instance_id = %self.instance_id, "counters reset");
        snapshot
    }

    /// Register a callback invoked with every published snapshot
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&HealthMetricsSnapshot) + Send + Sync + 'static,
    {
        let handle = SubscriptionHandle(Uuid::new_v4());
        self.shared
            .subscribers
            .lock()
            .entries
            .push((handle, Arc::new(callback)));
        handle
    }

    /// Remove a subscription; returns false if it was not registered
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subscribers = self.shared.subscribers.lock();
        let before = subscribers.entries.len();
        subscribers.entries.retain(|(h, _)| *h != handle);
        subscribers.entries.len() != before
    }

    /// Compute a fresh snapshot without publishing it
    pub fn compute_metrics(&self) -> HealthMetricsSnapshot {
        self.shared.engine.lock().compute_metrics()
    }

    /// Compute and publish a snapshot immediately, outside the timer
    pub fn refresh_now(&self) -> HealthMetricsSnapshot {
        self.shared.refresh()
    }

    /// Most recently published snapshot
    pub fn latest_snapshot(&self) -> HealthMetricsSnapshot {
        self.shared.latest.lock().snapshot.clone()
    }

    pub fn sensor_reading(&self) -> SensorReading {
        self.shared.engine.lock().sensor_reading()
    }

    pub fn current_activity(&self) -> ActivityState {
        self.shared.engine.lock().current_activity()
    }

    pub fn total_steps(&self) -> u64 {
        self.shared.engine.lock().total_steps()
    }

    /// Most recent contract violation, if any
    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.lock().clone()
    }

    pub fn clear_error(&self) {
        *self.shared.last_error.lock() = None;
    }
}

impl Drop for MotionCore {
    fn drop(&mut self) {
        self.refresh.get_mut().stop();
        self.cadence.get_mut().stop();
    }
}
