//! Synheart Motion - On-device activity and step metrics from raw accelerometer samples
//!
//! Motion turns a stream of triaxial accelerometer samples (and, when present, a
//! hardware step counter) into a classified activity, a cumulative step count and
//! derived health metrics: sample ingest → activity classification → step
//! counting → metrics aggregation, published once per second.
//!
//! ## Modules
//!
//! - **Engine**: synchronous single-owner state, usable directly for replay
//! - **Monitor**: thread-safe `MotionCore` handle with the 1 Hz refresh scheduler and subscribers
//! - **Replay**: deterministic offline replay of recorded sample logs

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod replay;
pub mod scheduler;
pub mod sensors;
pub mod steps;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{HeartRateMode, MotionConfig};
pub use engine::MotionEngine;
pub use error::MotionError;
pub use monitor::{MotionCore, SubscriptionHandle};
pub use replay::{parse_ndjson, replay, ReplayEvent, ReplayRecord, ReplaySession};
pub use sensors::{available_sensor_labels, ExtraSensor, SensorCapabilities};
pub use types::{
    AccelSample, ActivityLabel, ActivityState, HealthMetricsSnapshot, SensorReading, StepMode,
};

/// Motion version embedded in FFI and CLI output
pub const MOTION_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for published payloads
pub const PRODUCER_NAME: &str = "synheart-motion";
