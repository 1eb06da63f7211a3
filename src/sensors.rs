//! Sensor capability report
//!
//! Formats caller-supplied capability flags into the ordered list of sensor
//! labels shown by the presentation layer. The core never probes hardware.

use serde::{Deserialize, Serialize};

/// Optional sensors reported after the core set, in discovery order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraSensor {
    Gyroscope,
    Light,
    Proximity,
}

impl ExtraSensor {
    pub fn label(&self) -> &'static str {
        match self {
            ExtraSensor::Gyroscope => "Gyroscope",
            ExtraSensor::Light => "Light Sensor",
            ExtraSensor::Proximity => "Proximity Sensor",
        }
    }
}

/// Sensors the caller found on the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorCapabilities {
    pub heart_rate: bool,
    pub step_counter: bool,
    pub accelerometer: bool,
    /// Extra sensors in the order they were discovered
    pub extras: Vec<ExtraSensor>,
}

/// Ordered labels: Heart Rate, Step Counter variant, Accelerometer, then extras
pub fn available_sensor_labels(capabilities: &SensorCapabilities) -> Vec<String> {
    let mut labels = Vec::with_capacity(3 + capabilities.extras.len());

    if capabilities.heart_rate {
        labels.push("Heart Rate".to_string());
    }
    if capabilities.step_counter {
        labels.push("Step Counter".to_string());
    } else {
        labels.push("Step Counter (Simulated)".to_string());
    }
    if capabilities.accelerometer {
        labels.push("Accelerometer".to_string());
    }
    labels.extend(capabilities.extras.iter().map(|s| s.label().to_string()));

    labels
}
