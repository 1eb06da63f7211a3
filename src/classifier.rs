//! Activity classification
//!
//! Raw samples are classified by fixed magnitude bands, then smoothed through a
//! bounded history of recent raw labels by majority vote.

use crate::config::{
    MotionConfig, DEFAULT_HISTORY_CAPACITY, DEFAULT_RUNNING_THRESHOLD, DEFAULT_WALKING_THRESHOLD,
};
use crate::types::{AccelSample, ActivityLabel, ActivityState};
use std::collections::VecDeque;
use tracing::debug;

/// Fixed-capacity FIFO of raw activity labels, oldest first
#[derive(Debug, Clone)]
pub struct ActivityHistory {
    labels: VecDeque<ActivityLabel>,
    capacity: usize,
}

impl Default for ActivityHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ActivityHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            labels: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a label, evicting the oldest entries beyond capacity
    pub fn push(&mut self, label: ActivityLabel) {
        self.labels.push_back(label);
        while self.labels.len() > self.capacity {
            self.labels.pop_front();
        }
    }

    /// Most frequent label; ties go to the label encountered first in scan order
    pub fn majority(&self) -> Option<ActivityLabel> {
        let mut best: Option<(ActivityLabel, usize)> = None;
        for (i, label) in self.labels.iter().enumerate() {
            // Only the first occurrence of a label needs counting
            if self.labels.iter().take(i).any(|seen| seen == label) {
                continue;
            }
            let count = self.labels.iter().filter(|l| *l == label).count();
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((*label, count)),
            }
        }
        best.map(|(label, _)| label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityLabel> {
        self.labels.iter()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }
}

/// Threshold classifier with majority-vote smoothing
#[derive(Debug, Clone)]
pub struct ActivityClassifier {
    walking_threshold: f64,
    running_threshold: f64,
    history: ActivityHistory,
    last_raw: Option<ActivityLabel>,
    last_transition_ms: Option<u64>,
}

impl Default for ActivityClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_WALKING_THRESHOLD,
            DEFAULT_RUNNING_THRESHOLD,
            DEFAULT_HISTORY_CAPACITY,
        )
    }
}

impl ActivityClassifier {
    pub fn new(walking_threshold: f64, running_threshold: f64, history_capacity: usize) -> Self {
        Self {
            walking_threshold,
            running_threshold,
            history: ActivityHistory::new(history_capacity),
            last_raw: None,
            last_transition_ms: None,
        }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(
            config.walking_threshold,
            config.running_threshold,
            config.history_capacity,
        )
    }

    /// Map a magnitude to its activity band (lower bounds inclusive)
    pub fn label_for_magnitude(&self, magnitude: f64) -> ActivityLabel {
        if magnitude < self.walking_threshold {
            ActivityLabel::Stationary
        } else if magnitude < self.running_threshold {
            ActivityLabel::Walking
        } else {
            ActivityLabel::Running
        }
    }

    /// Classify a sample, record transitions and update the history.
    ///
    /// Returns the raw, unsmoothed label.
    pub fn classify(&mut self, sample: &AccelSample) -> ActivityLabel {
        let magnitude = sample.magnitude();
        let label = self.label_for_magnitude(magnitude);

        if self.last_raw != Some(label) {
            debug!(
                target: "synheart_motion",
                from = ?self.last_raw,
                to = %label,
                magnitude,
                timestamp_ms = sample.timestamp_ms,
                "activity transition"
            );
            self.last_raw = Some(label);
            self.last_transition_ms = Some(sample.timestamp_ms);
        }

        self.history.push(label);
        label
    }

    /// Majority label over the history, or Unknown before the first sample
    pub fn smoothed_activity(&self) -> ActivityState {
        self.history
            .majority()
            .map(ActivityState::from)
            .unwrap_or(ActivityState::Unknown)
    }

    /// Most recent raw label
    pub fn last_raw(&self) -> Option<ActivityLabel> {
        self.last_raw
    }

    /// Timestamp of the most recent raw label change
    pub fn last_transition_ms(&self) -> Option<u64> {
        self.last_transition_ms
    }

    pub fn history(&self) -> &ActivityHistory {
        &self.history
    }

    /// Clear history and transition state; thresholds are kept
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_raw = None;
        self.last_transition_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_with_magnitude(magnitude: f32, timestamp_ms: u64) -> AccelSample {
        AccelSample::new(0.0, 0.0, magnitude, timestamp_ms)
    }

    #[test]
    fn test_threshold_bands() {
        let mut classifier = ActivityClassifier::default();

        assert_eq!(
            classifier.classify(&sample_with_magnitude(9.81, 0)),
            ActivityLabel::Stationary
        );
        assert_eq!(
            classifier.classify(&sample_with_magnitude(11.0, 10)),
            ActivityLabel::Walking
        );
        assert_eq!(
            classifier.classify(&sample_with_magnitude(15.0, 20)),
            ActivityLabel::Running
        );
    }

    #[test]
    fn test_boundaries_are_inclusive_lower_bounds() {
        let mut classifier = ActivityClassifier::default();

        // 6-8-0 has magnitude exactly 10
        let walking_edge = AccelSample::new(6.0, 8.0, 0.0, 0);
        assert_eq!(walking_edge.magnitude(), 10.0);
        assert_eq!(classifier.classify(&walking_edge), ActivityLabel::Walking);

        let running_edge = sample_with_magnitude(12.5, 10);
        assert_eq!(running_edge.magnitude(), 12.5);
        assert_eq!(classifier.classify(&running_edge), ActivityLabel::Running);
    }

    #[test]
    fn test_empty_history_is_unknown() {
        let classifier = ActivityClassifier::default();
        assert_eq!(classifier.smoothed_activity(), ActivityState::Unknown);
        assert_eq!(classifier.last_transition_ms(), None);
    }

    #[test]
    fn test_single_sample_determines_activity() {
        let mut classifier = ActivityClassifier::default();
        classifier.classify(&sample_with_magnitude(13.0, 0));
        assert_eq!(classifier.smoothed_activity(), ActivityState::Running);
    }

    #[test]
    fn test_majority_vote() {
        let mut classifier = ActivityClassifier::default();
        for (i, magnitude) in [11.0, 11.0, 13.0, 11.0, 11.0].into_iter().enumerate() {
            classifier.classify(&sample_with_magnitude(magnitude, i as u64 * 100));
        }

        assert_eq!(classifier.history().len(), 5);
        assert_eq!(classifier.smoothed_activity(), ActivityState::Walking);
    }

    #[test]
    fn test_tie_resolves_to_first_in_scan_order() {
        let mut history = ActivityHistory::new(10);
        history.push(ActivityLabel::Running);
        history.push(ActivityLabel::Walking);
        history.push(ActivityLabel::Walking);
        history.push(ActivityLabel::Running);

        assert_eq!(history.majority(), Some(ActivityLabel::Running));

        let mut history = ActivityHistory::new(10);
        history.push(ActivityLabel::Stationary);
        history.push(ActivityLabel::Walking);
        assert_eq!(history.majority(), Some(ActivityLabel::Stationary));
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = ActivityHistory::new(10);
        for _ in 0..6 {
            history.push(ActivityLabel::Running);
        }
        for _ in 0..10 {
            history.push(ActivityLabel::Walking);
        }

        assert_eq!(history.len(), 10);
        assert!(history.iter().all(|l| *l == ActivityLabel::Walking));
        assert_eq!(history.majority(), Some(ActivityLabel::Walking));
    }

    #[test]
    fn test_transition_time_recorded_only_on_change() {
        let mut classifier = ActivityClassifier::default();

        classifier.classify(&sample_with_magnitude(11.0, 100));
        assert_eq!(classifier.last_transition_ms(), Some(100));

        classifier.classify(&sample_with_magnitude(11.5, 500));
        assert_eq!(classifier.last_transition_ms(), Some(100));

        classifier.classify(&sample_with_magnitude(14.0, 900));
        assert_eq!(classifier.last_transition_ms(), Some(900));
        assert_eq!(classifier.last_raw(), Some(ActivityLabel::Running));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut classifier = ActivityClassifier::default();
        classifier.classify(&sample_with_magnitude(13.0, 0));
        classifier.reset();

        assert!(classifier.history().is_empty());
        assert_eq!(classifier.smoothed_activity(), ActivityState::Unknown);
        assert_eq!(classifier.last_raw(), None);
        assert_eq!(classifier.last_transition_ms(), None);
    }
}
