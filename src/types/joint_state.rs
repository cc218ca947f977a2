use crate::types::JointVector;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Shared handle between the joint-feedback listener and the control side.
///
/// The feedback channel carries at least 6 values; the first 6 are taken as
/// the sensed joint vector. Lock scope is limited to the copy on both sides.
#[derive(Clone, Default)]
pub struct JointFeedbackChannel {
    inner: Arc<Mutex<JointVector>>,
}

impl JointFeedbackChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the sensed joint vector from a raw feedback message.
    /// Messages with fewer than 6 values are dropped.
    pub fn update(&self, positions: &[f64]) {
        if positions.len() < 6 {
            warn!(
                "joint feedback carried {} values, expected at least 6; dropped",
                positions.len()
            );
            return;
        }
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        for i in 0..6 {
            guard[i] = positions[i];
        }
    }

    /// Copy of the latest sensed joint vector.
    pub fn snapshot(&self) -> JointVector {
        let guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        *guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_takes_first_six() {
        let channel = JointFeedbackChannel::new();
        channel.update(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 99.0, 99.0]);

        let sensed = channel.snapshot();
        assert_eq!(sensed[0], 0.1);
        assert_eq!(sensed[5], 0.6);
    }

    #[test]
    fn test_short_feedback_dropped() {
        let channel = JointFeedbackChannel::new();
        channel.update(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        channel.update(&[7.0, 7.0]);

        let sensed = channel.snapshot();
        assert_eq!(sensed[0], 0.1);
        assert_eq!(sensed[5], 0.6);
    }
}
