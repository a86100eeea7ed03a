//! Requested clip windows.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// A `[start, end)` window of the source video, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl Segment {
    /// Create a validated segment.
    pub fn new(start: f64, end: f64) -> ModelResult<Self> {
        let segment = Self { start, end };
        segment.check().map_err(|reason| ModelError::invalid_segment(0, reason))?;
        Ok(segment)
    }

    /// Duration in seconds (`end - start`).
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Start time in whole milliseconds.
    pub fn start_ms(&self) -> i64 {
        (self.start * 1000.0).round() as i64
    }

    /// End time in whole milliseconds.
    pub fn end_ms(&self) -> i64 {
        (self.end * 1000.0).round() as i64
    }

    /// Validate the window, reporting `index` in the error.
    pub fn validate(&self, index: usize) -> ModelResult<()> {
        self.check()
            .map_err(|reason| ModelError::invalid_segment(index, reason))
    }

    fn check(&self) -> Result<(), &'static str> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err("start and end must be finite numbers");
        }
        if self.start < 0.0 {
            return Err("start must not be negative");
        }
        if self.end <= self.start {
            return Err("end must be greater than start");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let segment = Segment::new(10.0, 12.5).unwrap();
        assert!((segment.duration() - 2.5).abs() < f64::EPSILON);
        assert_eq!(segment.start_ms(), 10_000);
        assert_eq!(segment.end_ms(), 12_500);
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        assert!(Segment::new(5.0, 5.0).is_err());
        assert!(Segment::new(5.0, 4.0).is_err());
        assert!(Segment::new(-1.0, 4.0).is_err());
        assert!(Segment::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_reports_index() {
        let segment = Segment { start: 3.0, end: 1.0 };
        match segment.validate(7) {
            Err(ModelError::InvalidSegment { index, .. }) => assert_eq!(index, 7),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
