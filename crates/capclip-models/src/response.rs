//! The `/process` response shape.

use serde::{Deserialize, Serialize};

/// A published clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    /// Segment index (or the caller's `output_index`)
    pub segment: usize,
    pub url: String,
    /// Requested duration in seconds
    pub duration: f64,
}

/// A segment that was requested but not published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentFailureReport {
    pub segment: usize,
    pub stage: String,
    pub error: String,
}

/// Successful (possibly partial) run outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub results: Vec<SegmentResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SegmentFailureReport>,
}

impl ProcessResponse {
    pub fn new(results: Vec<SegmentResult>, failures: Vec<SegmentFailureReport>) -> Self {
        Self {
            success: true,
            results,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_omitted_when_empty() {
        let response = ProcessResponse::new(
            vec![SegmentResult {
                segment: 0,
                url: "https://cdn.example.com/segment_0_a.mp4".to_string(),
                duration: 5.0,
            }],
            Vec::new(),
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["results"][0]["segment"], 0);
        assert_eq!(value["results"][0]["duration"], 5.0);
        assert!(value.get("failures").is_none());
    }
}
