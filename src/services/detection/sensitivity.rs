// Sensitivity utilities
// Sensitivity gates which scored candidates survive as detections; it never changes the scores.

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl DetectionSensitivity {
    pub fn from_str(val: &str) -> Self {
        match val.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Minimum confidence a candidate needs to become a detection
    pub fn min_confidence(self) -> f64 {
        match self {
            Self::Low => 0.60,
            Self::Medium => 0.40,
            Self::High => 0.0,
        }
    }

    pub fn accepts(self, confidence: f64) -> bool {
        confidence >= self.min_confidence()
    }
}
