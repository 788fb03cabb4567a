use serde::{Deserialize, Serialize};
use std::fmt;

const FALL_LABEL: &str = "fall";

/// Label assigned by the inference model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DetectionClass {
    Fall,
    Other(String),
}

impl DetectionClass {
    pub fn is_fall(&self) -> bool {
        matches!(self, DetectionClass::Fall)
    }

    pub fn as_str(&self) -> &str {
        match self {
            DetectionClass::Fall => FALL_LABEL,
            DetectionClass::Other(label) => label,
        }
    }
}

impl From<String> for DetectionClass {
    fn from(label: String) -> Self {
        if label == FALL_LABEL {
            DetectionClass::Fall
        } else {
            DetectionClass::Other(label)
        }
    }
}

impl From<&str> for DetectionClass {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<DetectionClass> for String {
    fn from(class: DetectionClass) -> Self {
        match class {
            DetectionClass::Fall => FALL_LABEL.to_string(),
            DetectionClass::Other(label) => label,
        }
    }
}

impl fmt::Display for DetectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model confidence, always within `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Result<Self, String> {
        if !value.is_finite() {
            return Err(format!("Confidence must be finite, got {}", value));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(format!("Confidence must be within [0, 1], got {}", value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Percentage with one decimal, e.g. `91.0%`
    pub fn as_percent(&self) -> String {
        format!("{:.1}%", self.0 * 100.0)
    }
}

impl TryFrom<f64> for Confidence {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// One classified object or event reported for a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: DetectionClass,
    pub confidence: Confidence,
    pub bbox: Option<BoundingBox>,
}

impl Detection {
    pub fn new(class: impl Into<DetectionClass>, confidence: Confidence) -> Self {
        Self {
            class: class.into(),
            confidence,
            bbox: None,
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn is_fall(&self) -> bool {
        self.class.is_fall()
    }
}
