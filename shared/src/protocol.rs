use serde::{Deserialize, Serialize};

/// Status reported by `/live/start` and `/live/stop`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LiveStatus {
    Success,
    AlreadyRunning,
    Stopped,
    NotRunning,
    Error,
    /// Any status string the service may add later
    Other(String),
}

impl From<String> for LiveStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "success" => Self::Success,
            "already_running" => Self::AlreadyRunning,
            "stopped" => Self::Stopped,
            "not_running" => Self::NotRunning,
            "error" => Self::Error,
            _ => Self::Other(raw),
        }
    }
}

impl From<LiveStatus> for String {
    fn from(status: LiveStatus) -> Self {
        match status {
            LiveStatus::Success => "success".to_string(),
            LiveStatus::AlreadyRunning => "already_running".to_string(),
            LiveStatus::Stopped => "stopped".to_string(),
            LiveStatus::NotRunning => "not_running".to_string(),
            LiveStatus::Error => "error".to_string(),
            LiveStatus::Other(raw) => raw,
        }
    }
}

/// Body of `/live/start` and `/live/stop`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: LiveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    /// Human readable reason, falling back to the raw status
    pub fn reason(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| String::from(self.status.clone()))
    }
}

/// Body of `/live/frame`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePayload {
    /// Annotated JPEG, base64 on the wire
    #[serde(with = "base64_serde")]
    pub frame: Vec<u8>,
    pub detections: Vec<WireDetection>,
    /// ISO-8601, not always carrying an offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireDetection {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f64,
    /// `[x1, y1, x2, y2]` in frame pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f32; 4]>,
}

/// Body of `/live/stream-url`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamUrlResponse {
    #[serde(alias = "rtsp_url")]
    pub url: String,
}

/// Error body returned with a non-2xx status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// Helper module for base64 encoding/decoding with serde
mod base64_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use base64::{engine::general_purpose::STANDARD, Engine};
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use base64::{engine::general_purpose::STANDARD, Engine};
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.trim()).map_err(serde::de::Error::custom)
    }
}
