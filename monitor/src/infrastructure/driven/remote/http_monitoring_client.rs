use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use shared::{ErrorDetail, FramePayload, LiveStatus, StatusResponse, StreamUrlResponse};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::application::ports::{
    FrameSample, MonitoringServicePort, StartOutcome, StopOutcome,
};
use crate::application::MonitorError;
use crate::domain::value_objects::{BoundingBox, Confidence, Detection, Frame};

const START_PATH: &str = "live/start";
const STOP_PATH: &str = "live/stop";
const FRAME_PATH: &str = "live/frame";
const STREAM_URL_PATH: &str = "live/stream-url";

/// reqwest adapter for the remote `/live/*` endpoints
pub struct HttpMonitoringClient {
    client: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpMonitoringClient {
    /// `base_url` should end with `/`; endpoint paths are joined beneath it
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| MonitorError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &'static str) -> Result<T, MonitorError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| MonitorError::Transport(format!("Invalid endpoint {}: {}", path, e)))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(path, e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(path, e))?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorDetail>(&body)
                .map(|d| d.detail)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).trim().to_string());
            debug!("GET {} answered {}: {}", path, status, detail);
            return Err(MonitorError::RemoteRejected(format!(
                "{} {}",
                status.as_u16(),
                detail
            )));
        }

        serde_json::from_slice(&body)
            .map_err(|e| MonitorError::MalformedPayload(format!("{}: {}", path, e)))
    }

    fn transport_error(&self, operation: &'static str, e: reqwest::Error) -> MonitorError {
        if e.is_timeout() {
            MonitorError::Timeout {
                operation,
                after: self.request_timeout,
            }
        } else {
            MonitorError::Transport(format!("{}: {}", operation, e))
        }
    }
}

#[async_trait]
impl MonitoringServicePort for HttpMonitoringClient {
    async fn start(&self) -> Result<StartOutcome, MonitorError> {
        let response: StatusResponse = self.get_json(START_PATH).await?;
        Ok(match response.status {
            LiveStatus::Success => StartOutcome::Started,
            LiveStatus::AlreadyRunning => StartOutcome::AlreadyRunning,
            _ => StartOutcome::Rejected(response.reason()),
        })
    }

    async fn stop(&self) -> Result<StopOutcome, MonitorError> {
        let response: StatusResponse = self.get_json(STOP_PATH).await?;
        Ok(match response.status {
            LiveStatus::Stopped | LiveStatus::Success => StopOutcome::Stopped,
            LiveStatus::NotRunning => StopOutcome::NotRunning,
            _ => StopOutcome::Rejected(response.reason()),
        })
    }

    async fn poll_frame(&self) -> Result<FrameSample, MonitorError> {
        let payload: FramePayload = self.get_json(FRAME_PATH).await?;
        frame_sample_from_payload(payload, Utc::now())
    }

    async fn stream_url(&self) -> Result<String, MonitorError> {
        let response: StreamUrlResponse = self.get_json(STREAM_URL_PATH).await?;
        Ok(response.url)
    }
}

/// Validates a wire payload. `received_at` stands in for a missing or
/// unreadable timestamp.
pub fn frame_sample_from_payload(
    payload: FramePayload,
    received_at: DateTime<Utc>,
) -> Result<FrameSample, MonitorError> {
    if payload.frame.is_empty() {
        return Err(MonitorError::MalformedPayload("empty frame".to_string()));
    }

    let detections = payload
        .detections
        .into_iter()
        .map(|wire| {
            let confidence =
                Confidence::new(wire.confidence).map_err(MonitorError::MalformedPayload)?;
            let detection = Detection::new(wire.class_name, confidence);
            Ok(match wire.bbox {
                Some(bbox) => detection.with_bbox(BoundingBox::from(bbox)),
                None => detection,
            })
        })
        .collect::<Result<Vec<_>, MonitorError>>()?;

    let captured_at = payload
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(received_at);

    Ok(FrameSample {
        frame: Frame::new(payload.frame, captured_at),
        detections,
    })
}

/// RFC 3339, or a naive ISO-8601 timestamp read as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
