use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Latest annotated frame; superseded by the next successful poll
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// JPEG bytes
    pub image: Bytes,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: impl Into<Bytes>, captured_at: DateTime<Utc>) -> Self {
        Self {
            image: image.into(),
            captured_at,
        }
    }

    pub fn len(&self) -> usize {
        self.image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode(&self.image))
    }
}
