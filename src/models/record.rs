use super::{AspectRatio, StylePreset};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One persisted generation. Only ever replaced whole, by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub id: String,
    pub url: String,
    pub prompt: String,
    pub text: String,
    pub style_name: String,
    pub aspect_ratio: AspectRatio,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl GeneratedImage {
    pub fn new(url: impl Into<String>, request: &IconRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.into(),
            prompt: request.style.prompt_suffix.clone(),
            text: request.text.clone(),
            style_name: request.style.name.clone(),
            aspect_ratio: request.aspect_ratio,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[derive(Debug, Clone)]
pub struct IconRequest {
    pub text: String,
    pub style: StylePreset,
    pub aspect_ratio: AspectRatio,
}

impl IconRequest {
    pub fn new(text: impl Into<String>, style: StylePreset, aspect_ratio: AspectRatio) -> Self {
        Self {
            text: text.into(),
            style,
            aspect_ratio,
        }
    }
}
