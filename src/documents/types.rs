//! Request and result types shared by the facade and its callers.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::options::OptionMap;
use crate::providers::ExtractedText;

/// Uniform result of an operation that writes an artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultDescriptor {
    pub success: bool,
    pub path: PathBuf,
    /// Operation-specific fields, flattened into the JSON object.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResultDescriptor {
    pub fn new(path: PathBuf) -> Self {
        Self {
            success: true,
            path,
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Page count reported by merge and watermark results.
    pub fn pages(&self) -> Option<u64> {
        self.extra.get("pages").and_then(Value::as_u64)
    }
}

/// One PDF in the output directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactInfo {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Watermark appearance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatermarkOptions {
    pub opacity: f32,
    pub font_size: f32,
    pub rotation_degrees: f32,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            opacity: 0.3,
            font_size: 50.0,
            rotation_degrees: 45.0,
        }
    }
}

impl WatermarkOptions {
    /// Clamp opacity into 0..=1 and replace unusable values with defaults.
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            opacity: if self.opacity.is_finite() {
                self.opacity.clamp(0.0, 1.0)
            } else {
                defaults.opacity
            },
            font_size: if self.font_size.is_finite() && self.font_size > 0.0 {
                self.font_size
            } else {
                defaults.font_size
            },
            rotation_degrees: if self.rotation_degrees.is_finite() {
                self.rotation_degrees
            } else {
                defaults.rotation_degrees
            },
        }
    }
}

/// A single facade operation with its inputs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum OperationRequest {
    #[serde(rename_all = "camelCase")]
    RenderHtml {
        markup: String,
        destination: String,
        #[serde(default)]
        options: OptionMap,
    },
    #[serde(rename_all = "camelCase")]
    RenderText {
        text: String,
        destination: String,
        #[serde(default)]
        options: OptionMap,
    },
    #[serde(rename_all = "camelCase")]
    Merge {
        sources: Vec<PathBuf>,
        destination: String,
    },
    #[serde(rename_all = "camelCase")]
    ExtractText { source: PathBuf },
    #[serde(rename_all = "camelCase")]
    Watermark {
        source: PathBuf,
        text: String,
        destination: String,
        #[serde(default)]
        options: WatermarkOptions,
    },
}

impl OperationRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RenderHtml { .. } => "render_html",
            Self::RenderText { .. } => "compose_text",
            Self::Merge { .. } => "merge",
            Self::ExtractText { .. } => "extract_text",
            Self::Watermark { .. } => "apply_watermark",
        }
    }
}

/// What an executed operation produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationOutcome {
    Written(ResultDescriptor),
    Extracted(ExtractedText),
}
