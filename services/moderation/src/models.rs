//! Data models for the moderation service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Upload/processing lifecycle of a video asset. Transitions are
/// forward-only: uploaded -> processing -> completed | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestState {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl IngestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestState::Uploaded => "uploaded",
            IngestState::Processing => "processing",
            IngestState::Completed => "completed",
            IngestState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "uploaded" => Ok(IngestState::Uploaded),
            "processing" => Ok(IngestState::Processing),
            "completed" => Ok(IngestState::Completed),
            "failed" => Ok(IngestState::Failed),
            other => Err(format!("unknown ingest state: {}", other)),
        }
    }
}

/// Moderation verdict axis. `Pending` is the only non-terminal value and
/// is replaced exactly once by the background pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationState {
    Pending,
    Safe,
    Flagged,
    Review,
}

impl ModerationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationState::Pending => "pending",
            ModerationState::Safe => "safe",
            ModerationState::Flagged => "flagged",
            ModerationState::Review => "review",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "pending" => Ok(ModerationState::Pending),
            "safe" => Ok(ModerationState::Safe),
            "flagged" => Ok(ModerationState::Flagged),
            "review" => Ok(ModerationState::Review),
            other => Err(format!("unknown moderation state: {}", other)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ModerationState::Pending)
    }

    /// Gallery visibility projection: flagged content is hidden, content
    /// under review stays visible.
    pub fn visible(&self) -> bool {
        !matches!(self, ModerationState::Flagged)
    }
}

/// One uploaded video and its moderation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAsset {
    pub id: Uuid,
    pub storage_ref: String,
    pub duration_seconds: f64,
    pub original_name: Option<String>,
    pub format: Option<String>,
    pub ingest_state: IngestState,
    pub moderation_state: ModerationState,
    pub moderation_score: f64,
    pub moderation_reason: String,
    pub detected_labels: Vec<String>,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the upload collaborator when registering an asset
#[derive(Debug, Clone, Deserialize)]
pub struct NewAsset {
    pub storage_ref: String,
    /// Best-effort duration; zero or missing means the storage backend has
    /// not finished transcoding yet.
    pub duration_seconds: Option<f64>,
    pub original_name: Option<String>,
    pub format: Option<String>,
}

/// Status projection returned to polling clients
#[derive(Debug, Clone, Serialize)]
pub struct AssetStatus {
    pub ingest_state: IngestState,
    pub moderation_state: ModerationState,
    pub moderation_reason: String,
}

/// One sampled still image, written to the frame scratch directory for the
/// lifetime of a single pipeline run
#[derive(Debug, Clone)]
pub struct FrameSample {
    pub timestamp_seconds: f64,
    pub image_path: PathBuf,
}

/// One labeled object found by the analyzer in one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
}

/// Wire payload produced by the analyzer service for one frame
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerOutput {
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub sensitive_detections: Vec<Detection>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Per-frame analysis result fed into the aggregator
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub timestamp_seconds: f64,
    pub detections: Vec<Detection>,
}

/// Aggregate moderation decision for one asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub status: ModerationState,
    pub score: f64,
    pub reason: String,
    pub labels: Vec<String>,
}

impl Verdict {
    /// Degraded-but-terminal outcome used when the pipeline cannot produce
    /// real evidence (analyzer missing, no frames, unexpected error).
    pub fn safe_with_reason(reason: impl Into<String>) -> Self {
        Self {
            status: ModerationState::Safe,
            score: 0.0,
            reason: reason.into(),
            labels: Vec::new(),
        }
    }
}
