//! Moderation orchestrator
//!
//! Drives the per-asset pipeline: the ingest path persists the initial
//! record and returns immediately, then one spawned background task per
//! asset samples frames, analyzes each one, aggregates a verdict, and
//! performs the atomic terminal write. Every analysis failure is absorbed
//! into a degraded terminal verdict; an asset is never left permanently
//! pending by this component.

use crate::aggregator::aggregate;
use crate::analyzer::Analyzer;
use crate::config::AggregationPolicy;
use crate::error::ModerationResult;
use crate::models::{FrameAnalysis, FrameSample, NewAsset, Verdict, VideoAsset};
use crate::sampler::FrameSampler;
use crate::store::StatusStore;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ModerationOrchestrator {
    store: Arc<dyn StatusStore>,
    sampler: Arc<FrameSampler>,
    analyzer: Arc<dyn Analyzer>,
    policy: AggregationPolicy,
}

impl ModerationOrchestrator {
    pub fn new(
        store: Arc<dyn StatusStore>,
        sampler: Arc<FrameSampler>,
        analyzer: Arc<dyn Analyzer>,
        policy: AggregationPolicy,
    ) -> Self {
        Self {
            store,
            sampler,
            analyzer,
            policy,
        }
    }

    /// Register a new asset and schedule its moderation pipeline. The
    /// returned record is immediately readable; the caller never waits on
    /// the background task.
    pub async fn ingest(&self, new: NewAsset) -> ModerationResult<VideoAsset> {
        let asset = self.store.create(&new).await?;

        info!(asset_id = %asset.id, "Video registered, scheduling content analysis");

        let orchestrator = self.clone();
        let id = asset.id;
        let storage_ref = asset.storage_ref.clone();
        let duration = asset.duration_seconds;

        tokio::spawn(async move {
            orchestrator.run_pipeline(id, &storage_ref, duration).await;
        });

        Ok(asset)
    }

    /// One full pipeline run. Always ends in a terminal write attempt and
    /// unconditional frame cleanup.
    async fn run_pipeline(&self, id: Uuid, storage_ref: &str, duration_seconds: f64) {
        if let Err(e) = self.store.mark_processing(id).await {
            error!(asset_id = %id, "Failed to mark asset processing: {}", e);
            if let Err(e) = self.store.mark_failed(id, "persistence error").await {
                error!(asset_id = %id, "Failed to mark asset failed: {}", e);
            }
            return;
        }

        let mut frames: Vec<FrameSample> = Vec::new();

        let verdict = match self
            .analyze_asset(storage_ref, duration_seconds, &mut frames)
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(asset_id = %id, "Content analysis failed: {}", e);
                Verdict::safe_with_reason(format!("Analysis error: {}", e))
            }
        };

        info!(
            asset_id = %id,
            status = verdict.status.as_str(),
            score = verdict.score,
            "Content analysis finished"
        );

        // The terminal-write failure path is deliberately unretried; the
        // asset stays non-terminal and the error is surfaced in the logs.
        if let Err(e) = self.store.complete_with_verdict(id, &verdict).await {
            error!(
                asset_id = %id,
                "Terminal status write failed, asset left non-terminal: {}", e
            );
        }

        self.sampler.cleanup(&frames).await;
    }

    /// Produce a verdict for one asset. Frames sampled along the way are
    /// reported through `frames_out` so the caller can release them on
    /// every exit path.
    async fn analyze_asset(
        &self,
        storage_ref: &str,
        duration_seconds: f64,
        frames_out: &mut Vec<FrameSample>,
    ) -> ModerationResult<Verdict> {
        // Pipeline-wide precondition: no point sampling frames nobody can
        // analyze.
        if !self.analyzer.is_available() {
            warn!("Analyzer service unavailable, skipping content analysis");
            return Ok(Verdict::safe_with_reason("analyzer service not configured"));
        }

        let frames = self.sampler.sample(storage_ref, duration_seconds).await;
        *frames_out = frames.clone();

        if frames.is_empty() {
            return Ok(Verdict::safe_with_reason("frame extraction failed"));
        }

        let total = frames.len();
        let mut analyses: Vec<FrameAnalysis> = Vec::with_capacity(total);

        for (index, frame) in frames.into_iter().enumerate() {
            let detections = match self.analyzer.analyze(&frame.image_path).await {
                Ok(detections) => {
                    info!("Frame {}/{} analyzed", index + 1, total);
                    detections
                }
                Err(e) => {
                    // A failed frame contributes no detections; the run
                    // continues with the remaining frames.
                    warn!("Frame {}/{} failed: {}", index + 1, total, e);
                    Vec::new()
                }
            };

            analyses.push(FrameAnalysis {
                timestamp_seconds: frame.timestamp_seconds,
                detections,
            });
        }

        Ok(aggregate(&analyses, &self.policy))
    }
}
