//! Frame sampler
//!
//! Computes a deterministic, duration-tiered set of timestamps for a
//! stored video and materializes one image per timestamp in the frame
//! scratch directory. Sampling never fails a pipeline run because of one
//! bad frame: fetch failures are logged and the timestamp is dropped.

use crate::config::{SamplingConfig, SamplingTier};
use crate::models::FrameSample;
use crate::storage::FrameStorage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct FrameSampler {
    storage: Arc<dyn FrameStorage>,
    config: SamplingConfig,
    frames_dir: PathBuf,
}

impl FrameSampler {
    pub fn new(storage: Arc<dyn FrameStorage>, config: SamplingConfig, frames_dir: PathBuf) -> Self {
        Self {
            storage,
            config,
            frames_dir,
        }
    }

    /// Resolve the sampling tier for a duration, substituting the fallback
    /// duration when the backend has not reported one yet. Returns the
    /// effective duration, the sampling interval, and the frame count.
    fn plan(&self, duration_seconds: f64) -> (f64, f64, usize) {
        let duration = if duration_seconds > 0.0 {
            duration_seconds
        } else {
            self.config.fallback_duration_seconds
        };

        // Catch-all in case the configured tier list is empty.
        const LONGEST_TIER: SamplingTier = SamplingTier {
            max_duration_seconds: f64::INFINITY,
            interval_seconds: 15.0,
            max_frames: 20,
        };

        let tier = self
            .config
            .tiers
            .iter()
            .find(|t| duration <= t.max_duration_seconds)
            .or_else(|| self.config.tiers.last())
            .copied()
            .unwrap_or(LONGEST_TIER);

        let num_frames = tier
            .max_frames
            .min((duration / tier.interval_seconds).floor() as usize + 1);

        (duration, tier.interval_seconds, num_frames)
    }

    /// Compute the timestamp sequence for a video: `min(i * interval,
    /// duration - 1)` clamped at zero, monotonically non-decreasing.
    pub fn timestamps(&self, duration_seconds: f64) -> Vec<f64> {
        let (duration, interval, num_frames) = self.plan(duration_seconds);

        (0..num_frames)
            .map(|i| (i as f64 * interval).min(duration - 1.0).max(0.0))
            .collect()
    }

    /// Fetch one image per timestamp. Returns the frames that could be
    /// retrieved; an empty vec is a valid outcome, not an error.
    pub async fn sample(&self, storage_ref: &str, duration_seconds: f64) -> Vec<FrameSample> {
        let timestamps = self.timestamps(duration_seconds);

        info!(
            "Extracting {} frames from {:.1}s video",
            timestamps.len(),
            duration_seconds
        );

        if let Err(e) = tokio::fs::create_dir_all(&self.frames_dir).await {
            warn!("Failed to create frame scratch directory: {}", e);
            return Vec::new();
        }

        let mut frames = Vec::with_capacity(timestamps.len());

        for (index, &timestamp) in timestamps.iter().enumerate() {
            match self.storage.fetch_frame(storage_ref, timestamp).await {
                Ok(bytes) => {
                    let image_path = self
                        .frames_dir
                        .join(format!("frame_{}s_{}_{}.jpg", timestamp, Uuid::new_v4(), index));

                    match tokio::fs::write(&image_path, &bytes).await {
                        Ok(()) => frames.push(FrameSample {
                            timestamp_seconds: timestamp,
                            image_path,
                        }),
                        Err(e) => {
                            warn!("Failed to write frame at {}s: {}", timestamp, e);
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to extract frame at {}s: {}", timestamp, e);
                }
            }
        }

        info!(
            "Extracted {}/{} frames for {}",
            frames.len(),
            timestamps.len(),
            storage_ref
        );

        frames
    }

    /// Remove the scratch images of one pipeline run. Called on both the
    /// success and failure paths; removal failures are logged, never
    /// propagated.
    pub async fn cleanup(&self, frames: &[FrameSample]) {
        for frame in frames {
            if let Err(e) = tokio::fs::remove_file(&frame.image_path).await {
                warn!(
                    "Failed to delete frame file {}: {}",
                    frame.image_path.display(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ModerationError, ModerationResult};
    use async_trait::async_trait;

    struct NoFrames;

    #[async_trait]
    impl FrameStorage for NoFrames {
        async fn fetch_frame(
            &self,
            _storage_ref: &str,
            timestamp_seconds: f64,
        ) -> ModerationResult<Vec<u8>> {
            Err(ModerationError::StorageFetch {
                timestamp_seconds,
                message: "not found".to_string(),
            })
        }
    }

    fn sampler() -> FrameSampler {
        FrameSampler::new(
            Arc::new(NoFrames),
            SamplingConfig::default(),
            std::env::temp_dir().join("sampler_tests"),
        )
    }

    #[test]
    fn test_tier_selection() {
        let sampler = sampler();

        // (duration, expected interval, expected frame count)
        let cases = [
            (6.0, 2.0, 4),
            (10.0, 2.0, 5),
            (25.0, 3.0, 9),
            (45.0, 5.0, 10),
            (60.0, 5.0, 12),
            (120.0, 10.0, 13),
            (600.0, 15.0, 20),
        ];

        for (duration, interval, count) in cases {
            let (_, planned_interval, planned_count) = sampler.plan(duration);
            assert_eq!(planned_interval, interval, "interval for {}s", duration);
            assert_eq!(planned_count, count, "frame count for {}s", duration);
        }
    }

    #[test]
    fn test_unknown_duration_uses_fallback() {
        let sampler = sampler();

        for duration in [0.0, -1.0] {
            let timestamps = sampler.timestamps(duration);
            assert!(!timestamps.is_empty());
            // Fallback is 30s: every 3s, 10 frames.
            assert_eq!(timestamps.len(), 10);
            assert_eq!(timestamps[0], 0.0);
        }
    }

    #[test]
    fn test_45s_video_timestamps() {
        let sampler = sampler();
        let timestamps = sampler.timestamps(45.0);

        assert_eq!(
            timestamps,
            vec![0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 44.0]
        );
    }

    #[test]
    fn test_timestamps_monotonic_and_clamped() {
        let sampler = sampler();

        for duration in [0.5, 3.0, 29.0, 61.0, 179.0, 500.0] {
            let timestamps = sampler.timestamps(duration);
            assert!(!timestamps.is_empty(), "no timestamps for {}s", duration);
            for pair in timestamps.windows(2) {
                assert!(pair[0] <= pair[1]);
            }
            for &t in &timestamps {
                assert!(t >= 0.0);
            }
        }
    }

    #[tokio::test]
    async fn test_all_fetches_failing_yields_empty_sequence() {
        let sampler = sampler();
        let frames = sampler.sample("https://cdn.example/video.mp4", 45.0).await;
        assert!(frames.is_empty());
    }
}
