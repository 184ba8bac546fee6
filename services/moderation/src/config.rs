//! Configuration for the moderation service
//!
//! All policy constants (sampling tiers, aggregation thresholds, analyzer
//! command and timeout) live in explicit config structs constructed from
//! environment variables, following the `DatabaseConfig::from_env` pattern
//! used across the platform.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// One row of the duration-tiered sampling policy: videos up to
/// `max_duration_seconds` are sampled every `interval_seconds`, capped at
/// `max_frames` frames.
#[derive(Debug, Clone, Copy)]
pub struct SamplingTier {
    pub max_duration_seconds: f64,
    pub interval_seconds: f64,
    pub max_frames: usize,
}

/// Frame sampling policy
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Tiers ordered by ascending duration bound; the last tier is the
    /// catch-all for anything longer.
    pub tiers: Vec<SamplingTier>,
    /// Substituted when the storage backend reports an unknown or zero
    /// duration.
    pub fallback_duration_seconds: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                SamplingTier {
                    max_duration_seconds: 10.0,
                    interval_seconds: 2.0,
                    max_frames: 5,
                },
                SamplingTier {
                    max_duration_seconds: 30.0,
                    interval_seconds: 3.0,
                    max_frames: 10,
                },
                SamplingTier {
                    max_duration_seconds: 60.0,
                    interval_seconds: 5.0,
                    max_frames: 12,
                },
                SamplingTier {
                    max_duration_seconds: 180.0,
                    interval_seconds: 10.0,
                    max_frames: 18,
                },
                SamplingTier {
                    max_duration_seconds: f64::INFINITY,
                    interval_seconds: 15.0,
                    max_frames: 20,
                },
            ],
            fallback_duration_seconds: 30.0,
        }
    }
}

/// Thresholds and label set driving verdict aggregation
#[derive(Debug, Clone)]
pub struct AggregationPolicy {
    /// Labels that contribute to risk scoring (weapon classes)
    pub sensitive_labels: Vec<String>,
    /// Minimum confidence for a sensitive detection to count as
    /// weapon-grade
    pub weapon_grade_confidence: f64,
    /// Weapon-grade max confidence above which the asset is flagged
    pub flag_confidence: f64,
    /// Weapon-grade max confidence above which the asset goes to review
    pub review_confidence: f64,
    /// Fraction of sensitive frames above which the asset goes to review
    pub sensitive_ratio_threshold: f64,
    /// Cap applied to the flagged score
    pub max_score: f64,
    /// Multiplier on the max confidence for the weapon-review score
    pub review_score_factor: f64,
    /// Multiplier on the sensitive-frame ratio for the ratio-review score
    pub ratio_score_factor: f64,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            sensitive_labels: vec![
                "knife".to_string(),
                "gun".to_string(),
                "pistol".to_string(),
                "rifle".to_string(),
            ],
            weapon_grade_confidence: 0.6,
            flag_confidence: 0.7,
            review_confidence: 0.3,
            sensitive_ratio_threshold: 0.3,
            max_score: 0.9,
            review_score_factor: 0.7,
            ratio_score_factor: 0.5,
        }
    }
}

/// Analyzer subprocess configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Interpreter used to run the analyzer script
    pub command: String,
    /// Path to the analyzer entry point; its existence is the
    /// availability precondition for a pipeline run
    pub script_path: PathBuf,
    /// Deadline for a single frame analysis
    pub timeout: Duration,
}

impl AnalyzerConfig {
    pub fn from_env() -> Self {
        let command = env::var("ANALYZER_COMMAND").unwrap_or_else(|_| "python3".to_string());
        let script_path = env::var("ANALYZER_SCRIPT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("analyzer_service/app.py"));
        let timeout_seconds = env::var("ANALYZER_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Self {
            command,
            script_path,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }
}

/// Top-level configuration for the moderation service
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Address the HTTP boundary listens on
    pub bind_addr: String,
    /// Scratch directory for downloaded frame images
    pub frames_dir: PathBuf,
    pub analyzer: AnalyzerConfig,
    pub sampling: SamplingConfig,
    pub aggregation: AggregationPolicy,
}

impl ModerationConfig {
    pub fn from_env() -> Self {
        let bind_addr =
            env::var("MODERATION_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3002".to_string());
        let frames_dir = env::var("FRAMES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("pulsegen_frames"));

        Self {
            bind_addr,
            frames_dir,
            analyzer: AnalyzerConfig::from_env(),
            sampling: SamplingConfig::default(),
            aggregation: AggregationPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_sampling_tiers_cover_all_durations() {
        let config = SamplingConfig::default();
        assert_eq!(config.tiers.len(), 5);
        assert!(config.tiers.last().unwrap().max_duration_seconds.is_infinite());

        let mut previous = 0.0;
        for tier in &config.tiers {
            assert!(tier.max_duration_seconds > previous);
            previous = tier.max_duration_seconds;
        }
    }

    #[test]
    #[serial]
    fn test_analyzer_config_defaults() {
        unsafe {
            std::env::remove_var("ANALYZER_COMMAND");
            std::env::remove_var("ANALYZER_SCRIPT_PATH");
            std::env::remove_var("ANALYZER_TIMEOUT_SECONDS");
        }

        let config = AnalyzerConfig::from_env();
        assert_eq!(config.command, "python3");
        assert_eq!(config.script_path, PathBuf::from("analyzer_service/app.py"));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
