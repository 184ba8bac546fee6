//! Verdict aggregator
//!
//! Folds the per-frame detections of one pipeline run into a single
//! file-level verdict. This is a pure, threshold-based classifier: the
//! same input always produces the identical verdict, and every threshold
//! comes from [`AggregationPolicy`].

use crate::config::AggregationPolicy;
use crate::models::{FrameAnalysis, ModerationState, Verdict};

/// Aggregate per-frame detections into one verdict.
///
/// Absence of evidence is treated as absence of risk: an empty input
/// sequence (no frames could be sampled or analyzed) yields a safe
/// verdict, not an inferred danger.
pub fn aggregate(frames: &[FrameAnalysis], policy: &AggregationPolicy) -> Verdict {
    if frames.is_empty() {
        return Verdict::safe_with_reason("no frames available");
    }

    let total_frames = frames.len();
    let mut sensitive_frame_count = 0usize;
    let mut labels: Vec<String> = Vec::new();
    let mut weapon_count = 0usize;
    let mut max_confidence = 0.0f64;

    for frame in frames {
        let mut frame_is_sensitive = false;

        for detection in &frame.detections {
            if !policy.sensitive_labels.contains(&detection.label) {
                continue;
            }

            frame_is_sensitive = true;
            if !labels.contains(&detection.label) {
                labels.push(detection.label.clone());
            }

            if detection.confidence > policy.weapon_grade_confidence {
                weapon_count += 1;
                if detection.confidence > max_confidence {
                    max_confidence = detection.confidence;
                }
            }
        }

        if frame_is_sensitive {
            sensitive_frame_count += 1;
        }
    }

    let sensitive_ratio = sensitive_frame_count as f64 / total_frames as f64;

    if weapon_count > 0 && (max_confidence > policy.flag_confidence || weapon_count >= 2) {
        Verdict {
            status: ModerationState::Flagged,
            score: max_confidence.min(policy.max_score),
            reason: format!(
                "Weapons detected: {} ({} detections)",
                labels.join(", "),
                weapon_count
            ),
            labels,
        }
    } else if weapon_count > 0
        && (max_confidence > policy.review_confidence
            || sensitive_ratio > policy.sensitive_ratio_threshold)
    {
        Verdict {
            status: ModerationState::Review,
            score: max_confidence * policy.review_score_factor,
            reason: format!("Potential sensitive content: {}", labels.join(", ")),
            labels,
        }
    } else if sensitive_ratio > policy.sensitive_ratio_threshold {
        Verdict {
            status: ModerationState::Review,
            score: sensitive_ratio * policy.ratio_score_factor,
            reason: format!("Multiple sensitive objects detected: {}", labels.join(", ")),
            labels,
        }
    } else {
        Verdict {
            status: ModerationState::Safe,
            score: 0.0,
            reason: String::new(),
            labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Detection;

    fn policy() -> AggregationPolicy {
        AggregationPolicy::default()
    }

    fn frame(detections: Vec<(&str, f64)>) -> FrameAnalysis {
        FrameAnalysis {
            timestamp_seconds: 0.0,
            detections: detections
                .into_iter()
                .map(|(label, confidence)| Detection {
                    label: label.to_string(),
                    confidence,
                })
                .collect(),
        }
    }

    #[test]
    fn test_empty_input_is_safe() {
        let verdict = aggregate(&[], &policy());
        assert_eq!(verdict.status, ModerationState::Safe);
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.reason, "no frames available");
        assert!(verdict.labels.is_empty());
    }

    #[test]
    fn test_high_confidence_weapon_is_flagged() {
        let frames = vec![
            frame(vec![("knife", 0.85)]),
            frame(vec![]),
            frame(vec![]),
        ];

        let verdict = aggregate(&frames, &policy());
        assert_eq!(verdict.status, ModerationState::Flagged);
        assert_eq!(verdict.score, 0.85);
        assert_eq!(verdict.labels, vec!["knife".to_string()]);
        assert!(verdict.reason.contains("knife"));
        assert!(verdict.reason.contains("1 detections"));
    }

    #[test]
    fn test_flag_score_is_capped() {
        let frames = vec![frame(vec![("rifle", 0.99)])];

        let verdict = aggregate(&frames, &policy());
        assert_eq!(verdict.status, ModerationState::Flagged);
        assert_eq!(verdict.score, 0.9);
    }

    #[test]
    fn test_two_weapon_grade_detections_flag_regardless_of_confidence() {
        // Both above weapon-grade (0.6) but below the 0.7 flag threshold.
        let frames = vec![frame(vec![("gun", 0.65)]), frame(vec![("knife", 0.62)])];

        let verdict = aggregate(&frames, &policy());
        assert_eq!(verdict.status, ModerationState::Flagged);
        assert_eq!(verdict.score, 0.65);
        assert_eq!(
            verdict.labels,
            vec!["gun".to_string(), "knife".to_string()]
        );
    }

    #[test]
    fn test_single_moderate_weapon_goes_to_review() {
        let frames = vec![
            frame(vec![("pistol", 0.65)]),
            frame(vec![]),
            frame(vec![]),
            frame(vec![]),
        ];

        let verdict = aggregate(&frames, &policy());
        assert_eq!(verdict.status, ModerationState::Review);
        assert!((verdict.score - 0.65 * 0.7).abs() < 1e-9);
        assert!(verdict.reason.starts_with("Potential sensitive content"));
    }

    #[test]
    fn test_sensitive_ratio_without_weapon_grade_goes_to_review() {
        // 4 of 10 frames carry a low-confidence sensitive detection.
        let mut frames = vec![
            frame(vec![("knife", 0.2)]),
            frame(vec![("knife", 0.2)]),
            frame(vec![("knife", 0.2)]),
            frame(vec![("knife", 0.2)]),
        ];
        frames.extend((0..6).map(|_| frame(vec![])));

        let verdict = aggregate(&frames, &policy());
        assert_eq!(verdict.status, ModerationState::Review);
        assert!((verdict.score - 0.4 * 0.5).abs() < 1e-9);
        assert!(verdict.reason.starts_with("Multiple sensitive objects"));
    }

    #[test]
    fn test_non_sensitive_labels_are_ignored() {
        let frames = vec![
            frame(vec![("person", 0.95), ("bottle", 0.9)]),
            frame(vec![("car", 0.99)]),
        ];

        let verdict = aggregate(&frames, &policy());
        assert_eq!(verdict.status, ModerationState::Safe);
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.reason, "");
        assert!(verdict.labels.is_empty());
    }

    #[test]
    fn test_low_ratio_low_confidence_is_safe() {
        // 1 of 10 sensitive frames, below weapon grade.
        let mut frames = vec![frame(vec![("knife", 0.3)])];
        frames.extend((0..9).map(|_| frame(vec![])));

        let verdict = aggregate(&frames, &policy());
        assert_eq!(verdict.status, ModerationState::Safe);
        assert_eq!(verdict.labels, vec!["knife".to_string()]);
    }

    #[test]
    fn test_labels_deduplicated_across_frames() {
        let frames = vec![
            frame(vec![("gun", 0.8), ("gun", 0.75)]),
            frame(vec![("gun", 0.9)]),
        ];

        let verdict = aggregate(&frames, &policy());
        assert_eq!(verdict.labels, vec!["gun".to_string()]);
    }

    #[test]
    fn test_review_scores_follow_policy_factors() {
        let mut policy = policy();
        policy.review_score_factor = 0.5;
        policy.ratio_score_factor = 0.25;

        let weapon_frames = vec![
            frame(vec![("pistol", 0.65)]),
            frame(vec![]),
            frame(vec![]),
            frame(vec![]),
        ];
        let verdict = aggregate(&weapon_frames, &policy);
        assert_eq!(verdict.status, ModerationState::Review);
        assert!((verdict.score - 0.65 * 0.5).abs() < 1e-9);

        // 4 of 10 sensitive frames, none weapon-grade.
        let mut ratio_frames = vec![
            frame(vec![("knife", 0.2)]),
            frame(vec![("knife", 0.2)]),
            frame(vec![("knife", 0.2)]),
            frame(vec![("knife", 0.2)]),
        ];
        ratio_frames.extend((0..6).map(|_| frame(vec![])));
        let verdict = aggregate(&ratio_frames, &policy);
        assert_eq!(verdict.status, ModerationState::Review);
        assert!((verdict.score - 0.4 * 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let frames = vec![
            frame(vec![("knife", 0.66), ("person", 0.9)]),
            frame(vec![("rifle", 0.4)]),
            frame(vec![]),
        ];

        let first = aggregate(&frames, &policy());
        for _ in 0..10 {
            assert_eq!(aggregate(&frames, &policy()), first);
        }
    }
}
