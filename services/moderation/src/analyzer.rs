//! Analyzer client
//!
//! Invokes the external object-detection service (a Python script run as a
//! subprocess) on one frame image and parses its JSON payload. The
//! analyzer writes progress noise around the payload, so parsing scrubs
//! non-payload lines and extracts the first balanced JSON object.

use crate::config::AnalyzerConfig;
use crate::error::{ModerationError, ModerationResult};
use crate::models::{AnalyzerOutput, Detection};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Boundary to the frame-classification collaborator
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Whether the analyzer service is installed. Checked once per
    /// pipeline run, before any sampling starts.
    fn is_available(&self) -> bool;

    /// Classify one frame image, returning every detection the analyzer
    /// reported for it.
    async fn analyze(&self, image_path: &Path) -> ModerationResult<Vec<Detection>>;
}

/// Subprocess-backed analyzer client
pub struct SubprocessAnalyzer {
    config: AnalyzerConfig,
}

impl SubprocessAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Analyzer for SubprocessAnalyzer {
    fn is_available(&self) -> bool {
        self.config.script_path.exists()
    }

    async fn analyze(&self, image_path: &Path) -> ModerationResult<Vec<Detection>> {
        if !self.is_available() {
            return Err(ModerationError::AnalyzerUnavailable(format!(
                "analyzer script not found at {}",
                self.config.script_path.display()
            )));
        }

        debug!("Analyzing frame: {}", image_path.display());

        let invocation = Command::new(&self.config.command)
            .arg(&self.config.script_path)
            .arg(image_path)
            .kill_on_drop(true)
            .output();

        let output = timeout(self.config.timeout, invocation)
            .await
            .map_err(|_| {
                ModerationError::AnalyzerInvocation(format!(
                    "analyzer timed out after {}s",
                    self.config.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                ModerationError::AnalyzerInvocation(format!(
                    "failed to spawn '{}': {}",
                    self.config.command, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ModerationError::AnalyzerInvocation(format!(
                "analyzer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let payload = extract_payload(&stdout)?;

        if let Some(error) = payload.error {
            return Err(ModerationError::AnalyzerInvocation(error));
        }

        Ok(payload.detections)
    }
}

fn progress_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+%").expect("valid progress pattern"))
}

/// Extract the analyzer payload from stdout that may be surrounded by
/// model-download progress noise. Progress lines are dropped, then the
/// first balanced JSON object mentioning `"detections"` or `"error"` is
/// parsed (falling back to the first balanced object of any shape).
pub fn extract_payload(stdout: &str) -> ModerationResult<AnalyzerOutput> {
    let cleaned: String = stdout
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with("Downloading")
                && !line.contains('|')
                && !progress_line_pattern().is_match(line)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let candidate = first_balanced_object(&cleaned, |obj| {
        obj.contains("\"detections\"") || obj.contains("\"error\"")
    })
    .or_else(|| first_balanced_object(&cleaned, |_| true))
    .ok_or_else(|| {
        ModerationError::AnalyzerParse(format!(
            "no JSON payload found in output: {:.300}",
            stdout
        ))
    })?;

    serde_json::from_str(candidate)
        .map_err(|e| ModerationError::AnalyzerParse(format!("{}: {:.300}", e, candidate)))
}

/// Find the first balanced `{...}` substring satisfying `accept`. Brace
/// counting is enough here: analyzer payloads never contain braces inside
/// string values.
fn first_balanced_object(text: &str, accept: impl Fn(&str) -> bool) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let mut depth = 0usize;

        for (i, &b) in bytes.iter().enumerate().skip(start) {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let candidate = &text[start..=i];
                        if accept(candidate) {
                            return Some(candidate);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }

        search_from = start + 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_extract_plain_payload() {
        let payload = extract_payload(
            r#"{"detections": [{"label": "knife", "confidence": 0.82}], "sensitive_detections": [{"label": "knife", "confidence": 0.82}]}"#,
        )
        .unwrap();

        assert_eq!(payload.detections.len(), 1);
        assert_eq!(payload.detections[0].label, "knife");
        assert_eq!(payload.sensitive_detections.len(), 1);
        assert!(payload.error.is_none());
    }

    #[test]
    fn test_extract_payload_with_download_noise() {
        let stdout = concat!(
            "Downloading yolov8n.pt...\n",
            "  25%|████      | 1.6M/6.2M\n",
            "100%|██████████| 6.2M/6.2M\n",
            "{\"detections\": [], \"sensitive_detections\": []}\n",
        );

        let payload = extract_payload(stdout).unwrap();
        assert!(payload.detections.is_empty());
        assert!(payload.error.is_none());
    }

    #[test]
    fn test_extract_prefers_detection_object() {
        // An unrelated JSON object precedes the payload.
        let stdout = "{\"progress\": 1}\n{\"detections\": [{\"label\": \"gun\", \"confidence\": 0.9}]}";

        let payload = extract_payload(stdout).unwrap();
        assert_eq!(payload.detections.len(), 1);
        assert_eq!(payload.detections[0].label, "gun");
    }

    #[test]
    fn test_extract_error_payload() {
        let payload = extract_payload("{\"error\": \"Image file not found\"}").unwrap();
        assert_eq!(payload.error.as_deref(), Some("Image file not found"));
    }

    #[test]
    fn test_extract_rejects_non_json_output() {
        let result = extract_payload("Traceback (most recent call last):\nValueError: boom");
        assert!(matches!(result, Err(ModerationError::AnalyzerParse(_))));
    }

    #[test]
    fn test_extract_rejects_unbalanced_output() {
        let result = extract_payload("{\"detections\": [");
        assert!(matches!(result, Err(ModerationError::AnalyzerParse(_))));
    }

    #[test]
    fn test_missing_script_is_unavailable() {
        let analyzer = SubprocessAnalyzer::new(AnalyzerConfig {
            command: "python3".to_string(),
            script_path: PathBuf::from("/nonexistent/analyzer/app.py"),
            timeout: Duration::from_secs(5),
        });

        assert!(!analyzer.is_available());
    }

    #[tokio::test]
    async fn test_analyze_without_script_fails_fast() {
        let analyzer = SubprocessAnalyzer::new(AnalyzerConfig {
            command: "python3".to_string(),
            script_path: PathBuf::from("/nonexistent/analyzer/app.py"),
            timeout: Duration::from_secs(5),
        });

        let result = analyzer.analyze(Path::new("/tmp/frame.jpg")).await;
        assert!(matches!(
            result,
            Err(ModerationError::AnalyzerUnavailable(_))
        ));
    }
}
