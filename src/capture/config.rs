use crate::shared::constants;
use std::path::PathBuf;
use std::time::Duration;

/// Capture settings, passed into the session and the sample writer.
///
/// Defaults come from `shared::constants`; tests inject their own
/// sequence length and output directory.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Frames per recorded sequence
    pub seq_len: usize,
    /// Closed set of accepted gesture labels
    pub valid_labels: Vec<String>,
    /// Directory samples are written to, created on first use
    pub sample_dir: PathBuf,
    /// Camera device index for the capture backend
    pub camera_index: i32,
    /// Keyboard poll timeout per loop tick
    pub poll_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            seq_len: constants::SEQ_LEN,
            valid_labels: constants::VALID_LABELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sample_dir: PathBuf::from(constants::SAMPLE_DIR),
            camera_index: constants::DEFAULT_CAMERA_INDEX,
            poll_interval: Duration::from_millis(constants::POLL_INTERVAL_MS),
        }
    }
}

impl CaptureConfig {
    /// Normalize a raw label argument and check it against the valid set.
    ///
    /// Returns the normalized label, or None when it is not a known gesture.
    pub fn validate_label(&self, raw: &str) -> Option<String> {
        let label = raw.trim().to_lowercase();
        if self.valid_labels.iter().any(|valid| *valid == label) {
            Some(label)
        } else {
            None
        }
    }

    /// Comma-separated valid labels for user-facing diagnostics.
    pub fn label_choices(&self) -> String {
        self.valid_labels.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_known_labels() {
        let config = CaptureConfig::default();
        for label in ["hello", "yes", "thank_you", "im_happy", "goodbye"] {
            assert_eq!(config.validate_label(label), Some(label.to_string()));
        }
    }

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let config = CaptureConfig::default();
        assert_eq!(config.validate_label("  HeLLo "), Some("hello".to_string()));
        assert_eq!(
            config.validate_label("THANK_YOU"),
            Some("thank_you".to_string())
        );
    }

    #[test]
    fn test_rejects_unknown_labels() {
        let config = CaptureConfig::default();
        assert_eq!(config.validate_label("bye"), None);
        assert_eq!(config.validate_label(""), None);
        assert_eq!(config.validate_label("hello world"), None);
    }

    #[test]
    fn test_label_choices_lists_all() {
        let config = CaptureConfig::default();
        let choices = config.label_choices();
        assert_eq!(choices, "hello, yes, thank_you, im_happy, goodbye");
    }

    #[test]
    fn test_defaults_from_constants() {
        let config = CaptureConfig::default();
        assert_eq!(config.seq_len, constants::SEQ_LEN);
        assert_eq!(config.sample_dir, PathBuf::from(constants::SAMPLE_DIR));
        assert_eq!(config.camera_index, constants::DEFAULT_CAMERA_INDEX);
    }
}
