use anyhow::{Context, Result};
use opencv::prelude::*;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};

use crate::utils::logger;

/// Landmarks per detected hand (MediaPipe hand landmark model convention).
pub const LANDMARK_COUNT: usize = 21;

/// Keypoint feature dimensionality: x, y, z per landmark.
pub const FEATURE_LEN: usize = LANDMARK_COUNT * 3;

const DETECTOR_SCRIPT: &str = "hand_landmarks.py";
const VENV_PYTHON: &str = ".venv/bin/python";

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[allow(dead_code)]
    handedness: String,
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Normalized hand landmark (x, y in 0..1 image space, z relative depth).
#[derive(Clone, Copy, Debug, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// One tracked hand: 21 landmarks plus the detector's confidence.
#[derive(Clone, Debug)]
pub struct HandDetection {
    pub landmarks: [Landmark; LANDMARK_COUNT],
    pub confidence: f32,
}

impl HandDetection {
    /// Flatten the landmarks into the fixed-length keypoint vector.
    pub fn feature_vector(&self) -> Vec<f32> {
        let mut features = Vec::with_capacity(FEATURE_LEN);
        for lm in &self.landmarks {
            features.push(lm.x);
            features.push(lm.y);
            features.push(lm.z);
        }
        features
    }

    /// Landmark positions in pixel coordinates for overlay drawing.
    /// `mirrored` flips x for display on a mirrored preview.
    pub fn pixel_points(&self, width: f32, height: f32, mirrored: bool) -> Vec<(i32, i32)> {
        self.landmarks
            .iter()
            .map(|lm| {
                let x = if mirrored { 1.0 - lm.x } else { lm.x };
                ((x * width) as i32, (lm.y * height) as i32)
            })
            .collect()
    }
}

/// Keypoint vector for frames with no confident detection. Keeps the
/// sequence shape fixed across dropped-detection frames.
pub fn zero_features() -> Vec<f32> {
    vec![0.0; FEATURE_LEN]
}

fn best_detection(result: DetectionJson, threshold: f32) -> Option<HandDetection> {
    if let Some(error) = result.error {
        logger::error(&format!("Hand detector error: {}", error));
        return None;
    }

    for hand in result.hands {
        if hand.score < threshold {
            continue;
        }
        if hand.landmarks.len() != LANDMARK_COUNT {
            logger::error(&format!(
                "Expected {} landmarks, got {}",
                LANDMARK_COUNT,
                hand.landmarks.len()
            ));
            continue;
        }

        let mut landmarks = [Landmark::default(); LANDMARK_COUNT];
        for (i, lm) in hand.landmarks.iter().enumerate() {
            landmarks[i] = Landmark {
                x: lm.x,
                y: lm.y,
                z: lm.z,
            };
        }
        return Some(HandDetection {
            landmarks,
            confidence: hand.score,
        });
    }

    None
}

/// Hand keypoint extractor backed by a MediaPipe hand-landmark model running
/// in a Python subprocess.
///
/// Protocol: one `READY` line on startup; per frame, a 12-byte little-endian
/// header (width, height, channels) plus raw BGR bytes on stdin, one JSON line
/// of detections on stdout.
///
/// Setup:
///   python3 -m venv .venv && .venv/bin/pip install mediapipe numpy
/// with `hand_landmarks.py` next to the executable's working directory.
pub struct LandmarkTracker {
    process: Child,
    stdout_reader: BufReader<std::process::ChildStdout>,
    confidence_threshold: f32,
}

impl LandmarkTracker {
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let script_path = cwd.join(DETECTOR_SCRIPT);
        let venv_python = cwd.join(VENV_PYTHON);

        if !script_path.exists() {
            anyhow::bail!("Hand detector script not found at {:?}", script_path);
        }
        if !venv_python.exists() {
            anyhow::bail!(
                "Python environment not found. Run: python3 -m venv .venv && .venv/bin/pip install mediapipe numpy"
            );
        }

        logger::info("Starting hand landmark subprocess...");

        let mut process = Command::new(&venv_python)
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .current_dir(&cwd)
            .spawn()
            .context("Failed to start hand detector subprocess")?;

        let stdout = process.stdout.take().context("Failed to get stdout")?;
        let mut stdout_reader = BufReader::new(stdout);

        let mut ready_line = String::new();
        stdout_reader.read_line(&mut ready_line)?;
        if ready_line.trim() != "READY" {
            anyhow::bail!("Hand detector did not signal ready, got: {}", ready_line);
        }

        logger::info("Hand landmark subprocess ready");

        Ok(Self {
            process,
            stdout_reader,
            confidence_threshold: 0.5,
        })
    }

    #[allow(dead_code)]
    pub fn set_confidence_threshold(&mut self, threshold: f32) {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
    }

    /// Detect hand landmarks in a BGR frame.
    pub fn detect(&mut self, frame: &Mat) -> Result<Option<HandDetection>> {
        if frame.empty() {
            return Ok(None);
        }

        let width = frame.cols() as u32;
        let height = frame.rows() as u32;
        let channels = frame.channels() as u32;
        let data = frame.data_bytes()?;

        let stdin = self.process.stdin.as_mut().context("Failed to get stdin")?;
        stdin.write_all(&width.to_le_bytes())?;
        stdin.write_all(&height.to_le_bytes())?;
        stdin.write_all(&channels.to_le_bytes())?;
        stdin.write_all(data)?;
        stdin.flush()?;

        let mut response = String::new();
        self.stdout_reader.read_line(&mut response)?;

        let result: DetectionJson = serde_json::from_str(&response)
            .with_context(|| format!("Failed to parse detector response: {}", response))?;

        Ok(best_detection(result, self.confidence_threshold))
    }
}

impl Drop for LandmarkTracker {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection_json(score: f32, landmark_count: usize) -> DetectionJson {
        let landmarks = (0..landmark_count)
            .map(|i| LandmarkJson {
                x: i as f32 * 0.01,
                y: i as f32 * 0.02,
                z: -0.1,
            })
            .collect();
        DetectionJson {
            hands: vec![HandJson {
                handedness: "Right".to_string(),
                score,
                landmarks,
            }],
            error: None,
        }
    }

    #[test]
    fn test_best_detection_flattens_to_feature_vector() {
        let detection = best_detection(detection_json(0.9, LANDMARK_COUNT), 0.5).unwrap();
        let features = detection.feature_vector();

        assert_eq!(features.len(), FEATURE_LEN);
        // Landmark i maps to features[3i..3i+3] as (x, y, z)
        assert_eq!(features[0], 0.0);
        assert_eq!(features[3], 0.01);
        assert_eq!(features[4], 0.02);
        assert_eq!(features[5], -0.1);
    }

    #[test]
    fn test_low_confidence_is_dropped() {
        assert!(best_detection(detection_json(0.2, LANDMARK_COUNT), 0.5).is_none());
    }

    #[test]
    fn test_malformed_landmark_count_is_dropped() {
        assert!(best_detection(detection_json(0.9, 5), 0.5).is_none());
    }

    #[test]
    fn test_detector_error_yields_none() {
        let result = DetectionJson {
            hands: Vec::new(),
            error: Some("no frame".to_string()),
        };
        assert!(best_detection(result, 0.5).is_none());
    }

    #[test]
    fn test_zero_features_shape() {
        let features = zero_features();
        assert_eq!(features.len(), 63);
        assert!(features.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_pixel_points_mirroring() {
        let detection = best_detection(detection_json(0.9, LANDMARK_COUNT), 0.5).unwrap();

        let plain = detection.pixel_points(100.0, 100.0, false);
        let mirrored = detection.pixel_points(100.0, 100.0, true);

        assert_eq!(plain.len(), LANDMARK_COUNT);
        // Landmark 10 sits at x=0.10, so the mirror lands at 0.90
        assert_eq!(plain[10].0, 10);
        assert_eq!(mirrored[10].0, 90);
        assert_eq!(plain[10].1, mirrored[10].1);
    }

    #[test]
    fn test_parses_detector_json_line() {
        let line = r#"{"hands":[{"handedness":"Left","score":0.8,"landmarks":[{"x":0.1,"y":0.2,"z":0.0}]}]}"#;
        let parsed: DetectionJson = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.hands.len(), 1);
        assert!(parsed.error.is_none());
    }
}
