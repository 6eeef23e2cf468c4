use serde::{Deserialize, Serialize};

/// One persisted training sample: a fixed-length keypoint sequence and its
/// gesture label.
///
/// The archive holds exactly two entries, the sequence under `"x"` and the
/// label under `"y"`; the creation timestamp is carried by the filename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Keypoint sequence, shape (seq_len, feature_len)
    #[serde(rename = "x")]
    pub frames: Vec<Vec<f32>>,
    /// Gesture label
    #[serde(rename = "y")]
    pub label: String,
}

impl Sample {
    pub fn new(frames: Vec<Vec<f32>>, label: String) -> Self {
        Self { frames, label }
    }

    /// (rows, columns) of the stored sequence; columns taken from the first row.
    pub fn shape(&self) -> (usize, usize) {
        let rows = self.frames.len();
        let cols = self.frames.first().map(|row| row.len()).unwrap_or(0);
        (rows, cols)
    }
}
