use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::sample::Sample;
use crate::capture::CaptureConfig;
use crate::shared::constants;

/// Persists completed sequences as compressed sample archives.
///
/// Archive layout: uncompressed JSON length as little-endian u32, followed by
/// the lz4 block-compressed JSON body. Filenames combine the label with a
/// microsecond-resolution local timestamp, which keeps rapid successive
/// recordings from colliding. One file per call; a write failure ends the run.
pub struct SampleWriter {
    seq_len: usize,
    sample_dir: PathBuf,
}

impl SampleWriter {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            seq_len: config.seq_len,
            sample_dir: config.sample_dir.clone(),
        }
    }

    /// Write one sample archive, returning its path.
    pub fn write(&self, label: &str, frames: Vec<Vec<f32>>) -> Result<PathBuf> {
        if frames.len() != self.seq_len {
            anyhow::bail!(
                "Refusing to save a sequence of {} frames (expected {})",
                frames.len(),
                self.seq_len
            );
        }
        let width = frames.first().map(|row| row.len()).unwrap_or(0);
        if frames.iter().any(|row| row.len() != width) {
            anyhow::bail!("Keypoint rows have uneven lengths");
        }

        fs::create_dir_all(&self.sample_dir).with_context(|| {
            format!("Failed to create sample directory: {:?}", self.sample_dir)
        })?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%6f");
        let filename = format!(
            "{}_{}.{}",
            label,
            timestamp,
            constants::SAMPLE_EXTENSION
        );
        let path = self.sample_dir.join(filename);

        let sample = Sample::new(frames, label.to_string());
        let json = serde_json::to_vec(&sample)?;
        let compressed = lz4::block::compress(&json, None, false)?;

        let mut data = Vec::with_capacity(4 + compressed.len());
        data.extend_from_slice(&(json.len() as u32).to_le_bytes());
        data.extend_from_slice(&compressed);

        fs::write(&path, &data).with_context(|| format!("Failed to write sample: {:?}", path))?;

        Ok(path)
    }

    /// Read back a sample archive written by `write`.
    pub fn read(path: &Path) -> Result<Sample> {
        let data = fs::read(path).with_context(|| format!("Failed to read sample: {:?}", path))?;
        if data.len() < 4 {
            anyhow::bail!("Sample archive too short: {:?}", path);
        }

        let json_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        let json = lz4::block::decompress(&data[4..], Some(json_len as i32))?;
        let sample = serde_json::from_slice(&json)
            .with_context(|| format!("Malformed sample archive: {:?}", path))?;

        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &Path, seq_len: usize) -> CaptureConfig {
        CaptureConfig {
            seq_len,
            sample_dir: dir.to_path_buf(),
            ..CaptureConfig::default()
        }
    }

    fn sequence(rows: usize, cols: usize) -> Vec<Vec<f32>> {
        (0..rows)
            .map(|r| (0..cols).map(|c| (r * cols + c) as f32).collect())
            .collect()
    }

    #[test]
    fn test_write_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SampleWriter::new(&test_config(dir.path(), 30));

        let frames = sequence(30, 63);
        let path = writer.write("hello", frames.clone()).unwrap();
        assert!(path.exists());

        let sample = SampleWriter::read(&path).unwrap();
        assert_eq!(sample.shape(), (30, 63));
        assert_eq!(sample.label, "hello");
        assert_eq!(sample.frames, frames);
    }

    #[test]
    fn test_filename_carries_label_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SampleWriter::new(&test_config(dir.path(), 2));

        let path = writer.write("goodbye", sequence(2, 4)).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();

        assert!(name.starts_with("goodbye_"));
        assert!(name.ends_with(".bin"));
        // goodbye_YYYYMMDD_HHMMSS_ffffff.bin
        let stamp = name
            .trim_start_matches("goodbye_")
            .trim_end_matches(".bin");
        assert_eq!(stamp.len(), "20250101_120000_000000".len());
    }

    #[test]
    fn test_creates_sample_directory_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("samples");
        let writer = SampleWriter::new(&test_config(&nested, 1));

        assert!(!nested.exists());
        writer.write("yes", sequence(1, 3)).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_rejects_wrong_length_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SampleWriter::new(&test_config(dir.path(), 5));

        assert!(writer.write("hello", sequence(4, 3)).is_err());
        assert!(writer.write("hello", sequence(6, 3)).is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_rejects_uneven_rows() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SampleWriter::new(&test_config(dir.path(), 2));

        let mut frames = sequence(2, 3);
        frames[1].push(99.0);
        assert!(writer.write("hello", frames).is_err());
    }

    #[test]
    fn test_rapid_writes_produce_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SampleWriter::new(&test_config(dir.path(), 2));

        let first = writer.write("yes", sequence(2, 3)).unwrap();
        let second = writer.write("yes", sequence(2, 3)).unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_read_rejects_truncated_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        fs::write(&path, [0u8, 1]).unwrap();

        assert!(SampleWriter::read(&path).is_err());
    }
}
