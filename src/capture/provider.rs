use anyhow::{anyhow, Result};
use opencv::{core, imgproc, prelude::*, videoio};

use super::config::CaptureConfig;
use super::tracker::{self, LandmarkTracker};
use crate::utils::logger;

/// Display-ready frame: packed RGB24, row-major.
#[derive(Clone, Debug, Default)]
pub struct PreviewFrame {
    pub buffer: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Per-frame extraction result: the keypoint vector for the sequence buffer
/// and the preview frame for rendering.
pub struct Extraction {
    pub keypoints: Vec<f32>,
    pub preview: PreviewFrame,
}

/// The capture capability: a frame source plus keypoint extraction.
///
/// The session owns exactly one provider for its lifetime and releases it
/// unconditionally when quitting. `read_frame` returning `None` means
/// end-of-stream, which is a termination signal rather than an error.
pub trait CaptureProvider {
    type Frame;

    fn read_frame(&mut self) -> Result<Option<Self::Frame>>;
    fn extract(&mut self, frame: &Self::Frame) -> Result<Extraction>;
    fn close(&mut self) -> Result<()>;
}

/// Webcam provider: OpenCV capture device plus the hand landmark tracker.
pub struct CameraProvider {
    capture: videoio::VideoCapture,
    tracker: LandmarkTracker,
}

impl CameraProvider {
    pub fn open(config: &CaptureConfig) -> Result<Self> {
        let capture = videoio::VideoCapture::new(config.camera_index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(anyhow!(
                "Failed to open camera at index {}",
                config.camera_index
            ));
        }

        let tracker = LandmarkTracker::new()?;

        logger::info(&format!("Camera {} opened", config.camera_index));

        Ok(Self { capture, tracker })
    }
}

impl CaptureProvider for CameraProvider {
    type Frame = Mat;

    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? {
            return Ok(None);
        }
        if frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn extract(&mut self, frame: &Mat) -> Result<Extraction> {
        let detection = self.tracker.detect(frame)?;
        let keypoints = detection
            .as_ref()
            .map(|hand| hand.feature_vector())
            .unwrap_or_else(tracker::zero_features);

        // Mirror for a natural selfie-style preview
        let mut flipped = Mat::default();
        core::flip(frame, &mut flipped, 1)?;

        if let Some(hand) = &detection {
            let width = flipped.cols() as f32;
            let height = flipped.rows() as f32;
            for (x, y) in hand.pixel_points(width, height, true) {
                imgproc::circle(
                    &mut flipped,
                    core::Point::new(x, y),
                    3,
                    core::Scalar::new(0.0, 255.0, 0.0, 0.0),
                    -1,
                    imgproc::LINE_8,
                    0,
                )?;
            }
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color_def(&flipped, &mut rgb, imgproc::COLOR_BGR2RGB)?;
        if !rgb.is_continuous() {
            return Err(anyhow!("Preview frame is not continuous"));
        }

        let preview = PreviewFrame {
            buffer: rgb.data_bytes()?.to_vec(),
            width: rgb.cols() as u32,
            height: rgb.rows() as u32,
        };

        Ok(Extraction { keypoints, preview })
    }

    fn close(&mut self) -> Result<()> {
        self.capture.release()?;
        logger::info("Camera released");
        Ok(())
    }
}
