use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::buffer::SequenceBuffer;
use super::config::CaptureConfig;
use super::provider::{CaptureProvider, PreviewFrame};
use crate::storage::SampleWriter;
use crate::utils::logger;

/// Command a view can hand to the session each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    StartRecording,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Previewing,
    Recording,
    Quitting,
}

/// Why a recording attempt ended before reaching the full sequence length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    UserQuit,
    EndOfStream,
}

impl AbortReason {
    fn describe(self) -> &'static str {
        match self {
            AbortReason::UserQuit => "aborted by user",
            AbortReason::EndOfStream => "capture stream ended",
        }
    }
}

#[derive(Debug)]
pub enum RecordingOutcome {
    Saved(PathBuf),
    Aborted(AbortReason),
}

/// Snapshot of session state for rendering. The view consumes this; the
/// session never touches the display directly.
#[derive(Debug, Clone)]
pub struct SessionHud {
    pub label: String,
    pub state: CaptureState,
    pub collected: usize,
    pub seq_len: usize,
    pub sample_count: usize,
    pub notice: Option<String>,
}

impl SessionHud {
    /// Recording fill fraction in 0.0..=1.0.
    pub fn progress(&self) -> f32 {
        if self.seq_len == 0 {
            0.0
        } else {
            self.collected as f32 / self.seq_len as f32
        }
    }
}

/// Rendering and command input for a capture session.
pub trait CaptureView {
    fn render(&mut self, frame: &PreviewFrame, hud: &SessionHud) -> Result<()>;
    fn poll_command(&mut self, timeout: Duration) -> Result<Option<SessionCommand>>;
}

pub struct SessionSummary {
    pub samples_recorded: usize,
}

/// The capture loop: previews frames, records fixed-length keypoint
/// sequences on demand, and persists completed ones.
///
/// Single-threaded and synchronous; the keyboard poll timeout is the loop's
/// pacing. A quit request (key or SIGINT flag) takes effect at the next tick
/// boundary. The provider is released unconditionally on the way out,
/// including when the stream ends unexpectedly or a write fails.
pub struct CaptureSession<P: CaptureProvider, V: CaptureView> {
    config: CaptureConfig,
    label: String,
    provider: P,
    view: V,
    writer: SampleWriter,
    buffer: SequenceBuffer,
    state: CaptureState,
    sample_count: usize,
    quit_flag: Arc<AtomicBool>,
    notice: Option<String>,
}

impl<P: CaptureProvider, V: CaptureView> CaptureSession<P, V> {
    pub fn new(
        config: CaptureConfig,
        label: String,
        provider: P,
        view: V,
        quit_flag: Arc<AtomicBool>,
    ) -> Self {
        let writer = SampleWriter::new(&config);
        let buffer = SequenceBuffer::new(config.seq_len);
        Self {
            config,
            label,
            provider,
            view,
            writer,
            buffer,
            state: CaptureState::Previewing,
            sample_count: 0,
            quit_flag,
            notice: None,
        }
    }

    /// Run to completion. Always releases the provider, then surfaces any
    /// loop error.
    pub fn run(mut self) -> Result<SessionSummary> {
        let result = self.preview_loop();
        let released = self.provider.close();

        logger::info(&format!(
            "Session finished with {} samples for '{}'",
            self.sample_count, self.label
        ));

        result?;
        released?;
        Ok(SessionSummary {
            samples_recorded: self.sample_count,
        })
    }

    fn quit_requested(&self) -> bool {
        self.quit_flag.load(Ordering::SeqCst)
    }

    fn hud(&self, collected: usize) -> SessionHud {
        SessionHud {
            label: self.label.clone(),
            state: self.state,
            collected,
            seq_len: self.config.seq_len,
            sample_count: self.sample_count,
            notice: self.notice.clone(),
        }
    }

    fn preview_loop(&mut self) -> Result<()> {
        loop {
            self.state = CaptureState::Previewing;

            if self.quit_requested() {
                logger::info("Quit requested");
                self.state = CaptureState::Quitting;
                return Ok(());
            }

            let Some(frame) = self.provider.read_frame()? else {
                logger::info("Capture stream ended");
                self.state = CaptureState::Quitting;
                return Ok(());
            };
            let extraction = self.provider.extract(&frame)?;

            let hud = self.hud(0);
            self.view.render(&extraction.preview, &hud)?;

            match self.view.poll_command(self.config.poll_interval)? {
                Some(SessionCommand::Quit) => {
                    logger::info("Quit requested");
                    self.state = CaptureState::Quitting;
                    return Ok(());
                }
                Some(SessionCommand::StartRecording) => {
                    logger::info(&format!(
                        "Recording sequence #{} for '{}'",
                        self.sample_count + 1,
                        self.label
                    ));
                    match self.record_sequence()? {
                        RecordingOutcome::Saved(path) => {
                            let name = path
                                .file_name()
                                .map(|n| n.to_string_lossy().to_string())
                                .unwrap_or_default();
                            logger::info(&format!("Saved {}", name));
                            self.notice = Some(format!("Saved {}", name));
                        }
                        RecordingOutcome::Aborted(reason) => {
                            logger::info(&format!("Recording discarded: {}", reason.describe()));
                            self.notice =
                                Some(format!("Recording discarded: {}", reason.describe()));
                        }
                    }
                }
                None => {}
            }
        }
    }

    /// Record one fixed-length sequence. Runs as an uninterruptible inner
    /// loop relative to the outer command poll; only quit or end-of-stream
    /// can cut it short, and a short sequence is discarded, never saved.
    fn record_sequence(&mut self) -> Result<RecordingOutcome> {
        self.state = CaptureState::Recording;
        self.buffer.clear();

        while !self.buffer.is_full() {
            if self.quit_requested() {
                return Ok(self.abort(AbortReason::UserQuit));
            }

            let Some(frame) = self.provider.read_frame()? else {
                return Ok(self.abort(AbortReason::EndOfStream));
            };
            let extraction = self.provider.extract(&frame)?;
            self.buffer.append(extraction.keypoints)?;

            let hud = self.hud(self.buffer.len());
            self.view.render(&extraction.preview, &hud)?;

            if let Some(SessionCommand::Quit) =
                self.view.poll_command(self.config.poll_interval)?
            {
                return Ok(self.abort(AbortReason::UserQuit));
            }
        }

        let path = self.writer.write(&self.label, self.buffer.snapshot())?;
        self.sample_count += 1;
        Ok(RecordingOutcome::Saved(path))
    }

    fn abort(&mut self, reason: AbortReason) -> RecordingOutcome {
        self.buffer.clear();
        RecordingOutcome::Aborted(reason)
    }
}
