mod capture;
mod shared;
mod storage;
mod utils;
mod view;

use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capture::{CameraProvider, CaptureConfig, CaptureSession};
use crate::view::TerminalView;

#[derive(Parser)]
#[command(author, version, about = "Record labeled gesture keypoint sequences from a webcam", long_about = None)]
struct Cli {
    /// Gesture label for the recorded samples
    #[arg(short, long)]
    label: String,
}

fn main() -> Result<()> {
    utils::logger::init();

    // Reset terminal state in case a previous run crashed in raw mode.
    // Errors are ignored because the terminal may not be in raw mode.
    let _ = crossterm::terminal::disable_raw_mode();
    let _ = crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen);

    let cli = Cli::parse();
    let config = CaptureConfig::default();

    // Validate before any capture device is touched
    let Some(label) = config.validate_label(&cli.label) else {
        println!(
            "'{}' is not a valid gesture label. Choose from: {}",
            cli.label.trim(),
            config.label_choices()
        );
        return Ok(());
    };

    println!("Recording samples for label '{}'.", label);
    println!("Controls: 'r' starts a sequence, 'q' quits.");

    let quit_flag = Arc::new(AtomicBool::new(false));
    let flag = quit_flag.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    let provider = CameraProvider::open(&config)?;
    let view = TerminalView::new()?;

    let session = CaptureSession::new(config, label.clone(), provider, view, quit_flag);
    let summary = session.run()?;

    println!(
        "\nFinished. Recorded {} samples for label '{}'.",
        summary.samples_recorded, label
    );

    Ok(())
}
