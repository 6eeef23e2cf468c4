pub const APP_NAME: &str = "signcap";

pub const ERROR_LOG_FILE: &str = "error.log";
pub const DEBUG_LOG_FILE: &str = "debug.log";

/// Frames per gesture sequence (~1 second of capture)
pub const SEQ_LEN: usize = 30;

pub const SAMPLE_DIR: &str = "data/samples";
pub const SAMPLE_EXTENSION: &str = "bin";

pub const VALID_LABELS: &[&str] = &["hello", "yes", "thank_you", "im_happy", "goodbye"];

pub const DEFAULT_CAMERA_INDEX: i32 = 0;

/// Keyboard poll timeout per loop tick, in milliseconds.
/// Doubles as the capture loop's pacing.
pub const POLL_INTERVAL_MS: u64 = 10;
