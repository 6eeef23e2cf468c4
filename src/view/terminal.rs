use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    style::Print,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use fast_image_resize as fr;
use fr::images::Image;
use std::io::{BufWriter, Stdout, Write};
use std::time::Duration;

use super::cell::CellData;
use super::processor::FrameProcessor;
use crate::capture::provider::PreviewFrame;
use crate::capture::session::{CaptureState, CaptureView, SessionCommand, SessionHud};

/// Terminal rows reserved for the overlay above the camera preview.
const HUD_ROWS: u16 = 3;

const COLOR_LABEL: (u8, u8, u8) = (255, 255, 0);
const COLOR_HINT: (u8, u8, u8) = (200, 200, 200);
const COLOR_RECORDING: (u8, u8, u8) = (0, 255, 0);

/// Raw-mode terminal view: half-block TrueColor preview with a diffed
/// zero-allocation ANSI renderer, plus the session HUD overlay.
pub struct TerminalView {
    stdout: BufWriter<Stdout>,
    resizer: fr::Resizer,
    last_cells: Option<Vec<CellData>>,
    cell_buffer: Vec<CellData>,
    render_buffer: Vec<u8>,
    grid: (u16, u16),
}

impl TerminalView {
    pub fn new() -> Result<Self> {
        // Large output buffer keeps per-frame syscall overhead down
        let stdout = BufWriter::with_capacity(4 * 1024 * 1024, std::io::stdout());
        let mut view = Self {
            stdout,
            resizer: fr::Resizer::new(),
            last_cells: None,
            cell_buffer: Vec::new(),
            render_buffer: Vec::with_capacity(4 * 1024 * 1024),
            grid: (0, 0),
        };
        view.initialize_terminal()?;
        Ok(view)
    }

    fn initialize_terminal(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.stdout.execute(EnterAlternateScreen)?;
        self.stdout.execute(cursor::Hide)?;

        // Disable line wrapping so edge cells cannot scroll the screen
        self.stdout.execute(Print("\x1b[?7l"))?;
        // Synchronized updates: the terminal renders whole frames
        self.stdout.execute(Print("\x1b[?2026h"))?;

        Ok(())
    }

    // Helper for zero-allocation integer writing
    #[inline(always)]
    fn write_u8_fast(buffer: &mut Vec<u8>, mut n: u8) {
        if n >= 100 {
            buffer.push(b'0' + n / 100);
            n %= 100;
            buffer.push(b'0' + n / 10);
            buffer.push(b'0' + n % 10);
        } else if n >= 10 {
            buffer.push(b'0' + n / 10);
            buffer.push(b'0' + n % 10);
        } else {
            buffer.push(b'0' + n);
        }
    }

    #[inline(always)]
    fn write_u16_fast(buffer: &mut Vec<u8>, n: u16) {
        let mut digits = [0u8; 5];
        let mut len = 0;
        let mut value = n;
        loop {
            digits[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
            if value == 0 {
                break;
            }
        }
        for i in (0..len).rev() {
            buffer.push(digits[i]);
        }
    }

    /// Scale the preview into an exact grid-sized RGB canvas, aspect
    /// preserved and letterboxed with black.
    fn scale_to_grid(&mut self, frame: &PreviewFrame, dst_w: u32, dst_h: u32) -> Result<Vec<u8>> {
        let (new_w, new_h, x_off, y_off) =
            letterbox_dims(frame.width, frame.height, dst_w, dst_h);

        let src_image = Image::from_vec_u8(
            frame.width,
            frame.height,
            frame.buffer.clone(),
            fr::PixelType::U8x3,
        )?;
        let mut dst_image = Image::new(new_w, new_h, fr::PixelType::U8x3);
        self.resizer.resize(&src_image, &mut dst_image, None)?;

        let mut canvas = vec![0u8; (dst_w * dst_h * 3) as usize];
        let scaled = dst_image.buffer();
        for y in 0..new_h {
            let src_offset = (y * new_w) as usize * 3;
            let dst_offset = (((y_off + y) * dst_w + x_off) as usize) * 3;
            let copy_len = (new_w as usize) * 3;
            canvas[dst_offset..dst_offset + copy_len]
                .copy_from_slice(&scaled[src_offset..src_offset + copy_len]);
        }

        Ok(canvas)
    }

    /// Diff the cell grid against the previous frame and append escape
    /// sequences for the changed cells only.
    fn append_cells(&mut self, width: u16) {
        let cells = &self.cell_buffer;
        let buffer = &mut self.render_buffer;

        let mut force_redraw = false;
        if self.last_cells.as_ref().map(|v| v.len()).unwrap_or(0) != cells.len() {
            buffer.extend_from_slice(b"\x1b[2J");
            self.last_cells = Some(vec![CellData::default(); cells.len()]);
            force_redraw = true;
        }
        let last_cells = match &mut self.last_cells {
            Some(v) => v,
            None => return,
        };

        let mut last_fg: Option<(u8, u8, u8)> = None;
        let mut last_bg: Option<(u8, u8, u8)> = None;
        let mut cursor_x: i32 = -1;
        let mut cursor_y: i32 = -1;

        for (i, cell) in cells.iter().enumerate() {
            let old_cell = &last_cells[i];
            let changed = force_redraw
                || cell.char != old_cell.char
                || cell.fg != old_cell.fg
                || cell.bg != old_cell.bg;
            if !changed {
                cursor_x = -1;
                continue;
            }

            let target_x = (i % width as usize) as u16;
            let target_y = (i / width as usize) as u16 + HUD_ROWS;

            if cursor_x != target_x as i32 || cursor_y != target_y as i32 {
                buffer.extend_from_slice(b"\x1b[");
                Self::write_u16_fast(buffer, target_y + 1);
                buffer.push(b';');
                Self::write_u16_fast(buffer, target_x + 1);
                buffer.push(b'H');
                cursor_x = target_x as i32;
                cursor_y = target_y as i32;
            }

            if Some(cell.fg) != last_fg {
                buffer.extend_from_slice(b"\x1b[38;2;");
                Self::write_u8_fast(buffer, cell.fg.0);
                buffer.push(b';');
                Self::write_u8_fast(buffer, cell.fg.1);
                buffer.push(b';');
                Self::write_u8_fast(buffer, cell.fg.2);
                buffer.push(b'm');
                last_fg = Some(cell.fg);
            }
            if Some(cell.bg) != last_bg {
                buffer.extend_from_slice(b"\x1b[48;2;");
                Self::write_u8_fast(buffer, cell.bg.0);
                buffer.push(b';');
                Self::write_u8_fast(buffer, cell.bg.1);
                buffer.push(b';');
                Self::write_u8_fast(buffer, cell.bg.2);
                buffer.push(b'm');
                last_bg = Some(cell.bg);
            }

            let mut utf8 = [0u8; 4];
            buffer.extend_from_slice(cell.char.encode_utf8(&mut utf8).as_bytes());
            last_cells[i] = *cell;
            cursor_x += 1;
        }

        buffer.extend_from_slice(b"\x1b[0m");
    }

    fn append_hud_line(&mut self, row: u16, color: (u8, u8, u8), text: &str, max_cols: u16) {
        let buffer = &mut self.render_buffer;
        buffer.extend_from_slice(b"\x1b[");
        Self::write_u16_fast(buffer, row);
        buffer.extend_from_slice(b";1H\x1b[2K\x1b[38;2;");
        Self::write_u8_fast(buffer, color.0);
        buffer.push(b';');
        Self::write_u8_fast(buffer, color.1);
        buffer.push(b';');
        Self::write_u8_fast(buffer, color.2);
        buffer.push(b'm');

        let clipped: String = text.chars().take(max_cols as usize).collect();
        buffer.extend_from_slice(clipped.as_bytes());
        buffer.extend_from_slice(b"\x1b[0m");
    }

    fn append_hud(&mut self, hud: &SessionHud, cols: u16) {
        let status = format!("Label: {}    Samples: {}", hud.label, hud.sample_count);
        self.append_hud_line(1, COLOR_LABEL, &status, cols);

        match hud.state {
            CaptureState::Recording => {
                let line = format!("Recording frame {}/{}", hud.collected, hud.seq_len);
                self.append_hud_line(2, COLOR_RECORDING, &line, cols);

                let bar_width = cols.saturating_sub(2).min(40) as usize;
                let filled = ((hud.progress() * bar_width as f32) as usize).min(bar_width);
                let bar = "█".repeat(filled) + &"-".repeat(bar_width - filled);
                self.append_hud_line(3, COLOR_RECORDING, &bar, cols);
            }
            _ => {
                self.append_hud_line(
                    2,
                    COLOR_HINT,
                    "Press 'r' to record a sequence, 'q' to quit",
                    cols,
                );
                let notice = hud.notice.clone().unwrap_or_default();
                self.append_hud_line(3, COLOR_HINT, &notice, cols);
            }
        }
    }
}

impl CaptureView for TerminalView {
    fn render(&mut self, frame: &PreviewFrame, hud: &SessionHud) -> Result<()> {
        let (cols, rows) = terminal::size()?;
        let grid_rows = rows.saturating_sub(HUD_ROWS).max(1);

        self.render_buffer.clear();
        self.render_buffer.extend_from_slice(b"\x1b[?2026h");

        if frame.buffer.is_empty() || cols == 0 {
            self.append_hud(hud, cols.max(1));
        } else {
            let pixel_h = grid_rows as u32 * 2;
            let canvas = self.scale_to_grid(frame, cols as u32, pixel_h)?;

            if self.grid != (cols, grid_rows) {
                self.grid = (cols, grid_rows);
                self.cell_buffer = vec![CellData::default(); cols as usize * grid_rows as usize];
            }
            let processor = FrameProcessor::new(cols as usize, pixel_h as usize);
            let mut cells = std::mem::take(&mut self.cell_buffer);
            processor.process_frame_into(&canvas, &mut cells);
            self.cell_buffer = cells;

            self.append_cells(cols);
            self.append_hud(hud, cols);
        }

        self.render_buffer.extend_from_slice(b"\x1b[?2026l");

        let buffer = std::mem::take(&mut self.render_buffer);
        self.stdout.write_all(&buffer)?;
        self.stdout.flush()?;
        self.render_buffer = buffer;

        Ok(())
    }

    fn poll_command(&mut self, timeout: Duration) -> Result<Option<SessionCommand>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                return Ok(None);
            }
            let command = match key.code {
                KeyCode::Char('q') | KeyCode::Esc => Some(SessionCommand::Quit),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(SessionCommand::Quit)
                }
                KeyCode::Char('r') => Some(SessionCommand::StartRecording),
                _ => None,
            };
            return Ok(command);
        }
        Ok(None)
    }
}

impl Drop for TerminalView {
    fn drop(&mut self) {
        let _ = self.stdout.execute(Print("\x1b[?2026l\x1b[?7h"));
        let _ = self.stdout.execute(cursor::Show);
        let _ = self.stdout.execute(LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Aspect-preserving fit of a source frame into a destination box:
/// scaled size plus the letterbox offsets.
fn letterbox_dims(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> (u32, u32, u32, u32) {
    let scale_w = dst_w as f64 / src_w as f64;
    let scale_h = dst_h as f64 / src_h as f64;
    let scale = scale_w.min(scale_h);

    let new_w = ((src_w as f64 * scale).round() as u32).clamp(1, dst_w);
    let new_h = ((src_h as f64 * scale).round() as u32).clamp(1, dst_h);
    let x_off = (dst_w - new_w) / 2;
    let y_off = (dst_h - new_h) / 2;

    (new_w, new_h, x_off, y_off)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_fits_width() {
        // Wide source into a squarer box: width-bound, bars top and bottom
        let (w, h, x, y) = letterbox_dims(640, 480, 100, 100);
        assert_eq!((w, h), (100, 75));
        assert_eq!(x, 0);
        assert_eq!(y, 12);
    }

    #[test]
    fn test_letterbox_fits_height() {
        let (w, h, x, y) = letterbox_dims(480, 640, 100, 100);
        assert_eq!((w, h), (75, 100));
        assert_eq!(x, 12);
        assert_eq!(y, 0);
    }

    #[test]
    fn test_letterbox_never_exceeds_box() {
        let (w, h, _, _) = letterbox_dims(1921, 1080, 120, 60);
        assert!(w <= 120 && h <= 60);
        assert!(w >= 1 && h >= 1);
    }

    #[test]
    fn test_exact_fit_has_no_offsets() {
        let (w, h, x, y) = letterbox_dims(200, 100, 200, 100);
        assert_eq!((w, h, x, y), (200, 100, 0, 0));
    }
}
