use super::cell::CellData;
use rayon::prelude::*;

/// Converts packed RGB pixel data into half-block terminal cells.
///
/// Each cell covers two vertically stacked pixels, so a grid of
/// `width x height` pixels becomes `width x height/2` cells.
pub struct FrameProcessor {
    pub width: usize,
    pub height: usize,
}

impl FrameProcessor {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn process_frame(&self, pixel_data: &[u8]) -> Vec<CellData> {
        let mut cells = vec![CellData::default(); self.width * (self.height / 2)];
        self.process_frame_into(pixel_data, &mut cells);
        cells
    }

    pub fn process_frame_into(&self, pixel_data: &[u8], cells: &mut [CellData]) {
        let w = self.width;
        let term_height = self.height / 2;

        if cells.len() != w * term_height {
            return;
        }

        let chunk_size = if w * term_height > 10000 {
            2000
        } else {
            (w * term_height / rayon::current_num_threads().max(1)).max(1)
        };

        cells
            .par_chunks_mut(chunk_size)
            .enumerate()
            .for_each(|(chunk_idx, chunk)| {
                let start_idx = chunk_idx * chunk_size;

                for (i, cell) in chunk.iter_mut().enumerate() {
                    let idx = start_idx + i;
                    let cx = idx % w;
                    let cy = idx / w;

                    let top = pixel_at(pixel_data, w, cx, cy * 2);
                    let bottom = pixel_at(pixel_data, w, cx, cy * 2 + 1);

                    *cell = CellData {
                        char: '▀',
                        fg: top,
                        bg: bottom,
                    };
                }
            });
    }
}

fn pixel_at(pixel_data: &[u8], width: usize, x: usize, y: usize) -> (u8, u8, u8) {
    let offset = (y * width + x) * 3;
    if offset + 2 < pixel_data.len() {
        (
            pixel_data[offset],
            pixel_data[offset + 1],
            pixel_data[offset + 2],
        )
    } else {
        (0, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_block_pairs_rows() {
        let proc = FrameProcessor::new(2, 4);
        let mut frame = vec![0u8; 2 * 4 * 3];
        // Row 0 red, row 1 green, row 2 blue, row 3 white
        for x in 0..2 {
            frame[(x) * 3] = 255;
            frame[(2 + x) * 3 + 1] = 255;
            frame[(4 + x) * 3 + 2] = 255;
            let base = (6 + x) * 3;
            frame[base] = 255;
            frame[base + 1] = 255;
            frame[base + 2] = 255;
        }

        let cells = proc.process_frame(&frame);
        assert_eq!(cells.len(), 2 * 2);

        // First cell row pairs pixel rows 0 and 1
        assert_eq!(cells[0].char, '▀');
        assert_eq!(cells[0].fg, (255, 0, 0));
        assert_eq!(cells[0].bg, (0, 255, 0));
        // Second cell row pairs pixel rows 2 and 3
        assert_eq!(cells[2].fg, (0, 0, 255));
        assert_eq!(cells[2].bg, (255, 255, 255));
    }

    #[test]
    fn test_short_pixel_data_pads_black() {
        let proc = FrameProcessor::new(2, 2);
        let cells = proc.process_frame(&[255u8; 3]);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1].fg, (0, 0, 0));
    }
}
