/// A single character cell on the terminal.
///
/// Half-block rendering: the glyph is '▀' with the top pixel as foreground
/// and the bottom pixel as background, both TrueColor RGB.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CellData {
    pub char: char,
    pub fg: (u8, u8, u8),
    pub bg: (u8, u8, u8),
}

impl Default for CellData {
    fn default() -> Self {
        Self {
            char: ' ',
            fg: (0, 0, 0),
            bg: (0, 0, 0),
        }
    }
}
