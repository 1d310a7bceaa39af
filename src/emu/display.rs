pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;

/// Monochrome framebuffer, one `u64` per row with the MSB as the leftmost pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Display {
    data: [u64; DISPLAY_Y],
}

impl Display {
    pub fn new() -> Self {
        Display {
            data: [0; DISPLAY_Y],
        }
    }

    pub fn clear(&mut self) {
        self.data = [0; DISPLAY_Y];
    }

    /// XORs one sprite byte into row `y` starting at column `x`.
    ///
    /// Pixels past column 63 are dropped, there is no horizontal wraparound.
    /// Returns true if a previously lit pixel was switched off.
    pub fn draw(&mut self, x: u8, y: u8, byte: u8) -> bool {
        let x = (x as usize) % DISPLAY_X;
        let mask = if x <= 56 {
            (byte as u64) << (56 - x)
        } else {
            (byte as u64) >> (x - 56)
        };

        let row = &mut self.data[y as usize];
        let before = *row;
        *row ^= mask;

        before & mask != 0
    }

    pub fn row(&self, y: usize) -> u64 {
        self.data[y]
    }

    pub fn rows(&self) -> &[u64; DISPLAY_Y] {
        &self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.data[y] & (1u64 << (DISPLAY_X - 1 - x)) != 0
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

impl From<[u64; DISPLAY_Y]> for Display {
    fn from(data: [u64; DISPLAY_Y]) -> Self {
        Display { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_places_msb_at_column() {
        let mut display = Display::new();
        assert!(!display.draw(0, 0, 0x80));
        assert_eq!(display.row(0), 1u64 << 63);
        assert!(display.pixel(0, 0));

        assert!(!display.draw(56, 1, 0xFF));
        assert_eq!(display.row(1), 0xFF);
        assert!(display.pixel(63, 1));
    }

    #[test]
    fn pixels_past_the_right_edge_are_dropped() {
        let mut display = Display::new();
        display.draw(60, 3, 0xFF);
        assert_eq!(display.row(3), 0x0F);
    }

    #[test]
    fn redraw_erases_and_reports_collision() {
        let mut display = Display::new();
        assert!(!display.draw(2, 4, 0xA5));
        assert!(display.draw(2, 4, 0xA5));
        assert_eq!(display.row(4), 0);
    }

    #[test]
    fn disjoint_bits_do_not_collide() {
        let mut display = Display::new();
        display.draw(0, 0, 0xA5);
        assert!(!display.draw(0, 0, 0x5A));
        assert_eq!(display.row(0), 0xFFu64 << 56);
    }

    #[test]
    fn clear_zeroes_every_row() {
        let mut display = Display::new();
        for y in 0..DISPLAY_Y as u8 {
            display.draw(y, y, 0xFF);
        }
        display.clear();
        assert!(display.rows().iter().all(|&row| row == 0));
    }
}
