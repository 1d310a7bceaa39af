use super::Chip8Error;

pub const MEMORY_SIZE: usize = 4096;
pub const ROM_START_ADDRESS: usize = 0x200;
pub const FONT_START_ADDRESS: usize = 0x50;

/// Bytes per font glyph.
pub const GLYPH_SIZE: usize = 5;

/// 4x5 hex digit sprites, 0 through F.
pub const FONT: [u8; 16 * GLYPH_SIZE] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

pub const FONT_END_ADDRESS: usize = FONT_START_ADDRESS + FONT.len();

/// 4KB address space with the font preloaded.
pub struct Memory {
    contents: [u8; MEMORY_SIZE],
}

impl Memory {
    pub fn new() -> Self {
        let mut contents = [0; MEMORY_SIZE];
        contents[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);
        Memory { contents }
    }

    /// Copies a ROM image to the program area at 0x200.
    pub fn load_bin(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        let rom_end = ROM_START_ADDRESS + rom.len();
        self.contents
            .get_mut(ROM_START_ADDRESS..rom_end)
            .ok_or(Chip8Error::RomLoadError {
                size: rom.len(),
                max_size: MEMORY_SIZE - ROM_START_ADDRESS,
            })?
            .copy_from_slice(rom);

        Ok(())
    }

    pub fn read8(&self, addr: u16) -> Result<u8, Chip8Error> {
        self.contents
            .get(addr as usize)
            .copied()
            .ok_or(Chip8Error::MemoryOutOfBounds { address: addr })
    }

    /// Reads a big-endian word. Both bytes must be in range.
    pub fn read16(&self, addr: u16) -> Result<u16, Chip8Error> {
        let high = self.read8(addr)?;
        let low = self.read8(addr.wrapping_add(1))?;

        Ok(u16::from_be_bytes([high, low]))
    }

    pub fn store8(&mut self, addr: u16, value: u8) -> Result<(), Chip8Error> {
        *self
            .contents
            .get_mut(addr as usize)
            .ok_or(Chip8Error::MemoryOutOfBounds { address: addr })? = value;
        Ok(())
    }

    pub fn store16(&mut self, addr: u16, value: u16) -> Result<(), Chip8Error> {
        // A failing store leaves memory untouched.
        let next = addr.wrapping_add(1);
        if addr as usize + 1 >= MEMORY_SIZE {
            return Err(Chip8Error::MemoryOutOfBounds { address: next });
        }
        let [high, low] = value.to_be_bytes();
        self.store8(addr, high)?;
        self.store8(next, low)
    }

    /// Address of the font glyph for the low nibble of `digit`.
    pub fn digit(digit: u8) -> u16 {
        (FONT_START_ADDRESS + (digit & 0x0F) as usize * GLYPH_SIZE) as u16
    }

    /// Copies `len` bytes starting at `addr`.
    pub fn window(&self, addr: u16, len: u16) -> Result<Vec<u8>, Chip8Error> {
        let start = addr as usize;
        let end = start + len as usize;
        self.contents
            .get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or(Chip8Error::MemoryOutOfBounds {
                address: end.saturating_sub(1).min(u16::MAX as usize) as u16,
            })
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_is_preloaded() {
        let memory = Memory::new();
        assert_eq!(memory.read8(FONT_START_ADDRESS as u16).unwrap(), 0xF0);
        assert_eq!(memory.read8(Memory::digit(0xF) + 4).unwrap(), 0x80);
        assert_eq!(Memory::digit(0x1A), Memory::digit(0xA));
    }

    #[test]
    fn words_are_big_endian() {
        let mut memory = Memory::new();
        memory.store16(0x300, 0xA55A).unwrap();
        assert_eq!(memory.read8(0x300).unwrap(), 0xA5);
        assert_eq!(memory.read8(0x301).unwrap(), 0x5A);
        assert_eq!(memory.read16(0x300).unwrap(), 0xA55A);
    }

    #[test]
    fn last_byte_is_addressable_but_not_as_a_word() {
        let mut memory = Memory::new();
        memory.store8(0xFFF, 0x12).unwrap();
        assert_eq!(memory.read8(0xFFF).unwrap(), 0x12);
        assert!(matches!(
            memory.read16(0xFFF),
            Err(Chip8Error::MemoryOutOfBounds { address: 0x1000 })
        ));
        assert!(matches!(
            memory.store16(0xFFF, 0xBEEF),
            Err(Chip8Error::MemoryOutOfBounds { address: 0x1000 })
        ));
        assert_eq!(memory.read8(0xFFF).unwrap(), 0x12);
        assert!(memory.read8(0x1000).is_err());
        assert!(memory.store8(0x1000, 0).is_err());
    }

    #[test]
    fn load_bin_copies_at_program_start() {
        let mut memory = Memory::new();
        memory.load_bin(&[0x12, 0x00]).unwrap();
        assert_eq!(memory.read16(ROM_START_ADDRESS as u16).unwrap(), 0x1200);

        let too_big = vec![0; MEMORY_SIZE - ROM_START_ADDRESS + 1];
        assert!(matches!(
            memory.load_bin(&too_big),
            Err(Chip8Error::RomLoadError { max_size: 3584, .. })
        ));
    }

    #[test]
    fn window_is_bounds_checked() {
        let memory = Memory::new();
        assert_eq!(memory.window(FONT_START_ADDRESS as u16, 5).unwrap(), FONT[..5]);
        assert!(memory.window(0xFFE, 2).is_ok());
        assert!(memory.window(0xFFE, 3).is_err());
    }
}
