use super::memory::PatternMemory;
use super::registers::PpuRegisters;
use crate::debug_flags;

/// Packs one 8-pixel tile row into 4-bit pixels, leftmost pixel in the top nibble.
///
/// Each nibble is `palette:2 | high plane bit | low plane bit`. With `mirrored`
/// set the pattern bytes are consumed LSB-first, which flips the row horizontally.
/// Background tiles and sprites share this encoding.
pub fn pack_tile_row(mut low: u8, mut high: u8, palette: u8, mirrored: bool) -> u32 {
    let attribute = ((palette & 0x03) as u32) << 2;
    let mut data = 0u32;

    for _ in 0..8 {
        let (low_bit, high_bit) = if mirrored {
            let bits = (low & 1, high & 1);
            low >>= 1;
            high >>= 1;
            bits
        } else {
            let bits = (low >> 7, high >> 7);
            low <<= 1;
            high <<= 1;
            bits
        };

        data = (data << 4) | attribute | ((high_bit as u32) << 1) | low_bit as u32;
    }

    data
}

/// Two tiles of packed background pixels.
///
/// `high32` holds the tile being drawn, `low32` the next one. Every shift moves
/// one pixel from the top of `low32` into the bottom of `high32`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackgroundTileRegister {
    high32: u32,
    low32: u32,
}

impl BackgroundTileRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_low32(&mut self, value: u32) {
        self.low32 = value;
    }

    pub fn set_high32(&mut self, value: u32) {
        self.high32 = value;
    }

    pub fn high32(&self) -> u32 {
        self.high32
    }

    pub fn low32(&self) -> u32 {
        self.low32
    }

    pub fn shift_left4(&mut self) {
        self.high32 = (self.high32 << 4) | ((self.low32 >> 28) & 0x0F);
        self.low32 <<= 4;
    }

    /// Nibble at column `fine_x` of the tile being drawn.
    ///
    /// Callers clamp `fine_x` to 0..=7. Larger values select an arbitrary
    /// nibble (the shift amount wraps) rather than panicking.
    pub fn pixel(&self, fine_x: u8) -> u8 {
        let shift = 7u32.wrapping_sub(fine_x as u32).wrapping_mul(4);
        (self.high32.wrapping_shr(shift) & 0x0F) as u8
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Bytes latched by the four background fetches of one tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileFetchLatch {
    pub nametable_byte: u8,
    pub palette: u8,
    pub low_byte: u8,
    pub high_byte: u8,
}

impl TileFetchLatch {
    pub fn nametable_address(v: u16) -> u16 {
        0x2000 | (v & 0x0FFF)
    }

    pub fn attribute_address(v: u16) -> u16 {
        0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07)
    }

    /// Pattern address of the low plane; the high plane sits 8 bytes above.
    pub fn pattern_address(&self, pattern_base: u16, fine_y: u16) -> u16 {
        pattern_base
            .wrapping_add((self.nametable_byte as u16) << 4)
            .wrapping_add(fine_y)
    }

    pub fn fetch_nametable_byte<M: PatternMemory>(&mut self, v: u16, memory: &M) {
        self.nametable_byte = memory.read_nametable_byte(Self::nametable_address(v));
    }

    pub fn fetch_attribute_byte<M: PatternMemory>(&mut self, v: u16, memory: &M) {
        let byte = memory.read_nametable_byte(Self::attribute_address(v));
        // Quadrant within the 32x32 attribute block
        let shift = ((v >> 4) & 0x04) | (v & 0x02);
        self.palette = (byte >> shift) & 0x03;
    }

    pub fn fetch_low_byte<M: PatternMemory>(&mut self, pattern_base: u16, fine_y: u16, memory: &M) {
        self.low_byte = memory.read_pattern_byte(self.pattern_address(pattern_base, fine_y));
    }

    pub fn fetch_high_byte<M: PatternMemory>(&mut self, pattern_base: u16, fine_y: u16, memory: &M) {
        let address = self.pattern_address(pattern_base, fine_y).wrapping_add(8);
        self.high_byte = memory.read_pattern_byte(address);
    }

    pub fn packed_row(&self) -> u32 {
        pack_tile_row(self.low_byte, self.high_byte, self.palette, false)
    }
}

/// Background half of the pipeline: shift register plus fetch latches
#[derive(Debug, Clone, Default)]
pub struct BackgroundRenderer {
    tile: BackgroundTileRegister,
    latch: TileFetchLatch,
}

impl BackgroundRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tile(&self) -> &BackgroundTileRegister {
        &self.tile
    }

    /// Direct access for an external tile-fetch stage reloading the register.
    pub fn tile_mut(&mut self) -> &mut BackgroundTileRegister {
        &mut self.tile
    }

    pub fn latch(&self) -> &TileFetchLatch {
        &self.latch
    }

    pub fn shift(&mut self) {
        self.tile.shift_left4();
    }

    pub fn pixel(&self, fine_x: u8) -> u8 {
        self.tile.pixel(fine_x)
    }

    /// Moves the latched tile into the incoming half of the shift register.
    pub fn store_tile(&mut self) {
        let row = self.latch.packed_row();
        if debug_flags::bg_fetch() {
            log::trace!(
                "bg store: tile=0x{:02X} palette={} low=0x{:02X} high=0x{:02X} -> 0x{:08X}",
                self.latch.nametable_byte,
                self.latch.palette,
                self.latch.low_byte,
                self.latch.high_byte,
                row
            );
        }
        self.tile.set_low32(row);
    }

    /// One fetch-cycle step. The fetch performed depends on `dot % 8`:
    /// 1 nametable, 3 attribute, 5 low plane, 7 high plane, 0 store.
    pub fn fetch_step<M: PatternMemory>(&mut self, registers: &PpuRegisters, memory: &M) {
        let v = registers.v;
        let pattern_base = registers.control.bg_pattern_base();
        let fine_y = registers.fine_y();

        match registers.dot % 8 {
            1 => self.latch.fetch_nametable_byte(v, memory),
            3 => self.latch.fetch_attribute_byte(v, memory),
            5 => self.latch.fetch_low_byte(pattern_base, fine_y, memory),
            7 => self.latch.fetch_high_byte(pattern_base, fine_y, memory),
            0 => self.store_tile(),
            _ => {}
        }
    }

    pub fn reset(&mut self) {
        self.tile.reset();
        self.latch = TileFetchLatch::default();
    }
}
