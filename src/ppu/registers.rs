use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PpuControl: u8 {
        const NAMETABLE_X = 0b00000001;
        const NAMETABLE_Y = 0b00000010;
        const VRAM_INCREMENT = 0b00000100;
        const SPRITE_PATTERN = 0b00001000;
        const BG_PATTERN = 0b00010000;
        const SPRITE_SIZE = 0b00100000;
        const PPU_MASTER_SLAVE = 0b01000000;
        const NMI_ENABLE = 0b10000000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PpuMask: u8 {
        const GRAYSCALE = 0b00000001;
        const BG_LEFT_ENABLE = 0b00000010;
        const SPRITE_LEFT_ENABLE = 0b00000100;
        const BG_ENABLE = 0b00001000;
        const SPRITE_ENABLE = 0b00010000;
        const EMPHASIZE_RED = 0b00100000;
        const EMPHASIZE_GREEN = 0b01000000;
        const EMPHASIZE_BLUE = 0b10000000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PpuStatus: u8 {
        const SPRITE_OVERFLOW = 0b00100000;
        const SPRITE_0_HIT = 0b01000000;
        const VBLANK = 0b10000000;
    }
}

impl PpuControl {
    pub fn sprite_size_large(&self) -> bool {
        self.contains(PpuControl::SPRITE_SIZE)
    }

    /// Pattern table used by 8x8 sprites. 8x16 sprites pick their table from the tile index.
    pub fn sprite_pattern_base(&self) -> u16 {
        if self.contains(PpuControl::SPRITE_PATTERN) { 0x1000 } else { 0x0000 }
    }

    pub fn bg_pattern_base(&self) -> u16 {
        if self.contains(PpuControl::BG_PATTERN) { 0x1000 } else { 0x0000 }
    }
}

pub const DOTS_PER_SCANLINE: u16 = 341;
pub const SCANLINES_PER_FRAME: u16 = 262;
pub const VISIBLE_SCANLINES: u16 = 240;
pub const PRERENDER_SCANLINE: u16 = 261;

/// PPU registers and timing state seen by the pixel pipeline
#[derive(Debug, Clone)]
pub struct PpuRegisters {
    pub control: PpuControl,
    pub mask: PpuMask,
    pub status: PpuStatus,

    // Scroll registers (Loopy registers)
    pub v: u16,     // Current VRAM address
    pub t: u16,     // Temporary VRAM address
    pub fine_x: u8, // Fine X scroll, always 0..=7

    // Timing
    pub dot: u16,
    pub scanline: u16,
    pub frame: u64,
}

impl PpuRegisters {
    pub fn new() -> Self {
        Self {
            control: PpuControl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            v: 0,
            t: 0,
            fine_x: 0,
            dot: 0,
            scanline: 0,
            frame: 0,
        }
    }

    pub fn rendering_enabled(&self) -> bool {
        self.mask.intersects(PpuMask::BG_ENABLE | PpuMask::SPRITE_ENABLE)
    }

    pub fn set_fine_x(&mut self, value: u8) {
        self.fine_x = value & 0x07;
    }

    pub fn fine_y(&self) -> u16 {
        (self.v >> 12) & 0x07
    }

    /// Coarse X increment; wraps at 31 and flips the horizontal nametable.
    pub fn increment_coarse_x(&mut self) {
        if (self.v & 0x001F) == 31 {
            self.v &= !0x001F;
            self.v ^= 0x0400;
        } else {
            self.v = self.v.wrapping_add(1);
        }
    }

    /// Fine Y increment with carry into coarse Y.
    ///
    /// Coarse Y wraps at 29 (switching the vertical nametable) and at 31
    /// (without switching, for writes that pointed into the attribute table).
    pub fn increment_y(&mut self) {
        if (self.v & 0x7000) != 0x7000 {
            self.v = self.v.wrapping_add(0x1000);
            return;
        }

        self.v &= !0x7000;
        let mut coarse_y = (self.v & 0x03E0) >> 5;
        if coarse_y == 29 {
            coarse_y = 0;
            self.v ^= 0x0800;
        } else if coarse_y == 31 {
            coarse_y = 0;
        } else {
            coarse_y += 1;
        }
        self.v = (self.v & !0x03E0) | (coarse_y << 5);
    }

    pub fn copy_x(&mut self) {
        self.v = (self.v & 0xFBE0) | (self.t & 0x041F);
    }

    pub fn copy_y(&mut self) {
        self.v = (self.v & 0x841F) | (self.t & 0x7BE0);
    }

    /// Advance one dot. Returns true when a new frame begins.
    pub fn advance_dot(&mut self) -> bool {
        self.dot += 1;
        if self.dot < DOTS_PER_SCANLINE {
            return false;
        }
        self.dot = 0;
        self.scanline += 1;
        if self.scanline < SCANLINES_PER_FRAME {
            return false;
        }
        self.scanline = 0;
        self.frame += 1;
        true
    }
}

impl Default for PpuRegisters {
    fn default() -> Self {
        Self::new()
    }
}
