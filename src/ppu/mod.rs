//! NES PPU pixel pipeline: background shift register and sprite evaluation.
//!
//! `PixelPipeline` owns every piece of pipeline state for one console. The
//! CPU/bus core drives it one dot at a time with [`PixelPipeline::tick`] and
//! reads the sprite overflow flag back through [`PixelPipeline::status_bits`].

pub mod background;
pub mod memory;
pub mod registers;
pub mod sprites;

#[cfg(test)]
mod additional_tests;

pub use background::{pack_tile_row, BackgroundRenderer, BackgroundTileRegister, TileFetchLatch};
pub use memory::{NullPatternMemory, Oam, OamEntry, PatternMemory, VideoMemory, OAM_SIZE};
pub use registers::{PpuControl, PpuMask, PpuRegisters, PpuStatus, PRERENDER_SCANLINE, VISIBLE_SCANLINES};
pub use sprites::{
    fetch_sprite_pattern, sprite_pattern_address, ScanlineEvaluation, SpriteEvaluator, SpriteSlot,
    MAX_SPRITES_PER_SCANLINE,
};

#[derive(Debug, Clone)]
pub struct PixelPipeline {
    registers: PpuRegisters,
    oam: Oam,
    background: BackgroundRenderer,
    sprites: SpriteEvaluator,
}

impl PixelPipeline {
    pub fn new() -> Self {
        Self {
            registers: PpuRegisters::new(),
            oam: Oam::new(),
            background: BackgroundRenderer::new(),
            sprites: SpriteEvaluator::new(),
        }
    }

    /// Emulator reset. OAM contents survive, as on hardware.
    pub fn reset(&mut self) {
        self.registers = PpuRegisters::new();
        self.background.reset();
        self.sprites.reset();
    }

    pub fn registers(&self) -> &PpuRegisters {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut PpuRegisters {
        &mut self.registers
    }

    pub fn set_control(&mut self, value: u8) {
        self.registers.control = PpuControl::from_bits_truncate(value);
    }

    pub fn set_mask(&mut self, value: u8) {
        self.registers.mask = PpuMask::from_bits_truncate(value);
    }

    pub fn oam(&self) -> &Oam {
        &self.oam
    }

    /// OAM writes must land between scanline evaluations.
    pub fn oam_mut(&mut self) -> &mut Oam {
        &mut self.oam
    }

    pub fn background(&self) -> &BackgroundRenderer {
        &self.background
    }

    pub fn background_mut(&mut self) -> &mut BackgroundRenderer {
        &mut self.background
    }

    pub fn sprites(&self) -> &SpriteEvaluator {
        &self.sprites
    }

    /// Runs sprite evaluation and latches overflow into PPUSTATUS.
    ///
    /// The overflow bit stays set until the pre-render line clears it.
    pub fn evaluate_scanline<M: PatternMemory>(
        &mut self,
        memory: &M,
        sprite_size_large: bool,
        pattern_table_base: u16,
        scanline: u32,
    ) -> ScanlineEvaluation {
        let result = self.sprites.evaluate_scanline(
            &self.oam,
            memory,
            sprite_size_large,
            pattern_table_base,
            scanline,
        );
        if result.overflow {
            self.registers.status.insert(PpuStatus::SPRITE_OVERFLOW);
        }
        result
    }

    pub fn sprite_overflow(&self) -> bool {
        self.registers.status.contains(PpuStatus::SPRITE_OVERFLOW)
    }

    /// Pipeline-owned bits of $2002 (sprite overflow in bit 5).
    pub fn status_bits(&self) -> u8 {
        self.registers.status.bits()
    }

    /// Background nibble at the current fine X, or 0 with background disabled.
    pub fn background_pixel(&self) -> u8 {
        if !self.registers.mask.contains(PpuMask::BG_ENABLE) {
            return 0;
        }
        self.background.pixel(self.registers.fine_x)
    }

    /// First opaque sprite nibble at column `x`, None with sprites disabled.
    pub fn sprite_pixel(&self, x: u32) -> Option<(usize, u8)> {
        if !self.registers.mask.contains(PpuMask::SPRITE_ENABLE) {
            return None;
        }
        self.sprites.sprite_pixel(x)
    }

    /// Processes the current dot, then advances to the next one.
    /// Returns true when the frame wraps.
    pub fn tick<M: PatternMemory>(&mut self, memory: &M) -> bool {
        let dot = self.registers.dot;
        let scanline = self.registers.scanline;

        let prerender = scanline == PRERENDER_SCANLINE;
        let visible = scanline < VISIBLE_SCANLINES;
        let render_line = prerender || visible;
        let fetch_dot = (1..=256).contains(&dot) || (321..=336).contains(&dot);

        if self.registers.rendering_enabled() {
            if render_line && fetch_dot {
                self.background.shift();
                self.background.fetch_step(&self.registers, memory);
            }

            if prerender && (280..=304).contains(&dot) {
                self.registers.copy_y();
            }

            if render_line {
                if fetch_dot && dot % 8 == 0 {
                    self.registers.increment_coarse_x();
                }
                if dot == 256 {
                    self.registers.increment_y();
                }
                if dot == 257 {
                    self.registers.copy_x();
                }
            }

            if dot == 257 {
                if visible {
                    let control = self.registers.control;
                    self.evaluate_scanline(
                        memory,
                        control.sprite_size_large(),
                        control.sprite_pattern_base(),
                        scanline as u32,
                    );
                } else {
                    self.sprites.clear();
                }
            }
        }

        if prerender && dot == 1 {
            self.registers.status.remove(PpuStatus::SPRITE_OVERFLOW);
        }

        self.registers.advance_dot()
    }
}

impl Default for PixelPipeline {
    fn default() -> Self {
        Self::new()
    }
}
