use super::background::pack_tile_row;
use super::memory::{Oam, PatternMemory, OAM_SPRITES};
use crate::debug_flags;

pub const MAX_SPRITES_PER_SCANLINE: usize = 8;

/// One sprite selected for the current scanline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpriteSlot {
    /// Packed 8-pixel row, same nibble layout as the background register.
    pub pattern_data: u32,
    pub position_x: u32,
    /// Raw attribute bit 5: set when the sprite sits behind the background.
    pub priority: bool,
    pub oam_index: u8,
}

impl SpriteSlot {
    /// Nibble covering screen column `x`, or None outside the sprite's 8 columns.
    pub fn pixel_at(&self, x: u32) -> Option<u8> {
        let offset = x.wrapping_sub(self.position_x);
        if offset > 7 {
            return None;
        }
        Some(((self.pattern_data >> ((7 - offset) << 2)) & 0x0F) as u8)
    }
}

/// Outcome of one scanline's OAM scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanlineEvaluation {
    pub sprite_count: u8,
    pub overflow: bool,
}

/// Pattern table address of the low plane for one sprite row.
///
/// `row` is the row inside the sprite as seen on screen; vertical flip is
/// applied here. For 8x16 sprites the table comes from tile bit 0 and
/// `pattern_table_base` is ignored.
pub fn sprite_pattern_address(
    tile: u8,
    attributes: u8,
    row: u32,
    sprite_size_large: bool,
    pattern_table_base: u16,
) -> u16 {
    let vertical_flip = attributes & 0x80 != 0;

    if !sprite_size_large {
        let row = if vertical_flip { 7u32.wrapping_sub(row) } else { row };
        let table = if pattern_table_base == 0x1000 { 0x1000u16 } else { 0 };
        return table
            .wrapping_add((tile as u16) << 4)
            .wrapping_add(row as u16);
    }

    let mut row = if vertical_flip { 15u32.wrapping_sub(row) } else { row };
    let table = (tile as u16 & 1) * 0x1000;
    let mut tile = tile & 0xFE;
    if row > 7 {
        tile = tile.wrapping_add(1);
        row = row.wrapping_sub(8);
    }

    table
        .wrapping_add((tile as u16) << 4)
        .wrapping_add(row as u16)
}

/// Fetches and packs one row of the sprite at `oam_index`.
pub fn fetch_sprite_pattern<M: PatternMemory>(
    oam: &Oam,
    memory: &M,
    oam_index: u8,
    row: u32,
    sprite_size_large: bool,
    pattern_table_base: u16,
) -> u32 {
    let entry = oam.entry(oam_index);
    let address = sprite_pattern_address(
        entry.tile,
        entry.attributes,
        row,
        sprite_size_large,
        pattern_table_base,
    );

    let low = memory.read_pattern_byte(address);
    let high = memory.read_pattern_byte(address.wrapping_add(8));

    pack_tile_row(low, high, entry.palette(), entry.horizontal_flip())
}

/// Per-scanline sprite selection and pattern fetch
#[derive(Debug, Clone, Default)]
pub struct SpriteEvaluator {
    slots: [SpriteSlot; MAX_SPRITES_PER_SCANLINE],
    sprite_count: u8,
}

impl SpriteEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans all 64 OAM entries for sprites covering `scanline`.
    ///
    /// The row test is an unsigned wrapping subtraction checked only against
    /// the sprite height, so sprites below the scanline wrap to a huge row and
    /// drop out. Every in-range sprite counts toward overflow, but only the
    /// first eight in OAM order get a slot.
    pub fn evaluate_scanline<M: PatternMemory>(
        &mut self,
        oam: &Oam,
        memory: &M,
        sprite_size_large: bool,
        pattern_table_base: u16,
        scanline: u32,
    ) -> ScanlineEvaluation {
        let height: u32 = if sprite_size_large { 16 } else { 8 };
        let mut in_range = 0usize;
        self.slots = [SpriteSlot::default(); MAX_SPRITES_PER_SCANLINE];

        for index in 0..OAM_SPRITES as u8 {
            let entry = oam.entry(index);
            let row = scanline.wrapping_sub(entry.y as u32);
            if row >= height {
                continue;
            }

            if in_range < MAX_SPRITES_PER_SCANLINE {
                let pattern_data = fetch_sprite_pattern(
                    oam,
                    memory,
                    index,
                    row,
                    sprite_size_large,
                    pattern_table_base,
                );
                self.slots[in_range] = SpriteSlot {
                    pattern_data,
                    position_x: entry.x as u32,
                    priority: entry.behind_background(),
                    oam_index: index,
                };

                if debug_flags::trace_sprite_eval() {
                    log::trace!(
                        "scanline {}: slot {} <- oam {} row={} x={} data=0x{:08X}",
                        scanline,
                        in_range,
                        index,
                        row,
                        entry.x,
                        pattern_data
                    );
                }
            }

            in_range += 1;
        }

        let overflow = in_range > MAX_SPRITES_PER_SCANLINE;
        if overflow {
            log::debug!(
                "sprite overflow on scanline {}: {} sprites in range",
                scanline,
                in_range
            );
        }

        self.sprite_count = in_range.min(MAX_SPRITES_PER_SCANLINE) as u8;

        ScanlineEvaluation {
            sprite_count: self.sprite_count,
            overflow,
        }
    }

    pub fn sprite_count(&self) -> u8 {
        self.sprite_count
    }

    /// Slots populated by the last evaluation, in OAM order.
    pub fn active_slots(&self) -> &[SpriteSlot] {
        &self.slots[..self.sprite_count as usize]
    }

    pub fn slots(&self) -> &[SpriteSlot; MAX_SPRITES_PER_SCANLINE] {
        &self.slots
    }

    /// First opaque sprite nibble at column `x` as `(slot, nibble)`.
    ///
    /// Nibbles whose pattern bits are zero are transparent. Priority against
    /// the background is left to the caller.
    pub fn sprite_pixel(&self, x: u32) -> Option<(usize, u8)> {
        self.active_slots()
            .iter()
            .enumerate()
            .find_map(|(slot, sprite)| match sprite.pixel_at(x) {
                Some(nibble) if nibble % 4 != 0 => Some((slot, nibble)),
                _ => None,
            })
    }

    /// Drops the sprite set (used on lines where no evaluation runs).
    pub fn clear(&mut self) {
        self.slots = [SpriteSlot::default(); MAX_SPRITES_PER_SCANLINE];
        self.sprite_count = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
